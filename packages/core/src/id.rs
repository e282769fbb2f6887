//! Identifiers for handles held on the Rust side of the bridge.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two kinds of long-lived handles the bridge keeps tables for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleKind {
    Program,
    FileSystem,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleKind::Program => write!(f, "program"),
            HandleKind::FileSystem => write!(f, "file system"),
        }
    }
}

/// Opaque id the UI side uses to address a handle.
///
/// Derived deterministically from the handle: a program's namespace, or a
/// file system's account root DID. The same logical handle always yields the
/// same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleId(String);

impl HandleId {
    pub fn new(id: impl Into<String>) -> Self {
        HandleId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for HandleId {
    fn from(id: String) -> Self {
        HandleId(id)
    }
}

impl From<&str> for HandleId {
    fn from(id: &str) -> Self {
        HandleId(id.to_string())
    }
}

impl From<HandleId> for crate::Value {
    fn from(id: HandleId) -> Self {
        crate::Value::String(id.0)
    }
}
