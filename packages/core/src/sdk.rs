//! Contracts for the external program and file system SDKs.
//!
//! The bridge never implements identity or file system logic. It holds
//! handles that implement these traits and forwards wire values to them.
//! Arguments stay as [`Value`]s because the bridge does not interpret them;
//! only the SDK does.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::convert::from_value;
use crate::{Error, HandleKind, Value};

/// Result type of every asynchronous SDK call.
pub type SdkResult<T = Outcome> = Result<T, Rejection>;

/// The resolved value of an SDK call.
///
/// SDK implementations say what they return instead of letting the bridge
/// guess from the shape of the value. The bridge switches over these
/// variants exhaustively when encoding a response.
#[derive(Clone)]
pub enum Outcome {
    /// A new file system handle. Registered by the bridge, never serialized.
    Handle(Arc<dyn FileSystem>),
    /// A code-bearing value (a content id, an error code) sent as its string form.
    Code(Arc<dyn fmt::Display + Send + Sync>),
    /// A binary buffer.
    Bytes(Bytes),
    /// Anything already expressible as a wire value.
    Plain(Value),
}

impl Outcome {
    /// The outcome of a call that resolves with nothing.
    pub fn unit() -> Self {
        Outcome::Plain(Value::Null)
    }

    pub fn code(code: impl fmt::Display + Send + Sync + 'static) -> Self {
        Outcome::Code(Arc::new(code))
    }
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        Outcome::Plain(value)
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Handle(fs) => f
                .debug_tuple("Outcome::Handle")
                .field(&fs.account().root_did)
                .finish(),
            Outcome::Code(code) => f
                .debug_tuple("Outcome::Code")
                .field(&code.to_string())
                .finish(),
            Outcome::Bytes(bytes) => f
                .debug_struct("Outcome::Bytes")
                .field("len", &bytes.len())
                .finish(),
            Outcome::Plain(value) => f.debug_tuple("Outcome::Plain").field(value).finish(),
        }
    }
}

/// Why an SDK call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Rejected with a bare string.
    Text(String),
    /// Rejected with an error object, which may carry a message and may
    /// have a string form of its own.
    Error {
        message: Option<String>,
        repr: Option<String>,
    },
}

impl Rejection {
    /// An error object with a message.
    pub fn message(message: impl Into<String>) -> Self {
        Rejection::Error {
            message: Some(message.into()),
            repr: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Rejection::Text(text.into())
    }

    /// Reduce the rejection to a human-readable string.
    ///
    /// Prefers a non-empty message, then a non-empty string form, then
    /// `sentinel`.
    pub fn normalize(&self, sentinel: &str) -> String {
        let candidate = match self {
            Rejection::Text(text) => Some(text.as_str()),
            Rejection::Error { message, repr } => message
                .as_deref()
                .filter(|m| !m.is_empty())
                .or(repr.as_deref()),
        };
        match candidate {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => sentinel.to_string(),
        }
    }
}

impl From<Error> for Rejection {
    fn from(error: Error) -> Self {
        Rejection::message(error.to_string())
    }
}

/// The account a file system belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(rename = "rootDID")]
    pub root_did: String,
}

impl Account {
    pub fn new(username: impl Into<String>, root_did: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            root_did: root_did.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::from_pairs([
            ("username", Value::from(self.username.clone())),
            ("rootDID", Value::from(self.root_did.as_str())),
        ])
    }
}

/// How a program's namespace is written in its configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NamespaceSpec {
    /// Used verbatim.
    Plain(String),
    /// Derives to `"<creator>/<name>"`.
    App { creator: String, name: String },
}

/// Configuration a program is created from.
///
/// Only the namespace matters to the bridge; everything else is kept as-is
/// for the SDK.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub namespace: NamespaceSpec,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Configuration {
    pub fn new(namespace: NamespaceSpec) -> Self {
        Self {
            namespace,
            extra: BTreeMap::new(),
        }
    }

    /// Decode a configuration sent by the UI side.
    pub fn from_value(value: Value) -> Result<Self, Error> {
        from_value(value)
    }

    /// Derive the namespace string this configuration identifies.
    pub fn namespace(&self) -> Result<String, Error> {
        let malformed = Error::MalformedHandle {
            kind: HandleKind::Program,
            field: "configuration.namespace",
        };
        match &self.namespace {
            NamespaceSpec::Plain(ns) if ns.is_empty() => Err(malformed),
            NamespaceSpec::Plain(ns) => Ok(ns.clone()),
            NamespaceSpec::App { creator, name } if creator.is_empty() || name.is_empty() => {
                Err(malformed)
            }
            NamespaceSpec::App { creator, name } => Ok(format!("{}/{}", creator, name)),
        }
    }
}

/// An authenticated session, possibly with the user's file system loaded.
#[derive(Clone)]
pub struct Session {
    pub username: String,
    pub kind: String,
    pub fs: Option<Arc<dyn FileSystem>>,
}

impl Session {
    /// Encode for the UI side. The file system is left out; it is addressed
    /// by id instead.
    pub fn to_value(&self) -> Value {
        Value::from_pairs([
            ("username", Value::from(self.username.as_str())),
            ("type", Value::from(self.kind.as_str())),
        ])
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("kind", &self.kind)
            .field("fs", &self.fs.as_ref().map(|fs| fs.account().root_did.clone()))
            .finish()
    }
}

#[async_trait]
pub trait Auth: Send + Sync {
    async fn is_username_available(&self, username: Value) -> SdkResult;
    async fn is_username_valid(&self, username: Value) -> SdkResult;
    async fn register(&self, options: Value) -> SdkResult;
    async fn session(&self) -> SdkResult;
}

#[async_trait]
pub trait Capabilities: Send + Sync {
    async fn collect(&self) -> SdkResult;
    async fn request(&self, options: Value) -> SdkResult;
    async fn session(&self, username: Value) -> SdkResult;
}

/// An identity/session handle.
#[async_trait]
pub trait Program: Send + Sync {
    fn configuration(&self) -> &Configuration;

    fn session(&self) -> Option<&Session>;

    fn auth(&self) -> &dyn Auth;

    fn capabilities(&self) -> &dyn Capabilities;

    /// Load the file system of `username`.
    async fn load_file_system(&self, username: &str) -> SdkResult<Arc<dyn FileSystem>>;
}

/// Creates programs from configurations.
#[async_trait]
pub trait ProgramFactory: Send + Sync {
    async fn create(&self, configuration: Configuration) -> SdkResult<Arc<dyn Program>>;
}

/// A private file system scoped to an account.
///
/// Paths and option objects are passed through untouched. Content given to
/// `add` and `write` arrives as [`Value::Bytes`]. A trailing `options` the
/// caller did not send is `Value::Null`.
#[async_trait]
pub trait FileSystem: Send + Sync {
    fn account(&self) -> &Account;

    async fn accept_share(&self, options: Value) -> SdkResult;
    async fn add(&self, path: Value, content: Value, options: Value) -> SdkResult;
    async fn cat(&self, path: Value) -> SdkResult;
    async fn deactivate(&self) -> SdkResult;
    async fn exists(&self, path: Value) -> SdkResult;
    async fn get(&self, path: Value) -> SdkResult;
    async fn history_step(&self) -> SdkResult;
    async fn load_share(&self, options: Value) -> SdkResult;
    async fn ls(&self, path: Value) -> SdkResult;
    async fn mkdir(&self, path: Value, options: Value) -> SdkResult;
    async fn mv(&self, from: Value, to: Value) -> SdkResult;
    async fn publish(&self) -> SdkResult;
    async fn read(&self, path: Value) -> SdkResult;
    async fn resolve_symlink(&self, link: Value) -> SdkResult;
    async fn rm(&self, path: Value) -> SdkResult;
    async fn share_private(&self, paths: Value, options: Value) -> SdkResult;
    async fn symlink(&self, options: Value) -> SdkResult;
    async fn write(&self, path: Value, content: Value, options: Value) -> SdkResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_prefers_message() {
        let r = Rejection::Error {
            message: Some("boom".to_string()),
            repr: Some("Error: boom".to_string()),
        };
        assert_eq!(r.normalize("Unknown error"), "boom");
    }

    #[test]
    fn rejection_falls_back_to_string_form() {
        let r = Rejection::Error {
            message: Some(String::new()),
            repr: Some("[object Object]".to_string()),
        };
        assert_eq!(r.normalize("Unknown error"), "[object Object]");
        assert_eq!(Rejection::text("nope").normalize("Unknown error"), "nope");
    }

    #[test]
    fn rejection_falls_back_to_sentinel() {
        let r = Rejection::Error {
            message: None,
            repr: None,
        };
        assert_eq!(r.normalize("Unknown error"), "Unknown error");
        assert_eq!(Rejection::text("").normalize("fallback"), "fallback");
    }

    #[test]
    fn plain_namespace_is_verbatim() {
        let config = Configuration::new(NamespaceSpec::Plain("my-app".to_string()));
        assert_eq!(config.namespace().unwrap(), "my-app");
    }

    #[test]
    fn app_namespace_joins_creator_and_name() {
        let config = Configuration::from_value(Value::from_pairs([(
            "namespace",
            Value::from_pairs([
                ("creator", Value::from("fission")),
                ("name", Value::from("drive")),
            ]),
        )]))
        .unwrap();
        assert_eq!(config.namespace().unwrap(), "fission/drive");
    }

    #[test]
    fn extra_configuration_is_kept() {
        let config = Configuration::from_value(Value::from_pairs([
            ("namespace", Value::from("app")),
            ("debug", Value::from(true)),
        ]))
        .unwrap();
        assert_eq!(config.extra.get("debug"), Some(&serde_json::Value::Bool(true)));
    }

    #[test]
    fn empty_namespace_is_malformed() {
        let config = Configuration::new(NamespaceSpec::App {
            creator: "fission".to_string(),
            name: String::new(),
        });
        assert!(matches!(
            config.namespace(),
            Err(Error::MalformedHandle {
                kind: HandleKind::Program,
                ..
            })
        ));
    }

    #[test]
    fn missing_namespace_does_not_decode() {
        let result = Configuration::from_value(Value::from_pairs([("debug", Value::from(true))]));
        assert!(matches!(result, Err(Error::Decode { .. })));
    }

    #[test]
    fn session_encoding_leaves_out_file_system() {
        let session = Session {
            username: "alice".to_string(),
            kind: "webCrypto".to_string(),
            fs: None,
        };
        let value = session.to_value();
        assert_eq!(value.get("username"), Some(&Value::from("alice")));
        assert_eq!(value.get("type"), Some(&Value::from("webCrypto")));
        assert_eq!(value.get("fs"), None);
    }
}
