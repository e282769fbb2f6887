//! Failures of a single bridged call.

use portbridge_core::{HandleId, HandleKind};
use serde::{Deserialize, Serialize};

/// Why a call failed.
///
/// Every variant is caught at the call boundary and turned into a failure
/// envelope; nothing is thrown back into the host's message channel.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CallError {
    /// The envelope named a handle that was never registered.
    #[error("no {kind} registered under id '{id}'")]
    UnknownHandle { kind: HandleKind, id: HandleId },

    /// A scoped call arrived without a handle id.
    #[error("missing {kind} id")]
    MissingHandleId { kind: HandleKind },

    /// No handler is registered under this name.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// The argument payload does not fit the operation.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// The SDK call rejected. Carries the normalized message.
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Core(#[from] portbridge_core::Error),
}

impl CallError {
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        CallError::InvalidArguments {
            message: message.into(),
        }
    }

    /// The failure category reported alongside the message.
    pub fn kind(&self) -> FailureKind {
        match self {
            CallError::UnknownHandle { .. } | CallError::MissingHandleId { .. } => {
                FailureKind::Lookup
            }
            CallError::UnknownOperation(_) => FailureKind::UnknownOperation,
            CallError::InvalidArguments { .. } => FailureKind::Arguments,
            CallError::Rejected(_) => FailureKind::Rejected,
            CallError::Core(portbridge_core::Error::MalformedHandle { .. }) => {
                FailureKind::MalformedHandle
            }
            CallError::Core(portbridge_core::Error::Decode { .. }) => FailureKind::Arguments,
        }
    }
}

/// Failure categories visible to the UI side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Lookup,
    Rejected,
    Arguments,
    MalformedHandle,
    UnknownOperation,
}
