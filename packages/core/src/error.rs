//! Error types for the core layer.

use thiserror::Error;

use crate::HandleKind;

/// Errors raised while deriving ids or decoding wire values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A handle lacks the field its id is derived from.
    ///
    /// This is a precondition violation by whoever produced the handle; no
    /// fallback id is ever invented for it.
    #[error("malformed {kind} handle: missing {field}")]
    MalformedHandle {
        kind: HandleKind,
        field: &'static str,
    },

    /// A wire value could not be decoded into the expected shape.
    #[error("decode error: {message}")]
    Decode { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_handle_display() {
        let e = Error::MalformedHandle {
            kind: HandleKind::FileSystem,
            field: "account.rootDID",
        };
        let display = format!("{}", e);
        assert!(display.contains("file system"));
        assert!(display.contains("account.rootDID"));
    }

    #[test]
    fn decode_display() {
        let e = Error::Decode {
            message: "expected a map".to_string(),
        };
        assert_eq!(format!("{}", e), "decode error: expected a map");
    }
}
