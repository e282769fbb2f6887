//! Encoding SDK outcomes for the UI side.

use portbridge_core::{Outcome, References, Value};

use crate::error::CallError;

/// Turn a resolved outcome into response data.
///
/// - A new file system handle is registered and answered with null; handles
///   never cross the boundary.
/// - A code-bearing value is sent as its string form.
/// - Binary data is sent as an ordered sequence of byte values.
/// - Everything else passes through.
///
/// Registration happens synchronously here, right after the awaited call
/// resolved, so no other call can observe a half-registered handle.
pub fn normalize(outcome: Outcome, refs: &References) -> Result<Value, CallError> {
    match outcome {
        Outcome::Handle(fs) => {
            refs.file_systems.put(fs)?;
            Ok(Value::Null)
        }
        Outcome::Code(code) => Ok(Value::String(code.to_string())),
        Outcome::Bytes(bytes) => Ok(Value::byte_sequence(&bytes)),
        Outcome::Plain(Value::Bytes(bytes)) => Ok(Value::byte_sequence(&bytes)),
        Outcome::Plain(value) => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portbridge_core::testing::MemoryFileSystem;
    use portbridge_core::{Bytes, HandleId};
    use std::sync::Arc;

    #[test]
    fn handle_is_registered_and_hidden() {
        let refs = References::new();
        let fs = Arc::new(MemoryFileSystem::new("bob", "did:key:bob"));

        let data = normalize(Outcome::Handle(fs), &refs).unwrap();
        assert!(data.is_null());
        assert!(refs.file_systems.contains(&HandleId::new("did:key:bob")));
    }

    #[test]
    fn malformed_handle_is_an_error() {
        let refs = References::new();
        let fs = Arc::new(MemoryFileSystem::new("bob", ""));

        let result = normalize(Outcome::Handle(fs), &refs);
        assert!(matches!(result, Err(CallError::Core(_))));
        assert!(refs.file_systems.is_empty());
    }

    #[test]
    fn code_becomes_string() {
        let refs = References::new();
        let data = normalize(Outcome::code("bafyroot"), &refs).unwrap();
        assert_eq!(data, Value::from("bafyroot"));
    }

    #[test]
    fn bytes_become_sequence() {
        let refs = References::new();
        let data = normalize(Outcome::Bytes(Bytes::from_static(&[1, 2, 3])), &refs).unwrap();
        assert_eq!(
            data,
            Value::Array(vec![Value::from(1), Value::from(2), Value::from(3)])
        );

        let data = normalize(Outcome::Plain(Value::Bytes(vec![4])), &refs).unwrap();
        assert_eq!(data, Value::Array(vec![Value::from(4)]));
    }

    #[test]
    fn plain_passes_through() {
        let refs = References::new();
        let value = Value::from_pairs([("isFile", Value::Bool(true))]);
        assert_eq!(normalize(value.clone().into(), &refs).unwrap(), value);
    }
}
