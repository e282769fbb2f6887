//! Turning an argument payload into positional arguments.

use portbridge_core::Value;

use crate::envelope::CallStyle;
use crate::error::CallError;

/// Positional arguments for one SDK call.
///
/// Missing trailing arguments read as `Null`, so a function called with
/// fewer arguments than it declares still sees every parameter.
#[derive(Debug)]
pub struct Arguments {
    values: std::vec::IntoIter<Value>,
}

impl Arguments {
    /// Apply a call style to a payload.
    ///
    /// `Spread` requires an array and uses its elements; `Single` passes the
    /// payload through as the first argument.
    pub fn from_payload(payload: Value, style: CallStyle) -> Result<Self, CallError> {
        let values = match (style, payload) {
            (CallStyle::Spread, Value::Array(items)) => items,
            (CallStyle::Spread, other) => {
                return Err(CallError::invalid_arguments(format!(
                    "spread call needs an array payload, got {}",
                    other.type_name()
                )))
            }
            (CallStyle::Single, value) => vec![value],
        };
        Ok(Self {
            values: values.into_iter(),
        })
    }

    /// Take the next positional argument.
    pub fn take(&mut self) -> Value {
        self.values.next().unwrap_or(Value::Null)
    }

    /// Fail if the caller sent more arguments than were taken.
    pub fn finish(mut self) -> Result<(), CallError> {
        let extra = self.values.len();
        if extra == 0 {
            return Ok(());
        }
        let first = self.values.next().unwrap_or_default();
        Err(CallError::invalid_arguments(format!(
            "{} unexpected trailing argument(s), starting with a {}",
            extra,
            first.type_name()
        )))
    }
}

/// Convert the content element of a `[path, content]` payload from an array
/// of byte values into binary.
pub fn content_to_binary(payload: Value) -> Result<Value, CallError> {
    let mut items = match payload {
        Value::Array(items) => items,
        other => {
            return Err(CallError::invalid_arguments(format!(
                "expected [path, content], got {}",
                other.type_name()
            )))
        }
    };
    let content = items
        .get(1)
        .ok_or_else(|| CallError::invalid_arguments("missing content argument"))?;
    let bytes = content.to_byte_vec().ok_or_else(|| {
        CallError::invalid_arguments("content must be an array of byte values (0-255)")
    })?;
    items[1] = Value::Bytes(bytes);
    Ok(Value::Array(items))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spread_uses_elements() {
        let mut args = Arguments::from_payload(
            Value::Array(vec![Value::from("a"), Value::from("b")]),
            CallStyle::Spread,
        )
        .unwrap();
        assert_eq!(args.take(), Value::from("a"));
        assert_eq!(args.take(), Value::from("b"));
        assert_eq!(args.take(), Value::Null);
    }

    #[test]
    fn single_passes_payload_whole() {
        let payload = Value::Array(vec![Value::from("a"), Value::from("b")]);
        let mut args = Arguments::from_payload(payload.clone(), CallStyle::Single).unwrap();
        assert_eq!(args.take(), payload);
        assert_eq!(args.take(), Value::Null);
    }

    #[test]
    fn finish_rejects_leftover_arguments() {
        let mut args = Arguments::from_payload(
            Value::Array(vec![Value::from("p"), Value::from("unused")]),
            CallStyle::Spread,
        )
        .unwrap();
        args.take();
        let result = args.finish();
        assert!(matches!(result, Err(CallError::InvalidArguments { .. })));
    }

    #[test]
    fn finish_accepts_fewer_arguments() {
        let mut args =
            Arguments::from_payload(Value::Array(vec![Value::from("p")]), CallStyle::Spread)
                .unwrap();
        args.take();
        args.take();
        assert!(args.finish().is_ok());
    }

    #[test]
    fn spread_of_non_array_is_invalid() {
        let result = Arguments::from_payload(Value::from("a"), CallStyle::Spread);
        assert!(matches!(result, Err(CallError::InvalidArguments { .. })));
    }

    #[test]
    fn content_becomes_binary() {
        let payload = Value::Array(vec![
            Value::from("private/hi.txt"),
            Value::Array(vec![Value::from(72), Value::from(105)]),
        ]);
        let converted = content_to_binary(payload).unwrap();
        assert_eq!(
            converted,
            Value::Array(vec![Value::from("private/hi.txt"), Value::Bytes(b"Hi".to_vec())])
        );
    }

    #[test]
    fn content_must_be_bytes() {
        let payload = Value::Array(vec![
            Value::from("a.txt"),
            Value::Array(vec![Value::from(300)]),
        ]);
        assert!(content_to_binary(payload).is_err());

        let payload = Value::Array(vec![Value::from("a.txt")]);
        assert!(content_to_binary(payload).is_err());

        assert!(content_to_binary(Value::from("a.txt")).is_err());
    }
}
