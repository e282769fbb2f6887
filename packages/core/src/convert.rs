//! Conversions between Value and serde types.

use serde::de::DeserializeOwned;

use crate::{Error, Value};

/// Convert a Value to a Rust type via serde.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, Error> {
    serde_json::from_value(value_to_json(value)).map_err(|e| Error::Decode {
        message: e.to_string(),
    })
}

/// Convert our Value to serde_json::Value.
///
/// Bytes become an array of integers, which is how the UI side receives
/// buffers.
pub fn value_to_json(value: Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(b),
        Value::Integer(i) => serde_json::Value::Number(i.into()),
        Value::Float(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s),
        Value::Bytes(b) => serde_json::Value::Array(
            b.into_iter()
                .map(|byte| serde_json::Value::Number(byte.into()))
                .collect(),
        ),
        Value::Array(arr) => serde_json::Value::Array(arr.into_iter().map(value_to_json).collect()),
        Value::Map(map) => serde_json::Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, value_to_json(v)))
                .collect(),
        ),
    }
}

/// Convert serde_json::Value to our Value.
pub fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                // Fallback for numbers neither i64 nor f64 can hold
                Value::String(n.to_string())
            }
        }
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (k, json_to_value(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Share {
        #[serde(rename = "shareId")]
        share_id: String,
        #[serde(rename = "sharedBy")]
        shared_by: String,
    }

    #[test]
    fn typed_decode() {
        let value = Value::from_pairs([
            ("shareId", Value::from("1")),
            ("sharedBy", Value::from("alice")),
        ]);
        assert_eq!(
            from_value::<Share>(value).unwrap(),
            Share {
                share_id: "1".to_string(),
                shared_by: "alice".to_string(),
            }
        );
    }

    #[test]
    fn decode_mismatch_is_an_error() {
        let result = from_value::<Share>(Value::from(3));
        assert!(matches!(result, Err(Error::Decode { .. })));
    }

    #[test]
    fn bytes_serialize_as_integer_arrays() {
        let json = value_to_json(Value::Bytes(vec![0, 255]));
        assert_eq!(json, serde_json::json!([0, 255]));
    }

    #[test]
    fn non_finite_floats_become_null() {
        assert_eq!(value_to_json(Value::Float(f64::NAN)), serde_json::Value::Null);
    }
}
