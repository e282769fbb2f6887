//! Envelopes: what crosses the message channel in each direction.

use portbridge_core::{HandleId, HandleKind, Value};
use serde::{Deserialize, Serialize};

use crate::error::{CallError, FailureKind};

/// How an argument payload is handed to the bound function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "bool", into = "bool")]
pub enum CallStyle {
    /// The payload is an array whose elements become positional arguments.
    Spread,
    /// The payload is passed as the one and only argument.
    Single,
}

impl From<bool> for CallStyle {
    fn from(use_splat: bool) -> Self {
        if use_splat {
            CallStyle::Spread
        } else {
            CallStyle::Single
        }
    }
}

impl From<CallStyle> for bool {
    fn from(style: CallStyle) -> Self {
        style == CallStyle::Spread
    }
}

/// Payload of a call to a handle-scoped operation.
///
/// On the wire this is `{ arg, programRef | fsRef, useSplat }`. The
/// operation itself is implied by the name the handler was registered
/// under, and only the id field matching its scope is read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallEnvelope {
    #[serde(default)]
    pub arg: Value,

    #[serde(
        default,
        rename = "programRef",
        skip_serializing_if = "Option::is_none"
    )]
    pub program_ref: Option<HandleId>,

    #[serde(default, rename = "fsRef", skip_serializing_if = "Option::is_none")]
    pub fs_ref: Option<HandleId>,

    /// Overrides the operation's catalog call style when present.
    #[serde(
        default,
        rename = "useSplat",
        skip_serializing_if = "Option::is_none"
    )]
    pub call_style: Option<CallStyle>,
}

impl CallEnvelope {
    /// A call on the program registered under `id`.
    pub fn program(id: impl Into<HandleId>, arg: Value) -> Self {
        Self {
            arg,
            program_ref: Some(id.into()),
            ..Self::default()
        }
    }

    /// A call on the file system registered under `id`.
    pub fn file_system(id: impl Into<HandleId>, arg: Value) -> Self {
        Self {
            arg,
            fs_ref: Some(id.into()),
            ..Self::default()
        }
    }

    /// The id this envelope carries for a handle of `kind`.
    pub fn handle_id(&self, kind: HandleKind) -> Option<&HandleId> {
        match kind {
            HandleKind::Program => self.program_ref.as_ref(),
            HandleKind::FileSystem => self.fs_ref.as_ref(),
        }
    }

    #[must_use]
    pub fn with_style(mut self, style: CallStyle) -> Self {
        self.call_style = Some(style);
        self
    }

    /// Decode an envelope from a handler's raw payload.
    pub fn decode(payload: Value) -> Result<Self, CallError> {
        portbridge_core::convert::from_value(payload).map_err(|e| {
            CallError::invalid_arguments(format!("malformed call envelope: {}", e))
        })
    }

    pub fn to_value(&self) -> Value {
        Value::from_pairs(
            [
                Some(("arg", self.arg.clone())),
                self.program_ref
                    .as_ref()
                    .map(|id| ("programRef", Value::from(id.as_str()))),
                self.fs_ref
                    .as_ref()
                    .map(|id| ("fsRef", Value::from(id.as_str()))),
                self.call_style
                    .map(|style| ("useSplat", Value::Bool(style.into()))),
            ]
            .into_iter()
            .flatten(),
        )
    }
}

/// A request as delivered by the host's message channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundRequest {
    pub correlation_id: u64,
    pub function_name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultTag {
    Ok,
    Err,
}

/// The response to one [`InboundRequest`].
///
/// A success carries `data` (possibly null) and no message; a failure
/// carries `error_message`, a failure kind, and null `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    pub tag: ResultTag,
    pub correlation_id: u64,
    pub method_name: String,
    pub data: Value,
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    pub context: Value,
}

impl ResultEnvelope {
    pub fn ok(correlation_id: u64, method_name: &str, data: Value, context: Value) -> Self {
        Self {
            tag: ResultTag::Ok,
            correlation_id,
            method_name: method_name.to_string(),
            data,
            error_message: None,
            failure: None,
            context,
        }
    }

    pub fn err(correlation_id: u64, method_name: &str, error: &CallError, context: Value) -> Self {
        Self {
            tag: ResultTag::Err,
            correlation_id,
            method_name: method_name.to_string(),
            data: Value::Null,
            error_message: Some(error.to_string()),
            failure: Some(error.kind()),
            context,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.tag == ResultTag::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_program_scoped_wire_shape() {
        let envelope: CallEnvelope = serde_json::from_str(
            r#"{"arg": ["alice"], "programRef": "fission/drive", "useSplat": true}"#,
        )
        .unwrap();
        assert_eq!(
            envelope.handle_id(HandleKind::Program),
            Some(&HandleId::new("fission/drive"))
        );
        assert_eq!(envelope.handle_id(HandleKind::FileSystem), None);
        assert_eq!(envelope.call_style, Some(CallStyle::Spread));
        assert_eq!(envelope.arg, Value::Array(vec![Value::from("alice")]));
    }

    #[test]
    fn decodes_file_system_scoped_wire_shape() {
        let envelope: CallEnvelope =
            serde_json::from_str(r#"{"arg": "private/a.txt", "fsRef": "did:key:alice", "useSplat": false}"#)
                .unwrap();
        assert_eq!(
            envelope.handle_id(HandleKind::FileSystem),
            Some(&HandleId::new("did:key:alice"))
        );
        assert_eq!(envelope.handle_id(HandleKind::Program), None);
        assert_eq!(envelope.call_style, Some(CallStyle::Single));
    }

    #[test]
    fn call_style_is_optional() {
        let envelope: CallEnvelope = serde_json::from_str(r#"{"fsRef": "did:key:alice"}"#).unwrap();
        assert_eq!(envelope.call_style, None);
        assert!(envelope.arg.is_null());
    }

    #[test]
    fn envelope_decodes_from_value() {
        let envelope = CallEnvelope::file_system("did:key:alice", Value::from("a.txt"))
            .with_style(CallStyle::Single);
        let decoded = CallEnvelope::decode(envelope.to_value()).unwrap();
        assert_eq!(decoded, envelope);

        let envelope = CallEnvelope::program("app", Value::Null);
        assert_eq!(envelope.to_value().get("programRef"), Some(&Value::from("app")));
        assert_eq!(CallEnvelope::decode(envelope.to_value()).unwrap(), envelope);
    }

    #[test]
    fn non_map_payload_is_invalid() {
        let result = CallEnvelope::decode(Value::from(3));
        assert!(matches!(result, Err(CallError::InvalidArguments { .. })));
    }

    #[test]
    fn failure_envelope_has_null_data() {
        let error = CallError::Rejected("boom".to_string());
        let envelope = ResultEnvelope::err(7, "fileSystem.ls", &error, Value::Null);
        assert!(!envelope.is_ok());
        assert!(envelope.data.is_null());
        assert_eq!(envelope.error_message.as_deref(), Some("boom"));
        assert_eq!(envelope.failure, Some(FailureKind::Rejected));

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["tag"], "err");
        assert_eq!(json["correlationId"], 7);
        assert_eq!(json["methodName"], "fileSystem.ls");
        assert_eq!(json["errorMessage"], "boom");
    }

    #[test]
    fn success_envelope_has_no_message() {
        let envelope = ResultEnvelope::ok(1, "fileSystem.exists", Value::Bool(true), Value::Null);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["tag"], "ok");
        assert_eq!(json["data"], true);
        assert!(json["errorMessage"].is_null());
        assert!(json.get("failure").is_none());
    }
}
