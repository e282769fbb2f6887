//! The registration contract and an in-memory task namespace.
//!
//! A namespace is where handlers are registered by name. The host's message
//! channel delivers [`InboundRequest`]s to the namespace, which runs the
//! matching handler and answers with a [`ResultEnvelope`].
//!
//! ## Example
//!
//! ```ignore
//! let mut ns = TaskNamespace::new("fission-codes/webnative", "8.0.0");
//! bridge.register(&mut ns);
//!
//! let response = ns
//!     .dispatch(InboundRequest {
//!         correlation_id: 1,
//!         function_name: "fileSystem.exists".to_string(),
//!         args: envelope.to_value(),
//!     })
//!     .await;
//! ```

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use portbridge_core::Value;
use tokio::sync::mpsc;

use crate::config::BridgeConfig;
use crate::envelope::{InboundRequest, ResultEnvelope};
use crate::error::CallError;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A registered handler: takes the raw payload, resolves to the response data.
pub type Handler = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, CallError>> + Send + Sync>;

/// Something handlers can be registered on.
pub trait Namespace {
    /// Register `handler` under `name`, replacing any earlier handler.
    fn register(&mut self, name: &str, handler: Handler);
}

/// An in-memory namespace that dispatches requests to registered handlers.
///
/// Responses are returned from [`TaskNamespace::dispatch`]. If an outgoing
/// channel is attached, each response is also pushed onto it.
pub struct TaskNamespace {
    name: String,
    version: String,
    handlers: BTreeMap<String, Handler>,
    outgoing: Option<mpsc::UnboundedSender<ResultEnvelope>>,
}

impl TaskNamespace {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            handlers: BTreeMap::new(),
            outgoing: None,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.namespace.clone(), config.version.clone())
    }

    /// Also deliver every response on `outgoing`.
    #[must_use]
    pub fn with_outgoing(mut self, outgoing: mpsc::UnboundedSender<ResultEnvelope>) -> Self {
        self.outgoing = Some(outgoing);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Registered operation names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Run the handler registered under `name`.
    pub async fn invoke(&self, name: &str, args: Value) -> Result<Value, CallError> {
        let handler = self
            .handlers
            .get(name)
            .cloned()
            .ok_or_else(|| CallError::UnknownOperation(name.to_string()))?;
        handler(args).await
    }

    /// Handle one request and produce its response envelope.
    pub async fn dispatch(&self, request: InboundRequest) -> ResultEnvelope {
        tracing::debug!(
            namespace = %self.name,
            function = %request.function_name,
            correlation_id = request.correlation_id,
            "dispatching request"
        );
        let envelope = match self.invoke(&request.function_name, request.args).await {
            Ok(data) => ResultEnvelope::ok(
                request.correlation_id,
                &request.function_name,
                data,
                self.context(),
            ),
            Err(error) => {
                tracing::warn!(
                    function = %request.function_name,
                    correlation_id = request.correlation_id,
                    error = %error,
                    "request failed"
                );
                ResultEnvelope::err(
                    request.correlation_id,
                    &request.function_name,
                    &error,
                    self.context(),
                )
            }
        };
        self.emit(&envelope);
        envelope
    }

    /// Decode a JSON request body and dispatch it.
    ///
    /// A body that does not decode is answered with a failure envelope
    /// under correlation id 0.
    pub async fn dispatch_json(&self, body: &str) -> ResultEnvelope {
        match serde_json::from_str::<InboundRequest>(body) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => {
                let error = CallError::invalid_arguments(format!("malformed request: {}", e));
                let envelope = ResultEnvelope::err(0, "", &error, self.context());
                self.emit(&envelope);
                envelope
            }
        }
    }

    fn context(&self) -> Value {
        Value::from_pairs([
            ("namespace", Value::from(self.name.as_str())),
            ("version", Value::from(self.version.as_str())),
        ])
    }

    fn emit(&self, envelope: &ResultEnvelope) {
        let Some(outgoing) = &self.outgoing else {
            return;
        };
        if outgoing.send(envelope.clone()).is_err() {
            tracing::warn!(
                correlation_id = envelope.correlation_id,
                "outgoing channel closed, response dropped"
            );
        }
    }
}

impl Namespace for TaskNamespace {
    fn register(&mut self, name: &str, handler: Handler) {
        tracing::debug!(namespace = %self.name, function = name, "registering handler");
        self.handlers.insert(name.to_string(), handler);
    }
}
