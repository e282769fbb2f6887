//! portbridge: dispatch registrar for program and file system handles
//!
//! The UI side lives behind a message channel and can only hold plain
//! values. This crate keeps the live SDK handles on this side, gives each
//! one a stable id, and registers a fixed catalog of operations on a
//! [`Namespace`]. A call names an operation and carries a [`CallEnvelope`]
//! with the handle id and the arguments; the bridge resolves the handle,
//! calls the SDK and encodes the result back into a plain [`Value`].
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use portbridge::{init, BridgeConfig, CallEnvelope, InboundRequest, InitOptions, Value};
//!
//! let (bridge, ns) = init(factory, BridgeConfig::default(), InitOptions::default())?;
//!
//! let response = ns
//!     .dispatch(InboundRequest {
//!         correlation_id: 7,
//!         function_name: "fileSystem.exists".to_string(),
//!         args: CallEnvelope::file_system("did:key:alice", Value::from("private/notes.md"))
//!             .to_value(),
//!     })
//!     .await;
//! ```

mod args;
pub mod catalog;
mod config;
mod envelope;
mod error;
mod namespace;
mod normalize;
mod registrar;

pub use args::{content_to_binary, Arguments};
pub use catalog::{lookup, Bound, FileSystemOp, Operation, ProgramOp, Target, CATALOG};
pub use config::{BridgeConfig, InitOptions};
pub use envelope::{CallEnvelope, CallStyle, InboundRequest, ResultEnvelope, ResultTag};
pub use error::{CallError, FailureKind};
pub use namespace::{BoxFuture, Handler, Namespace, TaskNamespace};
pub use normalize::normalize;
pub use registrar::{encode_program, init, Bridge};

pub use portbridge_core::{
    Account, Configuration, FileSystem, HandleId, HandleKind, NamespaceSpec, Outcome, Program,
    ProgramFactory, Rejection, References, Value,
};
