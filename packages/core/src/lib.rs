//! portbridge core: handles, references and wire values
//!
//! This layer holds everything the dispatch layer needs to know about the
//! outside world without knowing how calls are dispatched:
//! - `Value`: the tree that crosses the message boundary
//! - `HandleId`: the id the UI side uses to address a live handle
//! - `Program` / `FileSystem` / `ProgramFactory`: contracts of the external SDKs
//! - `Outcome` / `Rejection`: what an SDK call resolves or rejects with
//! - `ReferenceTable` / `References`: id-to-handle tables
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use portbridge_core::{FileSystem, References};
//!
//! fn remember(refs: &References, fs: Arc<dyn FileSystem>) -> Result<(), portbridge_core::Error> {
//!     let id = refs.file_systems.put(fs)?;
//!     assert!(refs.file_systems.get(&id).is_some());
//!     Ok(())
//! }
//! ```

pub use bytes::Bytes;

pub mod convert;
mod error;
mod id;
pub mod reference;
mod sdk;
mod value;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use error::Error;
pub use id::{HandleId, HandleKind};
pub use reference::{file_system_ref, program_ref, ReferenceTable, Referenced, References};
pub use sdk::{
    Account, Auth, Capabilities, Configuration, FileSystem, NamespaceSpec, Outcome, Program,
    ProgramFactory, Rejection, SdkResult, Session,
};
pub use value::Value;
