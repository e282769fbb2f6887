//! The dispatch registrar.
//!
//! A [`Bridge`] owns the reference tables and the program factory. It
//! registers one handler per catalog entry on a [`Namespace`]; each handler
//! decodes the payload, resolves the handle it is scoped to, calls the SDK
//! and encodes the result.
//!
//! Bridges are cheap to clone and every clone shares the same tables, so
//! handlers can own a clone. Separate `Bridge::new` calls give fully
//! independent instances.

use std::sync::Arc;

use portbridge_core::{
    file_system_ref, program_ref, Configuration, Error, FileSystem, HandleId, HandleKind,
    Program, ProgramFactory, Rejection, References, Value,
};

use crate::args::{content_to_binary, Arguments};
use crate::catalog::{self, Bound, FileSystemOp, Operation, ProgramOp, Target, CATALOG};
use crate::config::{BridgeConfig, InitOptions};
use crate::envelope::CallEnvelope;
use crate::error::CallError;
use crate::namespace::{BoxFuture, Handler, Namespace, TaskNamespace};
use crate::normalize::normalize;

struct Shared {
    factory: Arc<dyn ProgramFactory>,
    refs: References,
    config: BridgeConfig,
}

/// Binds the operation catalog to program and file system handles.
#[derive(Clone)]
pub struct Bridge {
    shared: Arc<Shared>,
}

impl Bridge {
    pub fn new(factory: Arc<dyn ProgramFactory>, config: BridgeConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                factory,
                refs: References::new(),
                config,
            }),
        }
    }

    /// Create a bridge and seed its tables with pre-existing handles.
    pub fn with_handles(
        factory: Arc<dyn ProgramFactory>,
        config: BridgeConfig,
        options: InitOptions,
    ) -> Result<Self, Error> {
        let bridge = Self::new(factory, config);
        bridge.shared.refs.programs.initialize(options.programs)?;
        bridge
            .shared
            .refs
            .file_systems
            .initialize(options.file_systems)?;
        Ok(bridge)
    }

    pub fn references(&self) -> &References {
        &self.shared.refs
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.shared.config
    }

    /// Register a handler for every catalog entry on `ns`.
    pub fn register<N: Namespace + ?Sized>(&self, ns: &mut N) {
        for operation in CATALOG {
            let bridge = self.clone();
            let handler: Handler =
                Arc::new(move |payload: Value| -> BoxFuture<'static, Result<Value, CallError>> {
                    let bridge = bridge.clone();
                    Box::pin(async move { bridge.run(operation, payload).await })
                });
            ns.register(operation.name, handler);
        }
        tracing::debug!(operations = CATALOG.len(), "registered bridge operations");
    }

    /// Call an operation directly by name, bypassing any namespace.
    pub async fn call(&self, name: &str, payload: Value) -> Result<Value, CallError> {
        let operation =
            catalog::lookup(name).ok_or_else(|| CallError::UnknownOperation(name.to_string()))?;
        self.run(operation, payload).await
    }

    async fn run(&self, operation: &'static Operation, payload: Value) -> Result<Value, CallError> {
        tracing::debug!(operation = operation.name, "running operation");
        match operation.target {
            Target::CreateProgram => self.create_program(payload).await,
            Target::LoadFileSystem => {
                let envelope = CallEnvelope::decode(payload)?;
                self.load_file_system(operation, envelope).await
            }
            Target::Program(op) => {
                let envelope = CallEnvelope::decode(payload)?;
                self.call_program(operation, op, envelope).await
            }
            Target::FileSystem(op) => {
                let envelope = CallEnvelope::decode(payload)?;
                self.call_file_system(operation, op, envelope).await
            }
        }
    }

    /// Create a program from a configuration payload.
    ///
    /// Resolves to `{ ok: <encoded program> }` or `{ err: <message> }`. Only
    /// a malformed program (one whose id cannot be derived) fails the call
    /// itself.
    async fn create_program(&self, payload: Value) -> Result<Value, CallError> {
        let configuration = match Configuration::from_value(payload) {
            Ok(configuration) => configuration,
            Err(e) => return Ok(err_value(e.to_string())),
        };
        let program = match self.shared.factory.create(configuration).await {
            Ok(program) => program,
            Err(rejection) => return Ok(err_value(self.rejection_message(&rejection))),
        };
        let encoded = self.adopt_program(program)?;
        Ok(Value::from_pairs([("ok", encoded)]))
    }

    /// Register a freshly created program and its session's file system.
    ///
    /// Both ids are derived before either table is touched.
    fn adopt_program(&self, program: Arc<dyn Program>) -> Result<Value, Error> {
        let encoded = encode_program(&*program)?;
        let refs = &self.shared.refs;
        refs.programs.put(program.clone())?;
        if let Some(fs) = program.session().and_then(|session| session.fs.clone()) {
            refs.file_systems.put(fs)?;
        }
        Ok(encoded)
    }

    async fn load_file_system(
        &self,
        operation: &Operation,
        envelope: CallEnvelope,
    ) -> Result<Value, CallError> {
        let program = self.program(&envelope)?;
        let mut args =
            Arguments::from_payload(envelope.arg, envelope.call_style.unwrap_or(operation.style))?;
        let username = args.take();
        args.finish()?;
        let username = username.as_str().ok_or_else(|| {
            CallError::invalid_arguments(format!(
                "username must be a string, got {}",
                username.type_name()
            ))
        })?;

        let fs = program
            .load_file_system(username)
            .await
            .map_err(|rejection| self.rejected(operation, &rejection))?;
        let id = self.shared.refs.file_systems.put(fs)?;
        Ok(id.into())
    }

    async fn call_program(
        &self,
        operation: &Operation,
        op: ProgramOp,
        envelope: CallEnvelope,
    ) -> Result<Value, CallError> {
        let program = self.program(&envelope)?;
        let args =
            Arguments::from_payload(envelope.arg, envelope.call_style.unwrap_or(operation.style))?;
        let outcome = op
            .prepare(&*program, args)?
            .await
            .map_err(|rejection| self.rejected(operation, &rejection))?;
        normalize(outcome, &self.shared.refs)
    }

    async fn call_file_system(
        &self,
        operation: &Operation,
        op: FileSystemOp,
        envelope: CallEnvelope,
    ) -> Result<Value, CallError> {
        let fs = self.file_system(&envelope)?;
        let payload = if op.takes_content() {
            content_to_binary(envelope.arg)?
        } else {
            envelope.arg
        };
        let args = Arguments::from_payload(payload, envelope.call_style.unwrap_or(operation.style))?;
        let call = match op.bind(&*fs, args)? {
            Bound::Property(value) => return Ok(value),
            Bound::Call(call) => call,
        };
        let outcome = call
            .await
            .map_err(|rejection| self.rejected(operation, &rejection))?;
        normalize(outcome, &self.shared.refs)
    }

    fn program(&self, envelope: &CallEnvelope) -> Result<Arc<dyn Program>, CallError> {
        let id = envelope
            .handle_id(HandleKind::Program)
            .ok_or(CallError::MissingHandleId {
                kind: HandleKind::Program,
            })?;
        self.shared
            .refs
            .programs
            .get(id)
            .ok_or_else(|| CallError::UnknownHandle {
                kind: HandleKind::Program,
                id: id.clone(),
            })
    }

    fn file_system(&self, envelope: &CallEnvelope) -> Result<Arc<dyn FileSystem>, CallError> {
        let id = envelope
            .handle_id(HandleKind::FileSystem)
            .ok_or(CallError::MissingHandleId {
                kind: HandleKind::FileSystem,
            })?;
        self.shared
            .refs
            .file_systems
            .get(id)
            .ok_or_else(|| CallError::UnknownHandle {
                kind: HandleKind::FileSystem,
                id: id.clone(),
            })
    }

    fn rejection_message(&self, rejection: &Rejection) -> String {
        rejection.normalize(&self.shared.config.unknown_error)
    }

    fn rejected(&self, operation: &Operation, rejection: &Rejection) -> CallError {
        let message = self.rejection_message(rejection);
        tracing::warn!(operation = operation.name, error = %message, "sdk call rejected");
        CallError::Rejected(message)
    }
}

fn err_value(message: String) -> Value {
    tracing::warn!(error = %message, "program creation failed");
    Value::from_pairs([("err", Value::String(message))])
}

/// Encode a program for the UI side: `{ fs, program, session }`.
///
/// `fs` is the id of the session's file system, or null. The session is
/// encoded without its file system.
pub fn encode_program(program: &dyn Program) -> Result<Value, Error> {
    let program_id = program_ref(program)?;
    let session = program.session();
    let fs_id = session
        .and_then(|session| session.fs.as_deref())
        .map(file_system_ref)
        .transpose()?;
    Ok(Value::from_pairs([
        ("fs", Value::from(fs_id.map(HandleId::into_string))),
        ("program", Value::from(program_id)),
        (
            "session",
            session.map(|session| session.to_value()).unwrap_or(Value::Null),
        ),
    ]))
}

/// Set up a bridge with its namespace, ready to hand to the host.
pub fn init(
    factory: Arc<dyn ProgramFactory>,
    config: BridgeConfig,
    options: InitOptions,
) -> Result<(Bridge, TaskNamespace), Error> {
    let mut ns = TaskNamespace::from_config(&config);
    let bridge = Bridge::with_handles(factory, config, options)?;
    bridge.register(&mut ns);
    Ok((bridge, ns))
}
