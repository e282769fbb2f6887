//! The fixed catalog of operations the UI side can call.
//!
//! Each entry names one operation, the handle kind it is scoped to and the
//! call style its arguments use unless an envelope says otherwise.

use portbridge_core::{FileSystem, Program, SdkResult, Value};

use crate::args::Arguments;
use crate::envelope::CallStyle;
use crate::error::CallError;
use crate::namespace::BoxFuture;
use CallStyle::{Single, Spread};
use FileSystemOp as F;
use ProgramOp as P;
use Target::{FileSystem as Fs, Program as Prog};

/// An operation scoped to a program handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramOp {
    IsUsernameAvailable,
    IsUsernameValid,
    Register,
    AuthSession,
    CollectCapabilities,
    RequestCapabilities,
    CapabilitySession,
}

impl ProgramOp {
    /// Start the SDK call with the arguments it declares.
    ///
    /// Arguments left over after that fail the call before the SDK sees it.
    pub(crate) fn prepare<'a>(
        self,
        program: &'a dyn Program,
        mut args: Arguments,
    ) -> Result<BoxFuture<'a, SdkResult>, CallError> {
        let call = match self {
            ProgramOp::IsUsernameAvailable => program.auth().is_username_available(args.take()),
            ProgramOp::IsUsernameValid => program.auth().is_username_valid(args.take()),
            ProgramOp::Register => program.auth().register(args.take()),
            ProgramOp::AuthSession => program.auth().session(),
            ProgramOp::CollectCapabilities => program.capabilities().collect(),
            ProgramOp::RequestCapabilities => program.capabilities().request(args.take()),
            ProgramOp::CapabilitySession => program.capabilities().session(args.take()),
        };
        args.finish()?;
        Ok(call)
    }
}

/// An operation scoped to a file system handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSystemOp {
    AcceptShare,
    Account,
    Add,
    Cat,
    Deactivate,
    Exists,
    Get,
    HistoryStep,
    LoadShare,
    Ls,
    Mkdir,
    Mv,
    Publish,
    Read,
    ResolveSymlink,
    Rm,
    SharePrivate,
    Symlink,
    Write,
}

/// What an operation resolves to on a particular handle.
pub enum Bound<'a> {
    /// A plain member, returned as-is without invoking anything.
    Property(Value),
    /// A started SDK call.
    Call(BoxFuture<'a, SdkResult>),
}

impl FileSystemOp {
    /// Whether the payload carries file content as `[path, bytes, ..]`.
    pub fn takes_content(self) -> bool {
        matches!(self, FileSystemOp::Add | FileSystemOp::Write)
    }

    /// Resolve the member this operation reads on `fs`, starting the call
    /// when it is a method.
    ///
    /// Properties ignore `args`. Methods fail on arguments left over after
    /// the ones they declare.
    pub(crate) fn bind<'a>(
        self,
        fs: &'a dyn FileSystem,
        mut args: Arguments,
    ) -> Result<Bound<'a>, CallError> {
        let call = match self {
            FileSystemOp::Account => return Ok(Bound::Property(fs.account().to_value())),
            FileSystemOp::AcceptShare => fs.accept_share(args.take()),
            FileSystemOp::Add => fs.add(args.take(), args.take(), args.take()),
            FileSystemOp::Cat => fs.cat(args.take()),
            FileSystemOp::Deactivate => fs.deactivate(),
            FileSystemOp::Exists => fs.exists(args.take()),
            FileSystemOp::Get => fs.get(args.take()),
            FileSystemOp::HistoryStep => fs.history_step(),
            FileSystemOp::LoadShare => fs.load_share(args.take()),
            FileSystemOp::Ls => fs.ls(args.take()),
            FileSystemOp::Mkdir => fs.mkdir(args.take(), args.take()),
            FileSystemOp::Mv => fs.mv(args.take(), args.take()),
            FileSystemOp::Publish => fs.publish(),
            FileSystemOp::Read => fs.read(args.take()),
            FileSystemOp::ResolveSymlink => fs.resolve_symlink(args.take()),
            FileSystemOp::Rm => fs.rm(args.take()),
            FileSystemOp::SharePrivate => fs.share_private(args.take(), args.take()),
            FileSystemOp::Symlink => fs.symlink(args.take()),
            FileSystemOp::Write => fs.write(args.take(), args.take(), args.take()),
        };
        args.finish()?;
        Ok(Bound::Call(call))
    }
}

/// What a catalog entry is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Unscoped: create a program from a configuration.
    CreateProgram,
    /// Program-scoped: load a user's file system and register it.
    LoadFileSystem,
    Program(ProgramOp),
    FileSystem(FileSystemOp),
}

/// One catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub name: &'static str,
    pub target: Target,
    pub style: CallStyle,
}

const fn op(name: &'static str, target: Target, style: CallStyle) -> Operation {
    Operation {
        name,
        target,
        style,
    }
}

/// Every operation the bridge registers.
pub static CATALOG: &[Operation] = &[
    op("program", Target::CreateProgram, Single),
    op("loadFileSystem", Target::LoadFileSystem, Single),
    op("auth.isUsernameAvailable", Prog(P::IsUsernameAvailable), Single),
    op("auth.isUsernameValid", Prog(P::IsUsernameValid), Single),
    op("auth.register", Prog(P::Register), Single),
    op("auth.session", Prog(P::AuthSession), Single),
    op("capabilities.collect", Prog(P::CollectCapabilities), Single),
    op("capabilities.request", Prog(P::RequestCapabilities), Single),
    op("capabilities.session", Prog(P::CapabilitySession), Single),
    op("fileSystem.acceptShare", Fs(F::AcceptShare), Single),
    op("fileSystem.account", Fs(F::Account), Single),
    op("fileSystem.add", Fs(F::Add), Spread),
    op("fileSystem.cat", Fs(F::Cat), Single),
    op("fileSystem.deactivate", Fs(F::Deactivate), Single),
    op("fileSystem.exists", Fs(F::Exists), Single),
    op("fileSystem.get", Fs(F::Get), Single),
    op("fileSystem.historyStep", Fs(F::HistoryStep), Single),
    op("fileSystem.loadShare", Fs(F::LoadShare), Single),
    op("fileSystem.ls", Fs(F::Ls), Single),
    op("fileSystem.mkdir", Fs(F::Mkdir), Single),
    op("fileSystem.mv", Fs(F::Mv), Spread),
    op("fileSystem.publish", Fs(F::Publish), Single),
    op("fileSystem.read", Fs(F::Read), Single),
    op("fileSystem.resolveSymlink", Fs(F::ResolveSymlink), Single),
    op("fileSystem.rm", Fs(F::Rm), Single),
    op("fileSystem.sharePrivate", Fs(F::SharePrivate), Spread),
    op("fileSystem.symlink", Fs(F::Symlink), Single),
    op("fileSystem.write", Fs(F::Write), Spread),
];

/// Find a catalog entry by name.
pub fn lookup(name: &str) -> Option<&'static Operation> {
    CATALOG.iter().find(|operation| operation.name == name)
}
