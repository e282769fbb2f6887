//! In-memory SDK fakes for tests.
//!
//! Enabled with the `test-utils` feature. Every fake records the arguments
//! of each call so tests can assert exactly what reached the SDK.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    Account, Auth, Capabilities, Configuration, FileSystem, Outcome, Program, ProgramFactory,
    Rejection, SdkResult, Session, Value,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A call that reached a fake.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub member: &'static str,
    pub args: Vec<Value>,
}

/// Ordered log of calls made on a fake.
#[derive(Debug, Default)]
pub struct CallLog {
    calls: Mutex<Vec<RecordedCall>>,
}

impl CallLog {
    pub fn record(&self, member: &'static str, args: Vec<Value>) {
        lock(&self.calls).push(RecordedCall { member, args });
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    pub fn last(&self) -> Option<RecordedCall> {
        lock(&self.calls).last().cloned()
    }

    pub fn count(&self, member: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| call.member == member)
            .count()
    }
}

/// Turn a path value into a lookup key.
///
/// Accepts plain strings and path objects of the form
/// `{"file": [..segments]}` or `{"directory": [..segments]}`.
fn path_key(path: &Value) -> Result<String, Rejection> {
    if let Some(s) = path.as_str() {
        return Ok(s.trim_matches('/').to_string());
    }
    let segments = path
        .get("file")
        .or_else(|| path.get("directory"))
        .and_then(Value::as_array)
        .ok_or_else(|| Rejection::message(format!("invalid path: {}", path.type_name())))?;
    segments
        .iter()
        .map(|segment| {
            segment
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| Rejection::message("path segments must be strings"))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(|parts| parts.join("/"))
}

#[derive(Default)]
struct Tree {
    files: BTreeMap<String, Vec<u8>>,
    directories: BTreeSet<String>,
    links: BTreeMap<String, String>,
}

/// A file system that keeps everything in memory.
pub struct MemoryFileSystem {
    account: Account,
    tree: Mutex<Tree>,
    rejection: Mutex<Option<Rejection>>,
    publishes: AtomicU64,
    pub calls: CallLog,
}

impl MemoryFileSystem {
    pub fn new(username: &str, root_did: &str) -> Self {
        Self {
            account: Account::new(username, root_did),
            tree: Mutex::new(Tree::default()),
            rejection: Mutex::new(None),
            publishes: AtomicU64::new(0),
            calls: CallLog::default(),
        }
    }

    /// Make every following call reject with `rejection`.
    pub fn reject_with(&self, rejection: Rejection) {
        *lock(&self.rejection) = Some(rejection);
    }

    /// Seed a file directly.
    pub fn insert_file(&self, path: &str, content: &[u8]) {
        lock(&self.tree)
            .files
            .insert(path.trim_matches('/').to_string(), content.to_vec());
    }

    /// Content of a file, if it exists.
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        lock(&self.tree).files.get(path.trim_matches('/')).cloned()
    }

    fn enter(&self, member: &'static str, args: Vec<Value>) -> SdkResult<()> {
        self.calls.record(member, args);
        match lock(&self.rejection).clone() {
            Some(rejection) => Err(rejection),
            None => Ok(()),
        }
    }

    fn store(&self, path: &Value, content: &Value) -> SdkResult {
        let key = path_key(path)?;
        let Value::Bytes(bytes) = content else {
            return Err(Rejection::message(format!(
                "content must be binary, got {}",
                content.type_name()
            )));
        };
        lock(&self.tree).files.insert(key, bytes.clone());
        Ok(Outcome::unit())
    }

    fn load(&self, path: &Value) -> SdkResult<Vec<u8>> {
        let key = path_key(path)?;
        lock(&self.tree)
            .files
            .get(&key)
            .cloned()
            .ok_or_else(|| Rejection::message(format!("file does not exist: {}", key)))
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    fn account(&self) -> &Account {
        &self.account
    }

    async fn accept_share(&self, options: Value) -> SdkResult {
        self.enter("acceptShare", vec![options])?;
        Ok(Outcome::unit())
    }

    async fn add(&self, path: Value, content: Value, options: Value) -> SdkResult {
        self.enter("add", vec![path.clone(), content.clone(), options])?;
        self.store(&path, &content)
    }

    async fn cat(&self, path: Value) -> SdkResult {
        self.enter("cat", vec![path.clone()])?;
        self.load(&path).map(|bytes| Outcome::Bytes(Bytes::from(bytes)))
    }

    async fn deactivate(&self) -> SdkResult {
        self.enter("deactivate", vec![])?;
        Ok(Outcome::unit())
    }

    async fn exists(&self, path: Value) -> SdkResult {
        self.enter("exists", vec![path.clone()])?;
        let key = path_key(&path)?;
        let tree = lock(&self.tree);
        let exists = tree.files.contains_key(&key)
            || tree.directories.contains(&key)
            || tree.links.contains_key(&key);
        Ok(Value::Bool(exists).into())
    }

    async fn get(&self, path: Value) -> SdkResult {
        self.enter("get", vec![path.clone()])?;
        let key = path_key(&path)?;
        let tree = lock(&self.tree);
        let entry = match tree.files.get(&key) {
            Some(content) => Value::from_pairs([
                ("isFile", Value::Bool(true)),
                ("size", Value::Integer(content.len() as i64)),
            ]),
            None if tree.directories.contains(&key) => {
                Value::from_pairs([("isFile", Value::Bool(false))])
            }
            None => Value::Null,
        };
        Ok(entry.into())
    }

    async fn history_step(&self) -> SdkResult {
        self.enter("historyStep", vec![])?;
        Ok(Outcome::unit())
    }

    async fn load_share(&self, options: Value) -> SdkResult {
        self.enter("loadShare", vec![options.clone()])?;
        let share_id = options
            .get("shareId")
            .and_then(Value::as_str)
            .ok_or_else(|| Rejection::message("loadShare requires a shareId"))?;
        let shared_by = options
            .get("sharedBy")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let shared = MemoryFileSystem::new(shared_by, &format!("did:share:{}", share_id));
        Ok(Outcome::Handle(Arc::new(shared)))
    }

    async fn ls(&self, path: Value) -> SdkResult {
        self.enter("ls", vec![path.clone()])?;
        let prefix = path_key(&path)?;
        let tree = lock(&self.tree);
        let child = |key: &str| -> Option<(String, bool)> {
            let rest = if prefix.is_empty() {
                key
            } else {
                key.strip_prefix(prefix.as_str())?.strip_prefix('/')?
            };
            match rest.split_once('/') {
                Some((name, _)) => Some((name.to_string(), false)),
                None => Some((rest.to_string(), true)),
            }
        };
        let mut listing = BTreeMap::new();
        for key in tree.files.keys() {
            if let Some((name, is_file)) = child(key.as_str()) {
                listing.insert(name, Value::from_pairs([("isFile", Value::Bool(is_file))]));
            }
        }
        for key in tree.directories.iter() {
            if let Some((name, _)) = child(key.as_str()) {
                listing
                    .entry(name)
                    .or_insert_with(|| Value::from_pairs([("isFile", Value::Bool(false))]));
            }
        }
        Ok(Value::Map(listing).into())
    }

    async fn mkdir(&self, path: Value, options: Value) -> SdkResult {
        self.enter("mkdir", vec![path.clone(), options])?;
        let key = path_key(&path)?;
        lock(&self.tree).directories.insert(key);
        Ok(Outcome::unit())
    }

    async fn mv(&self, from: Value, to: Value) -> SdkResult {
        self.enter("mv", vec![from.clone(), to.clone()])?;
        let from = path_key(&from)?;
        let to = path_key(&to)?;
        let mut tree = lock(&self.tree);
        let content = tree
            .files
            .remove(&from)
            .ok_or_else(|| Rejection::message(format!("file does not exist: {}", from)))?;
        tree.files.insert(to, content);
        Ok(Outcome::unit())
    }

    async fn publish(&self) -> SdkResult {
        self.enter("publish", vec![])?;
        let n = self.publishes.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Outcome::code(format!("bafyroot{}", n)))
    }

    async fn read(&self, path: Value) -> SdkResult {
        self.enter("read", vec![path.clone()])?;
        self.load(&path).map(|bytes| Outcome::Bytes(Bytes::from(bytes)))
    }

    async fn resolve_symlink(&self, link: Value) -> SdkResult {
        self.enter("resolveSymlink", vec![link.clone()])?;
        let key = path_key(&link)?;
        let target = lock(&self.tree).links.get(&key).cloned();
        Ok(Value::from(target).into())
    }

    async fn rm(&self, path: Value) -> SdkResult {
        self.enter("rm", vec![path.clone()])?;
        let key = path_key(&path)?;
        let mut tree = lock(&self.tree);
        tree.files.remove(&key);
        tree.directories.remove(&key);
        tree.links.remove(&key);
        Ok(Outcome::unit())
    }

    async fn share_private(&self, paths: Value, options: Value) -> SdkResult {
        self.enter("sharePrivate", vec![paths, options])?;
        Ok(Value::from_pairs([("shareId", Value::from("1"))]).into())
    }

    async fn symlink(&self, options: Value) -> SdkResult {
        self.enter("symlink", vec![options.clone()])?;
        let at = options
            .get("at")
            .ok_or_else(|| Rejection::message("symlink requires `at`"))?;
        let name = options
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Rejection::message("symlink requires `name`"))?;
        let target = options
            .get("referringTo")
            .ok_or_else(|| Rejection::message("symlink requires `referringTo`"))?;
        let at = path_key(at)?;
        let key = if at.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", at, name)
        };
        let target = path_key(target)?;
        lock(&self.tree).links.insert(key, target);
        Ok(Outcome::unit())
    }

    async fn write(&self, path: Value, content: Value, options: Value) -> SdkResult {
        self.enter("write", vec![path.clone(), content.clone(), options])?;
        self.store(&path, &content)
    }
}

/// A program with canned auth and capability behavior.
pub struct FakeProgram {
    configuration: Configuration,
    session: Option<Session>,
    file_systems: Mutex<BTreeMap<String, Arc<dyn FileSystem>>>,
    pub calls: CallLog,
}

impl FakeProgram {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            session: None,
            file_systems: Mutex::new(BTreeMap::new()),
            calls: CallLog::default(),
        }
    }

    /// Attach an authenticated session.
    #[must_use]
    pub fn with_session(mut self, username: &str, fs: Option<Arc<dyn FileSystem>>) -> Self {
        if let Some(fs) = &fs {
            lock(&self.file_systems).insert(username.to_string(), fs.clone());
        }
        self.session = Some(Session {
            username: username.to_string(),
            kind: "webCrypto".to_string(),
            fs,
        });
        self
    }

    /// Make `fs` loadable for `username`.
    pub fn add_file_system(&self, username: &str, fs: Arc<dyn FileSystem>) {
        lock(&self.file_systems).insert(username.to_string(), fs);
    }

    fn session_value(&self) -> Value {
        self.session
            .as_ref()
            .map(Session::to_value)
            .unwrap_or(Value::Null)
    }
}

#[async_trait]
impl Auth for FakeProgram {
    async fn is_username_available(&self, username: Value) -> SdkResult {
        self.calls.record("auth.isUsernameAvailable", vec![username.clone()]);
        let taken = username
            .as_str()
            .is_some_and(|name| lock(&self.file_systems).contains_key(name));
        Ok(Value::Bool(!taken).into())
    }

    async fn is_username_valid(&self, username: Value) -> SdkResult {
        self.calls.record("auth.isUsernameValid", vec![username.clone()]);
        let valid = username.as_str().is_some_and(|name| {
            !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        });
        Ok(Value::Bool(valid).into())
    }

    async fn register(&self, options: Value) -> SdkResult {
        self.calls.record("auth.register", vec![options.clone()]);
        if options.get("username").and_then(Value::as_str).is_none() {
            return Err(Rejection::message("registration requires a username"));
        }
        Ok(Value::from_pairs([("success", Value::Bool(true))]).into())
    }

    async fn session(&self) -> SdkResult {
        self.calls.record("auth.session", vec![]);
        Ok(self.session_value().into())
    }
}

#[async_trait]
impl Capabilities for FakeProgram {
    async fn collect(&self) -> SdkResult {
        self.calls.record("capabilities.collect", vec![]);
        Ok(Value::from(self.session.as_ref().map(|s| s.username.clone())).into())
    }

    async fn request(&self, options: Value) -> SdkResult {
        self.calls.record("capabilities.request", vec![options]);
        Ok(Outcome::unit())
    }

    async fn session(&self, username: Value) -> SdkResult {
        self.calls.record("capabilities.session", vec![username]);
        Ok(self.session_value().into())
    }
}

#[async_trait]
impl Program for FakeProgram {
    fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn auth(&self) -> &dyn Auth {
        self
    }

    fn capabilities(&self) -> &dyn Capabilities {
        self
    }

    async fn load_file_system(&self, username: &str) -> SdkResult<Arc<dyn FileSystem>> {
        self.calls
            .record("loadFileSystem", vec![Value::from(username)]);
        lock(&self.file_systems)
            .get(username)
            .cloned()
            .ok_or_else(|| Rejection::message(format!("no file system for {}", username)))
    }
}

/// Creates [`FakeProgram`]s, optionally with a session and file system.
#[derive(Default)]
pub struct FakeFactory {
    session: Option<(String, String)>,
    rejection: Option<Rejection>,
    created: Mutex<Vec<Arc<FakeProgram>>>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Created programs get a session for `username` whose file system has
    /// root DID `root_did`.
    #[must_use]
    pub fn with_session(mut self, username: &str, root_did: &str) -> Self {
        self.session = Some((username.to_string(), root_did.to_string()));
        self
    }

    /// Every `create` rejects with `rejection`.
    pub fn rejecting(rejection: Rejection) -> Self {
        Self {
            rejection: Some(rejection),
            ..Self::default()
        }
    }

    /// Programs created so far, oldest first.
    pub fn created(&self) -> Vec<Arc<FakeProgram>> {
        lock(&self.created).clone()
    }
}

#[async_trait]
impl ProgramFactory for FakeFactory {
    async fn create(&self, configuration: Configuration) -> SdkResult<Arc<dyn Program>> {
        if let Some(rejection) = &self.rejection {
            return Err(rejection.clone());
        }
        let mut program = FakeProgram::new(configuration);
        if let Some((username, root_did)) = &self.session {
            let fs: Arc<dyn FileSystem> = Arc::new(MemoryFileSystem::new(username, root_did));
            program = program.with_session(username, Some(fs));
        }
        let program = Arc::new(program);
        lock(&self.created).push(program.clone());
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(segments: &[&str]) -> Value {
        Value::from_pairs([(
            "file",
            Value::Array(segments.iter().map(|s| Value::from(*s)).collect()),
        )])
    }

    #[tokio::test]
    async fn write_then_read() {
        let fs = MemoryFileSystem::new("alice", "did:key:alice");
        fs.write(
            file(&["private", "hi.txt"]),
            Value::Bytes(b"Hi".to_vec()),
            Value::Null,
        )
        .await
        .unwrap();

        match fs.read(Value::from("private/hi.txt")).await.unwrap() {
            Outcome::Bytes(bytes) => assert_eq!(&bytes[..], b"Hi"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn write_rejects_non_binary_content() {
        let fs = MemoryFileSystem::new("alice", "did:key:alice");
        let result = fs
            .write(
                Value::from("a.txt"),
                Value::Array(vec![Value::from(1)]),
                Value::Null,
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn ls_lists_direct_children() {
        let fs = MemoryFileSystem::new("alice", "did:key:alice");
        fs.insert_file("private/a.txt", b"a");
        fs.insert_file("private/docs/b.txt", b"b");
        fs.insert_file("public/c.txt", b"c");

        let listing = match fs.ls(Value::from("private")).await.unwrap() {
            Outcome::Plain(value) => value,
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert_eq!(
            listing.get("a.txt").and_then(|e| e.get("isFile")),
            Some(&Value::Bool(true))
        );
        assert_eq!(
            listing.get("docs").and_then(|e| e.get("isFile")),
            Some(&Value::Bool(false))
        );
        assert_eq!(listing.get("c.txt"), None);
    }

    #[tokio::test]
    async fn rejection_applies_to_later_calls() {
        let fs = MemoryFileSystem::new("alice", "did:key:alice");
        fs.reject_with(Rejection::message("offline"));
        let result = fs.publish().await;
        assert_eq!(result.unwrap_err(), Rejection::message("offline"));
        assert_eq!(fs.calls.count("publish"), 1);
    }

    #[tokio::test]
    async fn factory_attaches_session_file_system() {
        let factory = FakeFactory::new().with_session("alice", "did:key:alice");
        let program = factory
            .create(Configuration::new(crate::NamespaceSpec::Plain(
                "app".to_string(),
            )))
            .await
            .unwrap();
        let session = program.session().unwrap();
        assert_eq!(session.username, "alice");
        assert_eq!(
            session.fs.as_ref().unwrap().account().root_did,
            "did:key:alice"
        );
        assert_eq!(factory.created().len(), 1);
    }
}
