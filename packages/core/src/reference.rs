//! Reference tables: ids on the UI side, live handles on this side.
//!
//! A [`ReferenceTable`] maps a [`HandleId`] to a shared handle. Ids are
//! derived from the handle itself, so putting the same logical handle twice
//! overwrites the entry instead of adding a second one.
//!
//! Tables are only ever locked for a single synchronous insert or lookup.
//! Callers never hold a lock across an await point, which makes every
//! insertion atomic with respect to other in-flight calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{Error, FileSystem, HandleId, HandleKind, Program};

/// A handle whose id can be derived from its own fields.
pub trait Referenced: Send + Sync {
    /// Which table this kind of handle lives in.
    const KIND: HandleKind;

    /// Derive the id. Fails only for malformed handles.
    fn reference(&self) -> Result<HandleId, Error>;
}

impl Referenced for dyn Program {
    const KIND: HandleKind = HandleKind::Program;

    fn reference(&self) -> Result<HandleId, Error> {
        program_ref(self)
    }
}

impl Referenced for dyn FileSystem {
    const KIND: HandleKind = HandleKind::FileSystem;

    fn reference(&self) -> Result<HandleId, Error> {
        file_system_ref(self)
    }
}

/// A program's id is the namespace derived from its configuration.
pub fn program_ref(program: &dyn Program) -> Result<HandleId, Error> {
    program.configuration().namespace().map(HandleId::from)
}

/// A file system's id is the root DID of its account.
pub fn file_system_ref(fs: &dyn FileSystem) -> Result<HandleId, Error> {
    let root_did = &fs.account().root_did;
    if root_did.is_empty() {
        return Err(Error::MalformedHandle {
            kind: HandleKind::FileSystem,
            field: "account.rootDID",
        });
    }
    Ok(HandleId::new(root_did.clone()))
}

/// Keyed store of live handles of one kind.
pub struct ReferenceTable<H: ?Sized> {
    entries: Mutex<HashMap<HandleId, Arc<H>>>,
}

impl<H: ?Sized + Referenced> ReferenceTable<H> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Derive the id a handle would be stored under.
    pub fn derive(handle: &H) -> Result<HandleId, Error> {
        handle.reference()
    }

    /// Insert or overwrite `handle` under its derived id.
    pub fn put(&self, handle: Arc<H>) -> Result<HandleId, Error> {
        let id = Self::derive(&handle)?;
        tracing::debug!(kind = %H::KIND, id = %id, "registering handle");
        self.lock().insert(id.clone(), handle);
        Ok(id)
    }

    /// Look up a handle. Absence is reported as `None`, not as an error.
    pub fn get(&self, id: &HandleId) -> Option<Arc<H>> {
        self.lock().get(id).cloned()
    }

    /// Bulk insert handles that existed before the bridge was set up.
    ///
    /// Every id is derived before anything is inserted, so a malformed
    /// handle leaves the table untouched.
    pub fn initialize<I>(&self, handles: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = Arc<H>>,
    {
        let derived = handles
            .into_iter()
            .map(|handle| Self::derive(&handle).map(|id| (id, handle)))
            .collect::<Result<Vec<_>, Error>>()?;

        let mut entries = self.lock();
        for (id, handle) in derived {
            tracing::debug!(kind = %H::KIND, id = %id, "initializing handle");
            entries.insert(id, handle);
        }
        Ok(())
    }

    pub fn contains(&self, id: &HandleId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// All ids currently stored, sorted.
    pub fn ids(&self) -> Vec<HandleId> {
        let mut ids: Vec<HandleId> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    // The map is never left half-updated, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<HandleId, Arc<H>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<H: ?Sized + Referenced> Default for ReferenceTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// The two tables a bridge instance owns.
#[derive(Default)]
pub struct References {
    pub programs: ReferenceTable<dyn Program>,
    pub file_systems: ReferenceTable<dyn FileSystem>,
}

impl References {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeProgram, MemoryFileSystem};
    use crate::{Configuration, NamespaceSpec};

    fn fs(root_did: &str) -> Arc<dyn FileSystem> {
        Arc::new(MemoryFileSystem::new("alice", root_did))
    }

    #[test]
    fn derive_is_idempotent() {
        let handle = fs("did:key:alice");
        let first = ReferenceTable::<dyn FileSystem>::derive(&*handle).unwrap();
        let second = ReferenceTable::<dyn FileSystem>::derive(&*handle).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_str(), "did:key:alice");
    }

    #[test]
    fn put_twice_keeps_one_entry() {
        let table = ReferenceTable::<dyn FileSystem>::new();
        let handle = fs("did:key:alice");
        table.put(handle.clone()).unwrap();
        table.put(handle).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn put_then_get_returns_same_instance() {
        let table = ReferenceTable::<dyn FileSystem>::new();
        let handle = fs("did:key:alice");
        let id = table.put(handle.clone()).unwrap();

        let found = table.get(&id).unwrap();
        assert!(Arc::ptr_eq(&found, &handle));
    }

    #[test]
    fn missing_id_is_none() {
        let table = ReferenceTable::<dyn FileSystem>::new();
        assert!(table.get(&HandleId::new("did:key:nobody")).is_none());
    }

    #[test]
    fn malformed_file_system_is_rejected() {
        let table = ReferenceTable::<dyn FileSystem>::new();
        let result = table.put(fs(""));
        assert!(matches!(
            result,
            Err(Error::MalformedHandle {
                kind: HandleKind::FileSystem,
                field: "account.rootDID"
            })
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn program_id_is_configuration_namespace() {
        let table = ReferenceTable::<dyn Program>::new();
        let program: Arc<dyn Program> = Arc::new(FakeProgram::new(Configuration::new(
            NamespaceSpec::App {
                creator: "fission".to_string(),
                name: "drive".to_string(),
            },
        )));
        let id = table.put(program).unwrap();
        assert_eq!(id.as_str(), "fission/drive");
        assert!(table.contains(&id));
    }

    #[test]
    fn initialize_is_all_or_nothing() {
        let table = ReferenceTable::<dyn FileSystem>::new();
        let result = table.initialize(vec![fs("did:key:alice"), fs("")]);
        assert!(result.is_err());
        assert!(table.is_empty());

        table
            .initialize(vec![fs("did:key:alice"), fs("did:key:bob")])
            .unwrap();
        assert_eq!(
            table.ids(),
            vec![HandleId::new("did:key:alice"), HandleId::new("did:key:bob")]
        );
    }
}
