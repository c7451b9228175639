//! Override storage
//!
//! Overrides are persisted as flat grant rows per actor. A replace swaps the
//! actor's whole row set in one step, so readers see either the previous set
//! or the new one and never an empty intermediate state.
//!
//! Stores distinguish "no overrides configured" (`None`) from "an empty
//! override set was saved" (`Some(vec![])`).

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use fs2::FileExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::actor::ActorId;
use crate::catalog::PermissionCatalog;
use crate::error::Result;
use crate::permission::models::{flatten, group, ModulePermission, PermissionOverrideRecord};

/// Repository trait for per-actor permission overrides
pub trait OverrideStore: Send + Sync {
    /// Grouped overrides for an actor, `None` when nothing is stored
    fn get_overrides(&self, actor: &ActorId) -> Result<Option<Vec<ModulePermission>>> {
        Ok(self.get_records(actor)?.map(|records| group(&records)))
    }

    /// Raw grant rows for an actor, `None` when nothing is stored
    fn get_records(&self, actor: &ActorId) -> Result<Option<Vec<PermissionOverrideRecord>>>;

    /// Replace the actor's overrides with `permissions` as one atomic unit
    fn replace_overrides(&self, actor: &ActorId, permissions: &[ModulePermission]) -> Result<()>;

    /// Remove every override row for the actor
    fn clear_overrides(&self, actor: &ActorId) -> Result<()>;
}

/// Validate and flatten a permission set ahead of any write
fn prepare(actor: &ActorId, permissions: &[ModulePermission]) -> Result<Vec<PermissionOverrideRecord>> {
    PermissionCatalog::validate(permissions)?;
    Ok(flatten(actor, permissions))
}

/// In-memory override store.
///
/// Each actor's rows sit behind one map slot; a replace is a single slot swap.
#[derive(Default)]
pub struct InMemoryOverrideStore {
    entries: DashMap<ActorId, Arc<Vec<PermissionOverrideRecord>>>,
}

impl InMemoryOverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of actors with a stored override set
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl OverrideStore for InMemoryOverrideStore {
    fn get_records(&self, actor: &ActorId) -> Result<Option<Vec<PermissionOverrideRecord>>> {
        let snapshot = self.entries.get(actor).map(|entry| Arc::clone(entry.value()));
        Ok(snapshot.map(|records| records.as_ref().clone()))
    }

    fn replace_overrides(&self, actor: &ActorId, permissions: &[ModulePermission]) -> Result<()> {
        let records = prepare(actor, permissions)?;
        let count = records.len();
        self.entries.insert(actor.clone(), Arc::new(records));
        info!("Replaced overrides for {} ({} grants)", actor, count);
        Ok(())
    }

    fn clear_overrides(&self, actor: &ActorId) -> Result<()> {
        if self.entries.remove(actor).is_some() {
            info!("Cleared overrides for {}", actor);
        }
        Ok(())
    }
}

/// On-disk document: actor → grant rows
#[derive(Debug, Default, Serialize, Deserialize)]
struct OverrideDocument {
    #[serde(default)]
    actors: BTreeMap<ActorId, Vec<PermissionOverrideRecord>>,
}

/// File-based override store.
///
/// Writers hold an exclusive OS lock on a sidecar `.lock` file for the whole
/// load-modify-publish cycle, so store objects and processes sharing one
/// document serialize. A new document is written to a uniquely named temp file
/// and renamed over the old one; readers observe either the old or the new file.
pub struct FileOverrideStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileOverrideStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store at `<base>/permission_overrides.json`
    pub fn with_defaults<P: AsRef<Path>>(base_path: P) -> Self {
        Self::new(base_path.as_ref().join("permission_overrides.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<OverrideDocument> {
        if !self.path.exists() {
            return Ok(OverrideDocument::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let document = serde_json::from_str(&content)?;
        Ok(document)
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn publish(&self, document: &OverrideDocument) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut temp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(temp.as_file_mut(), document)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn update<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut OverrideDocument) -> bool,
    {
        let _guard = self.write_lock.lock();

        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        lock_file.lock_exclusive()?;

        let result = self.load().and_then(|mut document| {
            if apply(&mut document) {
                self.publish(&document)?;
            }
            Ok(())
        });

        if let Err(e) = FileExt::unlock(&lock_file) {
            warn!("Failed to release {}: {}", lock_path.display(), e);
        }
        result
    }
}

impl OverrideStore for FileOverrideStore {
    fn get_records(&self, actor: &ActorId) -> Result<Option<Vec<PermissionOverrideRecord>>> {
        let mut document = self.load()?;
        Ok(document.actors.remove(actor))
    }

    fn replace_overrides(&self, actor: &ActorId, permissions: &[ModulePermission]) -> Result<()> {
        let records = prepare(actor, permissions)?;
        let count = records.len();
        self.update(|document| {
            document.actors.insert(actor.clone(), records);
            true
        })?;
        info!(
            "Replaced overrides for {} ({} grants) in {}",
            actor,
            count,
            self.path.display()
        );
        Ok(())
    }

    fn clear_overrides(&self, actor: &ActorId) -> Result<()> {
        self.update(|document| document.actors.remove(actor).is_some())?;
        debug!("Cleared overrides for {} in {}", actor, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Action, Module, Submodule};
    use crate::error::Error;

    fn lab_read() -> Vec<ModulePermission> {
        vec![ModulePermission::new(Module::Laboratoire, [Action::Read])]
    }

    #[test]
    fn test_in_memory_absent_vs_empty() {
        let store = InMemoryOverrideStore::new();
        let actor = ActorId::user("u1");

        assert_eq!(store.get_overrides(&actor).unwrap(), None);

        store.replace_overrides(&actor, &[]).unwrap();
        assert_eq!(store.get_overrides(&actor).unwrap(), Some(Vec::new()));

        store.clear_overrides(&actor).unwrap();
        assert_eq!(store.get_overrides(&actor).unwrap(), None);
    }

    #[test]
    fn test_in_memory_replace_discards_previous_set() {
        let store = InMemoryOverrideStore::new();
        let actor = ActorId::user("u1");

        store
            .replace_overrides(
                &actor,
                &[ModulePermission::new(Module::Caisse, [Action::Read, Action::Write])],
            )
            .unwrap();
        store.replace_overrides(&actor, &lab_read()).unwrap();

        assert_eq!(store.get_overrides(&actor).unwrap(), Some(lab_read()));
    }

    #[test]
    fn test_in_memory_rejects_invalid_before_write() {
        let store = InMemoryOverrideStore::new();
        let actor = ActorId::user("u1");
        store.replace_overrides(&actor, &lab_read()).unwrap();

        let invalid = vec![ModulePermission::new(Module::Caisse, [Action::Read])
            .with_submodule(Submodule::Cpn, [Action::Read])];
        let err = store.replace_overrides(&actor, &invalid).unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(store.get_overrides(&actor).unwrap(), Some(lab_read()));
    }

    #[test]
    fn test_in_memory_actors_are_isolated() {
        let store = InMemoryOverrideStore::new();
        let user = ActorId::user("42");
        let profile = ActorId::profile("42");

        store.replace_overrides(&user, &lab_read()).unwrap();
        store.clear_overrides(&profile).unwrap();

        assert_eq!(store.get_overrides(&user).unwrap(), Some(lab_read()));
        assert_eq!(store.get_overrides(&profile).unwrap(), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_records_are_flat_rows() {
        let store = InMemoryOverrideStore::new();
        let actor = ActorId::profile("p1");
        let perms = vec![ModulePermission::new(Module::Bilan, [Action::Read])
            .with_submodule(Submodule::Export, [Action::Read, Action::Export])];
        store.replace_overrides(&actor, &perms).unwrap();

        let records = store.get_records(&actor).unwrap().unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.actor_id == actor && r.granted));
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let actor = ActorId::user("u1");

        {
            let store = FileOverrideStore::with_defaults(dir.path());
            store.replace_overrides(&actor, &lab_read()).unwrap();
            store.replace_overrides(&ActorId::user("u2"), &[]).unwrap();
        }

        let store = FileOverrideStore::with_defaults(dir.path());
        assert_eq!(store.get_overrides(&actor).unwrap(), Some(lab_read()));
        assert_eq!(store.get_overrides(&ActorId::user("u2")).unwrap(), Some(Vec::new()));
        assert_eq!(store.get_overrides(&ActorId::user("u3")).unwrap(), None);
    }

    #[test]
    fn test_file_store_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileOverrideStore::new(dir.path().join("nested").join("overrides.json"));
        let actor = ActorId::user("u1");

        store.clear_overrides(&actor).unwrap();
        assert!(!store.path().exists());

        store.replace_overrides(&actor, &lab_read()).unwrap();
        store.clear_overrides(&actor).unwrap();
        assert_eq!(store.get_overrides(&actor).unwrap(), None);
    }

    #[test]
    fn test_file_stores_on_one_path_keep_each_others_writes() {
        let dir = tempfile::tempdir().unwrap();
        let first = FileOverrideStore::with_defaults(dir.path());
        let second = FileOverrideStore::with_defaults(dir.path());

        first.replace_overrides(&ActorId::user("u1"), &lab_read()).unwrap();
        second.replace_overrides(&ActorId::user("u2"), &lab_read()).unwrap();
        first.clear_overrides(&ActorId::user("u3")).unwrap();

        assert_eq!(second.get_overrides(&ActorId::user("u1")).unwrap(), Some(lab_read()));
        assert_eq!(first.get_overrides(&ActorId::user("u2")).unwrap(), Some(lab_read()));
        assert!(dir.path().join("permission_overrides.json.lock").exists());
        // only the document and its lock file, no temp files left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_file_store_corrupt_document_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileOverrideStore::new(&path);
        let err = store.get_overrides(&ActorId::user("u1")).unwrap_err();
        assert!(err.is_storage());
    }
}
