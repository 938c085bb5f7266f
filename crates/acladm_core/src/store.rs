//! Mapping persistence.
//!
//! The engine only needs a handful of queries, expressed as provided methods
//! over [`MappingStore::all`]. Two backends ship here: an in-memory store and
//! a JSON file written atomically on every change.

use crate::error::{AclError, AclResult};
use crate::mapping::{Mapping, NewMapping};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub trait MappingStore {
    fn all(&self) -> AclResult<Vec<Mapping>>;

    fn find(&self, id: u64) -> AclResult<Option<Mapping>>;

    fn insert(&mut self, new: NewMapping) -> AclResult<Mapping>;

    /// Delete by id. `Ok(false)` when nothing was there.
    fn delete(&mut self, id: u64) -> AclResult<bool>;

    /// Distinct dataset paths, sorted.
    fn datasets(&self) -> AclResult<Vec<PathBuf>> {
        let set: BTreeSet<PathBuf> = self.all()?.into_iter().map(|m| m.dataset).collect();
        Ok(set.into_iter().collect())
    }

    /// Distinct users mapped to `dataset`, sorted.
    fn users_for_dataset(&self, dataset: &Path) -> AclResult<Vec<String>> {
        let set: BTreeSet<String> = self
            .all()?
            .into_iter()
            .filter(|m| m.dataset == dataset)
            .map(|m| m.user)
            .collect();
        Ok(set.into_iter().collect())
    }

    /// Distinct users mapped to `app`, sorted.
    fn users_for_app(&self, app: &Path) -> AclResult<Vec<String>> {
        let set: BTreeSet<String> = self
            .all()?
            .into_iter()
            .filter(|m| m.app == app)
            .map(|m| m.user)
            .collect();
        Ok(set.into_iter().collect())
    }

    /// Mappings for `user` whose app or dataset is `path`.
    fn reference_count(&self, path: &Path, user: &str) -> AclResult<usize> {
        Ok(self
            .all()?
            .iter()
            .filter(|m| m.user == user && m.references(path))
            .count())
    }

    fn exists_user_app(&self, user: &str, app: &Path) -> AclResult<bool> {
        Ok(self.all()?.iter().any(|m| m.user == user && m.app == app))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    next_id: u64,
    mappings: Vec<Mapping>,
}

impl StoreData {
    fn insert(&mut self, new: NewMapping) -> Mapping {
        self.next_id += 1;
        let mapping = new.into_mapping(self.next_id);
        self.mappings.push(mapping.clone());
        mapping
    }

    fn delete(&mut self, id: u64) -> bool {
        let before = self.mappings.len();
        self.mappings.retain(|m| m.id != id);
        self.mappings.len() != before
    }
}

/// Non-persistent store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: StoreData,
}

impl MappingStore for MemoryStore {
    fn all(&self) -> AclResult<Vec<Mapping>> {
        Ok(self.data.mappings.clone())
    }

    fn find(&self, id: u64) -> AclResult<Option<Mapping>> {
        Ok(self.data.mappings.iter().find(|m| m.id == id).cloned())
    }

    fn insert(&mut self, new: NewMapping) -> AclResult<Mapping> {
        Ok(self.data.insert(new))
    }

    fn delete(&mut self, id: u64) -> AclResult<bool> {
        Ok(self.data.delete(id))
    }
}

/// Store backed by one JSON document.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    data: StoreData,
}

impl JsonFileStore {
    /// Open `path`, starting empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> AclResult<Self> {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| AclError::Store(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreData::default(),
            Err(e) => return Err(AclError::io(&path, e)),
        };
        debug!(path = %path.display(), count = data.mappings.len(), "opened mapping store");
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Write to a sibling temp file then rename, so readers never see a partial document.
    fn save(&self) -> AclResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let json = serde_json::to_vec_pretty(&self.data)
            .map_err(|e| AclError::Store(e.to_string()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| AclError::io(dir, e))?;
        tmp.write_all(&json).map_err(|e| AclError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| AclError::io(&self.path, e.error))?;
        Ok(())
    }
}

impl MappingStore for JsonFileStore {
    fn all(&self) -> AclResult<Vec<Mapping>> {
        Ok(self.data.mappings.clone())
    }

    fn find(&self, id: u64) -> AclResult<Option<Mapping>> {
        Ok(self.data.mappings.iter().find(|m| m.id == id).cloned())
    }

    fn insert(&mut self, new: NewMapping) -> AclResult<Mapping> {
        let mapping = self.data.insert(new);
        self.save()?;
        Ok(mapping)
    }

    fn delete(&mut self, id: u64) -> AclResult<bool> {
        let removed = self.data.delete(id);
        if removed {
            self.save()?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MemoryStore {
        let mut store = MemoryStore::default();
        store.insert(NewMapping::new("bob", "/apps/viz", "/data/d1")).unwrap();
        store.insert(NewMapping::new("amy", "/apps/viz", "/data/d1")).unwrap();
        store.insert(NewMapping::new("amy", "/apps/stats", "/data/d2")).unwrap();
        store
    }

    #[test]
    fn distinct_sorted_queries() {
        let store = seeded();
        assert_eq!(store.datasets().unwrap(), vec![PathBuf::from("/data/d1"), PathBuf::from("/data/d2")]);
        assert_eq!(store.users_for_dataset(Path::new("/data/d1")).unwrap(), vec!["amy", "bob"]);
        assert_eq!(store.users_for_app(Path::new("/apps/stats")).unwrap(), vec!["amy"]);
    }

    #[test]
    fn reference_count_matches_app_or_dataset() {
        let store = seeded();
        assert_eq!(store.reference_count(Path::new("/apps/viz"), "amy").unwrap(), 1);
        assert_eq!(store.reference_count(Path::new("/data/d1"), "bob").unwrap(), 1);
        assert_eq!(store.reference_count(Path::new("/data/d1"), "carl").unwrap(), 0);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let mut store = seeded();
        assert!(store.delete(3).unwrap());
        assert!(!store.delete(3).unwrap());
        let next = store.insert(NewMapping::new("carl", "/apps/viz", "/data/d1")).unwrap();
        assert_eq!(next.id, 4);
    }

    #[test]
    fn json_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mappings.json");
        {
            let mut store = JsonFileStore::open(&path).unwrap();
            store.insert(NewMapping::new("amy", "/apps/viz", "/data/d1")).unwrap();
            store.insert(NewMapping::new("bob", "/apps/viz", "/data/d1")).unwrap();
            store.delete(1).unwrap();
        }
        let store = JsonFileStore::open(&path).unwrap();
        let all = store.all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].user, "bob");
        assert_eq!(all[0].id, 2);
    }

    #[test]
    fn json_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mappings.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(JsonFileStore::open(&path), Err(AclError::Store(_))));
    }
}
