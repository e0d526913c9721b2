use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::warn;

use super::KeyValueStore;
use crate::error::{AppError, AppResult};
use crate::tprintln;

/// JSON-file backed store. The whole map is kept in memory and the file is rewritten
/// (temp file + rename) on every mutation, so a crash leaves either the old or new document.
pub struct FileStore {
    path: PathBuf,
    map: parking_lot::RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`. Missing or unreadable files start empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let map = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<BTreeMap<String, String>>(&bytes) {
                Ok(m) => m,
                Err(e) => {
                    warn!(target: "facepay::storage", "ignoring unreadable storage file {:?}: {}", path, e);
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        tprintln!("storage.open path={:?} keys={}", path, map.len());
        Self { path, map: parking_lot::RwLock::new(map) }
    }

    pub fn path(&self) -> &Path { &self.path }

    fn persist(&self, map: &BTreeMap<String, String>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating storage directory {:?}", parent))?;
        }
        let bytes = serde_json::to_vec_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes).with_context(|| format!("writing {:?}", tmp))?;
        std::fs::rename(&tmp, &self.path).with_context(|| format!("replacing {:?}", self.path))?;
        Ok(())
    }

    fn mutate<F>(&self, f: F) -> AppResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut w = self.map.write();
        f(&mut w);
        self.persist(&w)
            .map_err(|e| AppError::Io { code: "storage_write_failed".into(), message: format!("{:#}", e) })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> { self.map.read().get(key).cloned() }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.mutate(|m| { m.insert(key.to_string(), value.to_string()); })
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        if !self.map.read().contains_key(key) { return Ok(()); }
        self.mutate(|m| { m.remove(key); })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");
        {
            let s = FileStore::open(&path);
            s.set("auth_type", "facial").unwrap();
            s.set("user_authenticated", "true").unwrap();
            s.remove("user_authenticated").unwrap();
        }
        let s = FileStore::open(&path);
        assert_eq!(s.get("auth_type").as_deref(), Some("facial"));
        assert!(s.get("user_authenticated").is_none());
    }

    #[test]
    fn corrupt_file_opens_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, b"{not json").unwrap();
        let s = FileStore::open(&path);
        assert!(s.get("facial_auth_session").is_none());
        s.set("k", "v").unwrap();
        assert_eq!(FileStore::open(&path).get("k").as_deref(), Some("v"));
    }
}
