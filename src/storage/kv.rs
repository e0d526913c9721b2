use std::collections::HashMap as StdHashMap;
use std::sync::Arc;

use super::KeyValueStore;
use crate::error::AppResult;

/// In-memory string store. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    map: Arc<parking_lot::RwLock<StdHashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Seed a store from key/value pairs.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let s = Self::new();
        {
            let mut w = s.map.write();
            for (k, v) in entries { w.insert(k.into(), v.into()); }
        }
        s
    }

    pub fn len(&self) -> usize { self.map.read().len() }
    pub fn is_empty(&self) -> bool { self.map.read().is_empty() }
    pub fn contains(&self, key: &str) -> bool { self.map.read().contains_key(key) }

    /// Return a snapshot of all keys in this store
    pub fn keys(&self) -> Vec<String> {
        let mut out: Vec<String> = self.map.read().keys().cloned().collect();
        out.sort();
        out
    }

    pub fn clear(&self) { self.map.write().clear(); }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> { self.map.read().get(key).cloned() }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.map.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        self.map.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_overwrites_and_remove_is_idempotent() {
        let s = MemoryStore::new();
        s.set("auth_type", "facial").unwrap();
        s.set("auth_type", "other").unwrap();
        assert_eq!(s.get("auth_type").as_deref(), Some("other"));
        s.remove("auth_type").unwrap();
        s.remove("auth_type").unwrap();
        assert!(s.get("auth_type").is_none());
        assert!(s.is_empty());
    }

    #[test]
    fn clones_share_state() {
        let a = MemoryStore::with_entries([("k", "v")]);
        let b = a.clone();
        b.set("k2", "v2").unwrap();
        assert_eq!(a.keys(), vec!["k".to_string(), "k2".to_string()]);
    }
}
