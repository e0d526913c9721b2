//!
//! facepay storage module
//! ----------------------
//! Durable key-value storage for client-side session state. The session layer never
//! talks to a concrete backend; it is handed a `KeyValueStore` capability with the
//! three operations {get, set, remove}, mirroring browser local/session storage.
//!
//! Backends:
//! - `MemoryStore`: process-local map, used for tab-scoped storage and in tests.
//! - `FileStore`: a single JSON document on disk, reloaded on open and rewritten
//!   atomically on every mutation.
//!
//! Reads never fail: a backend that cannot produce a value reports absence, which the
//! session layer resolves to "no session".

use std::sync::Arc;

use crate::error::AppResult;

pub mod kv;
pub mod file;

pub use file::FileStore;
pub use kv::MemoryStore;

/// Minimal string key-value capability.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> AppResult<()>;
    fn remove(&self, key: &str) -> AppResult<()>;
}

/// Shared handle passed to the session layer.
pub type SharedKv = Arc<dyn KeyValueStore>;

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Option<String> { (**self).get(key) }
    fn set(&self, key: &str, value: &str) -> AppResult<()> { (**self).set(key, value) }
    fn remove(&self, key: &str) -> AppResult<()> { (**self).remove(key) }
}
