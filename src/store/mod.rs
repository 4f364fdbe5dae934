pub mod entry;

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::storage::{Backend, StorageError, Transaction};
use entry::Entry;

/// The keyed value store. Owns the mounted persistence backend and applies
/// the lazy-expiry rule on every read: an entry whose TTL has elapsed is
/// deleted (in its own transaction) and reported absent, whatever command
/// triggered the read. There is no background sweep.
pub struct Store {
    backend: Box<dyn Backend>,
}

impl Store {
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Store { backend }
    }

    /// Look up a key, enforcing expiry. The returned entry is a detached
    /// copy; mutations flow back through a transaction.
    pub fn get(&mut self, key: &str) -> Result<Option<Entry>, StorageError> {
        let entry = match self.backend.get_by_key(key)? {
            Some(entry) => entry,
            None => return Ok(None),
        };

        if entry.is_expired() {
            let mut tx = self.backend.init_transaction()?;
            tx.delete_by_key(key)?;
            tx.commit()?;
            return Ok(None);
        }

        Ok(Some(entry))
    }

    /// Whether a key currently exists, expiry applied.
    pub fn exists(&mut self, key: &str) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }

    /// Open a transaction on the mounted backend. One per command; the
    /// borrow it holds keeps reads and writes from interleaving badly.
    pub fn begin(&mut self) -> Result<Box<dyn Transaction + '_>, StorageError> {
        self.backend.init_transaction()
    }
}

pub type SharedStore = Arc<RwLock<Store>>;

pub fn shared(backend: Box<dyn Backend>) -> SharedStore {
    Arc::new(RwLock::new(Store::new(backend)))
}

#[cfg(test)]
mod tests {
    use super::entry::{Entry, Value, now_millis};
    use super::*;
    use crate::storage::memory::MemoryBackend;

    fn store_with(entries: Vec<Entry>) -> Store {
        let mut store = Store::new(Box::new(MemoryBackend::new()));
        {
            let mut tx = store.begin().unwrap();
            for entry in &entries {
                tx.set_kv(entry).unwrap();
            }
            tx.commit().unwrap();
        }
        store
    }

    #[test]
    fn get_returns_live_entry() {
        let mut store = store_with(vec![Entry::new("k", Value::Str("v".to_string()))]);
        let entry = store.get("k").unwrap().unwrap();
        assert_eq!(entry.value, Value::Str("v".to_string()));
    }

    #[test]
    fn get_missing_key_is_none() {
        let mut store = store_with(vec![]);
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn expired_entry_is_removed_on_read() {
        let mut store = store_with(vec![Entry::with_expiry(
            "k",
            Value::Str("v".to_string()),
            now_millis() - 10,
        )]);

        assert!(store.get("k").unwrap().is_none());
        // The read physically deleted it, not just hid it.
        assert!(!store.exists("k").unwrap());
    }

    #[test]
    fn future_expiry_still_visible() {
        let mut store = store_with(vec![Entry::with_expiry(
            "k",
            Value::Str("v".to_string()),
            now_millis() + 60_000,
        )]);
        assert!(store.exists("k").unwrap());
    }
}
