use std::path::Path;

use super::{Backend, StorageError, Transaction, TxOp, staged_exists};
use crate::store::entry::Entry;

/// sled-backed store: one tree keyed uniquely by entry key, entries
/// serialized as JSON, upsert-on-write. The closest analogue to mounting a
/// document collection behind the adapter contract.
pub struct SledBackend {
    db: sled::Db,
}

impl SledBackend {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Ok(SledBackend { db })
    }
}

impl Backend for SledBackend {
    fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.db.contains_key(key.as_bytes())?)
    }

    fn get_by_key(&self, key: &str) -> Result<Option<Entry>, StorageError> {
        match self.db.get(key.as_bytes())? {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    fn init_transaction(&mut self) -> Result<Box<dyn Transaction + '_>, StorageError> {
        Ok(Box::new(SledTransaction {
            db: &self.db,
            ops: Vec::new(),
            finished: false,
        }))
    }
}

struct SledTransaction<'a> {
    db: &'a sled::Db,
    ops: Vec<TxOp>,
    finished: bool,
}

impl SledTransaction<'_> {
    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.finished {
            return Err(StorageError::TransactionFinished);
        }
        Ok(())
    }
}

impl Transaction for SledTransaction<'_> {
    fn set_kv(&mut self, entry: &Entry) -> Result<(), StorageError> {
        self.ensure_open()?;
        self.ops.push(TxOp::Put(entry.clone()));
        Ok(())
    }

    fn delete_by_key(&mut self, key: &str) -> Result<usize, StorageError> {
        self.ensure_open()?;
        let existed = match staged_exists(&self.ops, key) {
            Some(visible) => visible,
            None => self.db.contains_key(key.as_bytes())?,
        };
        self.ops.push(TxOp::Delete(key.to_string()));
        Ok(usize::from(existed))
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        self.ensure_open()?;
        self.finished = true;
        for op in self.ops.drain(..) {
            match op {
                TxOp::Put(entry) => {
                    let raw = serde_json::to_vec(&entry)?;
                    self.db.insert(entry.key.as_bytes(), raw)?;
                }
                TxOp::Delete(key) => {
                    self.db.remove(key.as_bytes())?;
                }
            }
        }
        self.db.flush()?;
        Ok(())
    }

    fn abort(&mut self) -> Result<(), StorageError> {
        self.finished = true;
        self.ops.clear();
        Ok(())
    }
}
