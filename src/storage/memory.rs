use std::collections::HashMap;

use super::{Backend, StorageError, Transaction, TxOp, staged_exists};
use crate::store::entry::Entry;

/// Plain in-memory backend. No durability: restarting the server starts
/// from an empty keyspace.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    map: HashMap<String, Entry>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend {
            map: HashMap::new(),
        }
    }
}

impl Backend for MemoryBackend {
    fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.map.contains_key(key))
    }

    fn get_by_key(&self, key: &str) -> Result<Option<Entry>, StorageError> {
        Ok(self.map.get(key).cloned())
    }

    fn init_transaction(&mut self) -> Result<Box<dyn Transaction + '_>, StorageError> {
        Ok(Box::new(MemoryTransaction {
            map: &mut self.map,
            ops: Vec::new(),
            finished: false,
        }))
    }
}

struct MemoryTransaction<'a> {
    map: &'a mut HashMap<String, Entry>,
    ops: Vec<TxOp>,
    finished: bool,
}

impl MemoryTransaction<'_> {
    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.finished {
            return Err(StorageError::TransactionFinished);
        }
        Ok(())
    }
}

impl Transaction for MemoryTransaction<'_> {
    fn set_kv(&mut self, entry: &Entry) -> Result<(), StorageError> {
        self.ensure_open()?;
        self.ops.push(TxOp::Put(entry.clone()));
        Ok(())
    }

    fn delete_by_key(&mut self, key: &str) -> Result<usize, StorageError> {
        self.ensure_open()?;
        let existed =
            staged_exists(&self.ops, key).unwrap_or_else(|| self.map.contains_key(key));
        self.ops.push(TxOp::Delete(key.to_string()));
        Ok(usize::from(existed))
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        self.ensure_open()?;
        self.finished = true;
        for op in self.ops.drain(..) {
            match op {
                TxOp::Put(entry) => {
                    self.map.insert(entry.key.clone(), entry);
                }
                TxOp::Delete(key) => {
                    self.map.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn abort(&mut self) -> Result<(), StorageError> {
        self.finished = true;
        self.ops.clear();
        Ok(())
    }
}
