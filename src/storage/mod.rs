pub mod aof;
pub mod memory;
pub mod sleddb;

use crate::store::entry::Entry;

/// The persistence adapter contract. A backend answers point reads directly
/// and hands out short-lived transactions for writes; the core is agnostic to
/// what sits behind it (a plain map, an append-only log, a sled tree).
///
/// Cross-transaction isolation for concurrent writers to the same key is
/// whatever the mounted backend provides; this layer adds no conflict
/// detection of its own.
pub trait Backend: Send + Sync {
    fn exists(&self, key: &str) -> Result<bool, StorageError>;

    fn get_by_key(&self, key: &str) -> Result<Option<Entry>, StorageError>;

    fn init_transaction(&mut self) -> Result<Box<dyn Transaction + '_>, StorageError>;
}

/// A scoped write handle over a backend. Operations are buffered and applied
/// atomically on commit; dropping an uncommitted transaction discards them.
/// Transactions live within a single command's execution and never nest.
pub trait Transaction {
    fn set_kv(&mut self, entry: &Entry) -> Result<(), StorageError>;

    /// Stage a delete; the returned count reflects whether the key is
    /// currently visible (committed state plus this transaction's own
    /// staged operations).
    fn delete_by_key(&mut self, key: &str) -> Result<usize, StorageError>;

    fn commit(&mut self) -> Result<(), StorageError>;

    fn abort(&mut self) -> Result<(), StorageError>;
}

/// One staged write.
#[derive(Debug, Clone)]
pub(crate) enum TxOp {
    Put(Entry),
    Delete(String),
}

/// Whether `key` would exist after this transaction's staged ops, if the
/// staged ops mention it at all.
pub(crate) fn staged_exists(ops: &[TxOp], key: &str) -> Option<bool> {
    ops.iter().rev().find_map(|op| match op {
        TxOp::Put(entry) if entry.key == key => Some(true),
        TxOp::Delete(k) if k == key => Some(false),
        _ => None,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage backend error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("corrupt log record: {0}")]
    Corrupt(String),

    #[error("transaction already finished")]
    TransactionFinished,
}
