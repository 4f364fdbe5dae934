use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

/// A keyed entry in the store: one typed payload plus optional expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub key: String,
    pub value: Value,
    /// Expiry as milliseconds since the UNIX epoch. None = no TTL.
    pub expires_at: Option<u64>,
}

/// The typed payload of an entry. The type of a key is immutable until the
/// key is deleted and recreated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Str(String),
    List(VecDeque<String>),
    Set(HashSet<String>),
    Hash(HashMap<String, String>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Hash(_) => "hash",
        }
    }
}

impl Entry {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Entry {
            key: key.into(),
            value,
            expires_at: None,
        }
    }

    pub fn with_expiry(key: impl Into<String>, value: Value, expires_at: u64) -> Self {
        Entry {
            key: key.into(),
            value,
            expires_at: Some(expires_at),
        }
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => now_millis() >= at,
            None => false,
        }
    }
}

/// Current time in milliseconds since the UNIX epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_millis() as u64
}
