use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use bytes::BytesMut;
use tracing::warn;

use super::{Backend, StorageError, Transaction, TxOp, staged_exists};
use crate::resp::{RespParser, RespValue};
use crate::store::entry::{Entry, Value};

/// Append-only log backend: an in-memory map rebuilt on startup by replaying
/// a log of committed operations, each encoded as one wire Array frame.
///
/// Record shapes:
///   ["SET", key, type, expiry_ms, payload...]   upsert of a whole entry
///   ["DEL", key]                                delete
///
/// A truncated tail (interrupted final write) stops replay at the last
/// complete record; anything else unreadable is treated as corruption.
pub struct AofBackend {
    map: HashMap<String, Entry>,
    log: File,
}

impl AofBackend {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let mut map = HashMap::new();

        if path.exists() {
            let mut raw = Vec::new();
            File::open(path)?.read_to_end(&mut raw)?;
            replay(&raw, &mut map)?;
        }

        let log = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(AofBackend { map, log })
    }

    /// Number of live entries after replay.
    pub fn entry_count(&self) -> usize {
        self.map.len()
    }
}

impl Backend for AofBackend {
    fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.map.contains_key(key))
    }

    fn get_by_key(&self, key: &str) -> Result<Option<Entry>, StorageError> {
        Ok(self.map.get(key).cloned())
    }

    fn init_transaction(&mut self) -> Result<Box<dyn Transaction + '_>, StorageError> {
        Ok(Box::new(AofTransaction {
            map: &mut self.map,
            log: &mut self.log,
            ops: Vec::new(),
            finished: false,
        }))
    }
}

struct AofTransaction<'a> {
    map: &'a mut HashMap<String, Entry>,
    log: &'a mut File,
    ops: Vec<TxOp>,
    finished: bool,
}

impl AofTransaction<'_> {
    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.finished {
            return Err(StorageError::TransactionFinished);
        }
        Ok(())
    }
}

impl Transaction for AofTransaction<'_> {
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

        let mut frame = Vec::new();
        for op in &self.ops {
            encode_record(op).write_to(&mut frame);
        }
        self.log.write_all(&frame)?;
        self.log.sync_data()?;

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

fn replay(raw: &[u8], map: &mut HashMap<String, Entry>) -> Result<(), StorageError> {
    let mut buf = BytesMut::from(raw);
    let mut records = 0usize;

    loop {
        match RespParser::parse(&mut buf) {
            Ok(Some(frame)) => {
                match decode_record(&frame)? {
                    TxOp::Put(entry) => {
                        map.insert(entry.key.clone(), entry);
                    }
                    TxOp::Delete(key) => {
                        map.remove(&key);
                    }
                }
                records += 1;
            }
            Ok(None) => {
                if !buf.is_empty() {
                    warn!(
                        "append-only log has a truncated tail ({} bytes); replayed {records} records",
                        buf.len()
                    );
                }
                return Ok(());
            }
            Err(e) => return Err(StorageError::Corrupt(e.to_string())),
        }
    }
}

fn encode_record(op: &TxOp) -> RespValue {
    match op {
        TxOp::Put(entry) => {
            let mut items = vec![
                RespValue::bulk("SET"),
                RespValue::bulk(&entry.key),
                RespValue::bulk(entry.value.type_name()),
                RespValue::bulk(entry.expires_at.unwrap_or(0).to_string()),
            ];
            match &entry.value {
                Value::Str(s) => items.push(RespValue::bulk(s)),
                Value::List(list) => items.extend(list.iter().map(RespValue::bulk)),
                Value::Set(set) => items.extend(set.iter().map(RespValue::bulk)),
                Value::Hash(hash) => {
                    for (field, value) in hash {
                        items.push(RespValue::bulk(field));
                        items.push(RespValue::bulk(value));
                    }
                }
            }
            RespValue::array(items)
        }
        TxOp::Delete(key) => {
            RespValue::array(vec![RespValue::bulk("DEL"), RespValue::bulk(key)])
        }
    }
}

fn decode_record(frame: &RespValue) -> Result<TxOp, StorageError> {
    let items = match frame {
        RespValue::Array(items) => items,
        _ => return Err(StorageError::Corrupt("record is not an array".to_string())),
    };

    match field(items, 0)? {
        "DEL" => Ok(TxOp::Delete(field(items, 1)?.to_string())),
        "SET" => {
            let key = field(items, 1)?.to_string();
            let type_name = field(items, 2)?;
            let expiry: u64 = field(items, 3)?
                .parse()
                .map_err(|_| StorageError::Corrupt("bad expiry field".to_string()))?;
            let payload: Vec<&str> = items[4..]
                .iter()
                .map(|item| {
                    item.as_bulk()
                        .ok_or_else(|| StorageError::Corrupt("non-bulk payload".to_string()))
                })
                .collect::<Result<_, _>>()?;

            let value = match type_name {
                "string" => match payload.as_slice() {
                    [s] => Value::Str(s.to_string()),
                    _ => {
                        return Err(StorageError::Corrupt(
                            "string record needs one payload field".to_string(),
                        ));
                    }
                },
                "list" => Value::List(payload.iter().map(|s| s.to_string()).collect()),
                "set" => Value::Set(payload.iter().map(|s| s.to_string()).collect()),
                "hash" => {
                    if payload.len() % 2 != 0 {
                        return Err(StorageError::Corrupt(
                            "hash record needs field/value pairs".to_string(),
                        ));
                    }
                    Value::Hash(
                        payload
                            .chunks(2)
                            .map(|pair| (pair[0].to_string(), pair[1].to_string()))
                            .collect(),
                    )
                }
                other => {
                    return Err(StorageError::Corrupt(format!("unknown entry type '{other}'")));
                }
            };

            Ok(TxOp::Put(Entry {
                key,
                value,
                expires_at: if expiry == 0 { None } else { Some(expiry) },
            }))
        }
        other => Err(StorageError::Corrupt(format!("unknown record op '{other}'"))),
    }
}

fn field(items: &[RespValue], idx: usize) -> Result<&str, StorageError> {
    items
        .get(idx)
        .and_then(RespValue::as_bulk)
        .ok_or_else(|| StorageError::Corrupt(format!("missing record field {idx}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    #[test]
    fn put_record_round_trips() {
        let entry = Entry::with_expiry(
            "jobs",
            Value::List(VecDeque::from(["a".to_string(), "b".to_string()])),
            12345,
        );
        let decoded = decode_record(&encode_record(&TxOp::Put(entry))).unwrap();
        match decoded {
            TxOp::Put(e) => {
                assert_eq!(e.key, "jobs");
                assert_eq!(e.expires_at, Some(12345));
                assert_eq!(
                    e.value,
                    Value::List(VecDeque::from(["a".to_string(), "b".to_string()]))
                );
            }
            other => panic!("expected put, got {other:?}"),
        }
    }

    #[test]
    fn zero_expiry_decodes_to_no_ttl() {
        let entry = Entry::new("k", Value::Str("v".to_string()));
        match decode_record(&encode_record(&TxOp::Put(entry))).unwrap() {
            TxOp::Put(e) => assert_eq!(e.expires_at, None),
            other => panic!("expected put, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_op() {
        let frame = RespValue::array(vec![RespValue::bulk("NOPE"), RespValue::bulk("k")]);
        assert!(matches!(
            decode_record(&frame),
            Err(StorageError::Corrupt(_))
        ));
    }

    #[test]
    fn rejects_odd_hash_payload() {
        let frame = RespValue::array(vec![
            RespValue::bulk("SET"),
            RespValue::bulk("h"),
            RespValue::bulk("hash"),
            RespValue::bulk("0"),
            RespValue::bulk("dangling-field"),
        ]);
        assert!(matches!(
            decode_record(&frame),
            Err(StorageError::Corrupt(_))
        ));
    }

    #[test]
    fn replay_stops_at_truncated_tail() {
        let entry = Entry::new("k", Value::Str("v".to_string()));
        let mut raw = encode_record(&TxOp::Put(entry)).serialize();
        // Interrupted second record: header only.
        raw.extend_from_slice(b"*2\r\n$3\r\nDEL\r\n");

        let mut map = HashMap::new();
        replay(&raw, &mut map).unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("k"));
    }
}
