use std::collections::HashMap;

use crate::command::required_arg;
use crate::error::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::store::SharedStore;
use crate::store::entry::{Entry, Value};

/// HSET key field value [field value ...] — count of fields newly created.
pub async fn cmd_hset(args: &[RespValue], store: &SharedStore) -> CommandResult {
    if args.len() < 3 || (args.len() - 1) % 2 != 0 {
        return Err(CommandError::WrongArgCount("hset"));
    }
    let key = required_arg(args, 0, "hset")?;
    let pairs: Vec<String> = args[1..]
        .iter()
        .map(|arg| arg.as_bulk().map(str::to_string))
        .collect::<Option<_>>()
        .ok_or(CommandError::WrongArgCount("hset"))?;

    let mut store = store.write().await;

    let mut entry = match store.get(key)? {
        Some(entry) => {
            if !matches!(entry.value, Value::Hash(_)) {
                return Err(CommandError::WrongType("hash"));
            }
            entry
        }
        None => Entry::new(key, Value::Hash(HashMap::new())),
    };

    let Value::Hash(hash) = &mut entry.value else {
        unreachable!("type checked above");
    };
    let mut created = 0i64;
    for pair in pairs.chunks(2) {
        if hash.insert(pair[0].clone(), pair[1].clone()).is_none() {
            created += 1;
        }
    }

    let mut tx = store.begin()?;
    tx.set_kv(&entry)?;
    tx.commit()?;

    Ok(RespValue::integer(created))
}

/// HGET key field — the field's value, Null when the key or field is absent.
pub async fn cmd_hget(args: &[RespValue], store: &SharedStore) -> CommandResult {
    if args.len() != 2 {
        return Err(CommandError::WrongArgCount("hget"));
    }
    let key = required_arg(args, 0, "hget")?;
    let field = required_arg(args, 1, "hget")?;

    let mut store = store.write().await;
    match store.get(key)? {
        None => Ok(RespValue::Null),
        Some(entry) => match entry.value {
            Value::Hash(hash) => Ok(hash
                .get(field)
                .map(RespValue::bulk)
                .unwrap_or(RespValue::Null)),
            _ => Err(CommandError::WrongType("hash")),
        },
    }
}

/// HDEL key field [field ...] — count of fields removed; removing the last
/// field deletes the key.
pub async fn cmd_hdel(args: &[RespValue], store: &SharedStore) -> CommandResult {
    if args.len() < 2 {
        return Err(CommandError::WrongArgCount("hdel"));
    }
    let key = required_arg(args, 0, "hdel")?;

    let mut store = store.write().await;

    let mut entry = match store.get(key)? {
        Some(entry) => entry,
        None => return Ok(RespValue::integer(0)),
    };
    let Value::Hash(hash) = &mut entry.value else {
        return Err(CommandError::WrongType("hash"));
    };

    let mut removed = 0i64;
    for arg in &args[1..] {
        if let Some(field) = arg.as_bulk() {
            if hash.remove(field).is_some() {
                removed += 1;
            }
        }
    }

    let mut tx = store.begin()?;
    if matches!(&entry.value, Value::Hash(hash) if hash.is_empty()) {
        tx.delete_by_key(key)?;
    } else {
        tx.set_kv(&entry)?;
    }
    tx.commit()?;

    Ok(RespValue::integer(removed))
}

/// HGETALL key — flat field/value array, empty when the key is absent.
pub async fn cmd_hgetall(args: &[RespValue], store: &SharedStore) -> CommandResult {
    if args.len() != 1 {
        return Err(CommandError::WrongArgCount("hgetall"));
    }
    let key = required_arg(args, 0, "hgetall")?;

    let mut store = store.write().await;
    match store.get(key)? {
        None => Ok(RespValue::array(Vec::new())),
        Some(entry) => match entry.value {
            Value::Hash(hash) => {
                let mut items = Vec::with_capacity(hash.len() * 2);
                for (field, value) in hash {
                    items.push(RespValue::bulk(field));
                    items.push(RespValue::bulk(value));
                }
                Ok(RespValue::array(items))
            }
            _ => Err(CommandError::WrongType("hash")),
        },
    }
}
