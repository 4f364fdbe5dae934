use std::collections::HashSet;

use crate::command::required_arg;
use crate::error::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::store::SharedStore;
use crate::store::entry::{Entry, Value};

/// SADD key member [member ...] — count of members newly inserted; creates
/// the set when the key is absent (or its TTL has elapsed).
pub async fn cmd_sadd(args: &[RespValue], store: &SharedStore) -> CommandResult {
    if args.len() < 2 {
        return Err(CommandError::WrongArgCount("sadd"));
    }
    let key = required_arg(args, 0, "sadd")?;
    let members: Vec<String> = args[1..]
        .iter()
        .map(|arg| arg.as_bulk().map(str::to_string))
        .collect::<Option<_>>()
        .ok_or(CommandError::WrongArgCount("sadd"))?;

    let mut store = store.write().await;

    let mut entry = match store.get(key)? {
        Some(entry) => {
            if !matches!(entry.value, Value::Set(_)) {
                return Err(CommandError::WrongType("set"));
            }
            entry
        }
        None => Entry::new(key, Value::Set(HashSet::new())),
    };

    let Value::Set(set) = &mut entry.value else {
        unreachable!("type checked above");
    };
    let mut added = 0i64;
    for member in members {
        if set.insert(member) {
            added += 1;
        }
    }

    let mut tx = store.begin()?;
    tx.set_kv(&entry)?;
    tx.commit()?;

    Ok(RespValue::integer(added))
}

/// SMEMBERS key — all members as a Set reply, empty when the key is absent.
pub async fn cmd_smembers(args: &[RespValue], store: &SharedStore) -> CommandResult {
    if args.len() != 1 {
        return Err(CommandError::WrongArgCount("smembers"));
    }
    let key = required_arg(args, 0, "smembers")?;

    let mut store = store.write().await;
    match store.get(key)? {
        None => Ok(RespValue::set(Vec::new())),
        Some(entry) => match entry.value {
            Value::Set(members) => Ok(RespValue::set(
                members.into_iter().map(RespValue::bulk).collect(),
            )),
            _ => Err(CommandError::WrongType("set")),
        },
    }
}
