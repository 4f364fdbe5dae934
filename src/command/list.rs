use std::collections::VecDeque;

use crate::command::required_arg;
use crate::error::{CommandError, CommandResult};
use crate::resp::RespValue;
use crate::store::SharedStore;
use crate::store::entry::{Entry, Value};

/// Which end of the list an operation works on.
#[derive(Clone, Copy, PartialEq)]
enum End {
    Head,
    Tail,
}

pub async fn cmd_lpush(args: &[RespValue], store: &SharedStore) -> CommandResult {
    push("lpush", args, store, End::Head, false).await
}

pub async fn cmd_rpush(args: &[RespValue], store: &SharedStore) -> CommandResult {
    push("rpush", args, store, End::Tail, false).await
}

pub async fn cmd_lpushx(args: &[RespValue], store: &SharedStore) -> CommandResult {
    push("lpushx", args, store, End::Head, true).await
}

pub async fn cmd_rpushx(args: &[RespValue], store: &SharedStore) -> CommandResult {
    push("rpushx", args, store, End::Tail, true).await
}

/// Shared push path. Head pushes prepend the arguments one by one, so the
/// last argument given ends up nearest the head; tail pushes append in
/// order. The X-forms refuse a missing key. A key whose TTL elapsed behaves
/// like a missing one (the expired payload is gone, not an error).
async fn push(
    cmd: &'static str,
    args: &[RespValue],
    store: &SharedStore,
    end: End,
    require_existing: bool,
) -> CommandResult {
    if args.len() < 2 {
        return Err(CommandError::WrongArgCount(cmd));
    }
    let key = required_arg(args, 0, cmd)?;
    let items: Vec<String> = args[1..]
        .iter()
        .map(|arg| arg.as_bulk().map(str::to_string))
        .collect::<Option<_>>()
        .ok_or(CommandError::WrongArgCount(cmd))?;

    let mut store = store.write().await;

    let mut entry = match store.get(key)? {
        Some(entry) => {
            if !matches!(entry.value, Value::List(_)) {
                return Err(CommandError::WrongType("list"));
            }
            entry
        }
        None => {
            if require_existing {
                return Err(CommandError::KeyDoesNotExist);
            }
            Entry::new(key, Value::List(VecDeque::new()))
        }
    };

    let Value::List(list) = &mut entry.value else {
        unreachable!("type checked above");
    };
    for item in items {
        match end {
            End::Head => list.push_front(item),
            End::Tail => list.push_back(item),
        }
    }
    let len = list.len() as i64;

    let mut tx = store.begin()?;
    tx.set_kv(&entry)?;
    tx.commit()?;

    Ok(RespValue::integer(len))
}

pub async fn cmd_lpop(args: &[RespValue], store: &SharedStore) -> CommandResult {
    pop("lpop", args, store, End::Head).await
}

pub async fn cmd_rpop(args: &[RespValue], store: &SharedStore) -> CommandResult {
    pop("rpop", args, store, End::Tail).await
}

/// Remove and return one element. Absent key, wrong type and empty list all
/// reply Null; popping the last element deletes the key.
async fn pop(
    cmd: &'static str,
    args: &[RespValue],
    store: &SharedStore,
    end: End,
) -> CommandResult {
    if args.len() != 1 {
        return Err(CommandError::WrongArgCount(cmd));
    }
    let key = required_arg(args, 0, cmd)?;

    let mut store = store.write().await;

    let mut entry = match store.get(key)? {
        Some(entry) => entry,
        None => return Ok(RespValue::Null),
    };
    let Value::List(list) = &mut entry.value else {
        return Ok(RespValue::Null);
    };

    let popped = match end {
        End::Head => list.pop_front(),
        End::Tail => list.pop_back(),
    };
    let Some(value) = popped else {
        return Ok(RespValue::Null);
    };

    let mut tx = store.begin()?;
    if entry_is_empty_list(&entry) {
        tx.delete_by_key(key)?;
    } else {
        tx.set_kv(&entry)?;
    }
    tx.commit()?;

    Ok(RespValue::bulk(value))
}

fn entry_is_empty_list(entry: &Entry) -> bool {
    matches!(&entry.value, Value::List(list) if list.is_empty())
}

/// LLEN key — list length, 0 when absent, type error otherwise.
pub async fn cmd_llen(args: &[RespValue], store: &SharedStore) -> CommandResult {
    if args.len() != 1 {
        return Err(CommandError::WrongArgCount("llen"));
    }
    let key = required_arg(args, 0, "llen")?;

    let mut store = store.write().await;
    match store.get(key)? {
        None => Ok(RespValue::integer(0)),
        Some(entry) => match entry.value {
            Value::List(list) => Ok(RespValue::integer(list.len() as i64)),
            _ => Err(CommandError::WrongType("list")),
        },
    }
}

/// LINDEX key index — element at index; negative indices count back from
/// the tail. A resolved index outside the list is an error.
pub async fn cmd_lindex(args: &[RespValue], store: &SharedStore) -> CommandResult {
    if args.len() != 2 {
        return Err(CommandError::WrongArgCount("lindex"));
    }
    let key = required_arg(args, 0, "lindex")?;
    let index: i64 = required_arg(args, 1, "lindex")?
        .parse()
        .map_err(|_| CommandError::NotInteger)?;

    let mut store = store.write().await;
    let entry = match store.get(key)? {
        Some(entry) => entry,
        None => return Ok(RespValue::Null),
    };
    let Value::List(list) = &entry.value else {
        return Err(CommandError::WrongType("list"));
    };

    let resolved = if index < 0 {
        list.len() as i64 + index
    } else {
        index
    };
    if resolved < 0 || resolved >= list.len() as i64 {
        return Err(CommandError::IndexOutOfRange);
    }

    Ok(RespValue::bulk(list[resolved as usize].clone()))
}
