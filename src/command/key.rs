use crate::command::required_arg;
use crate::error::{CommandError, CommandResult};
use crate::options::parse_copy_options;
use crate::resp::RespValue;
use crate::store::SharedStore;

/// EXISTS key [key ...] — count of keys still present once lazy expiry has
/// run against each.
pub async fn cmd_exists(args: &[RespValue], store: &SharedStore) -> CommandResult {
    if args.is_empty() {
        return Err(CommandError::WrongArgCount("exists"));
    }

    let mut store = store.write().await;
    let mut count = 0i64;
    for arg in args {
        if let Some(key) = arg.as_bulk() {
            if store.exists(key)? {
                count += 1;
            }
        }
    }
    Ok(RespValue::integer(count))
}

/// DEL key [key ...] — count of keys actually removed. An expired key counts
/// as already absent.
pub async fn cmd_del(args: &[RespValue], store: &SharedStore) -> CommandResult {
    if args.is_empty() {
        return Err(CommandError::WrongArgCount("del"));
    }

    let mut store = store.write().await;

    // Run lazy expiry first so an elapsed key is not counted as a removal.
    let mut live = Vec::new();
    for arg in args {
        if let Some(key) = arg.as_bulk() {
            if store.exists(key)? {
                live.push(key.to_string());
            }
        }
    }

    let mut count = 0i64;
    let mut tx = store.begin()?;
    for key in &live {
        count += tx.delete_by_key(key)? as i64;
    }
    tx.commit()?;

    Ok(RespValue::integer(count))
}

/// COPY src dst [REPLACE] — copies the whole entry (expiry included) under
/// the destination key. Without REPLACE an existing destination blocks the
/// copy; the source always survives.
pub async fn cmd_copy(args: &[RespValue], store: &SharedStore) -> CommandResult {
    if args.len() < 2 {
        return Err(CommandError::WrongArgCount("copy"));
    }
    let src = required_arg(args, 0, "copy")?;
    let dst = required_arg(args, 1, "copy")?;
    let opts = parse_copy_options(&args[2..]);

    let mut store = store.write().await;

    let entry = match store.get(src)? {
        Some(entry) => entry,
        None => return Ok(RespValue::integer(0)),
    };
    if store.exists(dst)? && !opts.replace {
        return Ok(RespValue::integer(0));
    }

    let mut copy = entry;
    copy.key = dst.to_string();

    let mut tx = store.begin()?;
    tx.set_kv(&copy)?;
    tx.commit()?;

    Ok(RespValue::integer(1))
}
