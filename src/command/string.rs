use crate::command::required_arg;
use crate::error::{CommandError, CommandResult};
use crate::options::parse_set_options;
use crate::resp::RespValue;
use crate::store::SharedStore;
use crate::store::entry::{Entry, Value};

/// SET key value [NX|XX] [EX s|PX ms|EXAT s|PXAT ms|KEEPTTL] [GET]
///
/// NX refuses an existing key, XX a missing one; a refused write replies
/// Null. KEEPTTL carries the prior expiry forward; with no TTL option the
/// expiry is cleared. GET replies with the prior string value instead of OK;
/// its type check runs before the write so a rejected call mutates nothing.
pub async fn cmd_set(args: &[RespValue], store: &SharedStore) -> CommandResult {
    if args.len() < 2 {
        return Err(CommandError::WrongArgCount("set"));
    }
    let key = required_arg(args, 0, "set")?;
    let value = required_arg(args, 1, "set")?;
    let opts = parse_set_options("set", &args[2..])?;

    let mut store = store.write().await;
    let prior = store.get(key)?;

    if (opts.nx && prior.is_some()) || (opts.xx && prior.is_none()) {
        return Ok(RespValue::Null);
    }

    if opts.get {
        if let Some(prior) = &prior {
            if !matches!(prior.value, Value::Str(_)) {
                return Err(CommandError::WrongType("string"));
            }
        }
    }

    let expires_at = if opts.keepttl {
        prior.as_ref().and_then(|p| p.expires_at)
    } else {
        opts.expiry
    };

    let entry = Entry {
        key: key.to_string(),
        value: Value::Str(value.to_string()),
        expires_at,
    };

    let mut tx = store.begin()?;
    tx.set_kv(&entry)?;
    tx.commit()?;

    if opts.get {
        return Ok(match prior {
            Some(Entry {
                value: Value::Str(old),
                ..
            }) => RespValue::bulk(old),
            _ => RespValue::Null,
        });
    }
    Ok(RespValue::ok())
}

/// GET key — the string value, Null when absent or expired, a type error
/// otherwise.
pub async fn cmd_get(args: &[RespValue], store: &SharedStore) -> CommandResult {
    if args.len() != 1 {
        return Err(CommandError::WrongArgCount("get"));
    }
    let key = required_arg(args, 0, "get")?;

    let mut store = store.write().await;
    match store.get(key)? {
        None => Ok(RespValue::Null),
        Some(entry) => match entry.value {
            Value::Str(s) => Ok(RespValue::bulk(s)),
            _ => Err(CommandError::WrongType("string")),
        },
    }
}
