use crate::command::required_arg;
use crate::error::{CommandError, CommandResult};
use crate::options::parse_expire_options;
use crate::resp::RespValue;
use crate::store::SharedStore;
use crate::store::entry::now_millis;

/// The four TTL-setting verbs, distinguished by unit and reference point.
#[derive(Clone, Copy)]
pub enum ExpireKind {
    /// EXPIRE — relative seconds.
    RelativeSeconds,
    /// PEXPIRE — relative milliseconds.
    RelativeMillis,
    /// EXPIREAT — absolute seconds since epoch.
    AbsoluteSeconds,
    /// PEXPIREAT — absolute milliseconds since epoch.
    AbsoluteMillis,
}

impl ExpireKind {
    fn name(self) -> &'static str {
        match self {
            ExpireKind::RelativeSeconds => "expire",
            ExpireKind::RelativeMillis => "pexpire",
            ExpireKind::AbsoluteSeconds => "expireat",
            ExpireKind::AbsoluteMillis => "pexpireat",
        }
    }

    /// Normalize the argument to an absolute millisecond epoch. Values in
    /// the past are legal; the key simply expires on its next read.
    fn resolve(self, n: i64, now_ms: i64) -> u64 {
        let at = match self {
            ExpireKind::RelativeSeconds => now_ms.saturating_add(n.saturating_mul(1000)),
            ExpireKind::RelativeMillis => now_ms.saturating_add(n),
            ExpireKind::AbsoluteSeconds => n.saturating_mul(1000),
            ExpireKind::AbsoluteMillis => n,
        };
        at.max(0) as u64
    }
}

/// EXPIRE / PEXPIRE / EXPIREAT / PEXPIREAT key n [NX|XX|LT|GT]
///
/// NX applies only when the key has no TTL, XX only when it has one; LT/GT
/// only tighten/loosen an existing TTL (a key without TTL counts as
/// infinitely late, so LT always applies and GT never does). Missing key or
/// a blocked condition replies 0 with no mutation; success replies 1.
pub async fn cmd_set_expiry(
    kind: ExpireKind,
    args: &[RespValue],
    store: &SharedStore,
) -> CommandResult {
    let cmd = kind.name();
    if args.len() < 2 {
        return Err(CommandError::WrongArgCount(cmd));
    }
    let key = required_arg(args, 0, cmd)?;
    let n: i64 = required_arg(args, 1, cmd)?
        .parse()
        .map_err(|_| CommandError::InvalidOptions(cmd))?;
    let opts = parse_expire_options(cmd, &args[2..])?;

    let mut store = store.write().await;
    let mut entry = match store.get(key)? {
        Some(entry) => entry,
        None => return Ok(RespValue::integer(0)),
    };

    if (opts.nx && entry.expires_at.is_some()) || (opts.xx && entry.expires_at.is_none()) {
        return Ok(RespValue::integer(0));
    }

    let new_at = kind.resolve(n, now_millis() as i64);
    if opts.lt {
        if let Some(current) = entry.expires_at {
            if new_at >= current {
                return Ok(RespValue::integer(0));
            }
        }
    }
    if opts.gt {
        match entry.expires_at {
            Some(current) if new_at > current => {}
            _ => return Ok(RespValue::integer(0)),
        }
    }

    entry.expires_at = Some(new_at);
    let mut tx = store.begin()?;
    tx.set_kv(&entry)?;
    tx.commit()?;

    Ok(RespValue::integer(1))
}

/// PERSIST key — clears a present TTL (1) or does nothing (0).
pub async fn cmd_persist(args: &[RespValue], store: &SharedStore) -> CommandResult {
    if args.len() != 1 {
        return Err(CommandError::WrongArgCount("persist"));
    }
    let key = required_arg(args, 0, "persist")?;

    let mut store = store.write().await;
    let mut entry = match store.get(key)? {
        Some(entry) => entry,
        None => return Ok(RespValue::integer(0)),
    };
    if entry.expires_at.is_none() {
        return Ok(RespValue::integer(0));
    }

    entry.expires_at = None;
    let mut tx = store.begin()?;
    tx.set_kv(&entry)?;
    tx.commit()?;

    Ok(RespValue::integer(1))
}

/// EXPIRETIME key — -2 when the key is absent, -1 when it has no TTL,
/// otherwise the expiry as absolute seconds since the epoch.
pub async fn cmd_expiretime(args: &[RespValue], store: &SharedStore) -> CommandResult {
    if args.len() != 1 {
        return Err(CommandError::WrongArgCount("expiretime"));
    }
    let key = required_arg(args, 0, "expiretime")?;

    let mut store = store.write().await;
    match store.get(key)? {
        None => Ok(RespValue::integer(-2)),
        Some(entry) => match entry.expires_at {
            None => Ok(RespValue::integer(-1)),
            Some(at_ms) => Ok(RespValue::integer((at_ms / 1000) as i64)),
        },
    }
}
