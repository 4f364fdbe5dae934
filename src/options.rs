use crate::error::CommandError;
use crate::resp::RespValue;
use crate::store::entry::now_millis;

/// Parsed trailing modifiers of a write/expire/copy command. Only the groups
/// a command's parse entry point looks at are ever populated; everything is
/// resolved before any store mutation happens.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WriteOptions {
    pub nx: bool,
    pub xx: bool,
    pub keepttl: bool,
    pub get: bool,
    pub lt: bool,
    pub gt: bool,
    pub replace: bool,
    /// Absolute expiry in ms since the UNIX epoch, normalized at parse time.
    pub expiry: Option<u64>,
}

const TTL_OPTIONS: [&str; 5] = ["KEEPTTL", "EX", "PX", "EXAT", "PXAT"];

/// SET: {NX | XX}, {KEEPTTL | EX s | PX ms | EXAT s | PXAT ms}, GET.
pub fn parse_set_options(
    cmd: &'static str,
    args: &[RespValue],
) -> Result<WriteOptions, CommandError> {
    let mut opts = WriteOptions::default();
    apply_condition_group(cmd, args, &mut opts)?;
    apply_ttl_group(cmd, args, &mut opts)?;
    opts.get = has_flag(args, "GET");
    Ok(opts)
}

/// EXPIRE family: {NX | XX}, {LT | GT}; NX conflicts with LT and GT.
pub fn parse_expire_options(
    cmd: &'static str,
    args: &[RespValue],
) -> Result<WriteOptions, CommandError> {
    let mut opts = WriteOptions::default();
    apply_condition_group(cmd, args, &mut opts)?;
    apply_bound_group(cmd, args, &mut opts)?;
    if opts.nx && (opts.lt || opts.gt) {
        return Err(CommandError::InvalidOptions(cmd));
    }
    Ok(opts)
}

/// COPY: REPLACE anywhere in the tail.
pub fn parse_copy_options(args: &[RespValue]) -> WriteOptions {
    WriteOptions {
        replace: has_flag(args, "REPLACE"),
        ..WriteOptions::default()
    }
}

fn token(arg: &RespValue) -> Option<String> {
    arg.as_bulk().map(str::to_uppercase)
}

fn has_flag(args: &[RespValue], flag: &str) -> bool {
    args.iter().any(|arg| token(arg).as_deref() == Some(flag))
}

fn apply_condition_group(
    cmd: &'static str,
    args: &[RespValue],
    opts: &mut WriteOptions,
) -> Result<(), CommandError> {
    let found: Vec<String> = args
        .iter()
        .filter_map(token)
        .filter(|t| t == "NX" || t == "XX")
        .collect();

    match found.as_slice() {
        [] => Ok(()),
        [one] => {
            if one == "NX" {
                opts.nx = true;
            } else {
                opts.xx = true;
            }
            Ok(())
        }
        _ => Err(CommandError::InvalidOptions(cmd)),
    }
}

fn apply_bound_group(
    cmd: &'static str,
    args: &[RespValue],
    opts: &mut WriteOptions,
) -> Result<(), CommandError> {
    let found: Vec<String> = args
        .iter()
        .filter_map(token)
        .filter(|t| t == "LT" || t == "GT")
        .collect();

    match found.as_slice() {
        [] => Ok(()),
        [one] => {
            if one == "LT" {
                opts.lt = true;
            } else {
                opts.gt = true;
            }
            Ok(())
        }
        _ => Err(CommandError::InvalidOptions(cmd)),
    }
}

fn apply_ttl_group(
    cmd: &'static str,
    args: &[RespValue],
    opts: &mut WriteOptions,
) -> Result<(), CommandError> {
    let positions: Vec<(usize, String)> = args
        .iter()
        .enumerate()
        .filter_map(|(i, arg)| token(arg).map(|t| (i, t)))
        .filter(|(_, t)| TTL_OPTIONS.contains(&t.as_str()))
        .collect();

    let (idx, which) = match positions.as_slice() {
        [] => return Ok(()),
        [one] => one.clone(),
        _ => return Err(CommandError::InvalidOptions(cmd)),
    };

    if which == "KEEPTTL" {
        opts.keepttl = true;
        return Ok(());
    }

    let n: i64 = args
        .get(idx + 1)
        .and_then(RespValue::as_bulk)
        .and_then(|raw| raw.parse().ok())
        .ok_or(CommandError::InvalidOptions(cmd))?;

    let now = now_millis() as i64;
    let at_ms = match which.as_str() {
        "EX" => n
            .checked_mul(1000)
            .and_then(|ms| ms.checked_add(now)),
        "PX" => n.checked_add(now),
        "EXAT" => n.checked_mul(1000),
        "PXAT" => Some(n),
        _ => unreachable!("filtered above"),
    }
    .ok_or(CommandError::InvalidOptions(cmd))?;

    // Past timestamps are legal; they just produce an already-elapsed TTL.
    opts.expiry = Some(at_ms.max(0) as u64);
    Ok(())
}
