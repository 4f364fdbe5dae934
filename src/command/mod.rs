pub mod auth;
pub mod expire;
pub mod hash;
pub mod key;
pub mod list;
pub mod pubsub;
pub mod set;
pub mod string;

use crate::config::SharedConfig;
use crate::connection::ClientState;
use crate::error::CommandError;
use crate::pubsub::{PushSender, SharedBroker};
use crate::resp::RespValue;
use crate::store::SharedStore;

use expire::ExpireKind;

/// Route one decoded request to its handler and wrap the outcome.
///
/// `cmd_name` is the first array element, already folded to uppercase.
/// Handlers validate arity, argument types and options before touching the
/// store, so a rejected call never leaves partial effects; their errors come
/// back here and turn into `ERR `-prefixed wire errors, which is the only
/// rewriting the dispatcher does.
pub async fn dispatch(
    cmd_name: &str,
    args: &[RespValue],
    store: &SharedStore,
    config: &SharedConfig,
    client: &mut ClientState,
    broker: &SharedBroker,
    push_tx: &PushSender,
) -> RespValue {
    let result = match cmd_name {
        // Generic
        "EXISTS" => key::cmd_exists(args, store).await,
        "DEL" => key::cmd_del(args, store).await,
        "COPY" => key::cmd_copy(args, store).await,

        // Strings
        "SET" => string::cmd_set(args, store).await,
        "GET" => string::cmd_get(args, store).await,

        // Lists
        "LPUSH" => list::cmd_lpush(args, store).await,
        "RPUSH" => list::cmd_rpush(args, store).await,
        "LPUSHX" => list::cmd_lpushx(args, store).await,
        "RPUSHX" => list::cmd_rpushx(args, store).await,
        "LPOP" => list::cmd_lpop(args, store).await,
        "RPOP" => list::cmd_rpop(args, store).await,
        "LLEN" => list::cmd_llen(args, store).await,
        "LINDEX" => list::cmd_lindex(args, store).await,

        // Sets
        "SADD" => set::cmd_sadd(args, store).await,
        "SMEMBERS" => set::cmd_smembers(args, store).await,

        // Hashes
        "HSET" => hash::cmd_hset(args, store).await,
        "HGET" => hash::cmd_hget(args, store).await,
        "HDEL" => hash::cmd_hdel(args, store).await,
        "HGETALL" => hash::cmd_hgetall(args, store).await,

        // Expiration
        "EXPIRE" => expire::cmd_set_expiry(ExpireKind::RelativeSeconds, args, store).await,
        "PEXPIRE" => expire::cmd_set_expiry(ExpireKind::RelativeMillis, args, store).await,
        "EXPIREAT" => expire::cmd_set_expiry(ExpireKind::AbsoluteSeconds, args, store).await,
        "PEXPIREAT" => expire::cmd_set_expiry(ExpireKind::AbsoluteMillis, args, store).await,
        "EXPIRETIME" => expire::cmd_expiretime(args, store).await,
        "PERSIST" => expire::cmd_persist(args, store).await,

        // Pub/Sub
        "SUBSCRIBE" => pubsub::cmd_subscribe(args, client, broker, push_tx).await,
        "UNSUBSCRIBE" => pubsub::cmd_unsubscribe(args, client, broker, push_tx).await,
        "PUBLISH" => pubsub::cmd_publish(args, broker).await,

        // Connection
        "AUTH" => auth::cmd_auth(args, config, client),

        other => Err(CommandError::InvalidCommand(other.to_string())),
    };

    match result {
        Ok(reply) => reply,
        Err(e) => RespValue::error(format!("ERR {e}")),
    }
}

/// Fetch a required positional argument as its string payload.
pub(crate) fn required_arg<'a>(
    args: &'a [RespValue],
    idx: usize,
    cmd: &'static str,
) -> Result<&'a str, CommandError> {
    args.get(idx)
        .and_then(RespValue::as_bulk)
        .ok_or(CommandError::WrongArgCount(cmd))
}
