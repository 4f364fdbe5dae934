use crate::command::required_arg;
use crate::connection::ClientState;
use crate::error::{CommandError, CommandResult};
use crate::pubsub::{PushSender, SharedBroker};
use crate::resp::RespValue;

fn subscription_ack(kind: &str, channel: &str) -> RespValue {
    RespValue::array(vec![
        RespValue::bulk(kind),
        RespValue::bulk(channel),
        RespValue::integer(1),
    ])
}

/// SUBSCRIBE channel [channel ...] — registers the caller (idempotently)
/// and pushes one `["subscribe", channel, 1]` acknowledgement per channel
/// through the out-of-band queue. The command's own reply is Void: the
/// worker writes nothing for it.
pub async fn cmd_subscribe(
    args: &[RespValue],
    client: &ClientState,
    broker: &SharedBroker,
    push_tx: &PushSender,
) -> CommandResult {
    if args.is_empty() {
        return Err(CommandError::WrongArgCount("subscribe"));
    }

    let mut broker = broker.write().await;
    for arg in args {
        if let Some(channel) = arg.as_bulk() {
            broker.subscribe(client.id, channel, push_tx.clone());
            let _ = push_tx.send(subscription_ack("subscribe", channel));
        }
    }

    Ok(RespValue::Void)
}

/// UNSUBSCRIBE [channel ...] — with no arguments, leaves every channel the
/// caller belongs to. One `["unsubscribe", channel, 1]` push per channel
/// actually left, then a plain OK reply.
pub async fn cmd_unsubscribe(
    args: &[RespValue],
    client: &ClientState,
    broker: &SharedBroker,
    push_tx: &PushSender,
) -> CommandResult {
    let mut broker = broker.write().await;

    let channels: Vec<String> = if args.is_empty() {
        broker.channels_of(client.id)
    } else {
        args.iter()
            .filter_map(|arg| arg.as_bulk().map(str::to_string))
            .collect()
    };

    for channel in &channels {
        if broker.unsubscribe(client.id, channel) {
            let _ = push_tx.send(subscription_ack("unsubscribe", channel));
        }
    }

    Ok(RespValue::ok())
}

/// PUBLISH channel message — fans `["message", channel, message]` out to
/// every current subscriber and replies with the number reached. The
/// publisher is not excluded: subscribed to the channel itself, it receives
/// its own message and is counted.
pub async fn cmd_publish(args: &[RespValue], broker: &SharedBroker) -> CommandResult {
    if args.len() != 2 {
        return Err(CommandError::WrongArgCount("publish"));
    }
    let channel = required_arg(args, 0, "publish")?;
    let message = required_arg(args, 1, "publish")?;

    let broker = broker.read().await;
    let delivered = broker.publish(channel, message);
    Ok(RespValue::integer(delivered as i64))
}
