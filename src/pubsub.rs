use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};

use crate::resp::RespValue;

/// Write side of a connection's out-of-band push queue. The connection task
/// owns the read side and forwards everything to its socket.
pub type PushSender = mpsc::UnboundedSender<RespValue>;
pub type PushReceiver = mpsc::UnboundedReceiver<RespValue>;

/// Channel-to-subscriber registry plus message fan-out.
///
/// Each channel keeps its subscribers as an ordered, duplicate-free sequence
/// of client ids; publishing walks that sequence and hands the message to
/// each subscriber's push queue. Because the queues are unbounded, a push
/// never blocks the publisher — a slow subscriber delays only itself.
#[derive(Default)]
pub struct PubSubBroker {
    channels: HashMap<String, Vec<u64>>,
    senders: HashMap<u64, PushSender>,
}

impl PubSubBroker {
    pub fn new() -> Self {
        PubSubBroker {
            channels: HashMap::new(),
            senders: HashMap::new(),
        }
    }

    /// Register a client in a channel. Idempotent: re-subscribing neither
    /// duplicates the registration nor reorders it. Returns whether the
    /// client was newly added.
    pub fn subscribe(&mut self, client_id: u64, channel: &str, sender: PushSender) -> bool {
        self.senders.entry(client_id).or_insert(sender);
        let subscribers = self.channels.entry(channel.to_string()).or_default();
        if subscribers.contains(&client_id) {
            return false;
        }
        subscribers.push(client_id);
        true
    }

    /// Remove a client from a channel. Returns whether it was subscribed.
    pub fn unsubscribe(&mut self, client_id: u64, channel: &str) -> bool {
        let Some(subscribers) = self.channels.get_mut(channel) else {
            return false;
        };
        let before = subscribers.len();
        subscribers.retain(|id| *id != client_id);
        let removed = subscribers.len() < before;
        if subscribers.is_empty() {
            self.channels.remove(channel);
        }
        if removed && !self.is_subscribed_anywhere(client_id) {
            self.senders.remove(&client_id);
        }
        removed
    }

    /// Channels the given client currently belongs to, in registry order.
    pub fn channels_of(&self, client_id: u64) -> Vec<String> {
        self.channels
            .iter()
            .filter(|(_, subscribers)| subscribers.contains(&client_id))
            .map(|(channel, _)| channel.clone())
            .collect()
    }

    /// Deliver `["message", channel, payload]` to every current subscriber.
    /// Returns the number of subscribers reached; a subscriber whose
    /// connection is gone is skipped.
    pub fn publish(&self, channel: &str, payload: &str) -> usize {
        let Some(subscribers) = self.channels.get(channel) else {
            return 0;
        };

        let message = RespValue::array(vec![
            RespValue::bulk("message"),
            RespValue::bulk(channel),
            RespValue::bulk(payload),
        ]);

        let mut delivered = 0;
        for client_id in subscribers {
            if let Some(sender) = self.senders.get(client_id) {
                if sender.send(message.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Drop every subscription of a client (connection teardown).
    pub fn unsubscribe_all(&mut self, client_id: u64) {
        self.channels
            .retain(|_, subscribers| {
                subscribers.retain(|id| *id != client_id);
                !subscribers.is_empty()
            });
        self.senders.remove(&client_id);
    }

    fn is_subscribed_anywhere(&self, client_id: u64) -> bool {
        self.channels
            .values()
            .any(|subscribers| subscribers.contains(&client_id))
    }
}

pub type SharedBroker = Arc<RwLock<PubSubBroker>>;

pub fn shared() -> SharedBroker {
    Arc::new(RwLock::new(PubSubBroker::new()))
}
