//! In-process fan-out of inbound broker traffic.
//!
//! The MQTT event loop runs on its own task and is the only reader of the
//! broker connection.  Everything it receives is pushed onto a
//! [`MessageBus`], built on [`tokio::sync::broadcast`] channels, so that any
//! number of waiting requests can each see every message without blocking
//! the event loop or each other.
//!
//! # Lanes
//!
//! | Lane | Traffic |
//! |---|---|
//! | messages | Every `PUBLISH` the broker delivers, tagged with its topic |
//! | signals | Subscription progress: `SUBSCRIBE` sent, `SUBACK` received |

use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Default channel capacity (number of buffered messages before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 64;

/// A message delivered by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Subscription progress reported by the event loop.
///
/// A request that needs its listener armed before it publishes waits for the
/// `Acked` signal whose packet id matches the `Sent` signal of its own
/// subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionSignal {
    /// A `SUBSCRIBE` with this packet id left the client.
    Sent { pkid: u16 },
    /// The broker acknowledged the `SUBSCRIBE` with this packet id.
    /// `granted` is `false` when the broker refused at least one filter.
    Acked { pkid: u16, granted: bool },
}

/// Shared inbound bus. Clone it cheaply – all clones share the same
/// underlying broadcast channels.
#[derive(Clone, Debug)]
pub struct MessageBus {
    messages: broadcast::Sender<InboundMessage>,
    signals: broadcast::Sender<SubscriptionSignal>,
}

impl MessageBus {
    /// Create a new bus; `capacity` applies to each lane independently.
    pub fn new(capacity: usize) -> Self {
        let (messages, _) = broadcast::channel(capacity);
        let (signals, _) = broadcast::channel(capacity);
        Self { messages, signals }
    }

    /// Hand an inbound message to every current subscriber.
    ///
    /// Returns the number of receivers that were handed the message.  Zero is
    /// a normal condition: a reply that arrives after its request gave up has
    /// nobody left to read it.
    pub fn dispatch(&self, message: InboundMessage) -> usize {
        match self.messages.send(message) {
            Ok(n) => n,
            Err(broadcast::error::SendError(dropped)) => {
                debug!(topic = %dropped.topic, "inbound message has no listener; dropped");
                0
            }
        }
    }

    /// Announce subscription progress.
    pub fn signal(&self, signal: SubscriptionSignal) -> usize {
        self.signals.send(signal).unwrap_or(0)
    }

    /// Subscribe to messages published on exactly `topic`.
    pub fn subscribe_topic(&self, topic: impl Into<String>) -> TopicSubscriber {
        TopicSubscriber {
            topic: topic.into(),
            receiver: self.messages.subscribe(),
        }
    }

    /// Subscribe to subscription progress signals.
    pub fn subscribe_signals(&self) -> broadcast::Receiver<SubscriptionSignal> {
        self.signals.subscribe()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// A subscriber that only delivers messages whose topic equals its own.
pub struct TopicSubscriber {
    topic: String,
    receiver: broadcast::Receiver<InboundMessage>,
}

impl TopicSubscriber {
    /// Wait for the next message on this subscriber's topic.
    ///
    /// Returns `None` when the bus is closed and no further messages will
    /// arrive.
    pub async fn recv(&mut self) -> Option<InboundMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(message) if message.topic == self.topic => return Some(message),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(topic = %self.topic, lagged_by = n, "TopicSubscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}
