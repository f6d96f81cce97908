//! `padbot-middleware` – the cloud side of the mapper.
//!
//! Carries twin messages between the mapper and the edge MQTT broker without
//! caring about their meaning.
//!
//! # Modules
//!
//! - [`bus`] – in-process broadcast bus that fans inbound broker traffic
//!   (publishes and subscription progress) out to waiting requests.
//! - [`channel`] – the [`TwinChannel`] trait the reconciliation engine talks
//!   to.
//! - [`mqtt`] – [`MqttTwinChannel`], the `rumqttc`-backed implementation.

pub mod bus;
pub mod channel;
pub mod mqtt;

pub use bus::{InboundMessage, MessageBus, SubscriptionSignal, TopicSubscriber};
pub use channel::TwinChannel;
pub use mqtt::{MqttSettings, MqttTwinChannel};
