//! The cloud-facing transport seam.
//!
//! The reconciliation engine never speaks MQTT directly.  It talks to a
//! [`TwinChannel`], which the production binary backs with
//! [`MqttTwinChannel`][crate::mqtt::MqttTwinChannel] and tests back with an
//! in-memory fake.

use std::time::Duration;

use async_trait::async_trait;
use padbot_types::MapperError;

/// Publish/subscribe access to the cloud twin broker.
///
/// # Contract
///
/// * `publish` – fire a message at `topic` with at-most-once delivery.  A
///   successful return only means the message left the mapper.
///
/// * `request_reply` – listen on `reply_topic`, publish `payload` on
///   `request_topic`, and return the first message that arrives on
///   `reply_topic`.  The listener must be armed before the request is
///   published.  Returns [`MapperError::ReplyTimeout`] when nothing arrives
///   within `timeout`; the listener is released in every case.
#[async_trait]
pub trait TwinChannel: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), MapperError>;

    async fn request_reply(
        &self,
        request_topic: &str,
        reply_topic: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, MapperError>;
}
