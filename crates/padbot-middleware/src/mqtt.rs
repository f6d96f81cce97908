//! MQTT twin channel for the KubeEdge edge broker.
//!
//! [`MqttTwinChannel`] bridges between the mapper and the broker that
//! EdgeCore's device twin listens on:
//!
//! * **Outbound** – twin get requests, twin updates and device state updates
//!   are published with QoS 0.
//!
//! * **Inbound** – a background task owns the `rumqttc` event loop and pushes
//!   every `PUBLISH`, outgoing `SUBSCRIBE` and `SUBACK` onto a
//!   [`MessageBus`], where [`TwinChannel::request_reply`] picks up the signals
//!   it is waiting for.
//!
//! # Request/reply ordering
//!
//! The twin get result is only delivered to clients that are subscribed when
//! EdgeCore answers.  A request therefore subscribes to the reply topic,
//! waits for the broker's `SUBACK` for that exact packet id, and only then
//! publishes the get request.  Requests are serialized so that the
//! subscription of one request is never confused with another's.
//!
//! # Back-pressure
//!
//! Requests are handed to the event loop with the non-blocking `try_*`
//! calls.  While the broker is unreachable the event loop stops draining its
//! queue; once the queue is full, every call fails at once with
//! [`MapperError::Transport`] instead of parking the caller until the broker
//! comes back.

use std::time::Duration;

use async_trait::async_trait;
use padbot_types::MapperError;
use rumqttc::{
    AsyncClient, ClientError, ConnectionError, Event, EventLoop, MqttOptions, Outgoing, Packet,
    QoS, SubAck, SubscribeReasonCode,
};
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info, warn};

use crate::bus::{InboundMessage, MessageBus, SubscriptionSignal};
use crate::channel::TwinChannel;

/// Capacity of the request queue between [`AsyncClient`] and the event loop.
const REQUEST_QUEUE_CAPACITY: usize = 32;

/// Pause between reconnection attempts after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on flushing queued packets after `DISCONNECT` is requested.
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// Broker connection parameters.
#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive: Duration,
    /// How long [`MqttTwinChannel::connect`] waits for the broker's
    /// `CONNACK` before giving up.
    pub connect_timeout: Duration,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 1883,
            client_id: "padbot-mapper".to_string(),
            keep_alive: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// [`TwinChannel`] backed by a `rumqttc` client.
pub struct MqttTwinChannel {
    client: AsyncClient,
    bus: MessageBus,
    request_lock: Mutex<()>,
    event_loop: JoinHandle<()>,
}

impl MqttTwinChannel {
    /// Connect to the broker and start the background event loop.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Transport`] if the broker refuses the
    /// connection, is unreachable, or does not answer within
    /// [`MqttSettings::connect_timeout`].
    pub async fn connect(settings: MqttSettings) -> Result<Self, MapperError> {
        let mut options =
            MqttOptions::new(settings.client_id.clone(), settings.host.clone(), settings.port);
        options.set_keep_alive(settings.keep_alive);
        options.set_clean_session(true);

        let (client, mut eventloop) = AsyncClient::new(options, REQUEST_QUEUE_CAPACITY);
        timeout(settings.connect_timeout, await_connack(&mut eventloop))
            .await
            .map_err(|_| {
                MapperError::Transport(format!(
                    "no CONNACK from {}:{} within {:?}",
                    settings.host, settings.port, settings.connect_timeout
                ))
            })??;
        info!(host = %settings.host, port = settings.port, "connected to MQTT broker");

        let bus = MessageBus::default();
        let event_loop = tokio::spawn(drive_event_loop(eventloop, bus.clone()));
        Ok(Self {
            client,
            bus,
            request_lock: Mutex::new(()),
            event_loop,
        })
    }

    /// Send `DISCONNECT` to the broker once everything queued before it
    /// has gone out, and wait (bounded) for the event loop to finish.
    pub async fn disconnect(&self) -> Result<(), MapperError> {
        self.client.try_disconnect().map_err(client_error)?;
        let deadline = Instant::now() + DISCONNECT_GRACE;
        while !self.event_loop.is_finished() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        Ok(())
    }

    /// Arm the reply listener, publish the request, and wait for the reply.
    async fn exchange(
        &self,
        request_topic: &str,
        reply_topic: &str,
        payload: Vec<u8>,
        deadline: Instant,
        timed_out: impl Fn() -> MapperError,
    ) -> Result<Vec<u8>, MapperError> {
        let mut replies = self.bus.subscribe_topic(reply_topic);
        let mut signals = self.bus.subscribe_signals();

        self.client
            .try_subscribe(reply_topic, QoS::AtMostOnce)
            .map_err(client_error)?;
        timeout_at(deadline, wait_armed(&mut signals))
            .await
            .map_err(|_| timed_out())??;
        debug!(topic = reply_topic, "reply listener armed");

        self.publish(request_topic, payload).await?;

        match timeout_at(deadline, replies.recv()).await {
            Ok(Some(message)) => Ok(message.payload),
            Ok(None) => Err(MapperError::Transport("MQTT event loop stopped".to_string())),
            Err(_) => Err(timed_out()),
        }
    }
}

impl Drop for MqttTwinChannel {
    fn drop(&mut self) {
        self.event_loop.abort();
    }
}

#[async_trait]
impl TwinChannel for MqttTwinChannel {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), MapperError> {
        self.client
            .try_publish(topic, QoS::AtMostOnce, false, payload)
            .map_err(client_error)
    }

    async fn request_reply(
        &self,
        request_topic: &str,
        reply_topic: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, MapperError> {
        let _serialized = self.request_lock.lock().await;
        let deadline = Instant::now() + timeout;
        let timed_out = || MapperError::ReplyTimeout {
            topic: reply_topic.to_string(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        };

        let outcome = self
            .exchange(request_topic, reply_topic, payload, deadline, timed_out)
            .await;

        // The in-process receivers are gone with `exchange`; release the
        // broker side too.
        if let Err(e) = self.client.try_unsubscribe(reply_topic) {
            debug!(topic = reply_topic, error = %e, "unsubscribe from reply topic failed");
        }
        outcome
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Event loop
// ─────────────────────────────────────────────────────────────────────────────

async fn await_connack(eventloop: &mut EventLoop) -> Result<(), MapperError> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
            Ok(_) => {}
            Err(e) => return Err(MapperError::Transport(format!("MQTT connect failed: {e}"))),
        }
    }
}

/// Poll the connection forever, fanning traffic out onto `bus`.
///
/// `rumqttc` reconnects on the next poll after an error, so errors are
/// logged and followed by a short pause.  The loop ends after `DISCONNECT`
/// is sent or once every [`AsyncClient`] handle has been dropped.
async fn drive_event_loop(mut eventloop: EventLoop, bus: MessageBus) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                bus.dispatch(InboundMessage {
                    topic: publish.topic,
                    payload: publish.payload.to_vec(),
                });
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                bus.signal(SubscriptionSignal::Acked {
                    pkid: ack.pkid,
                    granted: suback_granted(&ack),
                });
            }
            Ok(Event::Outgoing(Outgoing::Subscribe(pkid))) => {
                bus.signal(SubscriptionSignal::Sent { pkid });
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                info!("disconnected from MQTT broker");
                break;
            }
            Ok(Event::Incoming(Packet::ConnAck(_))) => info!("reconnected to MQTT broker"),
            Ok(_) => {}
            Err(ConnectionError::RequestsDone) => {
                debug!("MQTT client handles dropped; event loop exiting");
                break;
            }
            Err(e) => {
                warn!(error = %e, "MQTT connection error; reconnecting");
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

/// `true` when the broker granted every filter of the subscription.
fn suback_granted(ack: &SubAck) -> bool {
    !ack.return_codes.is_empty()
        && ack
            .return_codes
            .iter()
            .all(|code| matches!(code, SubscribeReasonCode::Success(_)))
}

/// Wait until the next `SUBSCRIBE` to leave the client has been acknowledged.
///
/// Acknowledgements for other packet ids (for example a late `SUBACK` of a
/// request that already gave up) are ignored.
async fn wait_armed(
    signals: &mut broadcast::Receiver<SubscriptionSignal>,
) -> Result<(), MapperError> {
    let mut pending: Option<u16> = None;
    loop {
        match signals.recv().await {
            Ok(SubscriptionSignal::Sent { pkid }) if pending.is_none() => pending = Some(pkid),
            Ok(SubscriptionSignal::Acked { pkid, granted }) if pending == Some(pkid) => {
                return if granted {
                    Ok(())
                } else {
                    Err(MapperError::Transport(format!(
                        "broker refused subscription (pkid {pkid})"
                    )))
                };
            }
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(lagged_by = n, "subscription signals lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => {
                return Err(MapperError::Transport("MQTT event loop stopped".to_string()));
            }
        }
    }
}

fn client_error(e: ClientError) -> MapperError {
    MapperError::Transport(format!("MQTT client error: {e}"))
}
