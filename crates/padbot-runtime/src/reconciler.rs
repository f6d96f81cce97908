//! [`Reconciler`] – one twin reconciliation cycle.
//!
//! Each cycle:
//!
//! 1. **Request** – publish a twin get request and wait (bounded) for the
//!    result on the reply topic.
//! 2. **Extract** – read `robotLocation.expected.value`; absence means the
//!    cloud has no intent.
//! 3. **Observe** – fetch the robot's status over HTTP.
//! 4. **Decide** – apply [`navigation::decide`].
//! 5. **Act** – send the navigation command on a detached task.
//! 6. **Report** – fetch the status again and publish all five properties as
//!    *actual* values on the twin update topic.
//!
//! A fault at any step skips the rest of the cycle.  [`Reconciler::run_cycle`]
//! contains every error and panic, so the caller only ever sees the snapshot
//! to carry into the next cycle.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::FutureExt;
use padbot_hal::DeviceClient;
use padbot_middleware::TwinChannel;
use padbot_types::status::ROBOT_LOCATION;
use padbot_types::{
    DeviceIdentity, DeviceState, DeviceStateUpdate, DeviceStatus, DeviceTwinUpdate, MapperError,
    PropertyValue, Topics,
};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::failure_guard::FailureGuard;
use crate::navigation::{self, NavigationDecision};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Tuning knobs for [`Reconciler`].
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// How long to wait for the twin get result.
    pub reply_timeout: Duration,
    /// Consecutive failed cycles before failures are logged at `error`.
    pub failure_alert_threshold: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            reply_timeout: Duration::from_secs(5),
            failure_alert_threshold: 10,
        }
    }
}

/// What a successful cycle saw and did.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// The cloud's desired location, if it had one.
    pub expected_location: Option<PropertyValue>,
    /// The navigation rule's verdict.  A `Navigate` has already been handed
    /// to a detached task when the report is returned.
    pub navigation: NavigationDecision,
    /// The status that was published.
    pub status: DeviceStatus,
}

// ─────────────────────────────────────────────────────────────────────────────
// Reconciler
// ─────────────────────────────────────────────────────────────────────────────

/// Keeps one device twin in step with one robot.
pub struct Reconciler {
    identity: DeviceIdentity,
    topics: Topics,
    channel: Arc<dyn TwinChannel>,
    device: Arc<dyn DeviceClient>,
    reply_timeout: Duration,
    failures: FailureGuard,
}

impl Reconciler {
    pub fn new(
        identity: DeviceIdentity,
        channel: Arc<dyn TwinChannel>,
        device: Arc<dyn DeviceClient>,
        config: ReconcilerConfig,
    ) -> Self {
        let topics = Topics::for_device(&identity);
        Self {
            identity,
            topics,
            channel,
            device,
            reply_timeout: config.reply_timeout,
            failures: FailureGuard::new(config.failure_alert_threshold),
        }
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Number of cycles that have failed in a row.
    pub fn failure_streak(&self) -> usize {
        self.failures.streak()
    }

    /// Announce the mapper's connection state on the device state topic.
    pub async fn report_device_state(&self, state: DeviceState) -> Result<(), MapperError> {
        let payload = DeviceStateUpdate::new(state).to_vec()?;
        self.channel.publish(&self.topics.state_update, payload).await?;
        info!(device = %self.identity, state = state.as_str(), "device state reported");
        Ok(())
    }

    /// Run one cycle, logging instead of returning failures.
    ///
    /// Returns the freshly published status, or `last` unchanged when the
    /// cycle was skipped.
    pub async fn run_cycle(&mut self, last: Option<DeviceStatus>) -> Option<DeviceStatus> {
        let span = info_span!("cycle", device = %self.identity);
        let outcome = AssertUnwindSafe(self.try_cycle().instrument(span.clone()))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(MapperError::CyclePanicked(panic_message(payload))));

        let _entered = span.enter();
        match outcome {
            Ok(report) => {
                let outage = self.failures.record_success();
                if outage > 0 {
                    info!(failed_cycles = outage, "twin sync recovered");
                }
                match &last {
                    Some(previous) => {
                        let changed = report.status.changed_since(previous);
                        if !changed.is_empty() {
                            info!(?changed, "device status changed");
                        }
                    }
                    None => info!("first device status reported"),
                }
                Some(report.status)
            }
            Err(e) => {
                if self.failures.record_failure() {
                    error!(error = %e, streak = self.failures.streak(), "twin sync keeps failing; cycle skipped");
                } else {
                    warn!(error = %e, "cycle skipped");
                }
                last
            }
        }
    }

    /// Run one cycle and report what happened.
    ///
    /// # Errors
    ///
    /// * [`MapperError::ReplyTimeout`] / [`MapperError::Transport`] – the twin
    ///   get exchange failed; nothing was navigated or published.
    /// * [`MapperError::Codec`] – the get result could not be decoded.
    /// * [`MapperError::DeviceStatus`] / [`MapperError::DeviceUnreachable`] –
    ///   a status fetch failed; nothing was published.
    pub async fn try_cycle(&self) -> Result<CycleReport, MapperError> {
        let expected_location = self.fetch_expected_location().await?;
        let observed = self.device.get_status().await?;

        let decision = navigation::decide(expected_location.as_ref(), &observed.robot_location);
        match &decision {
            NavigationDecision::Navigate { target } => {
                // Detached: the handle is dropped and the task runs on its own.
                drop(self.dispatch_navigation(target.clone()));
            }
            NavigationDecision::Hold(reason) => {
                debug!(?reason, location = %observed.robot_location, "no navigation this cycle");
            }
        }

        let status = self.device.get_status().await?;
        self.publish_actual(&status).await?;

        Ok(CycleReport {
            expected_location,
            navigation: decision,
            status,
        })
    }

    async fn fetch_expected_location(&self) -> Result<Option<PropertyValue>, MapperError> {
        let request = DeviceTwinUpdate::get_request(Utc::now()).to_vec()?;
        let reply = self
            .channel
            .request_reply(
                &self.topics.twin_get,
                &self.topics.twin_get_result,
                request,
                self.reply_timeout,
            )
            .await?;
        let twin = DeviceTwinUpdate::from_slice(&reply)?;
        let expected = twin.expected_value(ROBOT_LOCATION).cloned();
        debug!(expected = ?expected, "twin get result received");
        Ok(expected)
    }

    fn dispatch_navigation(&self, target: String) -> JoinHandle<()> {
        let device = Arc::clone(&self.device);
        info!(target = %target, "dispatching navigation");
        let span = info_span!("navigation", target = %target);
        tokio::spawn(
            async move {
                match device.navigate(&target).await {
                    Ok(()) => debug!("navigation finished"),
                    Err(e) => warn!(error = %e, "navigation failed"),
                }
            }
            .instrument(span),
        )
    }

    async fn publish_actual(&self, status: &DeviceStatus) -> Result<(), MapperError> {
        let payload = DeviceTwinUpdate::from_status(status, Utc::now()).to_vec()?;
        self.channel.publish(&self.topics.twin_update, payload).await?;
        debug!(location = %status.robot_location, "actual state published");
        Ok(())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
