//! [`Driver`] – fixed-interval cycle scheduler.
//!
//! Ticks once per interval, runs one [`Reconciler::run_cycle`] per tick and
//! carries the last reported status from one cycle to the next.  Cycles
//! never overlap; a cycle that overruns its slot delays the next tick
//! instead of triggering a burst of catch-up cycles.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use padbot_types::DeviceStatus;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::reconciler::Reconciler;

pub struct Driver {
    reconciler: Reconciler,
    interval: Duration,
    last_status: Option<DeviceStatus>,
}

impl Driver {
    pub fn new(reconciler: Reconciler, interval: Duration) -> Self {
        Self {
            reconciler,
            interval,
            last_status: None,
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// The status published by the most recent successful cycle.
    pub fn last_status(&self) -> Option<&DeviceStatus> {
        self.last_status.as_ref()
    }

    /// Run cycles until `shutdown` is set; returns the number of cycles run.
    ///
    /// The flag is checked before each cycle, so a cycle in progress always
    /// completes.
    pub async fn run_until(&mut self, shutdown: Arc<AtomicBool>) -> u64 {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            device = %self.reconciler.identity(),
            interval_ms = self.interval.as_millis() as u64,
            "reconciliation started"
        );
        let mut cycles = 0u64;
        loop {
            ticker.tick().await;
            if shutdown.load(Ordering::Acquire) {
                break;
            }
            let last = self.last_status.take();
            self.last_status = self.reconciler.run_cycle(last).await;
            cycles += 1;
        }
        info!(cycles, "reconciliation stopped");
        cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::ReconcilerConfig;
    use async_trait::async_trait;
    use padbot_hal::DeviceClient;
    use padbot_middleware::TwinChannel;
    use padbot_types::{DeviceIdentity, MapperError};
    use std::sync::atomic::AtomicUsize;

    /// Times out every request; trips `shutdown` after `stop_after` requests.
    struct SilentBroker {
        requests: AtomicUsize,
        stop_after: usize,
        shutdown: Arc<AtomicBool>,
    }

    #[async_trait]
    impl TwinChannel for SilentBroker {
        async fn publish(&self, _topic: &str, _payload: Vec<u8>) -> Result<(), MapperError> {
            Ok(())
        }

        async fn request_reply(
            &self,
            _request_topic: &str,
            reply_topic: &str,
            _payload: Vec<u8>,
            timeout: Duration,
        ) -> Result<Vec<u8>, MapperError> {
            let seen = self.requests.fetch_add(1, Ordering::AcqRel) + 1;
            if seen >= self.stop_after {
                self.shutdown.store(true, Ordering::Release);
            }
            Err(MapperError::ReplyTimeout {
                topic: reply_topic.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }

    struct IdleRobot;

    #[async_trait]
    impl DeviceClient for IdleRobot {
        async fn get_status(&self) -> Result<DeviceStatus, MapperError> {
            DeviceStatus::from_json(&serde_json::json!({ "robotLocation": "Lobby" }))
        }

        async fn navigate(&self, _target_location: &str) -> Result<(), MapperError> {
            Ok(())
        }
    }

    fn driver_with(broker: Arc<SilentBroker>, interval: Duration) -> Driver {
        let reconciler = Reconciler::new(
            DeviceIdentity::new("padbot-01"),
            broker,
            Arc::new(IdleRobot),
            ReconcilerConfig::default(),
        );
        Driver::new(reconciler, interval)
    }

    #[tokio::test]
    async fn keeps_cycling_through_timeouts_until_shutdown() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let broker = Arc::new(SilentBroker {
            requests: AtomicUsize::new(0),
            stop_after: 3,
            shutdown: Arc::clone(&shutdown),
        });
        let mut driver = driver_with(broker.clone(), Duration::from_millis(10));

        let cycles = driver.run_until(shutdown).await;

        assert_eq!(cycles, 3);
        assert_eq!(broker.requests.load(Ordering::Acquire), 3);
        assert_eq!(driver.reconciler().failure_streak(), 3);
        assert!(driver.last_status().is_none());
    }

    #[tokio::test]
    async fn preset_shutdown_runs_no_cycles() {
        let shutdown = Arc::new(AtomicBool::new(true));
        let broker = Arc::new(SilentBroker {
            requests: AtomicUsize::new(0),
            stop_after: usize::MAX,
            shutdown: Arc::clone(&shutdown),
        });
        let mut driver = driver_with(broker.clone(), Duration::from_millis(10));

        assert_eq!(driver.run_until(shutdown).await, 0);
        assert_eq!(broker.requests.load(Ordering::Acquire), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cycles_follow_the_interval() {
        let shutdown = Arc::new(AtomicBool::new(false));
        let broker = Arc::new(SilentBroker {
            requests: AtomicUsize::new(0),
            stop_after: 4,
            shutdown: Arc::clone(&shutdown),
        });
        let mut driver = driver_with(broker, Duration::from_secs(1));

        let started = tokio::time::Instant::now();
        driver.run_until(shutdown).await;
        // First tick fires immediately, then one per second; the shutdown
        // check happens on the tick after the fourth cycle.
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }
}
