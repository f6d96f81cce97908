//! `padbot-runtime` – the twin reconciliation engine.
//!
//! Pulls the cloud's desired robot location, compares it with what the robot
//! reports, sends the robot on its way when they disagree, and pushes the
//! robot's observed status back into the twin.
//!
//! # Modules
//!
//! - [`reconciler`] – [`Reconciler`]: one request / decide / act / report
//!   cycle over a [`TwinChannel`][padbot_middleware::TwinChannel] and a
//!   [`DeviceClient`][padbot_hal::DeviceClient].
//! - [`navigation`] – the pure four-fact navigation rule.
//! - [`failure_guard`] – [`FailureGuard`]: counts consecutive failed cycles
//!   so a persistent outage escalates from `warn` to `error`.
//! - [`driver`] – [`Driver`]: runs cycles on a fixed interval until asked to
//!   stop.
//! - [`telemetry`] – [`init_tracing`]: installs the `tracing` subscriber
//!   with an optional OTLP span exporter.

pub mod driver;
pub mod failure_guard;
pub mod navigation;
pub mod reconciler;
pub mod telemetry;

pub use driver::Driver;
pub use failure_guard::FailureGuard;
pub use navigation::{HoldReason, NavigationDecision, NavigationFacts};
pub use reconciler::{CycleReport, Reconciler, ReconcilerConfig};
pub use telemetry::{LogFormat, TracerProviderGuard, init_tracing};
