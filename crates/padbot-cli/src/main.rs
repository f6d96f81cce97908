//! `padbot-mapper` – KubeEdge device-twin mapper for a PadBot robot.
//!
//! Startup sequence:
//!
//! 1. Install the `tracing` subscriber (see `padbot_runtime::telemetry`).
//! 2. Load `config.toml`, apply environment overrides, validate.
//! 3. Resolve the robot's broker identity from `deviceProfile.json`.
//! 4. Connect to the MQTT broker and announce the device as `online`.
//! 5. Reconcile on a fixed interval until **Ctrl-C**, then announce
//!    `offline` and disconnect.
//!
//! Any startup failure is logged and the process exits non-zero.

mod config;
mod registry;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use padbot_hal::HttpDeviceClient;
use padbot_middleware::MqttTwinChannel;
use padbot_runtime::{Driver, Reconciler, telemetry};
use padbot_types::{DeviceIdentity, DeviceState, MapperError};
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let _telemetry = telemetry::init_tracing("padbot-mapper");

    let (cfg, config_path) = match config::load() {
        Ok(loaded) => loaded,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    info!(path = %config_path.display(), broker = %cfg.mqtt_host, "configuration loaded");

    let identity =
        match registry::resolve_identity(Path::new(&cfg.config_map_path), &cfg.device_name) {
            Ok(identity) => identity,
            Err(e) => {
                error!(error = %e, registry = %cfg.config_map_path, "cannot resolve device");
                return ExitCode::FAILURE;
            }
        };

    // ── Shutdown flag ─────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        info!("shutdown requested");
        shutdown_flag.store(true, Ordering::Release);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler; the mapper can only be killed");
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cfg, identity, shutdown)) {
        Ok(()) => {
            info!("padbot-mapper stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "padbot-mapper failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(
    cfg: config::Config,
    identity: DeviceIdentity,
    shutdown: Arc<AtomicBool>,
) -> Result<(), MapperError> {
    let channel = Arc::new(MqttTwinChannel::connect(cfg.mqtt_settings()).await?);
    let device = Arc::new(HttpDeviceClient::new(cfg.device_endpoints())?);

    let reconciler = Reconciler::new(
        identity,
        channel.clone(),
        device,
        cfg.reconciler_config(),
    );
    reconciler.report_device_state(DeviceState::Online).await?;

    let mut driver = Driver::new(reconciler, cfg.poll_interval());
    driver.run_until(shutdown).await;

    if let Err(e) = driver.reconciler().report_device_state(DeviceState::Offline).await {
        warn!(error = %e, "failed to report offline state");
    }
    if let Err(e) = channel.disconnect().await {
        warn!(error = %e, "broker disconnect failed");
    }
    Ok(())
}
