//! Mapper configuration – reads `~/.padbot-mapper/config.toml`.
//!
//! The file is optional: every field has a default except the three that
//! name the robot, and those can come from the environment instead.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use padbot_hal::DeviceEndpoints;
use padbot_middleware::MqttSettings;
use padbot_runtime::ReconcilerConfig;
use serde::{Deserialize, Serialize};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_VAR: &str = "PADBOT_MAPPER_CONFIG";

/// Mapper settings as stored in `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_client_id: String,
    pub mqtt_keep_alive_secs: u64,

    /// Path of the KubeEdge device registry (`deviceProfile.json`).
    pub config_map_path: String,
    /// Name of this robot's instance in the registry.
    pub device_name: String,

    pub status_url: String,
    pub navigation_url: String,

    pub poll_interval_ms: u64,
    pub reply_timeout_ms: u64,
    pub status_timeout_ms: u64,

    /// Consecutive failed cycles before the mapper logs at `error`.
    pub failure_alert_threshold: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt_host: "127.0.0.1".to_string(),
            mqtt_port: 1883,
            mqtt_client_id: "padbot-mapper".to_string(),
            mqtt_keep_alive_secs: 60,
            config_map_path: "/opt/kubeedge/deviceProfile.json".to_string(),
            device_name: String::new(),
            status_url: String::new(),
            navigation_url: String::new(),
            poll_interval_ms: 1000,
            reply_timeout_ms: 5000,
            status_timeout_ms: 3000,
            failure_alert_threshold: 10,
        }
    }
}

impl Config {
    /// Reject settings the mapper cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        let required = [
            ("device_name", &self.device_name),
            ("status_url", &self.status_url),
            ("navigation_url", &self.navigation_url),
            ("mqtt_host", &self.mqtt_host),
            ("config_map_path", &self.config_map_path),
        ];
        if let Some((field, _)) = required.into_iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(format!("config field `{field}` must not be empty"));
        }
        let intervals = [
            ("poll_interval_ms", self.poll_interval_ms),
            ("reply_timeout_ms", self.reply_timeout_ms),
            ("status_timeout_ms", self.status_timeout_ms),
            // rumqttc rejects keep-alives under one second.
            ("mqtt_keep_alive_secs", self.mqtt_keep_alive_secs),
        ];
        if let Some((field, _)) = intervals.into_iter().find(|(_, v)| *v == 0) {
            return Err(format!("config field `{field}` must be greater than zero"));
        }
        Ok(())
    }

    pub fn mqtt_settings(&self) -> MqttSettings {
        MqttSettings {
            host: self.mqtt_host.clone(),
            port: self.mqtt_port,
            client_id: self.mqtt_client_id.clone(),
            keep_alive: Duration::from_secs(self.mqtt_keep_alive_secs),
            ..MqttSettings::default()
        }
    }

    pub fn device_endpoints(&self) -> DeviceEndpoints {
        DeviceEndpoints {
            status_url: self.status_url.clone(),
            navigation_url: self.navigation_url.clone(),
            status_timeout: Duration::from_millis(self.status_timeout_ms),
            navigation_timeout: None,
        }
    }

    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            reply_timeout: Duration::from_millis(self.reply_timeout_ms),
            failure_alert_threshold: self.failure_alert_threshold,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// `$PADBOT_MAPPER_CONFIG` if set, otherwise `~/.padbot-mapper/config.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(explicit) = std::env::var(CONFIG_PATH_VAR) {
        return PathBuf::from(explicit);
    }
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".padbot-mapper").join("config.toml")
}

/// Load, override from the environment, and validate.
///
/// A missing config file is not an error; the defaults are used.
pub fn load() -> Result<(Config, PathBuf), String> {
    let path = config_path();
    let mut cfg = load_from(&path)?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok((cfg, path))
}

/// Read the config at `path`.  Returns `None` if the file does not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config at {}: {}", path.display(), e))?;
    Ok(Some(cfg))
}

/// Apply environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `MQTT_HOST` | `mqtt_host` |
/// | `MQTT_PORT` | `mqtt_port` |
/// | `CONFIG_MAP_PATH` | `config_map_path` |
/// | `DEVICE_NAME` | `device_name` |
/// | `PADBOT_STATUS_URL` | `status_url` |
/// | `PADBOT_NAVIGATION_URL` | `navigation_url` |
/// | `PADBOT_POLL_INTERVAL_MS` | `poll_interval_ms` |
/// | `PADBOT_REPLY_TIMEOUT_MS` | `reply_timeout_ms` |
///
/// Numeric values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

/// Same as [`apply_env_overrides`] with an arbitrary variable source.
pub(crate) fn apply_overrides(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("MQTT_HOST") {
        cfg.mqtt_host = v;
    }
    if let Some(port) = lookup("MQTT_PORT").and_then(|v| v.trim().parse::<u16>().ok()) {
        cfg.mqtt_port = port;
    }
    if let Some(v) = lookup("CONFIG_MAP_PATH") {
        cfg.config_map_path = v;
    }
    if let Some(v) = lookup("DEVICE_NAME") {
        cfg.device_name = v;
    }
    if let Some(v) = lookup("PADBOT_STATUS_URL") {
        cfg.status_url = v;
    }
    if let Some(v) = lookup("PADBOT_NAVIGATION_URL") {
        cfg.navigation_url = v;
    }
    if let Some(ms) = lookup("PADBOT_POLL_INTERVAL_MS").and_then(|v| v.trim().parse::<u64>().ok()) {
        cfg.poll_interval_ms = ms;
    }
    if let Some(ms) = lookup("PADBOT_REPLY_TIMEOUT_MS").and_then(|v| v.trim().parse::<u64>().ok()) {
        cfg.reply_timeout_ms = ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overrides_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn complete() -> Config {
        Config {
            device_name: "padbot-01".to_string(),
            status_url: "http://10.0.0.5/status".to_string(),
            navigation_url: "http://10.0.0.5/navigation".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.mqtt_host, "127.0.0.1");
        assert_eq!(cfg.mqtt_port, 1883);
        assert_eq!(cfg.config_map_path, "/opt/kubeedge/deviceProfile.json");
        assert_eq!(cfg.poll_interval_ms, 1000);
        assert_eq!(cfg.reply_timeout_ms, 5000);
        assert_eq!(cfg.failure_alert_threshold, 10);
    }

    #[test]
    fn config_path_points_to_mapper_dir() {
        let p = config_path_for_home("/home/robot");
        assert_eq!(p, PathBuf::from("/home/robot/.padbot-mapper/config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn load_from_fills_unset_fields_with_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
device_name = "padbot-01"
status_url = "http://10.0.0.5/status"
navigation_url = "http://10.0.0.5/navigation"
mqtt_host = "broker.local"
poll_interval_ms = 250
"#,
        )?;

        let cfg = load_from(&path)?.expect("config present");
        assert_eq!(cfg.device_name, "padbot-01");
        assert_eq!(cfg.mqtt_host, "broker.local");
        assert_eq!(cfg.poll_interval_ms, 250);
        assert_eq!(cfg.mqtt_port, 1883);
        assert_eq!(cfg.reply_timeout_ms, 5000);
        assert!(cfg.validate().is_ok());
        Ok(())
    }

    #[test]
    fn load_from_rejects_malformed_toml() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "mqtt_port = \"not a number\"")?;

        let err = load_from(&path).unwrap_err();
        assert!(err.contains("Failed to parse config"), "got: {err}");
        Ok(())
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut cfg = complete();
        apply_overrides(
            &mut cfg,
            overrides_from(&[
                ("MQTT_HOST", "10.1.1.1"),
                ("MQTT_PORT", "8883"),
                ("DEVICE_NAME", "padbot-02"),
                ("CONFIG_MAP_PATH", "/tmp/profile.json"),
                ("PADBOT_POLL_INTERVAL_MS", "500"),
                ("PADBOT_REPLY_TIMEOUT_MS", "2000"),
            ]),
        );
        assert_eq!(cfg.mqtt_host, "10.1.1.1");
        assert_eq!(cfg.mqtt_port, 8883);
        assert_eq!(cfg.device_name, "padbot-02");
        assert_eq!(cfg.config_map_path, "/tmp/profile.json");
        assert_eq!(cfg.poll_interval_ms, 500);
        assert_eq!(cfg.reply_timeout_ms, 2000);
    }

    #[test]
    fn overrides_ignore_invalid_numbers() {
        let mut cfg = complete();
        apply_overrides(
            &mut cfg,
            overrides_from(&[("MQTT_PORT", "not-a-port"), ("PADBOT_POLL_INTERVAL_MS", "-1")]),
        );
        assert_eq!(cfg.mqtt_port, 1883);
        assert_eq!(cfg.poll_interval_ms, 1000);
    }

    #[test]
    fn apply_env_overrides_reads_process_environment() {
        // SAFETY: single-threaded test; no other test touches PADBOT_STATUS_URL.
        unsafe { std::env::set_var("PADBOT_STATUS_URL", "http://robot-host/status") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.status_url, "http://robot-host/status");
        unsafe { std::env::remove_var("PADBOT_STATUS_URL") };
    }

    #[test]
    fn validate_requires_device_fields() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.contains("device_name"), "got: {err}");

        let mut cfg = complete();
        cfg.navigation_url = "  ".to_string();
        assert!(cfg.validate().unwrap_err().contains("navigation_url"));
    }

    #[test]
    fn validate_rejects_zero_intervals() {
        let mut cfg = complete();
        cfg.poll_interval_ms = 0;
        assert!(cfg.validate().unwrap_err().contains("poll_interval_ms"));

        let mut cfg = complete();
        cfg.mqtt_keep_alive_secs = 0;
        assert!(cfg.validate().unwrap_err().contains("mqtt_keep_alive_secs"));
    }

    #[test]
    fn derived_settings_carry_configured_values() {
        let mut cfg = complete();
        cfg.reply_timeout_ms = 1500;
        cfg.status_timeout_ms = 700;

        let mqtt = cfg.mqtt_settings();
        assert_eq!(mqtt.host, "127.0.0.1");
        assert_eq!(mqtt.keep_alive, Duration::from_secs(60));

        let endpoints = cfg.device_endpoints();
        assert_eq!(endpoints.status_timeout, Duration::from_millis(700));
        assert!(endpoints.navigation_timeout.is_none());

        assert_eq!(cfg.reconciler_config().reply_timeout, Duration::from_millis(1500));
        assert_eq!(cfg.poll_interval(), Duration::from_secs(1));
    }
}
