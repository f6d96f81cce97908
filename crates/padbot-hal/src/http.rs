//! [`HttpDeviceClient`] – `reqwest` driver for the PadBot HTTP API.
//!
//! * `GET <status_url>` → `{"batteryPercentage": 87, "robotLocation": "Lobby", …}`
//! * `POST <navigation_url>` with `{"targetPoint": "DockA"}`; the robot holds
//!   the request open until it arrives.

use std::time::Duration;

use async_trait::async_trait;
use padbot_types::{DeviceStatus, MapperError};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::device::DeviceClient;

/// Where and how patiently to reach the robot.
#[derive(Debug, Clone)]
pub struct DeviceEndpoints {
    pub status_url: String,
    pub navigation_url: String,
    /// Upper bound on a status request, connect included.
    pub status_timeout: Duration,
    /// Upper bound on a navigation request.  `None` waits as long as the
    /// robot keeps the request open.
    pub navigation_timeout: Option<Duration>,
}

/// HTTP client for a single robot.
///
/// Construct once and reuse across cycles; the underlying connection pools
/// are shared by every request.
pub struct HttpDeviceClient {
    endpoints: DeviceEndpoints,
    status_client: reqwest::Client,
    navigation_client: reqwest::Client,
}

impl HttpDeviceClient {
    /// # Errors
    ///
    /// Returns [`MapperError::DeviceUnreachable`] if the HTTP client cannot be
    /// built (e.g. the TLS backend fails to initialise).
    pub fn new(endpoints: DeviceEndpoints) -> Result<Self, MapperError> {
        let build_error = |e: reqwest::Error| MapperError::DeviceUnreachable {
            url: endpoints.status_url.clone(),
            details: format!("failed to build HTTP client: {e}"),
        };
        let status_client = reqwest::Client::builder()
            .timeout(endpoints.status_timeout)
            .build()
            .map_err(build_error)?;
        let mut navigation = reqwest::Client::builder();
        if let Some(limit) = endpoints.navigation_timeout {
            navigation = navigation.timeout(limit);
        }
        let navigation_client = navigation.build().map_err(build_error)?;
        Ok(Self {
            endpoints,
            status_client,
            navigation_client,
        })
    }

    pub fn endpoints(&self) -> &DeviceEndpoints {
        &self.endpoints
    }
}

#[async_trait]
impl DeviceClient for HttpDeviceClient {
    async fn get_status(&self) -> Result<DeviceStatus, MapperError> {
        let url = &self.endpoints.status_url;
        let response = self
            .status_client
            .get(url)
            .send()
            .await
            .map_err(|e| unreachable(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MapperError::DeviceStatus {
                url: url.clone(),
                status: status.as_u16(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| MapperError::Codec(format!("unreadable device status from {url}: {e}")))?;
        let snapshot = DeviceStatus::from_json(&body)?;
        debug!(
            battery = %snapshot.battery_percentage,
            action = %snapshot.action_status,
            location = %snapshot.robot_location,
            "device status fetched"
        );
        Ok(snapshot)
    }

    async fn navigate(&self, target_location: &str) -> Result<(), MapperError> {
        let url = &self.endpoints.navigation_url;
        info!(target = target_location, "sending navigation command");
        let response = self
            .navigation_client
            .post(url)
            .json(&json!({ "targetPoint": target_location }))
            .send()
            .await
            .map_err(|e| unreachable(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MapperError::DeviceStatus {
                url: url.clone(),
                status: status.as_u16(),
            });
        }
        info!(target = target_location, "navigation command completed");
        Ok(())
    }
}

fn unreachable(url: &str, e: reqwest::Error) -> MapperError {
    MapperError::DeviceUnreachable {
        url: url.to_string(),
        details: e.to_string(),
    }
}
