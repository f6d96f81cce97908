//! Generic `DeviceClient` trait for the robot being mirrored.
//!
//! Drivers implement this trait and are handed to the reconciler as an
//! `Arc<dyn DeviceClient>`.  The reconciler never knows whether the robot is
//! reached over HTTP, a serial link or a test double.

use async_trait::async_trait;
use padbot_types::{DeviceStatus, MapperError};

/// The robot, as seen by the mapper.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Read the robot's current status.
    ///
    /// Fields the robot does not report come back as `UNKNOWN`; only a
    /// failed request or an unreadable body is an error.
    ///
    /// # Errors
    ///
    /// * [`MapperError::DeviceUnreachable`] – the request never completed.
    /// * [`MapperError::DeviceStatus`] – the robot answered with a
    ///   non-success status code.
    /// * [`MapperError::Codec`] – the body was not a JSON object.
    async fn get_status(&self) -> Result<DeviceStatus, MapperError>;

    /// Send the robot to `target_location`.
    ///
    /// May not return until the motion completes; callers that cannot wait
    /// must run it on a task of its own.
    async fn navigate(&self, target_location: &str) -> Result<(), MapperError>;
}
