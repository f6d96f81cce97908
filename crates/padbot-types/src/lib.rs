//! `padbot-types` – shared vocabulary of the PadBot twin mapper.
//!
//! Everything in this crate is pure data: the loosely-typed twin property
//! values, the device status snapshot, the KubeEdge twin message envelope,
//! the device registry model, and the broker topic names derived from a
//! device identity.  No I/O happens here.
//!
//! # Modules
//!
//! - [`value`] – [`PropertyValue`], the type-erased scalar stored in a twin
//!   property, and the [`StatusToken`] sentinels.
//! - [`status`] – [`DeviceStatus`], the five-property snapshot read from the
//!   robot's HTTP API.
//! - [`twin`] – twin get/update messages and the device state message.
//! - [`registry`] – `deviceProfile.json` model and [`DeviceIdentity`]
//!   resolution.
//! - [`topics`] – [`Topics`], the four per-device broker topics.

pub mod registry;
pub mod status;
pub mod topics;
pub mod twin;
pub mod value;

pub use registry::{DeviceIdentity, DeviceInstance, DeviceModel, DeviceProfiles, ModelProperty};
pub use status::{DeviceStatus, PROPERTY_NAMES};
pub use topics::Topics;
pub use twin::{DeviceState, DeviceStateUpdate, DeviceTwinUpdate, MsgTwin, TwinValue, TwinVersion};
pub use value::{PropertyValue, StatusToken};

use thiserror::Error;

/// Global error type spanning broker transport faults, device fetch faults,
/// reply timeouts, codec failures and startup configuration faults.
#[derive(Error, Debug)]
pub enum MapperError {
    /// The broker could not be reached or refused an operation.
    #[error("Broker Transport Error: {0}")]
    Transport(String),

    /// No reply arrived on `topic` before the deadline.
    #[error("Twin reply timed out after {timeout_ms} ms on {topic}")]
    ReplyTimeout { topic: String, timeout_ms: u64 },

    /// The device answered with a non-success HTTP status.
    #[error("Device returned HTTP {status} from {url}")]
    DeviceStatus { url: String, status: u16 },

    /// The device could not be reached at all.
    #[error("Device unreachable at {url}: {details}")]
    DeviceUnreachable { url: String, details: String },

    /// A message or response body could not be encoded or decoded.
    #[error("Codec Error: {0}")]
    Codec(String),

    /// No device instance in the registry carries the configured name.
    #[error("Device '{0}' not found in device registry")]
    DeviceNotFound(String),

    /// The device registry could not be read or parsed.
    #[error("Device Registry Error: {0}")]
    Registry(String),

    /// A reconciliation cycle panicked; the panic was contained.
    #[error("Cycle panicked: {0}")]
    CyclePanicked(String),
}

impl From<serde_json::Error> for MapperError {
    fn from(e: serde_json::Error) -> Self {
        MapperError::Codec(e.to_string())
    }
}
