//! `padbot-hal` – the device side of the mapper.
//!
//! The robot exposes a small HTTP API: a status endpoint returning a flat
//! JSON object and a navigation endpoint accepting a target point.  The rest
//! of the mapper only ever talks to the [`DeviceClient`] trait, so the HTTP
//! driver can be swapped for a fake in tests.
//!
//! # Modules
//!
//! - [`device`] – the [`DeviceClient`] trait.
//! - [`http`] – [`HttpDeviceClient`], the `reqwest`-backed driver.

pub mod device;
pub mod http;

pub use device::DeviceClient;
pub use http::{DeviceEndpoints, HttpDeviceClient};
