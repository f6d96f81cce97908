//! Per-device broker topics.

use crate::registry::DeviceIdentity;

/// Prefix shared by every device event topic on the edge broker.
pub const DEVICE_EVENT_PREFIX: &str = "$hw/events/device/";

const STATE_UPDATE_SUFFIX: &str = "/state/update";
const TWIN_GET_SUFFIX: &str = "/twin/get";
const TWIN_GET_RESULT_SUFFIX: &str = "/twin/get/result";
const TWIN_UPDATE_SUFFIX: &str = "/twin/update";

/// The four topics addressed by one device identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub state_update: String,
    pub twin_get: String,
    pub twin_get_result: String,
    pub twin_update: String,
}

impl Topics {
    pub fn for_device(identity: &DeviceIdentity) -> Self {
        let topic = |suffix: &str| format!("{DEVICE_EVENT_PREFIX}{identity}{suffix}");
        Self {
            state_update: topic(STATE_UPDATE_SUFFIX),
            twin_get: topic(TWIN_GET_SUFFIX),
            twin_get_result: topic(TWIN_GET_RESULT_SUFFIX),
            twin_update: topic(TWIN_UPDATE_SUFFIX),
        }
    }
}
