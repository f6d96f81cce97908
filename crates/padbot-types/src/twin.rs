//! KubeEdge device-twin messages.
//!
//! The same envelope is used for the get request, the get result and the
//! update delta:
//!
//! ```json
//! {
//!   "event_id": "…",
//!   "timestamp": 1718000000000,
//!   "twin": {
//!     "robotLocation": {
//!       "expected": { "value": "DockA", "metadata": { "timestamp": 1718000000000 } },
//!       "actual":   { "value": "Lobby", "metadata": { "timestamp": 1718000000000 } },
//!       "metadata": { "type": "Updated" }
//!     }
//!   }
//! }
//! ```
//!
//! Absent keys are omitted on the wire, never written as `null`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::MapperError;
use crate::status::DeviceStatus;
use crate::value::PropertyValue;

/// Type marker attached to every property the mapper reports.
pub const TYPE_UPDATED: &str = "Updated";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeMetadata {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// One side (expected or actual) of a twin property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TwinValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<PropertyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ValueMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TwinVersion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<i64>,
}

/// A single twin property as carried in a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MsgTwin {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<TwinValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<TwinValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TypeMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<TwinVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_version: Option<TwinVersion>,
}

impl MsgTwin {
    /// A property carrying only a freshly observed *actual* value.
    pub fn reported(value: PropertyValue, timestamp_ms: i64) -> Self {
        Self {
            actual: Some(TwinValue {
                value: Some(value.into_reported()),
                metadata: Some(ValueMetadata {
                    timestamp: Some(timestamp_ms),
                }),
            }),
            metadata: Some(TypeMetadata {
                kind: Some(TYPE_UPDATED.to_string()),
            }),
            ..Self::default()
        }
    }
}

/// Twin message envelope used for get requests, get results and updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceTwinUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twin: Option<BTreeMap<String, MsgTwin>>,
}

impl DeviceTwinUpdate {
    /// Body of a twin get request: a bare envelope with no properties.
    pub fn get_request(now: DateTime<Utc>) -> Self {
        Self {
            event_id: Some(Uuid::new_v4().to_string()),
            timestamp: Some(now.timestamp_millis()),
            twin: None,
        }
    }

    /// Partial update reporting *actual* values for exactly the given
    /// properties.
    pub fn actual_report<'a>(
        properties: impl IntoIterator<Item = (&'static str, &'a PropertyValue)>,
        now: DateTime<Utc>,
    ) -> Self {
        let ts = now.timestamp_millis();
        let twin = properties
            .into_iter()
            .map(|(name, value)| (name.to_string(), MsgTwin::reported(value.clone(), ts)))
            .collect();
        Self {
            event_id: Some(Uuid::new_v4().to_string()),
            timestamp: Some(ts),
            twin: Some(twin),
        }
    }

    /// Partial update covering all five properties of `status`.
    pub fn from_status(status: &DeviceStatus, now: DateTime<Utc>) -> Self {
        Self::actual_report(status.properties(), now)
    }

    /// The cloud's *expected* value for `property`, if it has one.
    pub fn expected_value(&self, property: &str) -> Option<&PropertyValue> {
        self.twin
            .as_ref()?
            .get(property)?
            .expected
            .as_ref()?
            .value
            .as_ref()
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, MapperError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, MapperError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Connection state announced on the device-state-update topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Online,
    Offline,
}

impl DeviceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceState::Online => "online",
            DeviceState::Offline => "offline",
        }
    }
}

/// `{ "state": "online" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStateUpdate {
    pub state: String,
}

impl DeviceStateUpdate {
    pub fn new(state: DeviceState) -> Self {
        Self {
            state: state.as_str().to_string(),
        }
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, MapperError> {
        Ok(serde_json::to_vec(self)?)
    }
}
