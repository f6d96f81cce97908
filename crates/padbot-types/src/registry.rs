//! Device registry model (`deviceProfile.json`) and [`DeviceIdentity`].
//!
//! KubeEdge mounts the registry into the mapper's pod as a config map.  The
//! mapper only needs it once: to turn the configured device *name* into the
//! opaque device *id* that addresses every broker topic.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::MapperError;
use crate::status::PROPERTY_NAMES;

/// A property declared by a device model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelProperty {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub access_mode: Option<String>,
    #[serde(default)]
    pub default_value: Option<serde_json::Value>,
    #[serde(default)]
    pub minimum: Option<i64>,
    #[serde(default)]
    pub maximum: Option<i64>,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceModel {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: Vec<ModelProperty>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInstance {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Root of `deviceProfile.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfiles {
    #[serde(default)]
    pub device_models: Vec<DeviceModel>,
    #[serde(default)]
    pub device_instances: Vec<DeviceInstance>,
}

impl DeviceProfiles {
    /// Parse the registry document.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Registry`] when the document is not valid JSON
    /// or does not match the registry shape.
    pub fn from_json_str(raw: &str) -> Result<Self, MapperError> {
        serde_json::from_str(raw)
            .map_err(|e| MapperError::Registry(format!("failed to parse device profiles: {e}")))
    }

    /// The first instance whose `name` equals `device_name`.
    pub fn instance_named(&self, device_name: &str) -> Option<&DeviceInstance> {
        self.device_instances
            .iter()
            .find(|d| d.name.as_deref() == Some(device_name))
    }

    /// The model an instance refers to, if declared.
    pub fn model_of(&self, instance: &DeviceInstance) -> Option<&DeviceModel> {
        let model = instance.model.as_deref()?;
        self.device_models
            .iter()
            .find(|m| m.name.as_deref() == Some(model))
    }

    /// Resolve `device_name` into the identity used on the broker.
    ///
    /// # Errors
    ///
    /// * [`MapperError::DeviceNotFound`] – no instance carries that name.
    /// * [`MapperError::Registry`] – the instance exists but has no id.
    pub fn resolve(&self, device_name: &str) -> Result<DeviceIdentity, MapperError> {
        let instance = self
            .instance_named(device_name)
            .ok_or_else(|| MapperError::DeviceNotFound(device_name.to_string()))?;
        match instance.id.as_deref() {
            Some(id) if !id.trim().is_empty() => Ok(DeviceIdentity::new(id)),
            _ => Err(MapperError::Registry(format!(
                "device instance '{device_name}' has no id"
            ))),
        }
    }

    /// Reported properties that `device_name`'s model does not declare.
    ///
    /// Returns an empty list when the instance or its model is unknown, since
    /// there is nothing to check against.
    pub fn undeclared_properties(&self, device_name: &str) -> Vec<&'static str> {
        let Some(model) = self
            .instance_named(device_name)
            .and_then(|instance| self.model_of(instance))
        else {
            return Vec::new();
        };
        PROPERTY_NAMES
            .into_iter()
            .filter(|wanted| {
                !model
                    .properties
                    .iter()
                    .any(|p| p.name.as_deref() == Some(*wanted))
            })
            .collect()
    }
}

/// Opaque device id, resolved once at startup and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"{
        "deviceModels": [
            {
                "name": "padbot-model",
                "properties": [
                    {"name": "batteryPercentage", "dataType": "int", "minimum": 0, "maximum": 100, "unit": "%"},
                    {"name": "batteryStatus", "dataType": "string"},
                    {"name": "actionStatus", "dataType": "string"},
                    {"name": "robotLocation", "dataType": "string", "accessMode": "ReadWrite"}
                ]
            }
        ],
        "deviceInstances": [
            {"id": "padbot-lobby-01", "name": "padbot-lobby", "protocol": "http", "model": "padbot-model"},
            {"name": "padbot-unprovisioned", "model": "padbot-model"}
        ]
    }"#;

    #[test]
    fn resolve_finds_instance_by_name() -> Result<(), Box<dyn std::error::Error>> {
        let profiles = DeviceProfiles::from_json_str(PROFILE)?;
        let id = profiles.resolve("padbot-lobby")?;
        assert_eq!(id.as_str(), "padbot-lobby-01");
        Ok(())
    }

    #[test]
    fn resolve_unknown_name_is_device_not_found() -> Result<(), Box<dyn std::error::Error>> {
        let profiles = DeviceProfiles::from_json_str(PROFILE)?;
        let result = profiles.resolve("padbot-kitchen");
        assert!(matches!(result, Err(MapperError::DeviceNotFound(name)) if name == "padbot-kitchen"));
        Ok(())
    }

    #[test]
    fn resolve_instance_without_id_is_registry_error() -> Result<(), Box<dyn std::error::Error>> {
        let profiles = DeviceProfiles::from_json_str(PROFILE)?;
        let result = profiles.resolve("padbot-unprovisioned");
        assert!(matches!(result, Err(MapperError::Registry(_))));
        Ok(())
    }

    #[test]
    fn malformed_profile_is_registry_error() {
        let result = DeviceProfiles::from_json_str("{\"deviceInstances\": 3}");
        assert!(matches!(result, Err(MapperError::Registry(_))));
    }

    #[test]
    fn undeclared_properties_lists_model_gaps() -> Result<(), Box<dyn std::error::Error>> {
        let profiles = DeviceProfiles::from_json_str(PROFILE)?;
        assert_eq!(profiles.undeclared_properties("padbot-lobby"), vec!["navigationStatus"]);
        assert!(profiles.undeclared_properties("padbot-kitchen").is_empty());
        Ok(())
    }
}
