//! [`DeviceStatus`] – the robot's self-reported state.

use serde_json::Value;

use crate::MapperError;
use crate::value::PropertyValue;

pub const BATTERY_PERCENTAGE: &str = "batteryPercentage";
pub const BATTERY_STATUS: &str = "batteryStatus";
pub const ACTION_STATUS: &str = "actionStatus";
pub const NAVIGATION_STATUS: &str = "navigationStatus";
pub const ROBOT_LOCATION: &str = "robotLocation";

/// Every twin property the mapper reports, in reporting order.
pub const PROPERTY_NAMES: [&str; 5] = [
    BATTERY_PERCENTAGE,
    BATTERY_STATUS,
    ACTION_STATUS,
    NAVIGATION_STATUS,
    ROBOT_LOCATION,
];

/// Snapshot of the five properties read from the robot's status endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceStatus {
    pub battery_percentage: PropertyValue,
    pub battery_status: PropertyValue,
    pub action_status: PropertyValue,
    pub navigation_status: PropertyValue,
    pub robot_location: PropertyValue,
}

impl DeviceStatus {
    /// Build a snapshot from the flat JSON object returned by the robot.
    ///
    /// Missing or `null` fields become `UNKNOWN`; extra fields are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`MapperError::Codec`] if `body` is not a JSON object.
    pub fn from_json(body: &Value) -> Result<Self, MapperError> {
        let fields = body.as_object().ok_or_else(|| {
            MapperError::Codec(format!("device status is not a JSON object: {body}"))
        })?;
        let field = |name: &str| {
            fields
                .get(name)
                .map(PropertyValue::from_json)
                .unwrap_or_else(PropertyValue::unknown)
        };
        Ok(Self {
            battery_percentage: field(BATTERY_PERCENTAGE),
            battery_status: field(BATTERY_STATUS),
            action_status: field(ACTION_STATUS),
            navigation_status: field(NAVIGATION_STATUS),
            robot_location: field(ROBOT_LOCATION),
        })
    }

    /// Iterate `(property name, value)` pairs in [`PROPERTY_NAMES`] order.
    pub fn properties(&self) -> impl Iterator<Item = (&'static str, &PropertyValue)> {
        [
            (BATTERY_PERCENTAGE, &self.battery_percentage),
            (BATTERY_STATUS, &self.battery_status),
            (ACTION_STATUS, &self.action_status),
            (NAVIGATION_STATUS, &self.navigation_status),
            (ROBOT_LOCATION, &self.robot_location),
        ]
        .into_iter()
    }

    /// Names of the properties whose rendered value differs from `previous`.
    pub fn changed_since(&self, previous: &DeviceStatus) -> Vec<&'static str> {
        self.properties()
            .zip(previous.properties())
            .filter(|((_, now), (_, before))| !now.same_as(before))
            .map(|((name, _), _)| name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_status_decodes_every_field() -> Result<(), Box<dyn std::error::Error>> {
        let status = DeviceStatus::from_json(&json!({
            "batteryPercentage": 87,
            "batteryStatus": "Discharging",
            "actionStatus": "Idle",
            "navigationStatus": "Arrived",
            "robotLocation": "Lobby",
            "firmware": "2.4.1"
        }))?;
        assert_eq!(status.battery_percentage, PropertyValue::Number(87.0));
        assert_eq!(status.action_status, PropertyValue::Text("Idle".into()));
        assert_eq!(status.robot_location, PropertyValue::Text("Lobby".into()));
        Ok(())
    }

    #[test]
    fn missing_fields_default_to_unknown() -> Result<(), Box<dyn std::error::Error>> {
        let status = DeviceStatus::from_json(&json!({ "actionStatus": "Idle" }))?;
        assert!(status.robot_location.is_unknown());
        assert!(status.battery_percentage.is_unknown());
        assert!(status.navigation_status.is_unknown());
        assert!(!status.action_status.is_unknown());
        Ok(())
    }

    #[test]
    fn non_object_body_is_a_codec_error() {
        let result = DeviceStatus::from_json(&json!(["Lobby"]));
        assert!(matches!(result, Err(MapperError::Codec(_))));
    }

    #[test]
    fn properties_follow_reporting_order() -> Result<(), Box<dyn std::error::Error>> {
        let status = DeviceStatus::from_json(&json!({}))?;
        let names: Vec<&str> = status.properties().map(|(name, _)| name).collect();
        assert_eq!(names, PROPERTY_NAMES);
        Ok(())
    }

    #[test]
    fn changed_since_lists_only_differing_properties() -> Result<(), Box<dyn std::error::Error>> {
        let before = DeviceStatus::from_json(&json!({
            "batteryPercentage": 80, "robotLocation": "Lobby"
        }))?;
        let after = DeviceStatus::from_json(&json!({
            "batteryPercentage": "80", "robotLocation": "MOVING"
        }))?;
        assert_eq!(after.changed_since(&before), vec![ROBOT_LOCATION]);
        Ok(())
    }
}
