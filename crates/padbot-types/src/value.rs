//! Type-erased twin property values.
//!
//! The twin schema does not pin a type per property: the robot reports a
//! numeric battery percentage next to free-text action states, and the cloud
//! may echo any of them back.  [`PropertyValue`] keeps the distinction where
//! it matters (the [`StatusToken`] sentinels) and renders everything else
//! through one string policy when talking to the cloud.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Sentinel tokens with special meaning to the reconciliation logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusToken {
    /// The value is missing or could not be read.
    Unknown,
    /// The robot is between locations; `robotLocation` reports this while
    /// a navigation is in progress.
    Moving,
}

impl StatusToken {
    /// Wire spelling of the token.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusToken::Unknown => "UNKNOWN",
            StatusToken::Moving => "MOVING",
        }
    }

    /// Parse the exact wire spelling; anything else is not a token.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "UNKNOWN" => Some(StatusToken::Unknown),
            "MOVING" => Some(StatusToken::Moving),
            _ => None,
        }
    }
}

/// A loosely-typed scalar held by a twin property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Number(f64),
    Token(StatusToken),
}

impl PropertyValue {
    /// The `UNKNOWN` sentinel.
    pub fn unknown() -> Self {
        PropertyValue::Token(StatusToken::Unknown)
    }

    /// Decode an arbitrary JSON value.
    ///
    /// `null` and blank strings become [`StatusToken::Unknown`]; strings that
    /// spell a token become that token; numbers stay numeric; anything else is
    /// kept as its JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::unknown(),
            Value::String(s) => Self::from(s.as_str()),
            Value::Number(n) => match n.as_f64() {
                Some(f) => PropertyValue::Number(f),
                None => PropertyValue::Text(n.to_string()),
            },
            Value::Bool(b) => PropertyValue::Text(b.to_string()),
            other => PropertyValue::Text(other.to_string()),
        }
    }

    /// `true` if this value is exactly `token`.
    pub fn is_token(&self, token: StatusToken) -> bool {
        matches!(self, PropertyValue::Token(t) if *t == token)
    }

    pub fn is_unknown(&self) -> bool {
        self.is_token(StatusToken::Unknown)
    }

    pub fn is_moving(&self) -> bool {
        self.is_token(StatusToken::Moving)
    }

    /// Render the value the way the cloud twin stores it.
    ///
    /// Numbers use their shortest decimal form, so a battery reading of
    /// `85.0` is reported as `"85"`.
    pub fn to_wire_string(&self) -> String {
        match self {
            PropertyValue::Text(s) => s.clone(),
            PropertyValue::Number(n) => n.to_string(),
            PropertyValue::Token(t) => t.as_str().to_string(),
        }
    }

    /// Convert into the string-rendered form published as an *actual* value.
    pub fn into_reported(self) -> Self {
        match self {
            PropertyValue::Number(n) => PropertyValue::Text(n.to_string()),
            other => other,
        }
    }

    /// Compare two values under the string rendering policy, so `"7"` and
    /// `7` name the same location.
    pub fn same_as(&self, other: &PropertyValue) -> bool {
        self.to_wire_string() == other.to_wire_string()
    }
}

impl From<&str> for PropertyValue {
    fn from(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::unknown();
        }
        match StatusToken::parse(raw) {
            Some(token) => PropertyValue::Token(token),
            None => PropertyValue::Text(raw.to_string()),
        }
    }
}

impl From<String> for PropertyValue {
    fn from(raw: String) -> Self {
        PropertyValue::from(raw.as_str())
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        PropertyValue::Number(n)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire_string())
    }
}

impl Serialize for PropertyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PropertyValue::Text(s) => serializer.serialize_str(s),
            PropertyValue::Number(n) => serializer.serialize_f64(*n),
            PropertyValue::Token(t) => serializer.serialize_str(t.as_str()),
        }
    }
}

impl<'de> Deserialize<'de> for PropertyValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(PropertyValue::from_json(&raw))
    }
}
