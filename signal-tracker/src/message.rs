//! Inbound position messages
//!
//! Payloads are JSON objects with `lat`, `lng` and an optional `time`.
//! Parsing keeps track of which coordinates were present; turning the parsed
//! message into a position happens later, against whatever position is held
//! at that moment.

use crate::config::MissingFieldPolicy;
use crate::types::{Result, TrackedPosition, TrackerError};
use serde_json::{Map, Value};

/// A parsed, not yet applied, position message
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub observed_at: Option<Value>,
}

impl PositionUpdate {
    /// Update carrying both coordinates
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            observed_at: None,
        }
    }

    /// Builder method: attach the upstream `time` value
    pub fn with_observed_at(mut self, observed_at: Value) -> Self {
        self.observed_at = Some(observed_at);
        self
    }

    /// Parse a raw payload
    ///
    /// Fails if the payload is not a JSON object or if `lat`/`lng` is present
    /// but not a finite number (numeric strings are accepted).
    pub fn from_json(payload: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(payload)?;
        Self::from_value(&value)
    }

    /// Parse an already decoded JSON value
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value.as_object().ok_or(TrackerError::NotAnObject)?;

        Ok(Self {
            latitude: coordinate(object, "lat")?,
            longitude: coordinate(object, "lng")?,
            observed_at: object.get("time").filter(|v| !v.is_null()).cloned(),
        })
    }

    /// Turn this update into a full position
    ///
    /// Either both coordinates are settled or an error is returned; a
    /// position is never built from one accepted and one rejected field.
    pub fn resolve(
        self,
        previous: &TrackedPosition,
        policy: MissingFieldPolicy,
    ) -> Result<TrackedPosition> {
        let (latitude, longitude) = match policy {
            MissingFieldPolicy::Retain => (
                self.latitude.unwrap_or(previous.latitude),
                self.longitude.unwrap_or(previous.longitude),
            ),
            MissingFieldPolicy::Reject => (
                self.latitude.ok_or(TrackerError::MissingField("lat"))?,
                self.longitude.ok_or(TrackerError::MissingField("lng"))?,
            ),
        };

        Ok(TrackedPosition {
            latitude,
            longitude,
            observed_at: self.observed_at,
        })
    }
}

fn coordinate(object: &Map<String, Value>, field: &'static str) -> Result<Option<f64>> {
    let Some(value) = object.get(field) else {
        return Ok(None);
    };

    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(TrackerError::InvalidNumber {
            field,
            value: value.to_string(),
        }),
    }
}
