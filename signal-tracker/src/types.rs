//! Core types for the signal tracker library
//!
//! Positions, signal sites and the two-valued signal state, plus the error
//! type shared by every operation in the crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type used for locally recorded times
pub type Timestamp = DateTime<Utc>;

/// Result type for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Last known position of the tracked vehicle
///
/// Replaced wholesale on every accepted update. `observed_at` is whatever the
/// upstream message carried in its `time` field and is never interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedPosition {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Opaque observation time from the upstream message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<serde_json::Value>,
}

impl TrackedPosition {
    /// Create a position without an observation time
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            observed_at: None,
        }
    }

    /// Builder method: attach an observation time
    pub fn with_observed_at(mut self, observed_at: serde_json::Value) -> Self {
        self.observed_at = Some(observed_at);
        self
    }
}

/// A fixed-location traffic signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSite {
    /// Unique site name
    pub name: String,
    /// Latitude in degrees
    #[serde(alias = "lat")]
    pub latitude: f64,
    /// Longitude in degrees
    #[serde(alias = "lng")]
    pub longitude: f64,
}

impl SignalSite {
    /// Create a new signal site
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }
}

/// Simulated state of a signal site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalState {
    Red,
    Green,
}

impl SignalState {
    pub fn is_green(self) -> bool {
        self == SignalState::Green
    }
}

impl fmt::Display for SignalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalState::Red => write!(f, "red"),
            SignalState::Green => write!(f, "green"),
        }
    }
}

/// Errors that can occur while tracking positions
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Payload is not a JSON object")]
    NotAnObject,

    #[error("Field '{field}' is not a number: {value}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Update channel closed")]
    ChannelClosed,
}
