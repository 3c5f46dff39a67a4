//! Tracker configuration types
//!
//! Static configuration loaded once at process start: the default position,
//! the signal site registry, the green threshold and the update channel
//! settings. Immutable after the context is created.

use crate::types::{Result, SignalSite, TrackedPosition, TrackerError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Configuration for the tracker core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Position reported before any update arrives
    #[serde(default = "default_position")]
    pub default_position: DefaultPosition,

    /// Distance in meters within which a site turns green
    #[serde(default = "default_threshold")]
    pub threshold_m: f64,

    /// Signal sites, in display order
    #[serde(default = "default_sites")]
    pub sites: Vec<SignalSite>,

    /// What to do when an update lacks `lat` or `lng`
    #[serde(default)]
    pub missing_field: MissingFieldPolicy,

    /// Number of pending updates the channel holds before the sender blocks
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

/// Default coordinates, as written in config files
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DefaultPosition {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude")]
    pub lng: f64,
}

/// Handling of updates with an absent coordinate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingFieldPolicy {
    /// Keep the currently held value for the absent coordinate
    #[default]
    Retain,
    /// Drop the whole update
    Reject,
}

// Bengaluru city centre
fn default_position() -> DefaultPosition {
    DefaultPosition {
        lat: 12.9716,
        lng: 77.5946,
    }
}

fn default_threshold() -> f64 {
    200.0
}

fn default_sites() -> Vec<SignalSite> {
    vec![
        SignalSite::new("Intersection A", 12.9716, 77.5946),
        SignalSite::new("Intersection B", 12.9750, 77.5900),
        SignalSite::new("Intersection C", 12.9680, 77.6000),
    ]
}

fn default_channel_capacity() -> usize {
    64
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            default_position: default_position(),
            threshold_m: default_threshold(),
            sites: default_sites(),
            missing_field: MissingFieldPolicy::default(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl TrackerConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the default position
    pub fn with_default_position(mut self, lat: f64, lng: f64) -> Self {
        self.default_position = DefaultPosition { lat, lng };
        self
    }

    /// Builder method: set the green threshold in meters
    pub fn with_threshold(mut self, threshold_m: f64) -> Self {
        self.threshold_m = threshold_m;
        self
    }

    /// Builder method: replace the site registry
    pub fn with_sites(mut self, sites: Vec<SignalSite>) -> Self {
        self.sites = sites;
        self
    }

    /// Builder method: append a site
    pub fn add_site(mut self, name: impl Into<String>, lat: f64, lng: f64) -> Self {
        self.sites.push(SignalSite::new(name, lat, lng));
        self
    }

    /// Builder method: set the missing-field policy
    pub fn with_missing_field(mut self, policy: MissingFieldPolicy) -> Self {
        self.missing_field = policy;
        self
    }

    /// Builder method: set the update channel capacity
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Position the tracker starts from
    pub fn initial_position(&self) -> TrackedPosition {
        TrackedPosition::new(self.default_position.lat, self.default_position.lng)
    }

    /// Check the configuration for values the core cannot work with
    pub fn validate(&self) -> Result<()> {
        if !self.threshold_m.is_finite() || self.threshold_m < 0.0 {
            return Err(TrackerError::InvalidConfig(format!(
                "threshold_m must be a finite, non-negative number (got {})",
                self.threshold_m
            )));
        }

        if self.channel_capacity == 0 {
            return Err(TrackerError::InvalidConfig(
                "channel_capacity must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for site in &self.sites {
            if !seen.insert(site.name.as_str()) {
                return Err(TrackerError::InvalidConfig(format!(
                    "duplicate signal site name: {}",
                    site.name
                )));
            }
        }

        Ok(())
    }
}
