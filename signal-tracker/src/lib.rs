//! Signal Tracker Library
//!
//! Tracks the latest GPS position of a single vehicle and simulates the state
//! of nearby traffic signals: a signal is green while the vehicle is within a
//! threshold distance of it, red otherwise.
//!
//! # Architecture
//!
//! The library is the logical core only:
//! - Great-circle distance (haversine)
//! - A position tracker replaced wholesale on every update
//! - An evaluator that recomputes every signal's state from the current position
//! - Parsing of inbound JSON position messages
//! - A context object owning all of the above plus a bounded update channel
//!
//! The library does NOT:
//! - Connect to a message broker
//! - Render maps or dashboards
//!
//! Transport and display live in the application layer (signal-tracker-cli).
//!
//! # Example Usage
//!
//! ```
//! use signal_tracker::{PositionUpdate, SignalContext, SignalState, TrackerConfig};
//!
//! let config = TrackerConfig::new()
//!     .with_sites(Vec::new())
//!     .add_site("Intersection A", 12.9716, 77.5946)
//!     .with_threshold(200.0);
//!
//! let (mut context, sender) = SignalContext::new(config).unwrap();
//!
//! // A transport thread would normally hold the sender
//! let update = PositionUpdate::from_json(br#"{"lat": 12.98, "lng": 77.605}"#).unwrap();
//! sender.send(update).unwrap();
//!
//! context.drain();
//! assert_eq!(context.evaluate()["Intersection A"], SignalState::Red);
//! ```

// Public modules
pub mod config;
pub mod context;
pub mod evaluator;
pub mod geo;
pub mod message;
pub mod tracker;
pub mod types;

// Re-export main types for convenience
pub use config::{DefaultPosition, MissingFieldPolicy, TrackerConfig};
pub use context::{DrainSummary, LinkStatus, SignalContext, UpdateSender, UpdateStats};
pub use evaluator::{SignalEvaluator, SignalStates, SiteStatus};
pub use geo::{haversine_m, EARTH_RADIUS_M};
pub use message::PositionUpdate;
pub use tracker::PositionTracker;
pub use types::{Result, SignalSite, SignalState, Timestamp, TrackedPosition, TrackerError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
