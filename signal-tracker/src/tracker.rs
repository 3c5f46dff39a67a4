//! Position tracker
//!
//! Holds the single most recent position of the vehicle. The whole
//! `TrackedPosition` is swapped under one lock, so a reader sees either the
//! old pair or the new pair, never a mix.
//!
//! Inside `SignalContext` the tracker is owned by one thread and written
//! through `&mut self`, so ownership alone keeps the pair whole there and the
//! lock is never contended. The lock is what keeps a tracker shared through
//! an `Arc` (writer and reader on different threads) equally safe.

use crate::types::TrackedPosition;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Latest known position of one vehicle
#[derive(Debug)]
pub struct PositionTracker {
    position: RwLock<TrackedPosition>,
}

impl PositionTracker {
    /// Create a tracker holding `initial` until the first update arrives
    pub fn new(initial: TrackedPosition) -> Self {
        Self {
            position: RwLock::new(initial),
        }
    }

    /// Replace the held position unconditionally
    ///
    /// Out-of-range coordinates are stored as given.
    pub fn update(&self, latitude: f64, longitude: f64, observed_at: Option<serde_json::Value>) {
        self.replace(TrackedPosition {
            latitude,
            longitude,
            observed_at,
        });
    }

    /// Replace the held position with an already assembled one
    pub fn replace(&self, position: TrackedPosition) {
        *self.write() = position;
    }

    /// Most recently set position, or the initial one if never updated
    pub fn current(&self) -> TrackedPosition {
        self.read().clone()
    }

    // A poisoned lock still guards a complete position: writers only ever
    // perform a single assignment.
    fn read(&self) -> RwLockReadGuard<'_, TrackedPosition> {
        self.position.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, TrackedPosition> {
        self.position.write().unwrap_or_else(|e| e.into_inner())
    }
}
