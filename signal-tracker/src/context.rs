//! Process-wide tracking context
//!
//! `SignalContext` owns the position tracker, the evaluator and the receiving
//! end of a bounded update channel. Transports push parsed updates through an
//! `UpdateSender`; the thread that owns the context drains the channel and
//! applies updates in delivery order, then evaluates on demand.
//!
//! A reader that only needs a report every so often should wait in
//! `drain_until` rather than sleeping, so the channel keeps emptying and a
//! producer never parks on a full channel while the reader is idle.

use crate::config::{MissingFieldPolicy, TrackerConfig};
use crate::evaluator::{SignalEvaluator, SignalStates};
use crate::message::PositionUpdate;
use crate::tracker::PositionTracker;
use crate::types::{Result, Timestamp, TrackedPosition, TrackerError};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::sync::Arc;
use std::time::Instant;

/// Producer handle for the update channel
#[derive(Debug, Clone)]
pub struct UpdateSender {
    tx: SyncSender<PositionUpdate>,
}

impl UpdateSender {
    /// Queue an update
    ///
    /// Blocks only while the channel is full, which cannot outlast a reader
    /// waiting in `drain_until`. Fails once the context has been dropped.
    pub fn send(&self, update: PositionUpdate) -> Result<()> {
        self.tx.send(update).map_err(|_| TrackerError::ChannelClosed)
    }
}

/// Transport-side status shared between the transport and the reader
///
/// Holds the connection flag and the number of payloads the transport
/// dropped before they ever reached the channel.
#[derive(Debug, Clone, Default)]
pub struct LinkStatus {
    connected: Arc<AtomicBool>,
    malformed: Arc<AtomicU64>,
}

impl LinkStatus {
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Count one payload dropped as malformed
    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn malformed(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }
}

/// Outcome of one `drain` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    /// Updates applied to the tracker
    pub applied: usize,
    /// Updates dropped by the missing-field policy
    pub rejected: usize,
    /// True once every sender is gone and the channel is empty
    pub disconnected: bool,
}

impl DrainSummary {
    fn record(&mut self, outcome: Result<()>) {
        match outcome {
            Ok(()) => self.applied += 1,
            Err(_) => self.rejected += 1,
        }
    }
}

/// Lifetime update counters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UpdateStats {
    pub applied: u64,
    pub rejected: u64,
    /// Local time the last update was applied
    pub last_applied_at: Option<Timestamp>,
}

/// Explicit owner of all tracking state
#[derive(Debug)]
pub struct SignalContext {
    tracker: PositionTracker,
    evaluator: SignalEvaluator,
    policy: MissingFieldPolicy,
    rx: Receiver<PositionUpdate>,
    link: LinkStatus,
    stats: UpdateStats,
}

impl SignalContext {
    /// Validate `config` and create the context with its update channel
    pub fn new(config: TrackerConfig) -> Result<(Self, UpdateSender)> {
        config.validate()?;

        let (tx, rx) = mpsc::sync_channel(config.channel_capacity);
        log::debug!(
            "Tracking context created: {} sites, threshold {} m, capacity {}",
            config.sites.len(),
            config.threshold_m,
            config.channel_capacity
        );

        let context = Self {
            tracker: PositionTracker::new(config.initial_position()),
            policy: config.missing_field,
            evaluator: SignalEvaluator::new(config.sites, config.threshold_m),
            rx,
            link: LinkStatus::default(),
            stats: UpdateStats::default(),
        };

        Ok((context, UpdateSender { tx }))
    }

    /// Apply a single update directly, bypassing the channel
    pub fn apply(&mut self, update: PositionUpdate) -> Result<()> {
        let previous = self.tracker.current();
        match update.resolve(&previous, self.policy) {
            Ok(position) => {
                log::debug!(
                    "Position updated: lat={:.6} lng={:.6}",
                    position.latitude,
                    position.longitude
                );
                self.tracker.replace(position);
                self.stats.applied += 1;
                self.stats.last_applied_at = Some(Utc::now());
                Ok(())
            }
            Err(e) => {
                log::warn!("Dropping position update: {}", e);
                self.stats.rejected += 1;
                Err(e)
            }
        }
    }

    /// Apply every queued update in delivery order
    pub fn drain(&mut self) -> DrainSummary {
        let mut summary = DrainSummary::default();

        loop {
            match self.rx.try_recv() {
                Ok(update) => {
                    let outcome = self.apply(update);
                    summary.record(outcome);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    summary.disconnected = true;
                    break;
                }
            }
        }

        if summary.applied + summary.rejected > 0 {
            log::trace!(
                "Drained {} updates ({} rejected)",
                summary.applied + summary.rejected,
                summary.rejected
            );
        }

        summary
    }

    /// Apply updates as they arrive until `deadline` passes
    ///
    /// Returns early once every sender is gone and the channel is empty.
    pub fn drain_until(&mut self, deadline: Instant) -> DrainSummary {
        let mut summary = DrainSummary::default();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            match self.rx.recv_timeout(remaining) {
                Ok(update) => {
                    let outcome = self.apply(update);
                    summary.record(outcome);
                }
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    summary.disconnected = true;
                    break;
                }
            }
        }

        summary
    }

    pub fn current(&self) -> TrackedPosition {
        self.tracker.current()
    }

    pub fn evaluate(&self) -> SignalStates {
        self.evaluator.evaluate(&self.tracker.current())
    }

    pub fn evaluator(&self) -> &SignalEvaluator {
        &self.evaluator
    }

    pub fn stats(&self) -> UpdateStats {
        self.stats
    }

    /// Shared transport status, for the transport to update
    pub fn link(&self) -> LinkStatus {
        self.link.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SignalState;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_drain_applies_in_order() {
        let (mut ctx, tx) = SignalContext::new(TrackerConfig::new()).unwrap();
        tx.send(PositionUpdate::new(1.0, 1.0)).unwrap();
        tx.send(PositionUpdate::new(2.0, 2.0)).unwrap();
        tx.send(PositionUpdate::new(3.0, 3.0)).unwrap();

        let summary = ctx.drain();
        assert_eq!(summary.applied, 3);
        assert!(!summary.disconnected);
        assert_eq!(ctx.current(), TrackedPosition::new(3.0, 3.0));
        assert_eq!(ctx.stats().applied, 3);
        assert!(ctx.stats().last_applied_at.is_some());
    }

    #[test]
    fn test_drain_reports_disconnect() {
        let (mut ctx, tx) = SignalContext::new(TrackerConfig::new()).unwrap();
        tx.send(PositionUpdate::new(1.0, 1.0)).unwrap();
        drop(tx);

        let summary = ctx.drain();
        assert_eq!(summary.applied, 1);
        assert!(summary.disconnected);
    }

    #[test]
    fn test_rejected_update_keeps_position() {
        let config = TrackerConfig::new().with_missing_field(MissingFieldPolicy::Reject);
        let (mut ctx, tx) = SignalContext::new(config).unwrap();
        let before = ctx.current();

        tx.send(PositionUpdate {
            latitude: Some(50.0),
            longitude: None,
            observed_at: None,
        })
        .unwrap();

        let summary = ctx.drain();
        assert_eq!(summary.rejected, 1);
        assert_eq!(ctx.current(), before);
        assert_eq!(ctx.stats().rejected, 1);
        assert_eq!(ctx.stats().last_applied_at, None);
    }

    #[test]
    fn test_send_after_drop_fails() {
        let (ctx, tx) = SignalContext::new(TrackerConfig::new()).unwrap();
        drop(ctx);
        assert!(matches!(
            tx.send(PositionUpdate::new(0.0, 0.0)),
            Err(TrackerError::ChannelClosed)
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(SignalContext::new(TrackerConfig::new().with_threshold(-5.0)).is_err());
    }

    #[test]
    fn test_evaluate_tracks_latest_position() {
        let (mut ctx, _tx) = SignalContext::new(TrackerConfig::new()).unwrap();
        assert_eq!(ctx.evaluate()["Intersection A"], SignalState::Green);

        ctx.apply(PositionUpdate::new(12.9750, 77.5900)).unwrap();
        let states = ctx.evaluate();
        assert_eq!(states["Intersection A"], SignalState::Red);
        assert_eq!(states["Intersection B"], SignalState::Green);
    }

    #[test]
    fn test_link_status_shared() {
        let (ctx, _tx) = SignalContext::new(TrackerConfig::new()).unwrap();
        let link = ctx.link();
        assert!(!ctx.link().is_connected());
        link.set_connected(true);
        link.record_malformed();
        link.record_malformed();
        assert!(ctx.link().is_connected());
        assert_eq!(ctx.link().malformed(), 2);
    }

    #[test]
    fn test_producer_not_blocked_while_reader_waits() {
        let config = TrackerConfig::new().with_channel_capacity(1);
        let (mut ctx, tx) = SignalContext::new(config).unwrap();
        let (done_tx, done_rx) = mpsc::channel();

        let producer = thread::spawn(move || {
            tx.send(PositionUpdate::new(1.0, 1.0)).unwrap();
            tx.send(PositionUpdate::new(2.0, 2.0)).unwrap();
            done_tx.send(Instant::now()).unwrap();
            // Keep the sender alive so the drain runs to its deadline
            thread::sleep(Duration::from_millis(600));
        });

        let deadline = Instant::now() + Duration::from_millis(500);
        let summary = ctx.drain_until(deadline);

        let finished_at = done_rx.try_recv().expect("producer still blocked at deadline");
        assert!(finished_at < deadline);
        assert_eq!(summary.applied, 2);
        assert!(!summary.disconnected);
        assert_eq!(ctx.current(), TrackedPosition::new(2.0, 2.0));

        producer.join().unwrap();
    }

    #[test]
    fn test_drain_until_stops_on_disconnect() {
        let (mut ctx, tx) = SignalContext::new(TrackerConfig::new()).unwrap();
        tx.send(PositionUpdate::new(3.0, 3.0)).unwrap();
        drop(tx);

        let started = Instant::now();
        let summary = ctx.drain_until(started + Duration::from_secs(30));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(summary.applied, 1);
        assert!(summary.disconnected);
    }
}
