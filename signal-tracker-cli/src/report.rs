//! Status report generation
//!
//! Snapshot of the tracking context rendered as plain text or JSON.

use crate::config::OutputFormat;
use anyhow::Result;
use serde::Serialize;
use signal_tracker::{SignalContext, SignalStates, Timestamp, TrackedPosition};
use std::fmt::Write;

/// Everything shown on one refresh
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub source: String,
    pub connected: bool,
    pub position: TrackedPosition,
    pub updates_applied: u64,
    /// Dropped by the missing-field policy
    pub updates_rejected: u64,
    /// Dropped by the transport before reaching the tracker
    pub updates_malformed: u64,
    pub last_applied_at: Option<Timestamp>,
    pub threshold_m: f64,
    pub signals: SignalStates,
}

impl StatusReport {
    /// Capture the current state of `context`
    pub fn capture(context: &SignalContext, source: impl Into<String>) -> Self {
        let stats = context.stats();
        let link = context.link();
        Self {
            source: source.into(),
            connected: link.is_connected(),
            position: context.current(),
            updates_applied: stats.applied,
            updates_rejected: stats.rejected,
            updates_malformed: link.malformed(),
            last_applied_at: stats.last_applied_at,
            threshold_m: context.evaluator().threshold_m(),
            signals: context.evaluate(),
        }
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Txt => Ok(self.render_txt()),
            OutputFormat::Json => Ok(serde_json::to_string(self)?),
        }
    }

    pub fn render_txt(&self) -> String {
        let mut out = String::new();
        let observed = match &self.position.observed_at {
            None => "-".to_string(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };

        // Writing to a String cannot fail
        let _ = writeln!(out, "═══════════════════════════════════════════════");
        let _ = writeln!(out, "  Source:      {}", self.source);
        let _ = writeln!(
            out,
            "  Link:        {}",
            if self.connected { "connected" } else { "not connected" }
        );
        let _ = writeln!(out, "───────────────────────────────────────────────");
        let _ = writeln!(out, "  Latitude:    {:.6}", self.position.latitude);
        let _ = writeln!(out, "  Longitude:   {:.6}", self.position.longitude);
        let _ = writeln!(out, "  Last update: {}", observed);
        let _ = writeln!(
            out,
            "  Updates:     {} applied, {} rejected, {} malformed",
            self.updates_applied, self.updates_rejected, self.updates_malformed
        );
        let _ = writeln!(out, "───────────────────────────────────────────────");
        let _ = writeln!(out, "  Traffic Lights (green within {} m)", self.threshold_m);

        if self.signals.is_empty() {
            let _ = writeln!(out, "  (no signal sites configured)");
        }
        for site in &self.signals {
            let marker = if site.state.is_green() { "🟢" } else { "🔴" };
            let _ = writeln!(
                out,
                "  {} {} — {} ({:.0} m)",
                marker, site.name, site.state, site.distance_m
            );
        }

        out
    }
}
