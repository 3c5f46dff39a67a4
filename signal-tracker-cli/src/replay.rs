//! Offline replay of recorded position messages
//!
//! Reads one JSON message per line and pushes it through the same update
//! channel the MQTT listener uses. Useful without a broker.

use anyhow::{Context, Result};
use signal_tracker::{LinkStatus, UpdateSender};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

/// Counts from one replay run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub lines: usize,
    pub sent: usize,
    pub malformed: usize,
}

/// Replay `path` (`-` for stdin) on a background thread
pub fn spawn(
    path: PathBuf,
    sender: UpdateSender,
    link: LinkStatus,
) -> Result<JoinHandle<Result<ReplaySummary>>> {
    thread::Builder::new()
        .name("replay".to_string())
        .spawn(move || replay_path(&path, &sender, &link))
        .context("Failed to spawn replay thread")
}

pub fn replay_path(path: &Path, sender: &UpdateSender, link: &LinkStatus) -> Result<ReplaySummary> {
    if path == Path::new("-") {
        log::info!("Replaying position messages from stdin");
        replay(io::stdin().lock(), sender, link)
    } else {
        log::info!("Replaying position messages from {:?}", path);
        let file =
            File::open(path).with_context(|| format!("Failed to open replay file: {:?}", path))?;
        replay(BufReader::new(file), sender, link)
    }
}

/// Send every well-formed line of `reader` as a position update
pub fn replay<R: BufRead>(
    reader: R,
    sender: &UpdateSender,
    link: &LinkStatus,
) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read replay line {}", index + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        summary.lines += 1;

        match crate::listener::accept_payload(line.as_bytes(), link) {
            Some(update) => {
                sender.send(update).context("Tracking context closed during replay")?;
                summary.sent += 1;
            }
            None => {
                log::warn!("Skipping malformed replay line {}", index + 1);
                summary.malformed += 1;
            }
        }
    }

    log::info!(
        "Replay finished: {} messages, {} malformed",
        summary.lines,
        summary.malformed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_tracker::{SignalContext, TrackedPosition, TrackerConfig};
    use std::io::{Cursor, Write};

    #[test]
    fn test_replay_applies_lines_in_order() {
        let (mut ctx, sender) = SignalContext::new(TrackerConfig::new()).unwrap();
        let input = "{\"lat\": 12.97, \"lng\": 77.59}\n\nnot json\n{\"lat\": 12.98, \"lng\": 77.60}\n";

        let summary = replay(Cursor::new(input), &sender, &ctx.link()).unwrap();
        assert_eq!(
            summary,
            ReplaySummary {
                lines: 3,
                sent: 2,
                malformed: 1
            }
        );

        assert_eq!(ctx.link().malformed(), 1);
        assert_eq!(ctx.drain().applied, 2);
        assert_eq!(ctx.current(), TrackedPosition::new(12.98, 77.60));
    }

    #[test]
    fn test_replay_from_file_on_thread() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for i in 0..100 {
            writeln!(file, "{{\"lat\": {}, \"lng\": 1.0, \"time\": {}}}", i, i).unwrap();
        }

        let config = TrackerConfig::new().with_channel_capacity(2);
        let (mut ctx, sender) = SignalContext::new(config).unwrap();
        let handle = spawn(file.path().to_path_buf(), sender, ctx.link()).unwrap();

        let mut applied = 0;
        loop {
            let summary = ctx.drain();
            applied += summary.applied;
            if summary.disconnected {
                break;
            }
            thread::yield_now();
        }

        let summary = handle.join().unwrap().unwrap();
        assert_eq!(summary.sent, 100);
        assert_eq!(applied, 100);
        assert_eq!(ctx.current().latitude, 99.0);
        assert_eq!(ctx.current().observed_at, Some(serde_json::json!(99)));
    }

    #[test]
    fn test_missing_replay_file() {
        let (ctx, sender) = SignalContext::new(TrackerConfig::new()).unwrap();
        assert!(replay_path(Path::new("/nonexistent/track.jsonl"), &sender, &ctx.link()).is_err());
    }
}
