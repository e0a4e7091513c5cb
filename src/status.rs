use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone)]
pub(crate) enum StatusEvent {
    Bytes(u64),
    SessionEnded,
}

#[derive(Debug, Default)]
struct StatusSnapshot {
    total_bytes: u64,
    ended: usize,
    sessions: usize,
}

impl StatusSnapshot {
    fn apply(&mut self, event: StatusEvent) {
        match event {
            StatusEvent::Bytes(delta) => {
                self.total_bytes = self.total_bytes.saturating_add(delta);
            }
            StatusEvent::SessionEnded => {
                self.ended += 1;
            }
        }
    }

    fn line(&self, elapsed: Duration) -> String {
        let secs = elapsed.as_secs_f64();
        let mbps = if secs > 0.0 {
            (self.total_bytes as f64 * 8.0) / BYTES_PER_MB / secs
        } else {
            0.0
        };
        format!(
            "[{:>7.1}s] active {}/{} | received {:.2} MB | {:.2} Mbps",
            secs,
            self.sessions.saturating_sub(self.ended),
            self.sessions,
            self.total_bytes as f64 / BYTES_PER_MB,
            mbps
        )
    }
}

/// Logs a progress line every `interval` until every sender is gone.
pub(crate) async fn track_status(
    mut updates: mpsc::UnboundedReceiver<StatusEvent>,
    start: Instant,
    sessions: usize,
    interval: Duration,
) {
    let mut snapshot = StatusSnapshot {
        sessions,
        ..Default::default()
    };
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            event = updates.recv() => match event {
                Some(event) => snapshot.apply(event),
                None => break,
            },
            _ = ticker.tick() => {
                tracing::info!("{}", snapshot.line(start.elapsed()));
            }
        }
    }

    tracing::info!("{}", snapshot.line(start.elapsed()));
}
