use std::time::{Duration, Instant};

/// Running statistics for one streaming session.
///
/// Owned by its session while it runs and handed to the reporter only after
/// the session is done, so no locking is needed.
///
/// `latencies` holds inter-arrival gaps between consecutive chunks. They are
/// not network round-trip times.
#[derive(Debug, Clone)]
pub struct SessionMetrics {
    pub total_bytes: u64,
    pub packet_count: u64,
    pub start_time: Instant,
    pub last_packet_time: Option<Instant>,
    pub latencies: Vec<Duration>,
    pub bitrates: Vec<f64>,
}

impl SessionMetrics {
    pub fn new(start_time: Instant) -> Self {
        Self {
            total_bytes: 0,
            packet_count: 0,
            start_time,
            last_packet_time: None,
            latencies: Vec::new(),
            bitrates: Vec::new(),
        }
    }

    /// Accounts for one chunk of `size` bytes that arrived at `arrival`.
    ///
    /// A zero or negative gap since the previous chunk adds no latency or
    /// bitrate sample, but the counters and `last_packet_time` still move.
    pub fn record_chunk(&mut self, size: usize, arrival: Instant) {
        self.total_bytes += size as u64;
        self.packet_count += 1;

        if let Some(last) = self.last_packet_time {
            if let Some(gap) = arrival.checked_duration_since(last).filter(|g| !g.is_zero()) {
                self.latencies.push(gap);
                self.bitrates.push((size as f64 * 8.0) / gap.as_secs_f64());
            }
        }

        self.last_packet_time = Some(arrival);
    }

    /// Time from session start to the last chunk, zero if nothing arrived.
    pub fn duration(&self) -> Duration {
        self.last_packet_time
            .and_then(|last| last.checked_duration_since(self.start_time))
            .unwrap_or_default()
    }

    /// Effective throughput over [`Self::duration`] in bits per second.
    pub fn throughput_bps(&self) -> f64 {
        let secs = self.duration().as_secs_f64();
        if secs > 0.0 {
            (self.total_bytes as f64 * 8.0) / secs
        } else {
            0.0
        }
    }

    pub fn mean_latency(&self) -> Option<Duration> {
        mean_duration(&self.latencies)
    }

    pub fn max_latency(&self) -> Option<Duration> {
        self.latencies.iter().max().copied()
    }
}

pub(crate) fn mean_duration(samples: &[Duration]) -> Option<Duration> {
    if samples.is_empty() {
        return None;
    }
    let total: u128 = samples.iter().map(Duration::as_nanos).sum();
    let nanos = total / samples.len() as u128;
    Some(Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)))
}

pub(crate) fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}
