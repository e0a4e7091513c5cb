use std::time::Duration;

use serde::Serialize;

use crate::metrics::{mean, mean_duration};
use crate::session::{SessionOutcome, SessionRecord};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const BITS_PER_MBIT: f64 = 1024.0 * 1024.0;

/// Destination for rendered report lines.
pub trait ReportSink {
    fn line(&mut self, line: String);
}

/// Emits every line at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn line(&mut self, line: String) {
        tracing::info!("{}", line);
    }
}

impl ReportSink for Vec<String> {
    fn line(&mut self, line: String) {
        self.push(line);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    pub session_id: usize,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: usize,
    pub outcome: &'static str,
    pub total_bytes: u64,
    pub packet_count: u64,
    pub duration_secs: f64,
    pub throughput_bps: f64,
    /// Mean inter-arrival gap between chunks, not round-trip latency.
    pub mean_latency_ms: Option<f64>,
    pub max_latency_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallSummary {
    pub total_clients: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub total_bytes: u64,
    pub total_packets: u64,
    /// Mean over every per-chunk bitrate sample of every session.
    pub mean_bitrate_bps: Option<f64>,
    /// Mean over every inter-arrival gap of every session.
    pub mean_latency_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub elapsed_secs: f64,
    pub sessions: Vec<SessionSummary>,
    pub overall: OverallSummary,
    pub failures: Vec<FailureRecord>,
}

impl LoadReport {
    /// Reduces finished sessions into a report. Never mutates the records.
    pub fn from_records(records: &[SessionRecord], elapsed: Duration) -> Self {
        let mut sessions = Vec::with_capacity(records.len());
        let mut failures = Vec::new();
        let mut all_bitrates = Vec::new();
        let mut all_latencies = Vec::new();
        let mut overall = OverallSummary {
            total_clients: records.len(),
            completed: 0,
            failed: 0,
            cancelled: 0,
            total_bytes: 0,
            total_packets: 0,
            mean_bitrate_bps: None,
            mean_latency_ms: None,
        };

        for record in records {
            let metrics = &record.metrics;
            sessions.push(SessionSummary {
                session_id: record.session_id,
                outcome: record.outcome.label(),
                total_bytes: metrics.total_bytes,
                packet_count: metrics.packet_count,
                duration_secs: metrics.duration().as_secs_f64(),
                throughput_bps: metrics.throughput_bps(),
                mean_latency_ms: metrics.mean_latency().map(as_millis),
                max_latency_ms: metrics.max_latency().map(as_millis),
            });

            match &record.outcome {
                SessionOutcome::Completed => overall.completed += 1,
                SessionOutcome::Cancelled => overall.cancelled += 1,
                SessionOutcome::Failed(error) => {
                    overall.failed += 1;
                    failures.push(FailureRecord {
                        session_id: record.session_id,
                        error: error.to_string(),
                    });
                }
            }

            overall.total_bytes += metrics.total_bytes;
            overall.total_packets += metrics.packet_count;
            all_bitrates.extend_from_slice(&metrics.bitrates);
            all_latencies.extend_from_slice(&metrics.latencies);
        }

        overall.mean_bitrate_bps = mean(&all_bitrates);
        overall.mean_latency_ms = mean_duration(&all_latencies).map(as_millis);

        LoadReport {
            elapsed_secs: elapsed.as_secs_f64(),
            sessions,
            overall,
            failures,
        }
    }

    pub fn render(&self, sink: &mut dyn ReportSink) {
        for session in &self.sessions {
            sink.line(format!(
                "Client {} Statistics ({}):",
                session.session_id, session.outcome
            ));
            sink.line(format!(
                "  Total data received: {:.2} MB",
                session.total_bytes as f64 / BYTES_PER_MB
            ));
            sink.line(format!(
                "  Average bitrate: {:.2} Mbps",
                session.throughput_bps / BITS_PER_MBIT
            ));
            sink.line(format!("  Packets received: {}", session.packet_count));
            sink.line(format!("  Duration: {:.2} seconds", session.duration_secs));
            if let (Some(avg), Some(max)) = (session.mean_latency_ms, session.max_latency_ms) {
                sink.line(format!("  Average inter-arrival latency: {:.2} ms", avg));
                sink.line(format!("  Max inter-arrival latency: {:.2} ms", max));
            }
        }

        let overall = &self.overall;
        sink.line("Overall Statistics:".to_string());
        sink.line(format!(
            "  Total clients: {} (completed {}, failed {}, cancelled {})",
            overall.total_clients, overall.completed, overall.failed, overall.cancelled
        ));
        sink.line(format!(
            "  Total data received: {:.2} MB",
            overall.total_bytes as f64 / BYTES_PER_MB
        ));
        sink.line(format!("  Total packets received: {}", overall.total_packets));
        if let Some(bps) = overall.mean_bitrate_bps {
            sink.line(format!(
                "  Average bitrate across all clients: {:.2} Mbps",
                bps / BITS_PER_MBIT
            ));
        }
        if let Some(ms) = overall.mean_latency_ms {
            sink.line(format!(
                "  Average inter-arrival latency across all clients: {:.2} ms",
                ms
            ));
        }
        sink.line(format!("  Test duration: {:.2} seconds", self.elapsed_secs));

        if !self.failures.is_empty() {
            sink.line(format!("Failures: {}", self.failures.len()));
            for failure in &self.failures {
                sink.line(format!("  client {}: {}", failure.session_id, failure.error));
            }
        }
    }
}

fn as_millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
