use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::LoadTestConfig;
use crate::report::LoadReport;
use crate::session::{SessionRecord, StreamingSession};
use crate::status::track_status;
use crate::transport::{HttpStreamSource, StreamSource};

/// Every session of a finished test, ordered by session id.
#[derive(Debug, Clone)]
pub struct CompletedRun {
    pub records: Vec<SessionRecord>,
    pub elapsed: Duration,
}

impl CompletedRun {
    pub fn report(&self) -> LoadReport {
        LoadReport::from_records(&self.records, self.elapsed)
    }
}

/// Runs the load test against `config.url` over HTTP.
pub async fn run_load_test(config: LoadTestConfig) -> Result<LoadReport> {
    let source = HttpStreamSource::new(&config)?;
    run_load_test_with(config, Arc::new(source)).await
}

pub async fn run_load_test_with(
    config: LoadTestConfig,
    source: Arc<dyn StreamSource>,
) -> Result<LoadReport> {
    Ok(run_sessions(config, source).await?.report())
}

/// Runs `config.client_count` sessions against `source` for `config.duration`.
///
/// When the duration elapses the stop signal is raised and every session is
/// drained before returning. Sessions that end on their own do not shorten the
/// run.
pub async fn run_sessions(
    config: LoadTestConfig,
    source: Arc<dyn StreamSource>,
) -> Result<CompletedRun> {
    let start = Instant::now();
    let deadline = tokio::time::Instant::now() + config.duration;
    let client_count = config.client_count;

    tracing::info!(
        "Starting load test with {} clients for {:?} against {}",
        client_count,
        config.duration,
        config.url
    );

    let config = Arc::new(config);
    let stop = CancellationToken::new();

    let (status_tx, status_rx) = mpsc::unbounded_channel();
    let tracker_handle = tokio::spawn(track_status(
        status_rx,
        start,
        client_count,
        config.status_interval,
    ));

    let mut join_set = JoinSet::new();
    for session_id in 0..client_count {
        let session = StreamingSession {
            session_id,
            config: Arc::clone(&config),
            source: Arc::clone(&source),
            stop: stop.clone(),
            status_tx: status_tx.clone(),
        };
        join_set.spawn(session.run());
    }
    drop(status_tx);

    let mut records: Vec<SessionRecord> = Vec::with_capacity(client_count);
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline), if !stop.is_cancelled() => {
                tracing::info!(
                    "Test duration elapsed, stopping {} active sessions",
                    join_set.len()
                );
                stop.cancel();
            }
            joined = join_set.join_next() => match joined {
                Some(joined) => records.push(joined.context("session task failed")?),
                None => break,
            },
        }
    }
    if !stop.is_cancelled() {
        tracing::info!("All sessions ended, waiting out the test duration");
        tokio::time::sleep_until(deadline).await;
        stop.cancel();
    }

    let elapsed = start.elapsed();
    tracker_handle
        .await
        .map_err(|err| anyhow!("status tracker task failed: {}", err))?;

    records.sort_by_key(|record| record.session_id);
    Ok(CompletedRun { records, elapsed })
}
