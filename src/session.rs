use std::sync::Arc;
use std::time::Instant;

use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{HeaderCheck, LoadTestConfig};
use crate::error::SessionError;
use crate::header::{validate_header, HEADER_LEN};
use crate::metrics::SessionMetrics;
use crate::status::StatusEvent;
use crate::transport::{ChunkReader, StreamSource};

const PROGRESS_LOG_EVERY: u64 = 100;

/// Terminal state of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The remote end closed the stream.
    Completed,
    Failed(SessionError),
    /// The stop signal was observed between reads.
    Cancelled,
}

impl SessionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            SessionOutcome::Completed => "completed",
            SessionOutcome::Failed(_) => "failed",
            SessionOutcome::Cancelled => "cancelled",
        }
    }

    pub fn error(&self) -> Option<&SessionError> {
        match self {
            SessionOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// A finished session: its identity, frozen metrics and how it ended.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub session_id: usize,
    pub metrics: SessionMetrics,
    pub outcome: SessionOutcome,
}

pub(crate) struct StreamingSession {
    pub(crate) session_id: usize,
    pub(crate) config: Arc<LoadTestConfig>,
    pub(crate) source: Arc<dyn StreamSource>,
    pub(crate) stop: CancellationToken,
    pub(crate) status_tx: mpsc::UnboundedSender<StatusEvent>,
}

impl StreamingSession {
    pub(crate) async fn run(self) -> SessionRecord {
        let mut metrics = SessionMetrics::new(Instant::now());

        let outcome = match self.drive(&mut metrics).await {
            Ok(()) => SessionOutcome::Completed,
            Err(error) if error.is_cancelled() => SessionOutcome::Cancelled,
            Err(error) => SessionOutcome::Failed(error),
        };

        match &outcome {
            SessionOutcome::Failed(error) => {
                warn!("Client {}: session failed: {}", self.session_id, error)
            }
            other => info!("Client {}: session {}", self.session_id, other.label()),
        }
        let _ = self.status_tx.send(StatusEvent::SessionEnded);

        SessionRecord {
            session_id: self.session_id,
            metrics,
            outcome,
        }
    }

    async fn drive(&self, metrics: &mut SessionMetrics) -> Result<(), SessionError> {
        self.check_stop()?;
        info!("Client {}: connecting to {}", self.session_id, self.config.url);
        let mut reader = self
            .source
            .open(&self.config.url, &self.config.headers)
            .await
            .map_err(|err| self.settle_timeout(err))?;
        info!("Client {}: connected", self.session_id);

        if self.config.header_check == HeaderCheck::Enforce {
            self.check_stop()?;
            self.read_header(&mut reader, metrics).await?;
        }

        let mut buf = vec![0u8; self.config.chunk_size];
        loop {
            self.check_stop()?;
            let read = self.read_chunk(&mut reader, &mut buf).await?;
            if read == 0 {
                info!("Client {}: end of stream reached", self.session_id);
                return Ok(());
            }
            self.record(metrics, read);
        }
    }

    async fn read_header(
        &self,
        reader: &mut ChunkReader,
        metrics: &mut SessionMetrics,
    ) -> Result<(), SessionError> {
        let mut header = [0u8; HEADER_LEN];
        let read = tokio::time::timeout(self.config.read_timeout, reader.read_exact(&mut header))
            .await
            .map_err(|_| self.timeout_error())?;

        match read {
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(SessionError::MalformedHeader(format!(
                    "stream ended before {HEADER_LEN} header bytes"
                )));
            }
            Err(err) => return Err(err.into()),
        }

        if !validate_header(&header)? {
            return Err(SessionError::MalformedHeader(format!(
                "invalid signature {:?}",
                String::from_utf8_lossy(&header[..3])
            )));
        }

        self.record(metrics, HEADER_LEN);
        Ok(())
    }

    async fn read_chunk(
        &self,
        reader: &mut ChunkReader,
        buf: &mut [u8],
    ) -> Result<usize, SessionError> {
        tokio::time::timeout(self.config.read_timeout, reader.read(buf))
            .await
            .map_err(|_| self.timeout_error())?
            .map_err(SessionError::from)
    }

    fn record(&self, metrics: &mut SessionMetrics, size: usize) {
        metrics.record_chunk(size, Instant::now());
        let _ = self.status_tx.send(StatusEvent::Bytes(size as u64));

        if metrics.packet_count % PROGRESS_LOG_EVERY == 0 {
            debug!(
                "Client {}: received packet {}, size={} bytes, total={} bytes",
                self.session_id, metrics.packet_count, size, metrics.total_bytes
            );
        }
    }

    fn check_stop(&self) -> Result<(), SessionError> {
        if self.stop.is_cancelled() {
            Err(SessionError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn timeout_error(&self) -> SessionError {
        self.settle_timeout(SessionError::ReadTimeout(self.config.read_timeout))
    }

    /// A wait that outlives the stop signal counts as cancellation.
    fn settle_timeout(&self, error: SessionError) -> SessionError {
        match error {
            SessionError::ReadTimeout(_) if self.stop.is_cancelled() => SessionError::Cancelled,
            other => other,
        }
    }
}
