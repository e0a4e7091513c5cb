mod config;
mod error;
mod header;
mod metrics;
mod report;
mod runner;
mod session;
mod status;
mod transport;

pub use config::{HeaderCheck, LoadTestConfig};
pub use error::SessionError;
pub use header::{validate_header, FlvHeader, FLV_SIGNATURE, HEADER_LEN};
pub use metrics::SessionMetrics;
pub use report::{
    FailureRecord, LoadReport, OverallSummary, ReportSink, SessionSummary, TracingSink,
};
pub use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
pub use runner::{run_load_test, run_load_test_with, run_sessions, CompletedRun};
pub use session::{SessionOutcome, SessionRecord};
pub use transport::{ChunkReader, HttpStreamSource, StreamSource};
