use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, Url};
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

use crate::config::LoadTestConfig;
use crate::error::SessionError;

/// Readable body of one open stream.
pub type ChunkReader = Box<dyn AsyncRead + Send + Unpin>;

/// Opens the byte stream a single session consumes.
#[async_trait]
pub trait StreamSource: Send + Sync {
    async fn open(&self, url: &Url, headers: &HeaderMap) -> Result<ChunkReader, SessionError>;
}

/// HTTP GET streaming over a shared `reqwest` client.
///
/// Only connection setup and the wait for response headers are bounded here.
/// The body itself may run for the whole test, so sessions bound each read
/// individually.
#[derive(Clone, Debug)]
pub struct HttpStreamSource {
    client: Client,
    response_timeout: Duration,
}

impl HttpStreamSource {
    pub fn new(config: &LoadTestConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .context("failed to construct HTTP client")?;

        Ok(Self {
            client,
            response_timeout: config.read_timeout,
        })
    }
}

#[async_trait]
impl StreamSource for HttpStreamSource {
    async fn open(&self, url: &Url, headers: &HeaderMap) -> Result<ChunkReader, SessionError> {
        let request = self.client.get(url.clone()).headers(headers.clone());
        let response = tokio::time::timeout(self.response_timeout, request.send())
            .await
            .map_err(|_| SessionError::ReadTimeout(self.response_timeout))?
            .map_err(SessionError::connect)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        tracing::debug!(
            "{} responded {} (content-type: {})",
            url,
            status,
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("<none>")
        );

        let body = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::new(StreamReader::new(Box::pin(body))))
    }
}
