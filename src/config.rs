use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONNECTION, USER_AGENT};
use reqwest::Url;

const DEFAULT_USER_AGENT: &str = concat!("flvbench/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HeaderCheck {
    /// Consume chunks straight away without looking at the prefix.
    #[default]
    Skip,
    /// Read the 9-byte FLV prefix first; a short read or bad signature fails
    /// the session.
    Enforce,
}

#[derive(Clone, Debug)]
pub struct LoadTestConfig {
    pub url: Url,
    pub client_count: usize,
    pub duration: Duration,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub chunk_size: usize,
    pub header_check: HeaderCheck,
    pub status_interval: Duration,
    pub headers: HeaderMap,
}

impl LoadTestConfig {
    pub fn try_new(url: impl AsRef<str>, client_count: usize, duration: Duration) -> Result<Self> {
        if client_count == 0 {
            return Err(anyhow!("client_count must be greater than zero"));
        }
        if duration.is_zero() {
            return Err(anyhow!("duration must be greater than zero"));
        }

        let url = Url::parse(url.as_ref())
            .with_context(|| format!("invalid stream URL: {}", url.as_ref()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "unsupported URL scheme `{}`, expected http or https",
                url.scheme()
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        Ok(Self {
            url,
            client_count,
            duration,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            chunk_size: 8192,
            header_check: HeaderCheck::Skip,
            status_interval: Duration::from_secs(5),
            headers,
        })
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        if !connect_timeout.is_zero() {
            self.connect_timeout = connect_timeout;
        }
        self
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        if !read_timeout.is_zero() {
            self.read_timeout = read_timeout;
        }
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        if chunk_size > 0 {
            self.chunk_size = chunk_size;
        }
        self
    }

    pub fn with_header_check(mut self, header_check: HeaderCheck) -> Self {
        self.header_check = header_check;
        self
    }

    pub fn with_status_interval(mut self, status_interval: Duration) -> Self {
        if !status_interval.is_zero() {
            self.status_interval = status_interval;
        }
        self
    }

    pub fn add_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}
