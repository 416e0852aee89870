//! HTTP-backed sampling methods: well-known CDN files and a speed-test endpoint.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use log::debug;
use reqwest::header::CACHE_CONTROL;
use reqwest::Client;

use super::method::SamplingMethod;
use super::types::{ProbeError, Sample};
use crate::config::{CdnConfig, CdnFile, SpeedTestConfig};

/// Download `url` to completion and time it
async fn timed_download(client: &Client, url: &str) -> Result<Sample, ProbeError> {
    let start = Instant::now();
    let response = client
        .get(url)
        .header(CACHE_CONTROL, "no-store")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ProbeError::Status(response.status().as_u16()));
    }

    let body = response.bytes().await?;
    Sample::new(body.len() as u64, start.elapsed()).ok_or(ProbeError::InvalidSample)
}

/// Downloads well-known static files from public CDNs
#[derive(Debug, Clone)]
pub struct CdnFileMethod {
    client: Client,
    files: Vec<CdnFile>,
    timeout: Duration,
}

impl CdnFileMethod {
    pub fn new(client: Client, config: &CdnConfig) -> Self {
        Self {
            client,
            files: config.files.clone(),
            timeout: config.timeout,
        }
    }

    /// URL for the `index`-th sample, rotating through the files with a cache-busting query
    fn sample_url(&self, index: usize) -> Option<(&CdnFile, String)> {
        if self.files.is_empty() {
            return None;
        }
        let file = &self.files[index % self.files.len()];
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let separator = if file.url.contains('?') { '&' } else { '?' };
        Some((file, format!("{}{}nocache={}-{}", file.url, separator, millis, index)))
    }
}

#[async_trait]
impl SamplingMethod for CdnFileMethod {
    fn name(&self) -> &str {
        "cdn"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn sample(&self, index: usize) -> Result<Sample, ProbeError> {
        let (file, url) = self.sample_url(index).ok_or(ProbeError::InvalidSample)?;
        let sample = timed_download(&self.client, &url).await?;
        if sample.byte_count != file.size {
            debug!("{} returned {} bytes, expected {}", file.url, sample.byte_count, file.size);
        }
        Ok(sample)
    }
}

/// Downloads a requested number of bytes from a dedicated speed-test endpoint
#[derive(Debug, Clone)]
pub struct SpeedEndpointMethod {
    client: Client,
    endpoint: String,
    bytes: u64,
    timeout: Duration,
}

impl SpeedEndpointMethod {
    pub fn new(client: Client, config: &SpeedTestConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            bytes: config.bytes,
            timeout: config.timeout,
        }
    }

    fn sample_url(&self) -> String {
        format!("{}?bytes={}", self.endpoint, self.bytes)
    }
}

#[async_trait]
impl SamplingMethod for SpeedEndpointMethod {
    fn name(&self) -> &str {
        "cloudflare"
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn sample(&self, _index: usize) -> Result<Sample, ProbeError> {
        timed_download(&self.client, &self.sample_url()).await
    }
}
