//! Artifact retrieval from content-addressed storage.
//!
//! A content identifier is resolved by walking an ordered list of candidate
//! sources: the caller's direct URL first, then the configured gateways. The
//! walk is strictly sequential and stops at the first source that yields a
//! payload. Failures along the way are logged and skipped; running out of
//! candidates is reported as "not found", never as an error.

pub mod car;
pub mod source;

use std::time::Duration;

use log::{info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::FetcherConfig;
use crate::utils::validation::validate_cid;

pub use car::{extract_json, ScanState};
pub use source::{decode_payload, ArtifactSource, Endpoint, HttpSource};

/// Errors from a single candidate, or from input validation
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Invalid content identifier: {0}")]
    InvalidCid(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Source returned an HTML page (likely an error page)")]
    HtmlErrorPage,

    #[error("Invalid JSON payload: {0}")]
    Json(serde_json::Error),

    #[error("No embedded JSON object found in payload")]
    NoEmbeddedJson,
}

/// A resolved artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub cid: String,
    pub payload: Value,
    /// Label of the candidate that produced the payload
    pub source_used: String,
}

/// Coordinates as stored in spot payloads
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    /// Integer micro-degree form used by registries: `round(coord * 1e6)`
    pub fn to_microdegrees(&self) -> (i64, i64) {
        (
            (self.lat * 1_000_000.0).round() as i64,
            (self.lng * 1_000_000.0).round() as i64,
        )
    }
}

/// Typed view of a Wi-Fi spot payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotPayload {
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
}

impl Artifact {
    /// Decode the payload as a spot, if it has that shape
    pub fn spot(&self) -> Option<SpotPayload> {
        serde_json::from_value(self.payload.clone()).ok()
    }
}

/// Resolves CIDs across an ordered chain of sources
pub struct ArtifactFetcher {
    client: Client,
    gateways: Vec<Box<dyn ArtifactSource>>,
    direct_timeout: Duration,
}

impl ArtifactFetcher {
    /// Build a fetcher over HTTP gateways described by the configuration
    pub fn from_config(config: &FetcherConfig) -> Result<Self, FetchError> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &FetcherConfig) -> Self {
        let gateways = config
            .gateways
            .iter()
            .map(|prefix| {
                Box::new(HttpSource::gateway(client.clone(), prefix.clone(), config.gateway_timeout))
                    as Box<dyn ArtifactSource>
            })
            .collect();
        Self {
            client,
            gateways,
            direct_timeout: config.direct_timeout,
        }
    }

    /// Use an explicit chain of sources instead of HTTP gateways
    pub fn from_sources(client: Client, sources: Vec<Box<dyn ArtifactSource>>, direct_timeout: Duration) -> Self {
        Self {
            client,
            gateways: sources,
            direct_timeout,
        }
    }

    /// Resolve `cid`, trying `direct_url` first when given.
    ///
    /// Returns `Ok(None)` when every candidate failed. The only error is an
    /// invalid CID, reported before any request is made.
    pub async fn fetch(&self, cid: &str, direct_url: Option<&str>) -> Result<Option<Artifact>, FetchError> {
        validate_cid(cid).map_err(FetchError::InvalidCid)?;

        let direct = direct_url.map(|url| HttpSource::direct(self.client.clone(), url, self.direct_timeout));

        let mut candidates: Vec<&dyn ArtifactSource> = Vec::with_capacity(self.gateways.len() + 1);
        if let Some(source) = &direct {
            candidates.push(source);
        }
        for source in &self.gateways {
            candidates.push(source.as_ref());
        }

        Ok(walk(cid, candidates).await)
    }
}

/// Try each source in order, stopping at the first success
pub async fn walk<'a, I>(cid: &str, candidates: I) -> Option<Artifact>
where
    I: IntoIterator<Item = &'a dyn ArtifactSource>,
{
    for source in candidates {
        info!("Trying {} for {}", source.label(), cid);
        match source.retrieve(cid).await {
            Ok(payload) => {
                info!("Retrieved {} from {}", cid, source.label());
                return Some(Artifact {
                    cid: cid.to_string(),
                    payload,
                    source_used: source.label().to_string(),
                });
            }
            Err(e) => warn!("{} failed for {}: {}", source.label(), cid, e),
        }
    }

    warn!("All sources exhausted for {}", cid);
    None
}
