use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consensus::NodeViewMode;
use crate::utils::validation::validate_http_url;

/// Top-level configuration that mirrors the YAML file.
///
/// Every section falls back to its defaults, so an empty document is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub probe: ProbeConfig,
    pub fetcher: FetcherConfig,
    pub consensus: ConsensusConfig,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.probe.validate()?;
        self.fetcher.validate()?;
        self.consensus.validate()?;
        Ok(())
    }
}

/// Shared general configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GeneralConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

/// Bandwidth probe settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ProbeConfig {
    /// Requested measurement duration; drives the per-method sample count
    pub duration_secs: f64,
    #[serde(with = "humantime_serde")]
    pub inter_sample_delay: Duration,
    pub cdn: CdnConfig,
    pub speed_test: SpeedTestConfig,
}

impl ProbeConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if !self.duration_secs.is_finite() || self.duration_secs <= 0.0 {
            return Err(ValidationError::InvalidProbe(format!(
                "duration_secs must be positive, got {}",
                self.duration_secs
            )));
        }

        if self.cdn.files.is_empty() {
            return Err(ValidationError::InvalidProbe(
                "cdn.files cannot be empty".to_string(),
            ));
        }
        for file in &self.cdn.files {
            validate_http_url(&file.url).map_err(ValidationError::InvalidProbe)?;
        }
        if self.cdn.timeout.is_zero() {
            return Err(ValidationError::InvalidProbe(
                "cdn.timeout must be greater than zero".to_string(),
            ));
        }

        validate_http_url(&self.speed_test.endpoint).map_err(ValidationError::InvalidProbe)?;
        if self.speed_test.bytes == 0 {
            return Err(ValidationError::InvalidProbe(
                "speed_test.bytes must be greater than zero".to_string(),
            ));
        }
        if self.speed_test.timeout.is_zero() {
            return Err(ValidationError::InvalidProbe(
                "speed_test.timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// CDN file download method
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CdnConfig {
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub files: Vec<CdnFile>,
}

/// A static file of known size
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CdnFile {
    pub url: String,
    /// Expected size in bytes
    pub size: u64,
}

/// Dedicated speed-test endpoint method
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SpeedTestConfig {
    pub endpoint: String,
    /// Bytes requested per sample
    pub bytes: u64,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

/// Artifact fetcher settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct FetcherConfig {
    #[serde(with = "humantime_serde")]
    pub direct_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub gateway_timeout: Duration,
    /// Gateway prefixes in priority order; the CID is appended to each
    pub gateways: Vec<String>,
}

impl FetcherConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.direct_timeout.is_zero() || self.gateway_timeout.is_zero() {
            return Err(ValidationError::InvalidFetcher(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        for gateway in &self.gateways {
            validate_http_url(gateway).map_err(ValidationError::InvalidFetcher)?;
        }
        Ok(())
    }
}

/// Consensus aggregation settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ConsensusConfig {
    pub node_count: usize,
    pub node_view: NodeViewMode,
    /// Base seed for permuted node views
    pub seed: u64,
}

impl ConsensusConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.node_count == 0 {
            return Err(ValidationError::InvalidConsensus(
                "node_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid probe configuration: {0}")]
    InvalidProbe(String),
    #[error("Invalid fetcher configuration: {0}")]
    InvalidFetcher(String),
    #[error("Invalid consensus configuration: {0}")]
    InvalidConsensus(String),
}

/// Default implementations
impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            duration_secs: 5.0,
            inter_sample_delay: Duration::from_millis(500),
            cdn: CdnConfig::default(),
            speed_test: SpeedTestConfig::default(),
        }
    }
}

impl Default for CdnConfig {
    fn default() -> Self {
        let file = |url: &str, size: u64| CdnFile {
            url: url.to_string(),
            size,
        };
        Self {
            timeout: Duration::from_secs(10),
            files: vec![
                file("https://code.jquery.com/jquery-3.7.1.min.js", 89_476),
                file(
                    "https://cdn.jsdelivr.net/npm/bootstrap@5.3.2/dist/js/bootstrap.bundle.min.js",
                    277_907,
                ),
                file("https://cdn.jsdelivr.net/npm/three@0.159.0/build/three.min.js", 696_812),
            ],
        }
    }
}

impl Default for SpeedTestConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://speed.cloudflare.com/__down".to_string(),
            bytes: 10_000_000,
            timeout: Duration::from_secs(5),
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            direct_timeout: Duration::from_secs(15),
            gateway_timeout: Duration::from_secs(10),
            gateways: vec![
                "https://ipfs.io/ipfs/".to_string(),
                "https://dweb.link/ipfs/".to_string(),
                "https://gateway.pinata.cloud/ipfs/".to_string(),
                "https://trustless-gateway.link/ipfs/".to_string(),
            ],
        }
    }
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            node_count: 3,
            node_view: NodeViewMode::Identical,
            seed: 0,
        }
    }
}
