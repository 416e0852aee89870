//! Data types produced by the bandwidth probe.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One timed download
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub byte_count: u64,
    pub duration_secs: f64,
    pub throughput_mbps: f64,
}

impl Sample {
    /// Derive throughput from a byte count and elapsed time.
    ///
    /// Returns `None` when the throughput is not finite and positive; such
    /// samples are discarded rather than counted as zero.
    pub fn new(byte_count: u64, elapsed: Duration) -> Option<Self> {
        let duration_secs = elapsed.as_secs_f64();
        let throughput_mbps = (byte_count as f64 * 8.0) / duration_secs / 1_000_000.0;
        if !throughput_mbps.is_finite() || throughput_mbps <= 0.0 {
            return None;
        }
        Some(Self {
            byte_count,
            duration_secs,
            throughput_mbps,
        })
    }
}

/// Result of a single sampling method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodResult {
    /// Mean of the samples, rounded to whole Mbps
    pub speed: u64,
    /// Per-sample throughput in Mbps, full precision
    pub samples: Vec<f64>,
}

impl MethodResult {
    /// Summarize the successful samples of a method; `None` if there are none
    pub fn from_samples(samples: &[Sample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let values: Vec<f64> = samples.iter().map(|s| s.throughput_mbps).collect();
        let avg = values.iter().sum::<f64>() / values.len() as f64;
        Some(Self {
            speed: avg.round() as u64,
            samples: values,
        })
    }
}

/// Combined outcome of a probe run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    #[serde(rename = "speed")]
    pub speed_mbps: u64,
    pub unit: String,
    pub method: String,
    pub methods: BTreeMap<String, MethodResult>,
}

/// JSON form handed to callers: either a result or `{error}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProbeReport {
    Success(ProbeResult),
    Failure { error: String },
}

impl From<Result<ProbeResult, ProbeError>> for ProbeReport {
    fn from(outcome: Result<ProbeResult, ProbeError>) -> Self {
        match outcome {
            Ok(result) => ProbeReport::Success(result),
            Err(e) => ProbeReport::Failure { error: e.to_string() },
        }
    }
}

/// Errors raised while probing
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Sample throughput was not finite and positive")]
    InvalidSample,

    #[error("All speed test methods failed. Please check your internet connection.")]
    AllMethodsFailed,
}
