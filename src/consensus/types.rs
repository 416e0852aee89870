//! Core data types for consensus aggregation.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::probe::ProbeResult;

/// A single user-submitted speed measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementRecord {
    pub lat: f64,
    pub lon: f64,
    /// ISO-8601 / RFC 3339 timestamp of the measurement
    pub timestamp: String,
    pub ip: String,
    pub wallet_address: String,
    /// Measured speed in Mbps
    pub speed: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi_name: Option<String>,
}

/// Location and identity metadata supplied by the caller of a probe
#[derive(Debug, Clone, Default)]
pub struct RecordMetadata {
    pub lat: f64,
    pub lon: f64,
    pub ip: String,
    pub wallet_address: String,
    pub wifi_name: Option<String>,
}

impl MeasurementRecord {
    /// Package a probe result with caller metadata, stamped with the current UTC time
    pub fn from_probe(result: &ProbeResult, metadata: RecordMetadata) -> Self {
        Self {
            lat: metadata.lat,
            lon: metadata.lon,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            ip: metadata.ip,
            wallet_address: metadata.wallet_address,
            speed: result.speed_mbps as f64,
            wifi_name: metadata.wifi_name,
        }
    }

    /// Parsed timestamp, if it is valid RFC 3339
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// Check the fields aggregation relies on
    ///
    /// # Returns
    /// * `Ok(())` if the record is usable
    /// * `Err(String)` naming the offending field otherwise
    pub fn validate(&self) -> Result<(), String> {
        if !self.speed.is_finite() || self.speed < 0.0 {
            return Err(format!("speed must be a finite non-negative number, got {}", self.speed));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(format!("lat {} is outside [-90, 90]", self.lat));
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(format!("lon {} is outside [-180, 180]", self.lon));
        }
        if self.parsed_timestamp().is_none() {
            return Err(format!("timestamp '{}' is not RFC 3339", self.timestamp));
        }
        if self.wallet_address.trim().is_empty() {
            return Err("walletAddress cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Envelope accepted by the aggregation entry point
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationInput {
    #[serde(default)]
    pub speed_data: Option<Vec<MeasurementRecord>>,
}

/// Order statistics computed by one execution node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeStatistics {
    pub average_speed: f64,
    pub median_speed: f64,
    pub min_speed: f64,
    pub max_speed: f64,
}

/// Final agreed-upon statistics for a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusResult {
    pub total_inputs: usize,
    pub average_speed: f64,
    pub median_speed: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    pub speed_range: f64,
    pub speeds: Vec<f64>,
}

/// A latitude/longitude pair as reported per network
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Consensus statistics for all measurements of one Wi-Fi network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatistics {
    pub wifi_name: String,
    pub total_measurements: usize,
    pub average_speed: f64,
    pub median_speed: f64,
    pub min_speed: f64,
    pub max_speed: f64,
    pub speed_range: f64,
    pub locations: Vec<Coordinates>,
    pub latest_timestamp: String,
}

/// Errors raised before or during aggregation
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConsensusError {
    #[error("No speed data provided for statistics calculation")]
    NoData,

    #[error("Node count must be at least 1, got {0}")]
    InvalidNodeCount(usize),

    #[error("Speed at index {index} must be a finite non-negative number, got {value}")]
    InvalidSpeed { index: usize, value: f64 },

    #[error("Invalid measurement record at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },
}
