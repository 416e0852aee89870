//! Report generation for consensus statistics.
//!
//! Generates both JSON and human-readable text reports.

use std::fs;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use color_eyre::eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::consensus::{ConsensusResult, NetworkStatistics};

/// Where and how a report was produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: String,
    pub input_file: String,
    pub node_count: usize,
}

impl ReportMetadata {
    pub fn new(input_file: &Path, node_count: usize) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            input_file: input_file.display().to_string(),
            node_count,
        }
    }
}

/// Everything written for one aggregation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusReport {
    pub metadata: ReportMetadata,
    pub consensus: ConsensusResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub networks: Option<Vec<NetworkStatistics>>,
}

/// Generate JSON report
pub fn generate_json_report(report: &ConsensusReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialize report to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;

    log::info!("JSON report written to {}", output_path.display());
    Ok(())
}

/// Render the human-readable text report
pub fn render_text_report(report: &ConsensusReport) -> String {
    let mut lines: Vec<String> = Vec::new();
    let c = &report.consensus;

    // Header
    lines.push("=".repeat(80));
    lines.push("                      VERIFI CONSENSUS SPEED STATISTICS".to_string());
    lines.push("=".repeat(80));
    lines.push(String::new());

    lines.push(format!("Generated: {}", report.metadata.generated_at));
    lines.push(format!("Input: {}", report.metadata.input_file));
    lines.push(format!("Execution nodes: {}", report.metadata.node_count));
    lines.push(format!("Measurements: {}", c.total_inputs));
    lines.push(String::new());

    lines.push(format!("Average speed: {:.2} Mbps", c.average_speed));
    lines.push(format!("Median speed:  {:.2} Mbps", c.median_speed));
    lines.push(format!(
        "Range:         {:.2} - {:.2} Mbps ({:.2} Mbps spread)",
        c.min_speed, c.max_speed, c.speed_range
    ));
    lines.push(String::new());

    if let Some(ref networks) = report.networks {
        lines.push("=".repeat(80));
        lines.push("                              PER-NETWORK".to_string());
        lines.push("=".repeat(80));
        lines.push(String::new());

        if networks.is_empty() {
            lines.push("No measurements carry a network name.".to_string());
        }
        for net in networks {
            lines.push(format!(
                "{}: {} measurement(s), avg {:.2} Mbps, median {:.2} Mbps, range {:.2}-{:.2} Mbps, latest {}",
                net.wifi_name,
                net.total_measurements,
                net.average_speed,
                net.median_speed,
                net.min_speed,
                net.max_speed,
                net.latest_timestamp
            ));
        }
        lines.push(String::new());
    }

    // Footer
    lines.push("=".repeat(80));
    lines.join("\n")
}

/// Generate human-readable text report
pub fn generate_text_report(report: &ConsensusReport, output_path: &Path) -> Result<()> {
    fs::write(output_path, render_text_report(report))
        .with_context(|| format!("Failed to write text report to {}", output_path.display()))?;

    log::info!("Text report written to {}", output_path.display());
    Ok(())
}

/// Print a summary to stdout
pub fn print_summary(report: &ConsensusReport) {
    let c = &report.consensus;
    println!("\n=== CONSENSUS SPEED STATISTICS ===\n");
    println!("Measurements: {}", c.total_inputs);
    println!("Nodes: {}", report.metadata.node_count);
    println!("Average: {:.2} Mbps", c.average_speed);
    println!("Median: {:.2} Mbps", c.median_speed);
    println!("Min/Max: {:.2} / {:.2} Mbps", c.min_speed, c.max_speed);

    if let Some(ref networks) = report.networks {
        println!("\nNetworks: {}", networks.len());
        for net in networks.iter().take(5) {
            println!("  {}: {:.2} Mbps median", net.wifi_name, net.median_speed);
        }
    }

    println!();
}
