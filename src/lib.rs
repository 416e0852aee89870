//! # VeriFi - measurement and consensus core for crowd-sourced Wi-Fi speeds
//!
//! This library implements the pipeline that turns user-submitted network
//! measurements into a single agreed-upon statistic set that downstream
//! consumers (such as an on-chain registry) can treat as ground truth.
//!
//! ## Overview
//!
//! A client probes its connection, packages the result with location and
//! identity metadata, and publishes it to content-addressed storage. Batches
//! of such records are later retrieved and reduced to consensus statistics
//! that tolerate a minority of faulty execution nodes.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `probe`: Dual-method bandwidth probing (CDN files and a speed-test endpoint)
//! - `fetch`: CID resolution across a fallback chain of gateways, including
//!   JSON recovery from binary CAR payloads
//! - `consensus`: Per-node order statistics and median-of-nodes reduction
//! - `report`: JSON and text reports for aggregation runs
//! - `config`: Type-safe configuration structures and YAML parsing
//! - `config_loader`: Configuration file loading and CLI overrides
//! - `utils`: Validation helpers
//!
//! ## Example Usage
//!
//! ```rust
//! use verifi::consensus::aggregate;
//!
//! let result = aggregate(&[10.0, 20.0, 30.0, 40.0], 3)?;
//! assert_eq!(result.median_speed, 25.0);
//! assert_eq!(result.speed_range, 30.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ```rust,no_run
//! use verifi::{config::FetcherConfig, fetch::ArtifactFetcher};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = ArtifactFetcher::from_config(&FetcherConfig::default())?;
//! if let Some(artifact) = fetcher.fetch("bafybeie3k3hqe445fxunrbzzrtesx6vyfdqj6g6vjhpknvi5tge4ofji2y", None).await? {
//!     println!("{} via {}", artifact.payload, artifact.source_used);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration Format
//!
//! ```yaml
//! probe:
//!   duration_secs: 5
//!   inter_sample_delay: 500ms
//! fetcher:
//!   gateway_timeout: 10s
//!   gateways: ["https://ipfs.io/ipfs/", "https://dweb.link/ipfs/"]
//! consensus:
//!   node_count: 3
//!   node_view: identical   # or permuted
//! ```
//!
//! ## Error Handling
//!
//! Each module reports failures through its own `thiserror` enum. Recoverable
//! failures (a gateway timing out, a failed sample) are logged and absorbed;
//! only terminal states reach the caller. The binary and the configuration
//! loader use `color_eyre` for error reporting with context.

pub mod config;
pub mod config_loader;
pub mod consensus;
pub mod fetch;
pub mod probe;
pub mod report;
pub mod utils;
