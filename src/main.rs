use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use env_logger::Env;
use log::info;

use verifi::config_loader::{self, CliOverrides};
use verifi::consensus::{self, AggregationInput, ConsensusAggregator, MeasurementRecord, RecordMetadata};
use verifi::fetch::ArtifactFetcher;
use verifi::probe::{BandwidthProbe, ProbeReport};
use verifi::report::{self, ConsensusReport, ReportMetadata};

/// Wi-Fi speed measurement, artifact retrieval and consensus statistics
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Measure connection speed with both sampling methods
    Probe {
        /// Desired measurement duration in seconds
        #[arg(short, long)]
        duration: Option<f64>,

        /// Latitude of the measurement; together with --lon, --ip and --wallet emits a record
        #[arg(long, requires_all = ["lon", "ip", "wallet"])]
        lat: Option<f64>,

        #[arg(long, requires = "lat")]
        lon: Option<f64>,

        #[arg(long, requires = "lat")]
        ip: Option<String>,

        #[arg(long, requires = "lat")]
        wallet: Option<String>,

        /// Name of the measured Wi-Fi network
        #[arg(long)]
        wifi_name: Option<String>,

        /// Write the JSON output to this file as well
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Resolve a CID to its JSON payload
    Fetch {
        /// Content identifier
        cid: String,

        /// Direct download URL tried before the gateways
        #[arg(long)]
        url: Option<String>,
    },

    /// Reduce a batch of measurements to consensus statistics
    Aggregate {
        /// JSON file holding {"speedData": [...]}
        input: PathBuf,

        /// Number of execution nodes
        #[arg(short, long)]
        nodes: Option<usize>,

        /// Output directory for reports
        #[arg(short, long, default_value = "consensus_output")]
        output: PathBuf,

        /// Also compute statistics per Wi-Fi network
        #[arg(long)]
        by_network: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let cli = Cli::parse();

    let mut config = config_loader::load_or_default(cli.config.as_deref())?;

    // Initialize logging; the CLI flag wins over the configured level
    let level = cli
        .log_level
        .clone()
        .or_else(|| config.general.log_level.clone())
        .unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Probe {
            duration,
            lat,
            lon,
            ip,
            wallet,
            wifi_name,
            output,
        } => {
            config_loader::apply_overrides(
                &mut config,
                &CliOverrides {
                    duration_secs: duration,
                    ..CliOverrides::default()
                },
            )?;

            let probe = BandwidthProbe::from_config(&config.probe)
                .wrap_err("Failed to initialize bandwidth probe")?;
            let outcome = probe.measure(config.probe.duration_secs).await;

            let json = match (outcome, lat, lon, ip, wallet) {
                (Ok(result), Some(lat), Some(lon), Some(ip), Some(wallet_address)) => {
                    let record = MeasurementRecord::from_probe(
                        &result,
                        RecordMetadata {
                            lat,
                            lon,
                            ip,
                            wallet_address,
                            wifi_name,
                        },
                    );
                    record.validate().map_err(color_eyre::eyre::Report::msg)?;
                    serde_json::to_string_pretty(&record)?
                }
                (outcome, ..) => serde_json::to_string_pretty(&ProbeReport::from(outcome))?,
            };

            println!("{}", json);
            if let Some(path) = output {
                fs::write(&path, &json)
                    .with_context(|| format!("Failed to write probe output to {}", path.display()))?;
                info!("Probe output written to {}", path.display());
            }
        }

        Commands::Fetch { cid, url } => {
            let fetcher = ArtifactFetcher::from_config(&config.fetcher)
                .wrap_err("Failed to initialize artifact fetcher")?;

            match fetcher.fetch(&cid, url.as_deref()).await? {
                Some(artifact) => {
                    if let Some(spot) = artifact.spot() {
                        let (lat, lng) = spot.location.to_microdegrees();
                        info!("Spot coordinates in microdegrees: ({}, {})", lat, lng);
                    }
                    println!("{}", serde_json::to_string_pretty(&artifact)?);
                }
                None => bail!("No source returned a payload for {}", cid),
            }
        }

        Commands::Aggregate {
            input,
            nodes,
            output,
            by_network,
        } => {
            config_loader::apply_overrides(
                &mut config,
                &CliOverrides {
                    node_count: nodes,
                    ..CliOverrides::default()
                },
            )?;

            let content = fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let batch: AggregationInput = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", input.display()))?;

            let aggregator = ConsensusAggregator::from_config(&config.consensus)?;
            let result = aggregator.aggregate_input(&batch)?;

            let networks = if by_network {
                let records = batch.speed_data.as_deref().unwrap_or_default();
                Some(consensus::summarize_by_network(records, &aggregator)?)
            } else {
                None
            };

            let report = ConsensusReport {
                metadata: ReportMetadata::new(&input, aggregator.node_count()),
                consensus: result,
                networks,
            };

            fs::create_dir_all(&output)
                .with_context(|| format!("Failed to create output directory: {}", output.display()))?;
            report::generate_json_report(&report, &output.join("consensus_report.json"))?;
            report::generate_text_report(&report, &output.join("consensus_report.txt"))?;
            report::print_summary(&report);
        }
    }

    Ok(())
}
