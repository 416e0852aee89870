//! Client-side bandwidth probing.
//!
//! Two independent sampling methods run concurrently as separate tasks. Each
//! takes a small number of sequential timed downloads; the combined estimate
//! is the mean of whichever methods produced a result.

pub mod http;
pub mod method;
pub mod types;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use reqwest::Client;

use crate::config::ProbeConfig;

pub use http::{CdnFileMethod, SpeedEndpointMethod};
pub use method::{run_method, sample_count, SamplingMethod};
pub use types::*;

/// Measures achievable throughput with two concurrent sampling methods
#[derive(Clone)]
pub struct BandwidthProbe {
    methods: [Arc<dyn SamplingMethod>; 2],
    inter_sample_delay: Duration,
}

impl BandwidthProbe {
    pub fn new(
        cdn: Arc<dyn SamplingMethod>,
        endpoint: Arc<dyn SamplingMethod>,
        inter_sample_delay: Duration,
    ) -> Self {
        Self {
            methods: [cdn, endpoint],
            inter_sample_delay,
        }
    }

    /// Build the HTTP-backed probe described by the configuration
    pub fn from_config(config: &ProbeConfig) -> Result<Self, ProbeError> {
        let client = Client::builder().build()?;
        Ok(Self::new(
            Arc::new(CdnFileMethod::new(client.clone(), &config.cdn)),
            Arc::new(SpeedEndpointMethod::new(client, &config.speed_test)),
            config.inter_sample_delay,
        ))
    }

    /// Run both methods concurrently and combine their results.
    ///
    /// A method that fails entirely (or whose task panics) is left out of the
    /// combination; only when both fail is an error returned.
    pub async fn measure(&self, duration_secs: f64) -> Result<ProbeResult, ProbeError> {
        let samples = sample_count(duration_secs);
        info!(
            "Starting parallel speed test with {} methods, {} sample(s) each",
            self.methods.len(),
            samples
        );

        let [first, second] = self.methods.clone();
        let first_handle = self.spawn_method(first, samples);
        let second_handle = self.spawn_method(second, samples);
        let (first_outcome, second_outcome) = tokio::join!(first_handle, second_handle);

        let mut results = BTreeMap::new();
        for (method, outcome) in self.methods.iter().zip([first_outcome, second_outcome]) {
            match outcome {
                Ok(Some(result)) => {
                    info!("{} test: {} Mbps", method.name(), result.speed);
                    results.insert(method.name().to_string(), result);
                }
                Ok(None) => warn!("{} test failed", method.name()),
                Err(e) => warn!("{} test did not complete: {}", method.name(), e),
            }
        }

        let combined = combine(&results).ok_or(ProbeError::AllMethodsFailed)?;
        info!(
            "Successful tests: {}/{}, average speed: {} Mbps",
            results.len(),
            self.methods.len(),
            combined
        );

        Ok(ProbeResult {
            speed_mbps: combined,
            unit: "Mbps".to_string(),
            method: format!("Average of {} method(s)", results.len()),
            methods: results,
        })
    }

    fn spawn_method(
        &self,
        method: Arc<dyn SamplingMethod>,
        samples: usize,
    ) -> tokio::task::JoinHandle<Option<MethodResult>> {
        let delay = self.inter_sample_delay;
        tokio::spawn(async move { run_method(method.as_ref(), samples, delay).await })
    }
}

/// Unweighted mean of the per-method speeds, rounded to whole Mbps
pub fn combine(results: &BTreeMap<String, MethodResult>) -> Option<u64> {
    if results.is_empty() {
        return None;
    }
    let total: f64 = results.values().map(|r| r.speed as f64).sum();
    Some((total / results.len() as f64).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    enum Behaviour {
        Mbps(u64),
        Fail,
        Panic,
    }

    struct Fake {
        name: &'static str,
        behaviour: Behaviour,
    }

    #[async_trait]
    impl SamplingMethod for Fake {
        fn name(&self) -> &str {
            self.name
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(1)
        }

        async fn sample(&self, _index: usize) -> Result<Sample, ProbeError> {
            match self.behaviour {
                // 1 Mbps == 125_000 bytes per second
                Behaviour::Mbps(mbps) => {
                    Sample::new(mbps * 125_000, Duration::from_secs(1)).ok_or(ProbeError::InvalidSample)
                }
                Behaviour::Fail => Err(ProbeError::Status(500)),
                Behaviour::Panic => panic!("sampler crashed"),
            }
        }
    }

    fn probe(cdn: Behaviour, endpoint: Behaviour) -> BandwidthProbe {
        BandwidthProbe::new(
            Arc::new(Fake {
                name: "cdn",
                behaviour: cdn,
            }),
            Arc::new(Fake {
                name: "cloudflare",
                behaviour: endpoint,
            }),
            Duration::ZERO,
        )
    }

    #[tokio::test]
    async fn test_both_methods_average() {
        let result = probe(Behaviour::Mbps(40), Behaviour::Mbps(51))
            .measure(5.0)
            .await
            .unwrap();
        // (40 + 51) / 2 = 45.5 rounds up
        assert_eq!(result.speed_mbps, 46);
        assert_eq!(result.unit, "Mbps");
        assert_eq!(result.method, "Average of 2 method(s)");
        assert_eq!(result.methods["cdn"].samples.len(), 3);
        assert_eq!(result.methods["cloudflare"].speed, 51);
    }

    #[tokio::test]
    async fn test_single_method_value_unchanged() {
        let result = probe(Behaviour::Fail, Behaviour::Mbps(42))
            .measure(2.0)
            .await
            .unwrap();
        assert_eq!(result.speed_mbps, 42);
        assert!(!result.methods.contains_key("cdn"));
        assert_eq!(result.method, "Average of 1 method(s)");
    }

    #[tokio::test]
    async fn test_both_methods_fail_is_error() {
        let outcome = probe(Behaviour::Fail, Behaviour::Fail).measure(5.0).await;
        assert!(matches!(outcome, Err(ProbeError::AllMethodsFailed)));

        let report: ProbeReport = outcome.into();
        assert!(matches!(report, ProbeReport::Failure { .. }));
    }

    #[tokio::test]
    async fn test_panicking_method_does_not_fail_probe() {
        let result = probe(Behaviour::Panic, Behaviour::Mbps(42))
            .measure(1.0)
            .await
            .unwrap();
        assert_eq!(result.speed_mbps, 42);
        assert_eq!(result.methods.len(), 1);
    }

    #[test]
    fn test_combine_empty() {
        assert_eq!(combine(&BTreeMap::new()), None);
    }
}
