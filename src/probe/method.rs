//! Sampling methods and the sequential per-method sampling loop.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};

use super::types::{MethodResult, ProbeError, Sample};

/// An independent way of taking throughput samples
#[async_trait]
pub trait SamplingMethod: Send + Sync {
    /// Key used in the per-method breakdown (e.g. "cdn")
    fn name(&self) -> &str;

    /// Upper bound for a single sample
    fn timeout(&self) -> Duration;

    /// Take the `index`-th sample
    async fn sample(&self, index: usize) -> Result<Sample, ProbeError>;
}

/// Number of samples each method takes for a requested duration
pub fn sample_count(duration_secs: f64) -> usize {
    let rounded = (duration_secs / 2.0).round();
    if rounded.is_nan() {
        return 1;
    }
    rounded.clamp(1.0, 3.0) as usize
}

/// Take `samples` samples one after another, skipping failures.
///
/// Samples are sequential so they do not compete for bandwidth; the delay is
/// applied between samples, not after the last one.
pub async fn run_method(
    method: &dyn SamplingMethod,
    samples: usize,
    inter_sample_delay: Duration,
) -> Option<MethodResult> {
    let mut taken: Vec<Sample> = Vec::with_capacity(samples);

    for i in 0..samples {
        match tokio::time::timeout(method.timeout(), method.sample(i)).await {
            Ok(Ok(sample)) => {
                debug!(
                    "{} sample {}: {} bytes in {:.3}s",
                    method.name(),
                    i + 1,
                    sample.byte_count,
                    sample.duration_secs
                );
                info!("{} sample {}: {:.2} Mbps", method.name(), i + 1, sample.throughput_mbps);
                taken.push(sample);
            }
            Ok(Err(e)) => warn!("{} sample {} failed: {}", method.name(), i + 1, e),
            Err(_) => warn!(
                "{} sample {} timed out after {:?}",
                method.name(),
                i + 1,
                method.timeout()
            ),
        }

        if i + 1 < samples && !inter_sample_delay.is_zero() {
            tokio::time::sleep(inter_sample_delay).await;
        }
    }

    MethodResult::from_samples(&taken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Flaky {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SamplingMethod for Flaky {
        fn name(&self) -> &str {
            "flaky"
        }

        fn timeout(&self) -> Duration {
            Duration::from_millis(50)
        }

        async fn sample(&self, index: usize) -> Result<Sample, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match index {
                0 => Err(ProbeError::Status(503)),
                1 => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Sample::new(1, Duration::from_secs(1)).ok_or(ProbeError::InvalidSample)
                }
                _ => Sample::new(2_500_000, Duration::from_secs(1)).ok_or(ProbeError::InvalidSample),
            }
        }
    }

    #[test]
    fn test_sample_count_clamped() {
        assert_eq!(sample_count(0.0), 1);
        assert_eq!(sample_count(1.0), 1);
        assert_eq!(sample_count(3.0), 2);
        assert_eq!(sample_count(5.0), 3);
        assert_eq!(sample_count(60.0), 3);
        assert_eq!(sample_count(f64::NAN), 1);
    }

    #[tokio::test]
    async fn test_failed_and_timed_out_samples_are_skipped() {
        let method = Flaky {
            calls: AtomicUsize::new(0),
        };
        let result = run_method(&method, 3, Duration::ZERO).await.unwrap();
        assert_eq!(method.calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.samples, vec![20.0]);
        assert_eq!(result.speed, 20);
    }

    /// Instant samples that record when each call started and how many overlapped
    #[derive(Default)]
    struct Recording {
        started: std::sync::Mutex<Vec<tokio::time::Instant>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl SamplingMethod for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(1)
        }

        async fn sample(&self, _index: usize) -> Result<Sample, ProbeError> {
            self.started.lock().unwrap().push(tokio::time::Instant::now());
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Sample::new(1_250_000, Duration::from_secs(1)).ok_or(ProbeError::InvalidSample)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_only_between_sequential_samples() {
        let delay = Duration::from_millis(500);
        let method = Recording::default();

        let start = tokio::time::Instant::now();
        let result = run_method(&method, 3, delay).await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(result.samples.len(), 3);
        assert_eq!(method.max_in_flight.load(Ordering::SeqCst), 1);

        let started = method.started.lock().unwrap().clone();
        assert_eq!(started.len(), 3);
        for pair in started.windows(2) {
            assert!(pair[1] - pair[0] >= delay);
        }

        // Two gaps for three samples, none after the last
        assert!(elapsed >= delay * 2);
        assert!(elapsed < delay * 2 + Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_sample_has_no_trailing_delay() {
        let delay = Duration::from_millis(500);
        let method = Recording::default();

        let start = tokio::time::Instant::now();
        run_method(&method, 1, delay).await.unwrap();

        assert!(start.elapsed() < delay);
    }

    #[tokio::test]
    async fn test_no_successful_samples_is_no_result() {
        let method = Flaky {
            calls: AtomicUsize::new(0),
        };
        assert!(run_method(&method, 1, Duration::ZERO).await.is_none());
    }
}
