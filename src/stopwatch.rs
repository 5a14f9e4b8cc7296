use std::time::Instant;
use tdigest::TDigest;

/// Collects per-user recommendation latencies and reports percentiles.
#[derive(Clone)]
pub struct Stopwatch {
    start_time: Instant,
    durations_micros: Vec<f64>,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    pub fn new() -> Stopwatch {
        Stopwatch {
            start_time: Instant::now(),
            durations_micros: Vec::new(),
        }
    }

    pub fn start(&mut self) {
        self.start_time = Instant::now();
    }

    pub fn stop(&mut self) {
        let duration = self.start_time.elapsed();
        self.record(duration.as_micros() as f64);
    }

    pub fn record(&mut self, micros: f64) {
        self.durations_micros.push(micros);
    }

    pub fn get_n(&self) -> usize {
        self.durations_micros.len()
    }

    /// Estimated latency at quantile `q`, with `q` in `[0, 1]`.
    pub fn get_percentile_in_micros(&self, q: f64) -> f64 {
        let t_digest = TDigest::new_with_size(100);
        let sorted_digest = t_digest.merge_unsorted(self.durations_micros.clone());
        sorted_digest.estimate_quantile(q)
    }
}

#[cfg(test)]
mod stopwatch_test {
    use super::*;

    #[test]
    fn should_estimate_percentiles() {
        let mut stopwatch = Stopwatch::new();
        for micros in 1..=100 {
            stopwatch.record(micros as f64);
        }
        assert_eq!(100, stopwatch.get_n());

        let p50 = stopwatch.get_percentile_in_micros(0.5);
        let p90 = stopwatch.get_percentile_in_micros(0.9);
        let p99 = stopwatch.get_percentile_in_micros(0.99);
        assert!((p50 - 50.0).abs() <= 2.0);
        assert!((p90 - 90.0).abs() <= 2.0);
        assert!(p50 <= p90 && p90 <= p99);
    }

    #[test]
    fn should_time_an_interval() {
        let mut stopwatch = Stopwatch::default();
        stopwatch.start();
        stopwatch.stop();
        assert_eq!(1, stopwatch.get_n());
        assert!(stopwatch.get_percentile_in_micros(0.5) >= 0.0);
    }
}
