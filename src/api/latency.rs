//! In-memory latency histogram for the evaluation pipeline.
//! Records wall time of one engine run over a market batch.

use std::sync::Mutex;
use std::time::Duration;

use hdrhistogram::Histogram;

use crate::error::{AppError, Result};

/// Shared latency stats. Refresh loop records, API reads.
/// Values stored in microseconds.
pub struct LatencyStats {
    inner: Mutex<Histogram<u64>>,
}

impl LatencyStats {
    /// Tracks 1us to 100s, 3 significant figures.
    pub fn new() -> Result<Self> {
        let histogram = Histogram::new_with_bounds(1, 100_000_000, 3)
            .map_err(|e| AppError::Config(format!("latency histogram: {e}")))?;
        Ok(Self { inner: Mutex::new(histogram) })
    }

    pub fn record_us(&self, us: u64) {
        if let Ok(mut h) = self.inner.lock() {
            let _ = h.record(us.max(1));
        }
    }

    pub fn record(&self, d: Duration) {
        let us = d.as_micros().min(u128::from(u64::MAX)) as u64;
        self.record_us(us);
    }

    /// Return (p50_us, p95_us, p99_us). None if no samples.
    pub fn percentiles(&self) -> (Option<u64>, Option<u64>, Option<u64>) {
        let Ok(h) = self.inner.lock() else {
            return (None, None, None);
        };
        if h.len() == 0 {
            return (None, None, None);
        }
        (
            Some(h.value_at_quantile(0.5)),
            Some(h.value_at_quantile(0.95)),
            Some(h.value_at_quantile(0.99)),
        )
    }

    pub fn max_us(&self) -> Option<u64> {
        let h = self.inner.lock().ok()?;
        (h.len() > 0).then(|| h.max())
    }

    pub fn len(&self) -> u64 {
        self.inner.lock().map(|h| h.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_histogram_has_no_percentiles() {
        let stats = LatencyStats::new().unwrap();
        assert_eq!(stats.percentiles(), (None, None, None));
        assert_eq!(stats.max_us(), None);
        assert_eq!(stats.len(), 0);
    }

    #[test]
    fn percentiles_follow_samples() {
        let stats = LatencyStats::new().unwrap();
        for us in 1..=100 {
            stats.record_us(us);
        }
        let (p50, p95, p99) = stats.percentiles();
        assert_eq!(p50, Some(50));
        assert_eq!(p95, Some(95));
        assert_eq!(p99, Some(99));
        assert_eq!(stats.len(), 100);
    }

    #[test]
    fn sub_microsecond_runs_count_as_one() {
        let stats = LatencyStats::new().unwrap();
        stats.record(Duration::from_nanos(200));
        assert_eq!(stats.max_us(), Some(1));
    }
}
