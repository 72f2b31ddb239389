//! Decision counters and latency statistics for the loan approval service.

use crate::models::inference::PredictionResult;
use crate::types::decision::LoanStatus;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for the service loop
pub struct ServiceMetrics {
    /// Applications that produced a decision
    pub applications_processed: AtomicU64,
    pub approvals: AtomicU64,
    pub rejections: AtomicU64,
    /// Payloads that could not be decoded
    pub malformed_applications: AtomicU64,
    /// Applications whose prediction failed
    pub failed_predictions: AtomicU64,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Approval probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ServiceMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            applications_processed: AtomicU64::new(0),
            approvals: AtomicU64::new(0),
            rejections: AtomicU64::new(0),
            malformed_applications: AtomicU64::new(0),
            failed_predictions: AtomicU64::new(0),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a completed prediction
    pub fn record_decision(&self, processing_time: Duration, result: &PredictionResult) {
        self.applications_processed.fetch_add(1, Ordering::Relaxed);
        match result.label {
            LoanStatus::Approved => self.approvals.fetch_add(1, Ordering::Relaxed),
            LoanStatus::Rejected => self.rejections.fetch_add(1, Ordering::Relaxed),
        };

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        if let Some(probabilities) = result.probabilities {
            let bucket = (probabilities.approve.clamp(0.0, 1.0) * 10.0).min(9.0) as usize;
            if let Ok(mut buckets) = self.probability_buckets.write() {
                buckets[bucket] += 1;
            }
        }
    }

    /// Record a payload that could not be decoded
    pub fn record_malformed(&self) {
        self.malformed_applications.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a prediction error
    pub fn record_failure(&self) {
        self.failed_predictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = match self.processing_times.read() {
            Ok(times) => times,
            Err(_) => return ProcessingStats::default(),
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[((count as f64 * 0.95) as usize).min(count - 1)],
            p99_us: sorted[((count as f64 * 0.99) as usize).min(count - 1)],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Share of decided applications that were approved
    pub fn get_approval_rate(&self) -> f64 {
        let processed = self.applications_processed.load(Ordering::Relaxed);
        if processed == 0 {
            return 0.0;
        }
        self.approvals.load(Ordering::Relaxed) as f64 / processed as f64
    }

    /// Get current throughput (applications per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.applications_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get approval probability distribution
    pub fn get_probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|buckets| *buckets)
            .unwrap_or([0; 10])
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let processed = self.applications_processed.load(Ordering::Relaxed);
        let approvals = self.approvals.load(Ordering::Relaxed);
        let rejections = self.rejections.load(Ordering::Relaxed);
        let malformed = self.malformed_applications.load(Ordering::Relaxed);
        let failed = self.failed_predictions.load(Ordering::Relaxed);
        let processing = self.get_processing_stats();

        info!(
            processed,
            approvals,
            rejections,
            malformed,
            failed,
            approval_rate = format!("{:.1}%", self.get_approval_rate() * 100.0),
            throughput = format!("{:.2} app/s", self.get_throughput()),
            mean_us = processing.mean_us,
            p50_us = processing.p50_us,
            p99_us = processing.p99_us,
            "Loan decision summary"
        );

        let distribution = self.get_probability_distribution();
        let total: u64 = distribution.iter().sum();
        if total == 0 {
            return;
        }
        for (i, &count) in distribution.iter().enumerate() {
            let pct = (count as f64 / total as f64) * 100.0;
            let bar: String = "█".repeat(((pct / 5.0) as usize).min(20));
            info!(
                "  P(approve) {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Periodically logs a metrics summary
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::decision::ClassProbabilities;

    fn result(label: LoanStatus, p_approve: Option<f64>) -> PredictionResult {
        PredictionResult {
            label,
            probabilities: p_approve.map(|p| ClassProbabilities::from_pair([1.0 - p, p])),
            importances: None,
        }
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = ServiceMetrics::new();

        metrics.record_decision(Duration::from_micros(100), &result(LoanStatus::Approved, Some(0.9)));
        metrics.record_decision(Duration::from_micros(300), &result(LoanStatus::Rejected, None));
        metrics.record_malformed();
        metrics.record_failure();

        assert_eq!(metrics.applications_processed.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.approvals.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.rejections.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.malformed_applications.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.failed_predictions.load(Ordering::Relaxed), 1);
        assert!((metrics.get_approval_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_probability_buckets() {
        let metrics = ServiceMetrics::new();

        metrics.record_decision(Duration::from_micros(10), &result(LoanStatus::Approved, Some(1.0)));
        metrics.record_decision(Duration::from_micros(10), &result(LoanStatus::Rejected, Some(0.05)));

        let distribution = metrics.get_probability_distribution();
        assert_eq!(distribution[9], 1);
        assert_eq!(distribution[0], 1);
        assert_eq!(distribution.iter().sum::<u64>(), 2);
    }

    #[test]
    fn test_processing_stats() {
        let metrics = ServiceMetrics::new();
        assert_eq!(metrics.get_processing_stats().count, 0);

        for us in [100, 200, 300, 400] {
            metrics.record_decision(Duration::from_micros(us), &result(LoanStatus::Approved, None));
        }

        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 250);
        assert_eq!(stats.p50_us, 300);
        assert_eq!(stats.max_us, 400);
    }
}
