//! Service metrics for the analysis worker.

use crate::error::AnalysisError;
use crate::types::result::Summary;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector shared by all request tasks
pub struct PipelineMetrics {
    /// Batches analyzed successfully
    pub analyses_completed: AtomicU64,
    /// Batches that failed
    pub analyses_failed: AtomicU64,
    /// Transaction rows across completed batches
    pub rows_processed: AtomicU64,
    /// Rows flagged by the detector
    pub anomalies_detected: AtomicU64,
    /// Rows carrying the ground-truth fraud label
    pub fraud_labels: AtomicU64,
    /// Failures by error kind
    failures_by_kind: RwLock<HashMap<&'static str, u64>>,
    /// Batch processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            analyses_completed: AtomicU64::new(0),
            analyses_failed: AtomicU64::new(0),
            rows_processed: AtomicU64::new(0),
            anomalies_detected: AtomicU64::new(0),
            fraud_labels: AtomicU64::new(0),
            failures_by_kind: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            start_time: Instant::now(),
        }
    }

    /// Record a completed batch
    pub fn record_analysis(&self, processing_time: Duration, summary: &Summary) {
        self.analyses_completed.fetch_add(1, Ordering::Relaxed);
        self.rows_processed
            .fetch_add(summary.total_transactions as u64, Ordering::Relaxed);
        self.anomalies_detected
            .fetch_add(summary.detected_anomalies as u64, Ordering::Relaxed);
        self.fraud_labels
            .fetch_add(summary.fraudulent_transactions as u64, Ordering::Relaxed);

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only the most recent batches
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Record a failed batch
    pub fn record_failure(&self, error: &AnalysisError) {
        self.analyses_failed.fetch_add(1, Ordering::Relaxed);

        let kind = match error {
            AnalysisError::DataFormat(_) => "data_format",
            AnalysisError::ModelFit(_) => "model_fit",
            AnalysisError::InvalidConfig(_) => "invalid_config",
        };
        if let Ok(mut by_kind) = self.failures_by_kind.write() {
            *by_kind.entry(kind).or_insert(0) += 1;
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let mut sorted: Vec<u64> = match self.processing_times.read() {
            Ok(times) if !times.is_empty() => times.clone(),
            _ => return ProcessingStats::default(),
        };
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: sorted[count - 1],
        }
    }

    /// Rows analyzed per second since startup
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.rows_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get failures by error kind
    pub fn get_failures_by_kind(&self) -> HashMap<&'static str, u64> {
        self.failures_by_kind
            .read()
            .map(|by_kind| by_kind.clone())
            .unwrap_or_default()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let completed = self.analyses_completed.load(Ordering::Relaxed);
        let failed = self.analyses_failed.load(Ordering::Relaxed);
        let rows = self.rows_processed.load(Ordering::Relaxed);
        let anomalies = self.anomalies_detected.load(Ordering::Relaxed);
        let fraud = self.fraud_labels.load(Ordering::Relaxed);
        let anomaly_rate = if rows > 0 {
            (anomalies as f64 / rows as f64) * 100.0
        } else {
            0.0
        };

        let processing = self.get_processing_stats();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            FRAUD GRAPH ANALYSIS - METRICS SUMMARY            ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Batches: {:>8} ok {:>6} failed  │  Rows: {:>10}          ║",
            completed, failed, rows
        );
        info!(
            "║ Anomalies: {:>8} ({:>5.2}%)  │  Fraud labels: {:>8}       ║",
            anomalies, anomaly_rate, fraud
        );
        info!(
            "║ Throughput: {:>10.1} rows/s                                  ║",
            self.get_throughput()
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Batch Time (μs): mean={:>7} p50={:>7} p95={:>7} p99={:>7} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        let failures = self.get_failures_by_kind();
        if !failures.is_empty() {
            info!("╠══════════════════════════════════════════════════════════════╣");
            info!("║ Failures by Kind:                                            ║");
            for (kind, count) in &failures {
                info!("║   {:16}: {:>6}                                    ║", kind, count);
            }
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PipelineMetrics {
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

/// Real-time metrics reporter that prints periodic summaries
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
