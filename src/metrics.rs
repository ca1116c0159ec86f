//! Run observability metrics
//!
//! Counters and histograms are emitted through the `metrics` facade. With no
//! recorder installed they are no-ops; `init_metrics` installs a Prometheus
//! exporter for long-lived or scraped deployments.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

static METRICS_INITIALIZED: Lazy<Arc<RwLock<bool>>> = Lazy::new(|| Arc::new(RwLock::new(false)));

/// Initialize the metrics system with a Prometheus scrape endpoint
///
/// Idempotent: later calls are ignored.
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "api_requests_total",
        Unit::Count,
        "Total number of discovery-service operation calls"
    );
    describe_counter!(
        "accounts_processed_total",
        Unit::Count,
        "Accounts whose scan completed successfully"
    );
    describe_counter!(
        "accounts_failed_total",
        Unit::Count,
        "Accounts whose scan failed, timed out or panicked"
    );
    describe_counter!(
        "report_rows_total",
        Unit::Count,
        "Campaign rows included in published reports"
    );
    describe_histogram!(
        "account_scan_duration_seconds",
        Unit::Seconds,
        "Duration of a single account scan"
    );
    describe_gauge!(
        "call_quota_remaining",
        Unit::Count,
        "Outbound call quota remaining for the run"
    );

    *initialized = true;
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Record one operation call and its HTTP status
pub fn record_api_request(operation: &str, status: u16) {
    counter!(
        "api_requests_total",
        "operation" => operation.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
}

/// Record the quota left after a call
pub fn record_quota_remaining(remaining: usize) {
    gauge!("call_quota_remaining").set(remaining as f64);
}

/// Record rows published in a report
pub fn record_report_rows(rows: usize) {
    counter!("report_rows_total").increment(rows as u64);
}

/// Per-account scan timing
pub struct AccountScanMetrics {
    account_id: String,
    start_time: Instant,
}

impl AccountScanMetrics {
    /// Start tracking an account scan
    pub fn start(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            start_time: Instant::now(),
        }
    }

    /// Record a successful scan
    pub fn record_success(&self) {
        let duration = self.start_time.elapsed();
        counter!("accounts_processed_total").increment(1);
        histogram!("account_scan_duration_seconds").record(duration.as_secs_f64());
        debug!(
            account_id = %self.account_id,
            duration_ms = duration.as_millis(),
            "Account scan completed"
        );
    }

    /// Record a failed scan
    pub fn record_failure(&self, error: &str) {
        let duration = self.start_time.elapsed();
        counter!("accounts_failed_total").increment(1);
        histogram!("account_scan_duration_seconds").record(duration.as_secs_f64());
        error!(
            account_id = %self.account_id,
            error = %error,
            duration_ms = duration.as_millis(),
            "Account scan failed"
        );
    }
}

/// Check if the metrics system is initialized
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}
