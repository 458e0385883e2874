//! Prometheus export for the console's request and auth metrics.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global recorder. Later calls are ignored.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::error!("Failed to install Prometheus recorder: {}", e),
    }
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

pub fn record_login(outcome: &'static str) {
    metrics::counter!("console_logins_total", "outcome" => outcome).increment(1);
}

pub fn record_denial(module: &str, action: &str) {
    metrics::counter!(
        "console_permission_denials_total",
        "module" => module.to_string(),
        "action" => action.to_string()
    )
    .increment(1);
}
