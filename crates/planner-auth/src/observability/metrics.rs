//! Prometheus metrics for planner-auth

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::Result;
use crate::error::Error;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

const METRIC_INFO: &str = "planner_auth_info";
const METRIC_AUTHENTICATIONS: &str = "planner_auth_authentications_total";
const METRIC_AUTHZ_DENIALS: &str = "planner_auth_authorization_denials_total";

/// Initialize Prometheus metrics recorder.
pub fn init_metrics() -> Result<()> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::Config(format!("Failed to install metrics recorder: {e}")))?;

    PROMETHEUS_HANDLE.set(handle).ok();

    describe_gauge!(METRIC_INFO, "Build information (always 1)");
    describe_counter!(
        METRIC_AUTHENTICATIONS,
        "Authentication attempts by scheme and outcome"
    );
    describe_counter!(METRIC_AUTHZ_DENIALS, "Authorization denials by reason");

    gauge!(METRIC_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

/// Render metrics in Prometheus text format.
#[must_use]
pub fn render_metrics() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Record one authentication attempt.
pub fn record_authentication(scheme: &'static str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!(METRIC_AUTHENTICATIONS, "scheme" => scheme, "outcome" => outcome).increment(1);
}

/// Record a 403 from an ownership or binding check.
pub fn record_authorization_denied(reason: &'static str) {
    counter!(METRIC_AUTHZ_DENIALS, "reason" => reason).increment(1);
}
