//! Logging and metrics setup

#[cfg(feature = "metrics")]
mod metrics;

#[cfg(feature = "metrics")]
pub use metrics::{
    init_metrics, record_authentication, record_authorization_denied, render_metrics,
};

use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;
use crate::{Error, Result};

/// HTTP client internals that are silenced unless `RUST_LOG` says otherwise
const QUIET_TARGETS: &[&str] = &["hyper_util=warn", "reqwest=warn", "rustls=warn"];

/// Install the global subscriber and, with the `metrics` feature, the
/// Prometheus recorder.
pub fn init_observability(config: &TelemetryConfig) -> Result<()> {
    #[cfg(feature = "metrics")]
    {
        init_metrics()?;
    }

    init_logging(config)
}

/// `RUST_LOG` wins when set; otherwise the configured level applies to
/// everything except [`QUIET_TARGETS`].
fn env_filter(log_level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut directives = vec![log_level.to_string()];
    directives.extend(QUIET_TARGETS.iter().map(|t| (*t).to_string()));
    EnvFilter::try_new(directives.join(","))
        .map_err(|e| Error::Config(format!("Invalid log level '{log_level}': {e}")))
}

fn init_logging(config: &TelemetryConfig) -> Result<()> {
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = env_filter(&config.log_level)?;
    let fmt_layer = if config.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to install log subscriber: {e}")))
}
