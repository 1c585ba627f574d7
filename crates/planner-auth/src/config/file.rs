//! TOML configuration file loading

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use super::builder::ConfigBuilder;
use crate::Result;
use crate::auth::AuthScheme;

/// Configuration file locations checked in order
const CONFIG_PATHS: &[&str] = &[
    "./planner-auth.toml",
    "~/.config/planner-auth/config.toml",
    "/etc/planner-auth/config.toml",
];

/// Find the first existing configuration file
pub fn find_config_file() -> Option<PathBuf> {
    for path_str in CONFIG_PATHS {
        let path = if path_str.starts_with('~') {
            if let Ok(home) = std::env::var("HOME") {
                PathBuf::from(path_str.replacen('~', &home, 1))
            } else {
                continue;
            }
        } else {
            PathBuf::from(path_str)
        };

        if path.exists() {
            return Some(path);
        }
    }
    None
}

/// Load configuration from a TOML file
pub fn load_from_file(path: &Path, builder: ConfigBuilder) -> Result<ConfigBuilder> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let file_config: FileConfig = toml::from_str(&content).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to parse config file {}: {}",
            path.display(),
            e
        ))
    })?;

    apply_file_config(builder, file_config)
}

fn apply_file_config(mut builder: ConfigBuilder, config: FileConfig) -> Result<ConfigBuilder> {
    if let Some(auth) = config.auth {
        if let Some(scheme) = auth.scheme {
            builder = builder.auth_scheme(AuthScheme::parse_lenient(&scheme));
        }

        if let Some(url_str) = auth.jwks_url {
            let url = Url::parse(&url_str)
                .map_err(|e| crate::Error::Config(format!("Invalid JWKS URL: {e}")))?;
            builder = builder.jwks_url(url);
        }

        if let Some(pem) = auth.local_private_key {
            builder = builder.local_private_key(pem);
        }

        if let Some(secs) = auth.jwks_refresh_secs {
            builder = builder.jwks_refresh_interval((secs > 0).then(|| Duration::from_secs(secs)));
        }
    }

    if let Some(http) = config.http {
        if let Some(addr) = http.address {
            builder = builder.user_addr(addr);
        }

        if let Some(addr) = http.agent_address {
            builder = builder.agent_addr(addr);
        }

        if let Some(secs) = http.request_timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
    }

    if let Some(telemetry) = config.telemetry {
        if let Some(level) = telemetry.log_level {
            builder = builder.log_level(level);
        }

        if let Some(json) = telemetry.json_logs {
            builder = builder.json_logs(json);
        }
    }

    Ok(builder)
}

/// Root configuration file structure
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    auth: Option<AuthFileConfig>,
    http: Option<HttpFileConfig>,
    telemetry: Option<TelemetryFileConfig>,
}

#[derive(Debug, Deserialize)]
struct AuthFileConfig {
    scheme: Option<String>,
    jwks_url: Option<String>,
    local_private_key: Option<String>,
    jwks_refresh_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct HttpFileConfig {
    address: Option<SocketAddr>,
    agent_address: Option<SocketAddr>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TelemetryFileConfig {
    log_level: Option<String>,
    json_logs: Option<bool>,
}
