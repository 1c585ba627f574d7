//! Environment variable loading for configuration

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

use super::builder::ConfigBuilder;
use crate::Result;
use crate::auth::AuthScheme;

/// Environment variable names
mod vars {
    pub const AUTH: &str = "MIGRATION_PLANNER_AUTH";
    pub const JWK_URL: &str = "MIGRATION_PLANNER_JWK_URL";
    pub const PRIVATE_KEY: &str = "MIGRATION_PLANNER_PRIVATE_KEY";
    pub const JWKS_REFRESH_SECS: &str = "MIGRATION_PLANNER_JWKS_REFRESH_SECS";
    pub const ADDRESS: &str = "MIGRATION_PLANNER_ADDRESS";
    pub const AGENT_ADDRESS: &str = "MIGRATION_PLANNER_AGENT_ADDRESS";
    pub const REQUEST_TIMEOUT_SECS: &str = "MIGRATION_PLANNER_REQUEST_TIMEOUT_SECS";
    pub const RUST_LOG: &str = "RUST_LOG";
    pub const JSON_LOGS: &str = "MIGRATION_PLANNER_JSON_LOGS";
}

/// Load configuration from environment variables
pub fn load_from_env(mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
    if let Ok(scheme) = env::var(vars::AUTH) {
        builder = builder.auth_scheme(AuthScheme::parse_lenient(&scheme));
    }

    if let Ok(url_str) = env::var(vars::JWK_URL)
        && !url_str.trim().is_empty()
    {
        let url = Url::parse(url_str.trim())
            .map_err(|e| crate::Error::Config(format!("Invalid {}: {}", vars::JWK_URL, e)))?;
        builder = builder.jwks_url(url);
    }

    if let Ok(pem) = env::var(vars::PRIVATE_KEY)
        && !pem.trim().is_empty()
    {
        builder = builder.local_private_key(pem);
    }

    // Zero disables refresh
    if let Ok(secs_str) = env::var(vars::JWKS_REFRESH_SECS)
        && let Ok(secs) = secs_str.parse::<u64>()
    {
        builder = builder.jwks_refresh_interval((secs > 0).then(|| Duration::from_secs(secs)));
    }

    if let Ok(addr_str) = env::var(vars::ADDRESS) {
        builder = builder.user_addr(parse_addr(vars::ADDRESS, &addr_str)?);
    }

    if let Ok(addr_str) = env::var(vars::AGENT_ADDRESS) {
        builder = builder.agent_addr(parse_addr(vars::AGENT_ADDRESS, &addr_str)?);
    }

    if let Ok(timeout_str) = env::var(vars::REQUEST_TIMEOUT_SECS)
        && let Ok(secs) = timeout_str.parse::<u64>()
    {
        builder = builder.request_timeout(Duration::from_secs(secs));
    }

    if let Ok(level) = env::var(vars::RUST_LOG) {
        builder = builder.log_level(level);
    }

    if let Ok(val) = env::var(vars::JSON_LOGS) {
        builder = builder.json_logs(parse_bool(&val));
    }

    Ok(builder)
}

fn parse_addr(var: &str, value: &str) -> Result<SocketAddr> {
    value
        .trim()
        .parse()
        .map_err(|e| crate::Error::Config(format!("Invalid {var}: {e}")))
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

/// Serializes tests that read or write the process environment
#[cfg(test)]
pub(super) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
