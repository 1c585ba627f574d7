//! Configuration builder

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use url::Url;

use crate::Error;
use crate::auth::{AuthConfig, AuthScheme};

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub auth: AuthConfig,
    pub http: HttpConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    #[must_use]
    pub const fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    #[must_use]
    pub const fn auth(&self) -> &AuthConfig {
        &self.auth
    }
}

/// Listener configuration for the two API surfaces
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// User API, authenticated with the configured scheme
    pub user_addr: SocketAddr,
    /// Agent API, authenticated with source-issued tokens
    pub agent_addr: SocketAddr,
    pub request_timeout: Duration,
}

impl HttpConfig {
    const DEFAULT_USER_ADDR: SocketAddr =
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 3443));
    const DEFAULT_AGENT_ADDR: SocketAddr =
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 7443));
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_addr: Self::DEFAULT_USER_ADDR,
            agent_addr: Self::DEFAULT_AGENT_ADDR,
            request_timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub json_logs: bool,
}

/// Configuration builder with fluent API
#[derive(Debug)]
pub struct ConfigBuilder {
    auth: AuthConfig,
    http: HttpConfig,
    telemetry: TelemetryConfig,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            auth: AuthConfig {
                scheme: AuthScheme::None,
                jwks_url: None,
                local_private_key: None,
                jwks_refresh_interval: None,
            },
            http: HttpConfig {
                user_addr: HttpConfig::DEFAULT_USER_ADDR,
                agent_addr: HttpConfig::DEFAULT_AGENT_ADDR,
                request_timeout: HttpConfig::DEFAULT_TIMEOUT,
            },
            telemetry: TelemetryConfig {
                log_level: String::new(),
                json_logs: false,
            },
        }
    }

    #[must_use]
    pub const fn auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.auth.scheme = scheme;
        self
    }

    #[must_use]
    pub fn jwks_url(mut self, url: Url) -> Self {
        self.auth.jwks_url = Some(url);
        self
    }

    #[must_use]
    pub fn local_private_key(mut self, pem: String) -> Self {
        self.auth.local_private_key = Some(pem);
        self
    }

    /// Periodically re-fetch the JWKS instead of fetching it once.
    #[must_use]
    pub const fn jwks_refresh_interval(mut self, interval: Option<Duration>) -> Self {
        self.auth.jwks_refresh_interval = interval;
        self
    }

    #[must_use]
    pub const fn user_addr(mut self, addr: SocketAddr) -> Self {
        self.http.user_addr = addr;
        self
    }

    #[must_use]
    pub const fn agent_addr(mut self, addr: SocketAddr) -> Self {
        self.http.agent_addr = addr;
        self
    }

    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.http.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn log_level(mut self, level: String) -> Self {
        self.telemetry.log_level = level;
        self
    }

    #[must_use]
    pub const fn json_logs(mut self, enabled: bool) -> Self {
        self.telemetry.json_logs = enabled;
        self
    }

    /// Build the configuration, checking the auth scheme has its inputs.
    pub fn build(self) -> crate::Result<Config> {
        self.auth.validate().map_err(Error::Config)?;

        if self.http.user_addr == self.http.agent_addr {
            return Err(Error::Config(
                "user and agent APIs must listen on different addresses".into(),
            ));
        }

        let log_level = if self.telemetry.log_level.is_empty() {
            "info".to_string()
        } else {
            self.telemetry.log_level
        };

        Ok(Config {
            auth: self.auth,
            http: self.http,
            telemetry: TelemetryConfig {
                log_level,
                json_logs: self.telemetry.json_logs,
            },
        })
    }
}
