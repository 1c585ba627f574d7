//! Authentication configuration types

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

/// Authentication scheme of the user-facing API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    /// External identity provider, keys from its JWKS endpoint
    Rhsso,
    /// Identity provider tokens checked against a locally configured key
    Local,
    /// Source-issued agent tokens
    Agent,
    /// Authentication disabled; every request runs as a fixed admin
    #[default]
    None,
}

impl AuthScheme {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rhsso => "rhsso",
            Self::Local => "local",
            Self::Agent => "agent",
            Self::None => "none",
        }
    }

    /// Parse a configured value. Unknown values fall back to [`AuthScheme::None`].
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or_else(|()| {
            tracing::warn!(
                value,
                "Unrecognized authentication scheme, falling back to none"
            );
            Self::None
        })
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthScheme {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rhsso" => Ok(Self::Rhsso),
            "local" => Ok(Self::Local),
            "agent" => Ok(Self::Agent),
            "none" | "" => Ok(Self::None),
            _ => Err(()),
        }
    }
}

/// Authentication configuration
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub scheme: AuthScheme,
    /// Identity provider key set (rhsso scheme)
    pub jwks_url: Option<Url>,
    /// PKCS#1 PEM private key (local scheme)
    pub local_private_key: Option<String>,
    /// Refresh period for the JWKS. `None` fetches it once at startup.
    pub jwks_refresh_interval: Option<Duration>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("scheme", &self.scheme)
            .field("jwks_url", &self.jwks_url)
            .field("has_local_private_key", &self.local_private_key.is_some())
            .field("jwks_refresh_interval", &self.jwks_refresh_interval)
            .finish()
    }
}

impl AuthConfig {
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        !matches!(self.scheme, AuthScheme::None)
    }

    /// Check that the selected scheme has what it needs.
    pub fn validate(&self) -> Result<(), String> {
        match self.scheme {
            AuthScheme::Rhsso if self.jwks_url.is_none() => {
                Err("rhsso authentication requires a JWKS URL".into())
            }
            AuthScheme::Local
                if self
                    .local_private_key
                    .as_deref()
                    .is_none_or(|k| k.trim().is_empty()) =>
            {
                Err("local authentication requires a private key".into())
            }
            _ => Ok(()),
        }
    }
}
