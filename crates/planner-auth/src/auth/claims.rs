//! JWT claims types

use serde::{Deserialize, Serialize};

use super::error::{AuthError, Result};
use crate::constants::TOKEN_LEEWAY_SECS;

/// Audience can be a single string or array of strings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn contains(&self, value: &str) -> bool {
        match self {
            Self::One(s) => s == value,
            Self::Many(v) => v.iter().any(|s| s == value),
        }
    }
}

/// Claims carried by agent tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentClaims {
    /// Source the agent reports for
    pub source_id: String,
    #[serde(default)]
    pub iss: String,
    /// Organization of the source
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<OneOrMany>,
    pub exp: i64,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// Claims read from identity provider tokens
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityClaims {
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl IdentityClaims {
    /// Domain part of the email claim, if it has one.
    pub fn email_domain(&self) -> Option<String> {
        let (_, domain) = self.email.as_deref()?.split_once('@')?;
        (!domain.is_empty() && !domain.contains('@')).then(|| domain.to_string())
    }
}

/// Reject tokens whose `iat` lies in the future beyond the allowed skew.
pub(crate) fn ensure_issued_in_past(iat: i64, now: i64) -> Result<()> {
    if iat > now.saturating_add(TOKEN_LEEWAY_SECS as i64) {
        return Err(AuthError::InvalidClaim("iat"));
    }
    Ok(())
}
