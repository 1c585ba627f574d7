//! Authenticated principal carried through request extensions
//!
//! The authenticator writes exactly one [`Principal`] per request. Handlers
//! receive it by declaring [`HumanPrincipal`] or [`AgentPrincipal`] as an
//! extractor argument, so a handler cannot run without one.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::Extensions;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::claims::AgentClaims;
use super::error::{AuthError, Result};
use crate::constants::{NONE_AUTH_ORGANIZATION, NONE_AUTH_RAW_TOKEN, NONE_AUTH_USERNAME};

/// The validated bearer token a human principal was built from
#[derive(Clone, PartialEq, Eq)]
pub struct RawToken(Arc<str>);

impl RawToken {
    #[must_use]
    pub fn new(token: &str) -> Self {
        Self(Arc::from(token))
    }

    /// Token text, for forwarding to downstream identity services.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for RawToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RawToken([REDACTED])")
    }
}

/// Human operator authenticated by the identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumanPrincipal {
    pub username: String,
    pub organization: String,
    pub email_domain: Option<String>,
    pub token: RawToken,
}

impl HumanPrincipal {
    /// Fixed identity used when authentication is disabled
    #[must_use]
    pub fn unauthenticated_admin() -> Self {
        Self {
            username: NONE_AUTH_USERNAME.to_string(),
            organization: NONE_AUTH_ORGANIZATION.to_string(),
            email_domain: None,
            token: RawToken::new(NONE_AUTH_RAW_TOKEN),
        }
    }
}

/// Collector agent authenticated by a source-issued token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentPrincipal {
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub issuer: String,
    pub organization: String,
    pub source_id: Uuid,
}

impl TryFrom<AgentClaims> for AgentPrincipal {
    type Error = AuthError;

    fn try_from(claims: AgentClaims) -> Result<Self> {
        let source_id =
            Uuid::parse_str(&claims.source_id).map_err(|_| AuthError::InvalidClaim("source_id"))?;
        let issued_at =
            DateTime::from_timestamp(claims.iat, 0).ok_or(AuthError::InvalidClaim("iat"))?;
        let expires_at =
            DateTime::from_timestamp(claims.exp, 0).ok_or(AuthError::InvalidClaim("exp"))?;
        if claims.sub.is_empty() {
            return Err(AuthError::InvalidClaim("sub"));
        }

        Ok(Self {
            issued_at,
            expires_at,
            issuer: claims.iss,
            organization: claims.sub,
            source_id,
        })
    }
}

/// Identity attached to an authenticated request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Human(HumanPrincipal),
    Agent(AgentPrincipal),
}

impl Principal {
    #[must_use]
    pub const fn human(&self) -> Option<&HumanPrincipal> {
        match self {
            Self::Human(user) => Some(user),
            Self::Agent(_) => None,
        }
    }

    #[must_use]
    pub const fn agent(&self) -> Option<&AgentPrincipal> {
        match self {
            Self::Agent(agent) => Some(agent),
            Self::Human(_) => None,
        }
    }

    #[must_use]
    pub fn organization(&self) -> &str {
        match self {
            Self::Human(user) => &user.organization,
            Self::Agent(agent) => &agent.organization,
        }
    }
}

/// Attach the principal to a request. A second write is refused.
pub fn set_principal(extensions: &mut Extensions, principal: Principal) -> Result<()> {
    if extensions.get::<Principal>().is_some() {
        return Err(AuthError::PrincipalAlreadySet);
    }
    extensions.insert(principal);
    Ok(())
}

#[must_use]
pub fn get_principal(extensions: &Extensions) -> Option<&Principal> {
    extensions.get::<Principal>()
}

impl<S: Send + Sync> FromRequestParts<S> for Principal {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        get_principal(&parts.extensions)
            .cloned()
            .ok_or(AuthError::MissingPrincipal)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for HumanPrincipal {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        match get_principal(&parts.extensions) {
            Some(Principal::Human(user)) => Ok(user.clone()),
            Some(Principal::Agent(_)) => Err(AuthError::WrongPrincipal { expected: "human" }),
            None => Err(AuthError::MissingPrincipal),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AgentPrincipal {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        match get_principal(&parts.extensions) {
            Some(Principal::Agent(agent)) => Ok(agent.clone()),
            Some(Principal::Human(_)) => Err(AuthError::WrongPrincipal { expected: "agent" }),
            None => Err(AuthError::MissingPrincipal),
        }
    }
}
