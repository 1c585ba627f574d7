//! Authenticator selection and the HTTP middleware built on it

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use tokio_util::sync::CancellationToken;

use super::agent::AgentVerifier;
use super::config::{AuthConfig, AuthScheme};
use super::error::{AuthError, Result};
use super::jwks::JwksRefreshTask;
use super::principal::{HumanPrincipal, Principal, set_principal};
use super::rhsso::RhssoVerifier;
use crate::constants::BEARER_PREFIX;
use crate::store::KeyStore;

/// One configured authentication scheme
#[derive(Clone)]
pub enum Authenticator {
    Rhsso(Arc<RhssoVerifier>),
    Agent(Arc<AgentVerifier>),
    None,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rhsso(verifier) => f.debug_tuple("Rhsso").field(verifier).finish(),
            Self::Agent(verifier) => f.debug_tuple("Agent").field(verifier).finish(),
            Self::None => f.write_str("None"),
        }
    }
}

impl Authenticator {
    /// Build the authenticator selected by `config`.
    ///
    /// The rhsso scheme downloads the provider key set here.
    pub async fn from_config(config: &AuthConfig, key_store: Arc<dyn KeyStore>) -> Result<Self> {
        tracing::info!(scheme = %config.scheme, "Creating authenticator");
        config.validate().map_err(AuthError::Config)?;

        match config.scheme {
            AuthScheme::Rhsso => {
                let url = config
                    .jwks_url
                    .clone()
                    .ok_or_else(|| AuthError::Config("missing JWKS URL".into()))?;
                let verifier = RhssoVerifier::from_jwks_url(url).await?;
                Ok(Self::Rhsso(Arc::new(verifier)))
            }
            AuthScheme::Local => {
                let pem = config.local_private_key.as_deref().unwrap_or_default();
                let verifier = RhssoVerifier::with_local_private_key(pem)?;
                Ok(Self::Rhsso(Arc::new(verifier)))
            }
            AuthScheme::Agent => Ok(Self::agent(key_store)),
            AuthScheme::None => {
                tracing::warn!(
                    "Authentication is disabled; every request runs as the internal admin"
                );
                Ok(Self::None)
            }
        }
    }

    #[must_use]
    pub fn agent(key_store: Arc<dyn KeyStore>) -> Self {
        Self::Agent(Arc::new(AgentVerifier::new(key_store)))
    }

    #[must_use]
    pub const fn scheme(&self) -> &'static str {
        match self {
            Self::Rhsso(_) => "rhsso",
            Self::Agent(_) => "agent",
            Self::None => "none",
        }
    }

    /// Resolve the principal for a request from its headers.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal> {
        match self {
            Self::None => Ok(Principal::Human(HumanPrincipal::unauthenticated_admin())),
            Self::Rhsso(verifier) => verifier.verify(bearer_token(headers)?).map(Principal::Human),
            Self::Agent(verifier) => verifier
                .verify(bearer_token(headers)?)
                .await
                .map(Principal::Agent),
        }
    }

    /// Wrap every route of `router` with this authenticator.
    #[must_use]
    pub fn protect<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.route_layer(middleware::from_fn_with_state(self, authenticate))
    }

    /// Start periodic JWKS refresh when the scheme has a remote key set.
    pub fn spawn_jwks_refresh(
        &self,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Option<tokio::task::JoinHandle<()>> {
        let Self::Rhsso(verifier) = self else {
            return None;
        };
        let cache = verifier.jwks()?.clone();
        tracing::info!(interval_secs = interval.as_secs(), "Starting JWKS refresh task");
        Some(JwksRefreshTask::new(cache, interval).spawn(shutdown))
    }
}

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix(BEARER_PREFIX))
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingCredentials)
}

/// Authentication middleware
///
/// Rejects with 401 before the handler runs; on success the principal is
/// stored in the request extensions.
pub async fn authenticate(
    State(authenticator): State<Authenticator>,
    mut request: Request,
    next: Next,
) -> Response {
    let principal = match authenticator.authenticate(request.headers()).await {
        Ok(principal) => principal,
        Err(e) => {
            // Token text never reaches the log
            tracing::warn!(scheme = authenticator.scheme(), reason = %e, "Authentication failed");
            #[cfg(feature = "metrics")]
            crate::observability::record_authentication(authenticator.scheme(), false);
            return e.into_response();
        }
    };

    #[cfg(feature = "metrics")]
    crate::observability::record_authentication(authenticator.scheme(), true);

    if let Err(e) = set_principal(request.extensions_mut(), principal) {
        return e.into_response();
    }
    next.run(request).await
}
