//! Agent token verification
//!
//! Public keys are read from the key store on every call, so keys issued by
//! another replica are usable immediately.

use std::sync::Arc;

use jsonwebtoken::{Algorithm, Validation, decode, decode_header};

use super::claims::{AgentClaims, ensure_issued_in_past};
use super::error::{AuthError, Result};
use super::principal::AgentPrincipal;
use crate::constants::TOKEN_LEEWAY_SECS;
use crate::store::KeyStore;

/// Validates RS256 agent tokens against persisted source keys
pub struct AgentVerifier {
    store: Arc<dyn KeyStore>,
    validation: Validation,
}

impl std::fmt::Debug for AgentVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentVerifier")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

impl AgentVerifier {
    #[must_use]
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iat"]);
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.leeway = TOKEN_LEEWAY_SECS;
        Self { store, validation }
    }

    /// Verify `token` and return the agent it was issued to.
    #[tracing::instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<AgentPrincipal> {
        let header = decode_header(token)?;
        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;

        let keys = self.store.public_keys().await?;
        let key = keys.decoding_key(&kid)?;

        let data = decode::<AgentClaims>(token, &key, &self.validation)?;
        ensure_issued_in_past(data.claims.iat, chrono::Utc::now().timestamp())?;

        let agent = AgentPrincipal::try_from(data.claims)?;
        tracing::debug!(source_id = %agent.source_id, kid = %kid, "Agent token verified");
        Ok(agent)
    }
}
