//! Agent token issuance

use chrono::{DateTime, Months, Utc};
use jsonwebtoken::{Algorithm, Header, encode};

use super::claims::{AgentClaims, OneOrMany};
use super::error::{AuthError, Result};
use super::keys::SigningKey;
use crate::constants::{AGENT_TOKEN_ISSUER, AGENT_TOKEN_VALIDITY_MONTHS};
use crate::model::Source;

/// Sign an agent token for `source` with the source's own key.
///
/// The token header carries the key's kid so verifiers can pick the
/// matching public key directly.
pub fn issue_agent_token(key: &SigningKey, source: &Source) -> Result<String> {
    issue_agent_token_at(key, source, Utc::now())
}

fn issue_agent_token_at(key: &SigningKey, source: &Source, now: DateTime<Utc>) -> Result<String> {
    if key.source_id() != source.id {
        return Err(AuthError::Signing(format!(
            "key {} does not belong to source {}",
            key.kid(),
            source.id
        )));
    }

    let expires_at = now
        .checked_add_months(Months::new(AGENT_TOKEN_VALIDITY_MONTHS))
        .ok_or_else(|| AuthError::Signing("token expiry out of range".into()))?;

    let claims = AgentClaims {
        source_id: source.id.to_string(),
        iss: AGENT_TOKEN_ISSUER.to_string(),
        sub: source.org_id.clone(),
        aud: Some(OneOrMany::Many(vec![AGENT_TOKEN_ISSUER.to_string()])),
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
        nbf: Some(now.timestamp()),
        jti: None,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(key.kid().to_string());

    let token = encode(&header, &claims, &key.encoding_key()?)
        .map_err(|e| AuthError::Signing(e.to_string()))?;

    tracing::debug!(source_id = %source.id, kid = %key.kid(), "Issued agent token");
    Ok(token)
}
