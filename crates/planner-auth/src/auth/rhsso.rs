//! Identity provider token verification
//!
//! Used by both the `rhsso` scheme (keys from a JWKS endpoint) and the
//! `local` scheme (public half of a configured private key).

use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use rsa::RsaPrivateKey;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
use url::Url;

use super::claims::{IdentityClaims, ensure_issued_in_past};
use super::error::{AuthError, Result};
use super::jwks::JwksCache;
use super::principal::{HumanPrincipal, RawToken};
use crate::constants::TOKEN_LEEWAY_SECS;

enum KeySource {
    Jwks(Arc<JwksCache>),
    Static(DecodingKey),
}

/// Validates RS256 tokens issued by the identity provider
pub struct RhssoVerifier {
    keys: KeySource,
    validation: Validation,
}

impl std::fmt::Debug for RhssoVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys = match &self.keys {
            KeySource::Jwks(cache) => format!("{cache:?}"),
            KeySource::Static(_) => "static".to_string(),
        };
        f.debug_struct("RhssoVerifier")
            .field("keys", &keys)
            .finish_non_exhaustive()
    }
}

impl RhssoVerifier {
    /// Fetch the provider key set once and build a verifier on top of it.
    pub async fn from_jwks_url(jwks_url: Url) -> Result<Self> {
        let cache = JwksCache::fetch(jwks_url).await?;
        Ok(Self::with_jwks(Arc::new(cache)))
    }

    #[must_use]
    pub fn with_jwks(cache: Arc<JwksCache>) -> Self {
        Self::build(KeySource::Jwks(cache))
    }

    /// Verify against the public half of a PKCS#1 PEM private key.
    pub fn with_local_private_key(pem: &str) -> Result<Self> {
        if pem.trim().is_empty() {
            return Err(AuthError::Config("private key is empty".into()));
        }
        let private_key = RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|e| AuthError::Config(format!("invalid local private key: {e}")))?;
        let public_pem = private_key
            .to_public_key()
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| AuthError::KeyEncoding(e.to_string()))?;
        let key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| AuthError::KeyEncoding(e.to_string()))?;
        Ok(Self::with_decoding_key(key))
    }

    #[must_use]
    pub fn with_decoding_key(key: DecodingKey) -> Self {
        Self::build(KeySource::Static(key))
    }

    fn build(keys: KeySource) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_required_spec_claims(&["exp", "iat"]);
        validation.validate_aud = false;
        validation.leeway = TOKEN_LEEWAY_SECS;
        Self { keys, validation }
    }

    /// JWKS cache backing this verifier, if any
    #[must_use]
    pub fn jwks(&self) -> Option<&Arc<JwksCache>> {
        match &self.keys {
            KeySource::Jwks(cache) => Some(cache),
            KeySource::Static(_) => None,
        }
    }

    #[tracing::instrument(skip_all)]
    pub fn verify(&self, token: &str) -> Result<HumanPrincipal> {
        let key = match &self.keys {
            KeySource::Jwks(cache) => {
                let header = decode_header(token)?;
                cache.get_key(header.kid.as_deref())?
            }
            KeySource::Static(key) => key.clone(),
        };

        let claims = decode::<IdentityClaims>(token, &key, &self.validation)?.claims;
        ensure_issued_in_past(claims.iat, chrono::Utc::now().timestamp())?;

        let username = claims
            .preferred_username
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AuthError::MissingClaim("preferred_username".into()))?;
        let organization = resolve_organization(username, claims.org_id.as_deref())?;

        Ok(HumanPrincipal {
            username: username.to_string(),
            organization,
            email_domain: claims.email_domain(),
            token: RawToken::new(token),
        })
    }
}

/// Organization of a user: the `org_id` claim, or else the domain of a
/// `name@domain` username.
pub fn resolve_organization(username: &str, org_id: Option<&str>) -> Result<String> {
    if let Some(org) = org_id.filter(|o| !o.is_empty()) {
        return Ok(org.to_string());
    }

    let mut parts = username.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(domain), None) if !domain.is_empty() => Ok(domain.to_string()),
        _ => {
            tracing::debug!("Username cannot be split into user and organization");
            Err(AuthError::MalformedUsername)
        }
    }
}
