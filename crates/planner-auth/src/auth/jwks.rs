//! JWKS fetching and caching
//!
//! The key set is downloaded once when the cache is built. It only changes
//! afterwards if a [`JwksRefreshTask`] is running or [`JwksCache::refresh`]
//! is called explicitly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use url::Url;

use super::error::{AuthError, Result};
use crate::constants::JWKS_FETCH_TIMEOUT_SECS;

/// JSON Web Key
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key ID
    #[serde(default)]
    pub kid: Option<String>,
    /// Key type (RSA, EC)
    pub kty: String,
    /// Algorithm
    #[serde(default)]
    pub alg: Option<String>,
    /// Key usage
    #[serde(default)]
    pub r#use: Option<String>,
    // RSA components
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
}

/// JSON Web Key Set
#[derive(Debug, Clone, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

/// Usable keys by kid. Keys published without a kid can never be selected
/// and are dropped.
#[derive(Default)]
struct KeyMap {
    keys: HashMap<String, DecodingKey>,
}

impl KeyMap {
    fn from_jwk_set(jwks: JwkSet) -> Self {
        let mut map = Self::default();
        for jwk in jwks.keys {
            let Some(key) = decode_jwk(&jwk) else {
                continue;
            };
            match jwk.kid {
                Some(kid) => {
                    map.keys.insert(kid, key);
                }
                None => tracing::debug!("Skipping key without kid"),
            }
        }
        map
    }

    /// Tokens must name their key; there is no fallback for a missing kid.
    fn get(&self, kid: Option<&str>) -> Result<DecodingKey> {
        let kid = kid.ok_or(AuthError::MissingKeyId)?;
        self.keys
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::KeyNotFound(kid.to_string()))
    }

    fn len(&self) -> usize {
        self.keys.len()
    }
}

/// RS256 verification keys published by the identity provider
pub struct JwksCache {
    keys: ArcSwap<KeyMap>,
    jwks_uri: Url,
    client: reqwest::Client,
}

impl std::fmt::Debug for JwksCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksCache")
            .field("jwks_uri", &self.jwks_uri)
            .field("keys_count", &self.keys_count())
            .finish_non_exhaustive()
    }
}

impl JwksCache {
    /// Download the key set at `jwks_uri`. Fails if it cannot be fetched.
    pub async fn fetch(jwks_uri: Url) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(JWKS_FETCH_TIMEOUT_SECS))
            .build()
            .map_err(AuthError::JwksFetch)?;

        let cache = Self {
            keys: ArcSwap::from_pointee(KeyMap::default()),
            jwks_uri,
            client,
        };
        cache.refresh().await?;
        Ok(cache)
    }

    /// Verification key named by a token's `kid` header
    pub fn get_key(&self, kid: Option<&str>) -> Result<DecodingKey> {
        self.keys.load().get(kid)
    }

    /// Refresh JWKS from remote
    pub async fn refresh(&self) -> Result<()> {
        tracing::debug!(jwks_uri = %self.jwks_uri, "Refreshing JWKS");

        let response = self
            .client
            .get(self.jwks_uri.clone())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(AuthError::JwksFetch)?;

        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthError::JwksParse(e.to_string()))?;

        let map = KeyMap::from_jwk_set(jwks);
        let count = map.len();
        self.keys.store(Arc::new(map));

        tracing::info!(keys_count = count, "JWKS refreshed successfully");
        Ok(())
    }

    pub fn keys_count(&self) -> usize {
        self.keys.load().len()
    }
}

/// Only RS256-capable RSA keys are kept. Anything else, including a
/// malformed RSA entry, is skipped without failing the whole set.
fn decode_jwk(jwk: &Jwk) -> Option<DecodingKey> {
    if jwk.kty != "RSA" {
        tracing::debug!(kty = %jwk.kty, "Skipping unsupported key type");
        return None;
    }
    if jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
        tracing::debug!(alg = ?jwk.alg, "Skipping key with unsupported algorithm");
        return None;
    }
    if jwk.r#use.as_deref().is_some_and(|u| u != "sig") {
        return None;
    }

    let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
        tracing::warn!(kid = ?jwk.kid, "Skipping RSA key without modulus or exponent");
        return None;
    };
    match DecodingKey::from_rsa_components(n, e) {
        Ok(key) => Some(key),
        Err(err) => {
            tracing::warn!(kid = ?jwk.kid, error = %err, "Skipping RSA key with invalid components");
            None
        }
    }
}

/// Background JWKS refresh task builder
pub struct JwksRefreshTask {
    cache: Arc<JwksCache>,
    interval: Duration,
}

impl std::fmt::Debug for JwksRefreshTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksRefreshTask")
            .field("cache", &self.cache)
            .field("interval", &self.interval)
            .finish()
    }
}

impl JwksRefreshTask {
    #[must_use]
    pub const fn new(cache: Arc<JwksCache>, interval: Duration) -> Self {
        Self { cache, interval }
    }

    pub fn spawn(
        self,
        shutdown: tokio_util::sync::CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // the first tick fires immediately and the set was just fetched
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.cache.refresh().await {
                            tracing::warn!(error = %e, "Background JWKS refresh failed");
                        }
                    }
                    () = shutdown.cancelled() => {
                        tracing::debug!("JWKS refresh task shutting down");
                        break;
                    }
                }
            }
        })
    }
}
