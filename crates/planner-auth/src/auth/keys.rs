//! Signing key lifecycle
//!
//! One RSA keypair is issued per source when the source is registered. The
//! private half stays inside [`SigningKey`]; storage only ever sees PEM text
//! through [`KeyRecord`].

use std::collections::HashMap;

use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use uuid::Uuid;

use super::error::{AuthError, Result};
use crate::model::Source;
use crate::store::{KeyRecord, KeyStore};

/// RSA modulus size for issued keys
pub const KEY_BITS: usize = 2048;

/// RSA signing key bound to a single source
pub struct SigningKey {
    kid: String,
    org_id: String,
    source_id: Uuid,
    private_key: RsaPrivateKey,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("org_id", &self.org_id)
            .field("source_id", &self.source_id)
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    /// Generate a fresh keypair with a random kid.
    ///
    /// CPU bound; call from a blocking context.
    pub fn generate(org_id: impl Into<String>, source_id: Uuid) -> Result<Self> {
        let private_key = RsaPrivateKey::new(&mut rand::thread_rng(), KEY_BITS)
            .map_err(|e| AuthError::KeyGeneration(e.to_string()))?;
        Ok(Self {
            kid: Uuid::new_v4().to_string(),
            org_id: org_id.into(),
            source_id,
            private_key,
        })
    }

    /// Rebuild a key from its stored form.
    pub fn from_record(record: &KeyRecord) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs1_pem(&record.private_key_pem)
            .map_err(|e| AuthError::KeyEncoding(e.to_string()))?;
        Ok(Self {
            kid: record.kid.clone(),
            org_id: record.org_id.clone(),
            source_id: record.source_id,
            private_key,
        })
    }

    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    #[must_use]
    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    #[must_use]
    pub const fn source_id(&self) -> Uuid {
        self.source_id
    }

    pub fn public_key_pem(&self) -> Result<String> {
        RsaPublicKey::from(&self.private_key)
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| AuthError::KeyEncoding(e.to_string()))
    }

    pub(crate) fn encoding_key(&self) -> Result<EncodingKey> {
        let pem = self
            .private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| AuthError::KeyEncoding(e.to_string()))?;
        EncodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| AuthError::KeyEncoding(e.to_string()))
    }

    /// Serialize into the form handed to a [`KeyStore`].
    pub fn to_record(&self) -> Result<KeyRecord> {
        let private_key_pem = self
            .private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| AuthError::KeyEncoding(e.to_string()))?;
        Ok(KeyRecord {
            kid: self.kid.clone(),
            org_id: self.org_id.clone(),
            source_id: self.source_id,
            private_key_pem: private_key_pem.to_string(),
            public_key_pem: self.public_key_pem()?,
        })
    }
}

/// Generate a signing key for `source` and persist it.
#[tracing::instrument(skip_all, fields(source_id = %source.id))]
pub async fn issue_signing_key(store: &dyn KeyStore, source: &Source) -> Result<SigningKey> {
    let org_id = source.org_id.clone();
    let source_id = source.id;
    let key = tokio::task::spawn_blocking(move || SigningKey::generate(org_id, source_id))
        .await
        .map_err(|e| AuthError::KeyGeneration(e.to_string()))??;

    store.insert(key.to_record()?).await?;
    tracing::info!(kid = %key.kid, "Issued signing key");
    Ok(key)
}

/// Public keys of every persisted signing key, by kid
#[derive(Debug, Clone, Default)]
pub struct PublicKeySet {
    keys: HashMap<String, String>,
}

impl PublicKeySet {
    #[must_use]
    pub fn get(&self, kid: &str) -> Option<&str> {
        self.keys.get(kid).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Resolve `kid` to a verification key.
    pub fn decoding_key(&self, kid: &str) -> Result<DecodingKey> {
        let pem = self
            .get(kid)
            .ok_or_else(|| AuthError::KeyNotFound(kid.to_string()))?;
        DecodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| AuthError::KeyStore(format!("stored key {kid} is unusable: {e}")))
    }
}

impl FromIterator<(String, String)> for PublicKeySet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}
