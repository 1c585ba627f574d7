//! Shared fixtures for unit tests
//!
//! RSA key generation is slow, so two keys are generated once per test binary
//! and reused under fresh kids.

use std::sync::LazyLock;

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use rsa::RsaPrivateKey;
use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey, LineEnding};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::SigningKey;
use crate::store::KeyRecord;

static PRIMARY: LazyLock<RsaPrivateKey> =
    LazyLock::new(|| RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap());

static SECONDARY: LazyLock<RsaPrivateKey> =
    LazyLock::new(|| RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap());

fn record_for(key: &RsaPrivateKey, kid: &str, org_id: &str, source_id: Uuid) -> KeyRecord {
    KeyRecord {
        kid: kid.to_string(),
        org_id: org_id.to_string(),
        source_id,
        private_key_pem: key.to_pkcs1_pem(LineEnding::LF).unwrap().to_string(),
        public_key_pem: key
            .to_public_key()
            .to_pkcs1_pem(LineEnding::LF)
            .unwrap(),
    }
}

/// Signing key backed by the primary test key
pub fn signing_key(org_id: &str, source_id: Uuid) -> SigningKey {
    SigningKey::from_record(&record_for(
        &PRIMARY,
        &Uuid::new_v4().to_string(),
        org_id,
        source_id,
    ))
    .unwrap()
}

/// Signing key with an explicit kid, backed by the secondary test key
pub fn other_signing_key(kid: &str, org_id: &str, source_id: Uuid) -> SigningKey {
    SigningKey::from_record(&record_for(&SECONDARY, kid, org_id, source_id)).unwrap()
}

pub fn primary_private_pem() -> String {
    PRIMARY.to_pkcs1_pem(LineEnding::LF).unwrap().to_string()
}

/// Sign arbitrary claims with the primary key
pub fn sign_with_primary<T: Serialize>(claims: &T, kid: Option<&str>) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(primary_private_pem().as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
