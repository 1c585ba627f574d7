//! Persistence collaborators
//!
//! The auth core only sees these traits. Key material crosses them as PEM
//! text, never as live crypto types.

mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub use memory::{InMemoryKeyStore, InMemoryShareTokenStore, InMemorySourceStore};

use crate::auth::PublicKeySet;
use crate::model::{ShareToken, Source};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    Conflict,

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persisted form of a signing key
#[derive(Clone)]
pub struct KeyRecord {
    pub kid: String,
    pub org_id: String,
    pub source_id: Uuid,
    pub private_key_pem: String,
    pub public_key_pem: String,
}

impl std::fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRecord")
            .field("kid", &self.kid)
            .field("org_id", &self.org_id)
            .field("source_id", &self.source_id)
            .field("private_key_pem", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// Signing key persistence
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Persist a freshly issued key. Keys are write-once.
    async fn insert(&self, record: KeyRecord) -> StoreResult<()>;

    /// Current public keys of every persisted signing key, by kid
    async fn public_keys(&self) -> StoreResult<PublicKeySet>;

    /// Drop the signing key owned by a source
    async fn delete_by_source(&self, source_id: Uuid) -> StoreResult<()>;
}

/// Share token persistence
///
/// Implementations must enforce at most one token per source.
#[async_trait]
pub trait ShareTokenStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the source already has a token
    async fn create(&self, token: ShareToken) -> StoreResult<ShareToken>;

    async fn get_by_token(&self, token: &str) -> StoreResult<Option<ShareToken>>;

    async fn get_by_source(&self, source_id: Uuid) -> StoreResult<Option<ShareToken>>;

    async fn delete_by_source(&self, source_id: Uuid) -> StoreResult<()>;

    async fn list_by_sources(&self, source_ids: &[Uuid]) -> StoreResult<Vec<ShareToken>>;
}

/// Source persistence
#[async_trait]
pub trait SourceStore: Send + Sync {
    async fn create(&self, source: Source) -> StoreResult<Source>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<Source>>;

    async fn list_by_organization(&self, org_id: &str) -> StoreResult<Vec<Source>>;

    /// Replace a stored source. Fails with [`StoreError::NotFound`] if absent.
    async fn update(&self, source: Source) -> StoreResult<Source>;

    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}
