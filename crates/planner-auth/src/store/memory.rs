//! In-memory store implementations
//!
//! Each store keeps its records behind a single `parking_lot` lock, so
//! uniqueness checks and inserts happen atomically.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{KeyRecord, KeyStore, ShareTokenStore, SourceStore, StoreError, StoreResult};
use crate::auth::PublicKeySet;
use crate::model::{ShareToken, Source};

/// Thread-safe in-memory signing key store
#[derive(Debug, Clone, Default)]
pub struct InMemoryKeyStore {
    keys: Arc<RwLock<HashMap<String, KeyRecord>>>,
}

impl InMemoryKeyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn insert(&self, record: KeyRecord) -> StoreResult<()> {
        let mut keys = self.keys.write();
        if keys.contains_key(&record.kid)
            || keys.values().any(|k| k.source_id == record.source_id)
        {
            return Err(StoreError::Conflict);
        }
        keys.insert(record.kid.clone(), record);
        Ok(())
    }

    async fn public_keys(&self) -> StoreResult<PublicKeySet> {
        let keys = self.keys.read();
        Ok(keys
            .values()
            .map(|k| (k.kid.clone(), k.public_key_pem.clone()))
            .collect())
    }

    async fn delete_by_source(&self, source_id: Uuid) -> StoreResult<()> {
        self.keys.write().retain(|_, k| k.source_id != source_id);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ShareTokenIndex {
    by_token: HashMap<String, ShareToken>,
    by_source: HashMap<Uuid, String>,
}

/// Thread-safe in-memory share token store
#[derive(Debug, Clone, Default)]
pub struct InMemoryShareTokenStore {
    inner: Arc<RwLock<ShareTokenIndex>>,
}

impl InMemoryShareTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().by_token.is_empty()
    }
}

#[async_trait]
impl ShareTokenStore for InMemoryShareTokenStore {
    async fn create(&self, token: ShareToken) -> StoreResult<ShareToken> {
        let mut inner = self.inner.write();
        if inner.by_source.contains_key(&token.source_id)
            || inner.by_token.contains_key(&token.token)
        {
            return Err(StoreError::Conflict);
        }
        inner.by_source.insert(token.source_id, token.token.clone());
        inner.by_token.insert(token.token.clone(), token.clone());
        Ok(token)
    }

    async fn get_by_token(&self, token: &str) -> StoreResult<Option<ShareToken>> {
        Ok(self.inner.read().by_token.get(token).cloned())
    }

    async fn get_by_source(&self, source_id: Uuid) -> StoreResult<Option<ShareToken>> {
        let inner = self.inner.read();
        Ok(inner
            .by_source
            .get(&source_id)
            .and_then(|token| inner.by_token.get(token))
            .cloned())
    }

    async fn delete_by_source(&self, source_id: Uuid) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if let Some(token) = inner.by_source.remove(&source_id) {
            inner.by_token.remove(&token);
        }
        Ok(())
    }

    async fn list_by_sources(&self, source_ids: &[Uuid]) -> StoreResult<Vec<ShareToken>> {
        let inner = self.inner.read();
        Ok(source_ids
            .iter()
            .filter_map(|id| inner.by_source.get(id))
            .filter_map(|token| inner.by_token.get(token))
            .cloned()
            .collect())
    }
}

/// Thread-safe in-memory source store
#[derive(Debug, Clone, Default)]
pub struct InMemorySourceStore {
    sources: Arc<RwLock<HashMap<Uuid, Source>>>,
}

impl InMemorySourceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SourceStore for InMemorySourceStore {
    async fn create(&self, source: Source) -> StoreResult<Source> {
        let mut sources = self.sources.write();
        if sources.contains_key(&source.id) {
            return Err(StoreError::Conflict);
        }
        sources.insert(source.id, source.clone());
        Ok(source)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Source>> {
        Ok(self.sources.read().get(&id).cloned())
    }

    async fn list_by_organization(&self, org_id: &str) -> StoreResult<Vec<Source>> {
        let mut sources: Vec<Source> = self
            .sources
            .read()
            .values()
            .filter(|s| s.org_id == org_id)
            .cloned()
            .collect();
        sources.sort_by_key(|s| s.created_at);
        Ok(sources)
    }

    async fn update(&self, source: Source) -> StoreResult<Source> {
        let mut sources = self.sources.write();
        let slot = sources.get_mut(&source.id).ok_or(StoreError::NotFound)?;
        *slot = source.clone();
        Ok(source)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        self.sources.write().remove(&id);
        Ok(())
    }
}
