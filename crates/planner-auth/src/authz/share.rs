//! Share tokens: unauthenticated read capability for one source

use std::sync::Arc;

use rand::RngCore;
use uuid::Uuid;

use super::error::{AccessError, Result};
use super::guard::found;
use crate::constants::SHARE_TOKEN_BYTES;
use crate::model::{ShareToken, Source, truncate_token};
use crate::store::{ShareTokenStore, SourceStore};

/// Random hex token of [`SHARE_TOKEN_BYTES`] bytes
#[must_use]
pub fn generate_share_token() -> String {
    let mut bytes = [0u8; SHARE_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Share token operations over the token and source stores
#[derive(Clone)]
pub struct ShareTokenService {
    tokens: Arc<dyn ShareTokenStore>,
    sources: Arc<dyn SourceStore>,
}

impl std::fmt::Debug for ShareTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareTokenService").finish_non_exhaustive()
    }
}

impl ShareTokenService {
    pub fn new(tokens: Arc<dyn ShareTokenStore>, sources: Arc<dyn SourceStore>) -> Self {
        Self { tokens, sources }
    }

    /// Return the source's token, creating it on first use.
    ///
    /// Concurrent callers all observe the same token: a losing insert
    /// re-reads the winner's row. Ownership is checked by the caller.
    #[tracing::instrument(skip(self))]
    pub async fn get_or_create(&self, source_id: Uuid) -> Result<ShareToken> {
        let source = found(self.sources.get(source_id).await?, "source")?;
        if !source.has_inventory() {
            return Err(AccessError::Validation(
                "source has no inventory to share".into(),
            ));
        }

        if let Some(existing) = self.tokens.get_by_source(source_id).await? {
            return Ok(existing);
        }

        let candidate = ShareToken::new(source_id, generate_share_token());
        match self.tokens.create(candidate).await {
            Ok(created) => {
                tracing::info!(token = %truncate_token(&created.token), "Created share token");
                Ok(created)
            }
            Err(e) if e.is_conflict() => {
                tracing::debug!("Share token created concurrently, reusing it");
                found(self.tokens.get_by_source(source_id).await?, "share token")
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_by_source(&self, source_id: Uuid) -> Result<Option<ShareToken>> {
        Ok(self.tokens.get_by_source(source_id).await?)
    }

    /// Resolve a token to the source it grants access to.
    ///
    /// A token whose source has since been deleted is reported as 404.
    pub async fn get_source_by_token(&self, token: &str) -> Result<Source> {
        let share = found(self.tokens.get_by_token(token).await?, "share token")?;
        self.sources.get(share.source_id).await?.ok_or_else(|| {
            tracing::debug!(
                token = %truncate_token(token),
                source_id = %share.source_id,
                "Share token points at a deleted source"
            );
            AccessError::NotFound("source")
        })
    }

    pub async fn delete_by_source(&self, source_id: Uuid) -> Result<()> {
        self.tokens.delete_by_source(source_id).await?;
        tracing::debug!(%source_id, "Deleted share token");
        Ok(())
    }

    /// Tokens for every source of an organization
    pub async fn list_by_organization(&self, org_id: &str) -> Result<Vec<ShareToken>> {
        let ids: Vec<Uuid> = self
            .sources
            .list_by_organization(org_id)
            .await?
            .iter()
            .map(|s| s.id)
            .collect();
        Ok(self.tokens.list_by_sources(&ids).await?)
    }
}
