//! Source operations with authorization applied
//!
//! Every user-facing operation loads the source, returns 404 if it is gone,
//! and only then checks ownership. Agent inventory writes additionally check
//! the token's source binding and the vCenter identity.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{AgentPrincipal, HumanPrincipal, issue_agent_token, issue_signing_key};
use crate::authz::{
    AccessError, Result, ShareTokenService, commit_vcenter_identity, ensure_agent_bound,
    ensure_owner, ensure_same_organization, found,
};
use crate::model::{InventoryUpdate, ShareToken, Source};
use crate::store::{KeyStore, ShareTokenStore, SourceStore};

/// A newly registered source and the token its agent should present
#[derive(Serialize)]
pub struct CreatedSource {
    #[serde(flatten)]
    pub source: Source,
    pub agent_token: String,
}

impl std::fmt::Debug for CreatedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreatedSource")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Owner-side changes to a source
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub inventory: Option<InventoryUpdate>,
}

#[derive(Clone)]
pub struct SourceService {
    sources: Arc<dyn SourceStore>,
    keys: Arc<dyn KeyStore>,
    shares: ShareTokenService,
}

impl std::fmt::Debug for SourceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceService").finish_non_exhaustive()
    }
}

impl SourceService {
    pub fn new(
        sources: Arc<dyn SourceStore>,
        keys: Arc<dyn KeyStore>,
        share_tokens: Arc<dyn ShareTokenStore>,
    ) -> Self {
        let shares = ShareTokenService::new(share_tokens, sources.clone());
        Self {
            sources,
            keys,
            shares,
        }
    }

    #[must_use]
    pub const fn shares(&self) -> &ShareTokenService {
        &self.shares
    }

    async fn load(&self, id: Uuid) -> Result<Source> {
        found(self.sources.get(id).await?, "source")
    }

    async fn load_owned(&self, user: &HumanPrincipal, id: Uuid) -> Result<Source> {
        let source = self.load(id).await?;
        ensure_owner(user, &source)?;
        Ok(source)
    }

    /// Register a source for the user, issue its signing key and mint the
    /// agent token.
    #[tracing::instrument(skip(self, user), fields(username = %user.username, org = %user.organization))]
    pub async fn create_source(&self, user: &HumanPrincipal, name: &str) -> Result<CreatedSource> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AccessError::Validation("source name is required".into()));
        }

        let source = Source::new(name, user.username.clone(), user.organization.clone())
            .with_email_domain(user.email_domain.clone());
        let source = self.sources.create(source).await?;

        let key = match issue_signing_key(self.keys.as_ref(), &source).await {
            Ok(key) => key,
            Err(e) => {
                tracing::error!(source_id = %source.id, error = %e, "Key issuance failed, removing source");
                self.sources.delete(source.id).await?;
                return Err(e.into());
            }
        };
        let agent_token = issue_agent_token(&key, &source)?;

        tracing::info!(source_id = %source.id, "Source created");
        Ok(CreatedSource {
            source,
            agent_token,
        })
    }

    pub async fn get_source(&self, user: &HumanPrincipal, id: Uuid) -> Result<Source> {
        self.load_owned(user, id).await
    }

    /// Sources the caller owns: same organization and same username
    pub async fn list_sources(&self, user: &HumanPrincipal) -> Result<Vec<Source>> {
        let mut sources = self.sources.list_by_organization(&user.organization).await?;
        sources.retain(|source| source.username == user.username);
        Ok(sources)
    }

    #[tracing::instrument(skip(self, user, update), fields(username = %user.username))]
    pub async fn update_source(
        &self,
        user: &HumanPrincipal,
        id: Uuid,
        update: SourceUpdate,
    ) -> Result<Source> {
        let mut source = self.load_owned(user, id).await?;

        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(AccessError::Validation("source name is required".into()));
            }
            source.name = name.to_string();
        }
        if let Some(inventory) = update.inventory {
            commit_vcenter_identity(&mut source, &inventory.vcenter_id)?;
            source.inventory = Some(inventory.inventory);
        }

        source.updated_at = Utc::now();
        Ok(self.sources.update(source).await?)
    }

    /// Delete a source together with its signing key and share token.
    ///
    /// The source goes first, so a concurrent share request can no longer
    /// create a token for it once the token cleanup runs.
    #[tracing::instrument(skip(self, user), fields(username = %user.username))]
    pub async fn delete_source(&self, user: &HumanPrincipal, id: Uuid) -> Result<()> {
        self.load_owned(user, id).await?;

        self.sources.delete(id).await?;
        self.shares.delete_by_source(id).await?;
        self.keys.delete_by_source(id).await?;
        tracing::info!(source_id = %id, "Source deleted");
        Ok(())
    }

    /// Inventory pushed by the source's agent.
    ///
    /// The vCenter check reads and writes the source without a lock, so two
    /// concurrent first writes with different ids may both pass.
    #[tracing::instrument(skip(self, agent, update), fields(agent_source = %agent.source_id))]
    pub async fn update_inventory(
        &self,
        agent: &AgentPrincipal,
        id: Uuid,
        update: InventoryUpdate,
    ) -> Result<Source> {
        let mut source = self.load(id).await?;
        ensure_agent_bound(agent, source.id)?;
        ensure_same_organization(&agent.organization, &source)?;
        commit_vcenter_identity(&mut source, &update.vcenter_id)?;

        source.inventory = Some(update.inventory);
        source.updated_at = Utc::now();
        let source = self.sources.update(source).await?;
        tracing::info!(source_id = %source.id, "Inventory updated");
        Ok(source)
    }

    pub async fn share_source(&self, user: &HumanPrincipal, id: Uuid) -> Result<ShareToken> {
        self.load_owned(user, id).await?;
        self.shares.get_or_create(id).await
    }

    pub async fn unshare_source(&self, user: &HumanPrincipal, id: Uuid) -> Result<()> {
        self.load_owned(user, id).await?;
        self.shares.delete_by_source(id).await
    }

    pub async fn get_share_token(
        &self,
        user: &HumanPrincipal,
        id: Uuid,
    ) -> Result<Option<ShareToken>> {
        self.load_owned(user, id).await?;
        self.shares.get_by_source(id).await
    }

    pub async fn list_share_tokens(&self, user: &HumanPrincipal) -> Result<Vec<ShareToken>> {
        self.shares.list_by_organization(&user.organization).await
    }

    /// Read a source through its share token; no principal involved.
    pub async fn get_shared_source(&self, token: &str) -> Result<Source> {
        self.shares.get_source_by_token(token).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::auth::{AgentVerifier, RawToken};
    use crate::store::{
        InMemoryKeyStore, InMemoryShareTokenStore, InMemorySourceStore, StoreResult,
    };

    struct Fixture {
        service: SourceService,
        sources: InMemorySourceStore,
        keys: InMemoryKeyStore,
        tokens: InMemoryShareTokenStore,
    }

    fn fixture() -> Fixture {
        let sources = InMemorySourceStore::new();
        let keys = InMemoryKeyStore::new();
        let tokens = InMemoryShareTokenStore::new();
        let service = SourceService::new(
            Arc::new(sources.clone()),
            Arc::new(keys.clone()),
            Arc::new(tokens.clone()),
        );
        Fixture {
            service,
            sources,
            keys,
            tokens,
        }
    }

    fn user(username: &str, organization: &str) -> HumanPrincipal {
        HumanPrincipal {
            username: username.to_string(),
            organization: organization.to_string(),
            email_domain: Some("acme.com".to_string()),
            token: RawToken::new("token"),
        }
    }

    fn agent_for(source: &Source) -> AgentPrincipal {
        AgentPrincipal {
            issued_at: Utc::now(),
            expires_at: Utc::now(),
            issuer: "assisted-migrations".to_string(),
            organization: source.org_id.clone(),
            source_id: source.id,
        }
    }

    fn inventory(vcenter_id: &str) -> InventoryUpdate {
        InventoryUpdate {
            vcenter_id: vcenter_id.to_string(),
            inventory: json!({ "vcenter": { "id": vcenter_id }, "vms": { "total": 10 } }),
        }
    }

    async fn seeded(f: &Fixture, username: &str, org: &str) -> Source {
        f.sources
            .create(Source::new("lab", username, org))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_source_issues_working_agent_token() {
        let f = fixture();
        let alice = user("alice", "acme");

        let created = f.service.create_source(&alice, " lab ").await.unwrap();
        assert_eq!(created.source.name, "lab");
        assert_eq!(created.source.org_id, "acme");
        assert_eq!(created.source.email_domain.as_deref(), Some("acme.com"));
        assert_eq!(f.keys.len(), 1);

        let verifier = AgentVerifier::new(Arc::new(f.keys.clone()));
        let agent = verifier.verify(&created.agent_token).await.unwrap();
        assert_eq!(agent.source_id, created.source.id);
        assert_eq!(agent.organization, "acme");
    }

    #[tokio::test]
    async fn test_create_source_requires_name() {
        let f = fixture();
        let err = f
            .service
            .create_source(&user("alice", "acme"), "  ")
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(f.keys.is_empty());
    }

    #[tokio::test]
    async fn test_get_source_enforces_ownership() {
        let f = fixture();
        let source = seeded(&f, "alice", "acme").await;

        assert!(f.service.get_source(&user("alice", "acme"), source.id).await.is_ok());
        assert!(
            f.service
                .get_source(&user("alice", "globex"), source.id)
                .await
                .unwrap_err()
                .is_forbidden()
        );
        assert!(
            f.service
                .get_source(&user("bob", "acme"), source.id)
                .await
                .unwrap_err()
                .is_forbidden()
        );
    }

    #[tokio::test]
    async fn test_missing_source_is_not_found_before_ownership() {
        let f = fixture();
        let err = f
            .service
            .get_source(&user("mallory", "evil"), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_sources_is_owner_scoped() {
        let f = fixture();
        seeded(&f, "alice", "acme").await;
        seeded(&f, "bob", "acme").await;
        seeded(&f, "alice", "globex").await;

        let alice = user("alice", "acme");
        let listed = f.service.list_sources(&alice).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].username, "alice");
        assert_eq!(listed[0].org_id, "acme");

        // Everything listed is also readable
        for source in listed {
            f.service.get_source(&alice, source.id).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_update_source_cross_org_forbidden() {
        let f = fixture();
        let source = seeded(&f, "alice", "acme").await;
        let update = SourceUpdate {
            name: Some("renamed".into()),
            inventory: None,
        };

        let err = f
            .service
            .update_source(&user("alice", "globex"), source.id, update.clone())
            .await
            .unwrap_err();
        assert!(err.is_forbidden());

        let updated = f
            .service
            .update_source(&user("alice", "acme"), source.id, update)
            .await
            .unwrap();
        assert_eq!(updated.name, "renamed");
    }

    #[tokio::test]
    async fn test_update_source_inventory_commits_vcenter() {
        let f = fixture();
        let source = seeded(&f, "alice", "acme").await;
        let alice = user("alice", "acme");

        let updated = f
            .service
            .update_source(
                &alice,
                source.id,
                SourceUpdate {
                    name: None,
                    inventory: Some(inventory("vc-1")),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.vcenter_id.as_deref(), Some("vc-1"));

        let err = f
            .service
            .update_source(
                &alice,
                source.id,
                SourceUpdate {
                    name: None,
                    inventory: Some(inventory("vc-2")),
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_delete_source_cascades() {
        let f = fixture();
        let alice = user("alice", "acme");
        let created = f.service.create_source(&alice, "lab").await.unwrap();
        let id = created.source.id;
        f.service
            .update_inventory(&agent_for(&created.source), id, inventory("vc-1"))
            .await
            .unwrap();
        f.service.share_source(&alice, id).await.unwrap();

        let err = f
            .service
            .delete_source(&user("bob", "acme"), id)
            .await
            .unwrap_err();
        assert!(err.is_forbidden());

        f.service.delete_source(&alice, id).await.unwrap();
        assert!(f.keys.is_empty());
        assert!(f.tokens.is_empty());
        assert!(f.service.get_source(&alice, id).await.unwrap_err().is_not_found());

        let verifier = AgentVerifier::new(Arc::new(f.keys.clone()));
        assert!(verifier.verify(&created.agent_token).await.is_err());
    }

    /// Token store that records whether the source still existed when its
    /// token was cleaned up.
    struct CleanupOrder {
        inner: InMemoryShareTokenStore,
        sources: InMemorySourceStore,
        source_present: Arc<parking_lot::Mutex<Option<bool>>>,
    }

    #[async_trait::async_trait]
    impl ShareTokenStore for CleanupOrder {
        async fn create(&self, token: ShareToken) -> StoreResult<ShareToken> {
            self.inner.create(token).await
        }

        async fn get_by_token(&self, token: &str) -> StoreResult<Option<ShareToken>> {
            self.inner.get_by_token(token).await
        }

        async fn get_by_source(&self, source_id: Uuid) -> StoreResult<Option<ShareToken>> {
            self.inner.get_by_source(source_id).await
        }

        async fn delete_by_source(&self, source_id: Uuid) -> StoreResult<()> {
            let present = self.sources.get(source_id).await?.is_some();
            *self.source_present.lock() = Some(present);
            self.inner.delete_by_source(source_id).await
        }

        async fn list_by_sources(&self, source_ids: &[Uuid]) -> StoreResult<Vec<ShareToken>> {
            self.inner.list_by_sources(source_ids).await
        }
    }

    #[tokio::test]
    async fn test_delete_source_removes_source_before_token() {
        let sources = InMemorySourceStore::new();
        let tokens = InMemoryShareTokenStore::new();
        let source_present = Arc::new(parking_lot::Mutex::new(None));
        let service = SourceService::new(
            Arc::new(sources.clone()),
            Arc::new(InMemoryKeyStore::new()),
            Arc::new(CleanupOrder {
                inner: tokens.clone(),
                sources: sources.clone(),
                source_present: source_present.clone(),
            }),
        );
        let alice = user("alice", "acme");
        let created = service.create_source(&alice, "lab").await.unwrap();
        let id = created.source.id;
        service
            .update_inventory(&agent_for(&created.source), id, inventory("vc-1"))
            .await
            .unwrap();
        service.share_source(&alice, id).await.unwrap();

        service.delete_source(&alice, id).await.unwrap();
        assert_eq!(*source_present.lock(), Some(false));
        assert!(tokens.is_empty());

        // A late share request finds nothing to attach a token to
        let err = service.shares().get_or_create(id).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(tokens.is_empty());
    }

    #[tokio::test]
    async fn test_update_inventory_first_write_binds_vcenter() {
        let f = fixture();
        let source = seeded(&f, "alice", "acme").await;
        let agent = agent_for(&source);

        let updated = f
            .service
            .update_inventory(&agent, source.id, inventory("vc-1"))
            .await
            .unwrap();
        assert_eq!(updated.vcenter_id.as_deref(), Some("vc-1"));
        assert!(updated.has_inventory());

        f.service
            .update_inventory(&agent, source.id, inventory("vc-1"))
            .await
            .unwrap();

        let err = f
            .service
            .update_inventory(&agent, source.id, inventory("vc-2"))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        let stored = f.sources.get(source.id).await.unwrap().unwrap();
        assert_eq!(stored.vcenter_id.as_deref(), Some("vc-1"));
    }

    #[tokio::test]
    async fn test_update_inventory_other_source_forbidden() {
        let f = fixture();
        let source = seeded(&f, "alice", "acme").await;
        let other = seeded(&f, "alice", "acme").await;

        let err = f
            .service
            .update_inventory(&agent_for(&other), source.id, inventory("vc-1"))
            .await
            .unwrap_err();
        assert!(err.is_forbidden());
        let stored = f.sources.get(source.id).await.unwrap().unwrap();
        assert!(stored.vcenter_id.is_none());
    }

    #[tokio::test]
    async fn test_update_inventory_other_organization_forbidden() {
        let f = fixture();
        let source = seeded(&f, "alice", "acme").await;
        let mut agent = agent_for(&source);
        agent.organization = "globex".to_string();

        let err = f
            .service
            .update_inventory(&agent, source.id, inventory("vc-1"))
            .await
            .unwrap_err();
        assert!(err.is_forbidden());
    }

    #[tokio::test]
    async fn test_update_inventory_missing_source() {
        let f = fixture();
        let phantom = Source::new("gone", "alice", "acme");
        let err = f
            .service
            .update_inventory(&agent_for(&phantom), phantom.id, inventory("vc-1"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_share_flow() {
        let f = fixture();
        let alice = user("alice", "acme");
        let source = seeded(&f, "alice", "acme").await;

        let err = f.service.share_source(&alice, source.id).await.unwrap_err();
        assert!(err.is_validation());

        f.service
            .update_inventory(&agent_for(&source), source.id, inventory("vc-1"))
            .await
            .unwrap();

        let err = f
            .service
            .share_source(&user("bob", "acme"), source.id)
            .await
            .unwrap_err();
        assert!(err.is_forbidden());

        let share = f.service.share_source(&alice, source.id).await.unwrap();
        let again = f.service.share_source(&alice, source.id).await.unwrap();
        assert_eq!(share.token, again.token);
        assert_eq!(
            f.service.get_share_token(&alice, source.id).await.unwrap(),
            Some(share.clone())
        );
        assert_eq!(f.service.list_share_tokens(&alice).await.unwrap().len(), 1);

        let shared = f.service.get_shared_source(&share.token).await.unwrap();
        assert_eq!(shared.id, source.id);

        f.service.unshare_source(&alice, source.id).await.unwrap();
        assert!(
            f.service
                .get_shared_source(&share.token)
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[test]
    fn test_created_source_debug_hides_token() {
        let created = CreatedSource {
            source: Source::new("lab", "alice", "acme"),
            agent_token: "eyJsecret".to_string(),
        };
        assert!(!format!("{created:?}").contains("eyJsecret"));
    }

    #[test]
    fn test_created_source_serializes_flat() {
        let created = CreatedSource {
            source: Source::new("lab", "alice", "acme"),
            agent_token: "tok".to_string(),
        };
        let json = serde_json::to_value(&created).unwrap();
        assert_eq!(json["name"], "lab");
        assert_eq!(json["agent_token"], "tok");
    }
}
