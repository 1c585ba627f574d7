//! Tenant resources guarded by this crate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered source: the tenant resource agents report inventory for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub org_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_domain: Option<String>,
    /// External platform identity bound on the first inventory write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcenter_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Source {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        username: impl Into<String>,
        org_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            username: username.into(),
            org_id: org_id.into(),
            email_domain: None,
            vcenter_id: None,
            inventory: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_email_domain(mut self, domain: Option<String>) -> Self {
        self.email_domain = domain;
        self
    }

    #[must_use]
    pub const fn has_inventory(&self) -> bool {
        self.inventory.is_some()
    }
}

/// Inventory payload pushed by an agent or uploaded by its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryUpdate {
    pub vcenter_id: String,
    pub inventory: serde_json::Value,
}

/// Capability token granting read access to a single source.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShareToken {
    pub token: String,
    pub source_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl ShareToken {
    #[must_use]
    pub fn new(source_id: Uuid, token: String) -> Self {
        Self {
            token,
            source_id,
            created_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for ShareToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareToken")
            .field("token", &truncate_token(&self.token))
            .field("source_id", &self.source_id)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Log-safe prefix of a share token.
pub fn truncate_token(token: &str) -> String {
    match token.get(..8) {
        Some(prefix) if token.len() > 8 => format!("{prefix}..."),
        _ => token.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_new() {
        let source = Source::new("lab", "alice", "acme");
        assert_eq!(source.name, "lab");
        assert_eq!(source.username, "alice");
        assert_eq!(source.org_id, "acme");
        assert!(source.vcenter_id.is_none());
        assert!(!source.has_inventory());
        assert_eq!(source.created_at, source.updated_at);
    }

    #[test]
    fn test_source_serialize_skips_empty_fields() {
        let source = Source::new("lab", "alice", "acme");
        let json = serde_json::to_value(&source).unwrap();
        assert!(json.get("vcenter_id").is_none());
        assert!(json.get("inventory").is_none());
        assert_eq!(json["org_id"], "acme");
    }

    #[test]
    fn test_truncate_token() {
        assert_eq!(truncate_token("0123456789abcdef"), "01234567...");
        assert_eq!(truncate_token("01234567"), "01234567");
        assert_eq!(truncate_token("abc"), "abc");
    }

    #[test]
    fn test_share_token_debug_truncates() {
        let token = ShareToken::new(Uuid::new_v4(), "f".repeat(64));
        let debug = format!("{token:?}");
        assert!(debug.contains("ffffffff..."));
        assert!(!debug.contains(&"f".repeat(64)));
    }
}
