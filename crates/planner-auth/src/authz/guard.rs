//! Ownership and binding checks
//!
//! Each check is a plain function over the principal and the stored
//! resource. Callers load the resource first, so a missing resource is
//! reported as 404 before any of these run.

use uuid::Uuid;

use super::error::{AccessError, Result};
use crate::auth::{AgentPrincipal, HumanPrincipal};
use crate::model::Source;

/// A tenant resource owned by one user in one organization
pub trait Owned {
    fn organization(&self) -> &str;

    fn owner(&self) -> &str;
}

impl Owned for Source {
    fn organization(&self) -> &str {
        &self.org_id
    }

    fn owner(&self) -> &str {
        &self.username
    }
}

fn deny(reason: &'static str) -> AccessError {
    tracing::warn!(reason, "Authorization denied");
    #[cfg(feature = "metrics")]
    crate::observability::record_authorization_denied(reason);
    AccessError::Forbidden(reason)
}

/// The resource must live in the caller's organization.
pub fn ensure_same_organization<R: Owned>(organization: &str, resource: &R) -> Result<()> {
    if organization != resource.organization() {
        return Err(deny("organization mismatch"));
    }
    Ok(())
}

/// The user must own the resource: same organization and same username.
pub fn ensure_owner<R: Owned>(user: &HumanPrincipal, resource: &R) -> Result<()> {
    if user.organization != resource.organization() {
        return Err(deny("organization mismatch"));
    }
    if user.username != resource.owner() {
        return Err(deny("username mismatch"));
    }
    Ok(())
}

/// The agent token must have been issued for this source.
pub fn ensure_agent_bound(agent: &AgentPrincipal, source_id: Uuid) -> Result<()> {
    if agent.source_id != source_id {
        return Err(deny("agent not bound to source"));
    }
    Ok(())
}

/// Bind the source to an external platform on its first inventory write.
///
/// Returns `true` when the identity was recorded by this call. Once set, a
/// different id is rejected with a validation error.
pub fn commit_vcenter_identity(source: &mut Source, vcenter_id: &str) -> Result<bool> {
    if vcenter_id.is_empty() {
        return Err(AccessError::Validation("vCenter ID is required".into()));
    }
    if let Some(bound) = source.vcenter_id.as_deref() {
        if bound == vcenter_id {
            return Ok(false);
        }
        tracing::warn!(
            source_id = %source.id,
            bound,
            presented = vcenter_id,
            "vCenter ID mismatch"
        );
        return Err(AccessError::Validation("vCenter ID mismatch".into()));
    }

    tracing::info!(source_id = %source.id, vcenter_id, "Binding source to vCenter");
    source.vcenter_id = Some(vcenter_id.to_string());
    Ok(true)
}

/// Convert an absent lookup into a 404.
pub fn found<T>(value: Option<T>, what: &'static str) -> Result<T> {
    value.ok_or(AccessError::NotFound(what))
}
