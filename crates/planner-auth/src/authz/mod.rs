//! Authorization
//!
//! Authentication establishes who is calling; this module decides what they
//! may touch. Denials are 403, lookups of absent resources 404, and a
//! conflicting vCenter binding 400.

mod error;
mod guard;
mod share;

pub use error::{AccessError, Result};
pub use guard::{
    Owned, commit_vcenter_identity, ensure_agent_bound, ensure_owner, ensure_same_organization,
    found,
};
pub use share::{ShareTokenService, generate_share_token};
