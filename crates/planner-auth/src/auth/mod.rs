//! Authentication module
//!
//! Two trust domains share one request pipeline:
//!
//! - Human operators present RS256 tokens from the identity provider, checked
//!   against its JWKS (`rhsso`) or a locally configured key (`local`).
//! - Collector agents present RS256 tokens signed with their source's own
//!   key; the header `kid` selects the public key from the [`KeyStore`].
//!
//! Every verification failure is reported as a plain 401. The specific
//! reason is only logged.
//!
//! [`KeyStore`]: crate::store::KeyStore

mod agent;
mod authenticator;
mod claims;
mod config;
mod error;
mod issuer;
mod jwks;
mod keys;
mod principal;
mod rhsso;

pub use agent::AgentVerifier;
pub use authenticator::{Authenticator, authenticate, bearer_token};
pub use claims::{AgentClaims, IdentityClaims, OneOrMany};
pub use config::{AuthConfig, AuthScheme};
pub use error::{AuthError, Result};
pub use issuer::issue_agent_token;
pub use jwks::{JwkSet, JwksCache, JwksRefreshTask};
pub use keys::{KEY_BITS, PublicKeySet, SigningKey, issue_signing_key};
pub use principal::{
    AgentPrincipal, HumanPrincipal, Principal, RawToken, get_principal, set_principal,
};
pub use rhsso::{RhssoVerifier, resolve_organization};
