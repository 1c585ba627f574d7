//! Authentication and authorization for the migration planner API

pub mod api;
pub mod auth;
pub mod authz;
pub mod config;
mod constants;
mod error;
pub mod model;
pub mod observability;
pub mod service;
pub mod store;

#[cfg(test)]
mod testing;

pub use api::{AppState, agent_router, user_router};
pub use auth::{
    AgentPrincipal, AgentVerifier, AuthConfig, AuthError, AuthScheme, Authenticator,
    HumanPrincipal, Principal, RhssoVerifier, SigningKey, issue_agent_token, issue_signing_key,
};
pub use authz::{AccessError, ShareTokenService};
pub use config::{Config, ConfigBuilder, HttpConfig, TelemetryConfig};
pub use error::{Error, ErrorBody, Result};
pub use model::{InventoryUpdate, ShareToken, Source};
pub use service::{CreatedSource, SourceService, SourceUpdate};
pub use store::{
    InMemoryKeyStore, InMemoryShareTokenStore, InMemorySourceStore, KeyRecord, KeyStore,
    ShareTokenStore, SourceStore, StoreError,
};
