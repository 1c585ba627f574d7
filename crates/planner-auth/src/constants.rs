//! Constants for the planner auth service

/// Issuer and audience of agent tokens
pub const AGENT_TOKEN_ISSUER: &str = "assisted-migrations";

/// Agent token lifetime in calendar months
pub const AGENT_TOKEN_VALIDITY_MONTHS: u32 = 3;

/// Clock skew tolerance for exp/nbf/iat checks, in seconds
pub const TOKEN_LEEWAY_SECS: u64 = 60;

/// Bearer scheme prefix of the Authorization header
pub const BEARER_PREFIX: &str = "Bearer ";

/// Random bytes behind a share token (hex encoded to twice the length)
pub const SHARE_TOKEN_BYTES: usize = 32;

/// Identity injected when authentication is disabled
pub const NONE_AUTH_USERNAME: &str = "admin";
pub const NONE_AUTH_ORGANIZATION: &str = "internal";
pub const NONE_AUTH_RAW_TOKEN: &str = "fake-raw-token";

/// Timeout for JWKS downloads
pub const JWKS_FETCH_TIMEOUT_SECS: u64 = 10;
