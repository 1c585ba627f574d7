use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;
use crate::store::StoreError;

/// JSON body returned with every 4xx/5xx produced by this crate.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authentication setup failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl Error {
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Config("missing JWKS URL".into());
        assert_eq!(err.to_string(), "Configuration error: missing JWKS URL");

        let err = Error::Transport("bind failed".into());
        assert_eq!(err.to_string(), "Transport error: bind failed");
    }

    #[test]
    fn test_error_predicates() {
        assert!(Error::Config(String::new()).is_config());
        assert!(!Error::Config(String::new()).is_transport());
        assert!(Error::Transport(String::new()).is_transport());
    }

    #[test]
    fn test_from_auth_error() {
        let err: Error = AuthError::MissingCredentials.into();
        assert!(matches!(err, Error::Auth(_)));
    }
}
