//! Authentication error types
//!
//! Every verification failure maps to a single 401 outcome on the wire. The
//! variants only exist so the reason can be logged.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

use crate::error::ErrorBody;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing or malformed authorization header")]
    MissingCredentials,

    #[error("token header has no key id")]
    MissingKeyId,

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    TokenExpired,

    #[error("token not yet valid")]
    TokenNotYetValid,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("algorithm not allowed")]
    InvalidAlgorithm,

    #[error("missing required claim: {0}")]
    MissingClaim(String),

    #[error("invalid claim: {0}")]
    InvalidClaim(&'static str),

    #[error("malformed username")]
    MalformedUsername,

    #[error("key store unavailable: {0}")]
    KeyStore(String),

    #[error("JWKS fetch failed: {0}")]
    JwksFetch(#[from] reqwest::Error),

    #[error("JWKS parse failed: {0}")]
    JwksParse(String),

    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("key encoding failed: {0}")]
    KeyEncoding(String),

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("authenticated principal missing from request")]
    MissingPrincipal,

    #[error("principal already set for request")]
    PrincipalAlreadySet,

    #[error("expected {expected} principal")]
    WrongPrincipal { expected: &'static str },
}

impl AuthError {
    /// HTTP status surfaced to the caller.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingCredentials
            | Self::MissingKeyId
            | Self::KeyNotFound(_)
            | Self::InvalidToken
            | Self::TokenExpired
            | Self::TokenNotYetValid
            | Self::InvalidSignature
            | Self::InvalidAlgorithm
            | Self::MissingClaim(_)
            | Self::InvalidClaim(_)
            | Self::MalformedUsername
            | Self::KeyStore(_) => StatusCode::UNAUTHORIZED,

            Self::WrongPrincipal { .. } => StatusCode::FORBIDDEN,

            Self::JwksFetch(_)
            | Self::JwksParse(_)
            | Self::KeyGeneration(_)
            | Self::KeyEncoding(_)
            | Self::Signing(_)
            | Self::Config(_)
            | Self::MissingPrincipal
            | Self::PrincipalAlreadySet => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub const fn is_authentication_failure(&self) -> bool {
        matches!(self.status(), StatusCode::UNAUTHORIZED)
    }

    const fn public_message(&self) -> &'static str {
        match self.status() {
            StatusCode::UNAUTHORIZED => "authentication failed",
            StatusCode::FORBIDDEN => "forbidden",
            _ => "internal error",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::TokenExpired,
            ErrorKind::ImmatureSignature => Self::TokenNotYetValid,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::MissingAlgorithm => Self::InvalidAlgorithm,
            ErrorKind::MissingRequiredClaim(claim) => Self::MissingClaim(claim.clone()),
            _ => Self::InvalidToken,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        Self::KeyStore(err.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Authentication pipeline error");
        }
        (
            status,
            Json(ErrorBody {
                message: self.public_message().to_string(),
            }),
        )
            .into_response()
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
