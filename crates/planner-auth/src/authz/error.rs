//! Authorization error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

use crate::auth::AuthError;
use crate::error::ErrorBody;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AccessError {
    /// Authenticated, but not allowed to touch the resource
    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("store error: {0}")]
    Store(StoreError),
}

impl AccessError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) | Self::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Auth(e) => e.status(),
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub const fn is_forbidden(&self) -> bool {
        matches!(self.status(), StatusCode::FORBIDDEN)
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.status(), StatusCode::NOT_FOUND)
    }

    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    fn public_message(&self) -> String {
        match self {
            Self::Forbidden(_) => "forbidden".to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Store(StoreError::NotFound) => "not found".to_string(),
            Self::Validation(detail) => detail.clone(),
            Self::Auth(_) | Self::Store(_) if self.status().is_server_error() => {
                "internal error".to_string()
            }
            Self::Auth(_) | Self::Store(_) => "forbidden".to_string(),
        }
    }
}

impl From<StoreError> for AccessError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        if let Self::Auth(e) = self {
            return e.into_response();
        }
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (
            status,
            Json(ErrorBody {
                message: self.public_message(),
            }),
        )
            .into_response()
    }
}

pub type Result<T> = std::result::Result<T, AccessError>;
