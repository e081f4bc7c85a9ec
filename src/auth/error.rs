//! Error types for authentication operations.
//!
//! Every authentication failure renders the same generic `unauthorized`
//! response; the detail is only ever written to the log.

use std::fmt;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use crate::store::StoreError;

/// Authentication errors.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// The identity provider rejected the token (bad signature, audience,
    /// expiry, transport failure or timeout)
    InvalidToken(String),
    /// A session token failed the signature, format or claims check
    MalformedToken(String),
    /// A concurrent first login created the account and it could not be re-read
    AccountConflict(String),
    /// No principal attached to the request
    Unauthenticated,
    /// Username/password mismatch
    BadCredentials,
    /// The account exists but is disabled
    Disabled,
    /// Authenticated but not allowed to act on the resource
    Forbidden(String),
    /// Store failure
    Store(StoreError),
    /// Unexpected internal failure (hashing, signing)
    Internal(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidToken(msg) => write!(f, "Invalid provider token: {}", msg),
            Self::MalformedToken(msg) => write!(f, "Malformed session token: {}", msg),
            Self::AccountConflict(msg) => write!(f, "Account conflict: {}", msg),
            Self::Unauthenticated => write!(f, "Authentication required"),
            Self::BadCredentials => write!(f, "Invalid username or password"),
            Self::Disabled => write!(f, "User account is disabled"),
            Self::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            Self::Store(err) => write!(f, "Store error: {}", err),
            Self::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// Error returned when a non-admin acts on someone else's resource.
    pub fn access_denied() -> Self {
        Self::Forbidden(
            "You must be admin or the resource's owner to be able to do this action".to_string(),
        )
    }

    /// HTTP status used when rendering this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match status {
            StatusCode::FORBIDDEN => {
                warn!("Access denied: {}", self);
                serde_json::json!({ "error": "forbidden", "message": self.to_string() })
            }
            StatusCode::INTERNAL_SERVER_ERROR => {
                error!("Authentication failed with internal error: {}", self);
                serde_json::json!({ "error": "internal_error" })
            }
            _ => {
                warn!("Authentication failed: {}", self);
                serde_json::json!({ "error": "unauthorized" })
            }
        };

        (status, Json(body)).into_response()
    }
}
