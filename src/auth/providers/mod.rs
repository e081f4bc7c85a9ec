//! Identity verifiers for third-party login providers.
//!
//! Each provider validates its own token format and yields a normalized
//! [`IdentityPayload`]. Dispatch is an enum selected by the explicit
//! [`Provider`] tag the client posts to.

mod facebook;
mod google;
#[cfg(test)]
pub(crate) mod test_support;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::auth::error::{AuthError, AuthResult};

pub use facebook::{DEFAULT_GRAPH_URL, FacebookVerifier};
pub use google::{DEFAULT_GOOGLE_JWKS_URL, GOOGLE_ISSUERS, GoogleVerifier};

/// Login provider tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Google,
    Facebook,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Facebook => "facebook",
        }
    }

    /// The payload field that becomes the local username.
    ///
    /// Google identities are keyed by email, Facebook identities by username.
    pub fn login_key<'a>(&self, payload: &'a IdentityPayload) -> Option<&'a str> {
        let key = match self {
            Self::Google => payload.email.as_deref(),
            Self::Facebook => payload.username.as_deref(),
        };
        key.filter(|k| !k.is_empty())
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "facebook" => Ok(Self::Facebook),
            other => Err(AuthError::InvalidToken(format!(
                "Unknown identity provider: {}",
                other
            ))),
        }
    }
}

/// Normalized identity extracted from a provider token.
///
/// Lives only for the duration of a login call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityPayload {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

/// Verifier for one provider.
pub enum IdentityVerifier {
    Google(GoogleVerifier),
    Facebook(FacebookVerifier),
}

impl IdentityVerifier {
    pub fn provider(&self) -> Provider {
        match self {
            Self::Google(_) => Provider::Google,
            Self::Facebook(_) => Provider::Facebook,
        }
    }

    /// Validate `token` with the provider and extract the identity.
    ///
    /// Fails with [`AuthError::InvalidToken`]; never retried.
    pub async fn verify(&self, token: &str) -> AuthResult<IdentityPayload> {
        if token.trim().is_empty() {
            return Err(AuthError::InvalidToken("empty provider token".to_string()));
        }

        match self {
            Self::Google(verifier) => verifier.verify(token).await,
            Self::Facebook(verifier) => verifier.verify(token).await,
        }
    }
}

/// Turn a reqwest failure into a provider rejection.
///
/// The request URL is dropped from the message; it can carry tokens.
pub(crate) fn transport_error(provider: Provider, err: reqwest::Error) -> AuthError {
    if err.is_timeout() {
        AuthError::InvalidToken(format!("{} verification timed out", provider))
    } else {
        AuthError::InvalidToken(format!(
            "{} verification failed: {}",
            provider,
            err.without_url()
        ))
    }
}
