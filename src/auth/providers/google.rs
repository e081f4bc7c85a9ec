//! Google ID token verification.
//!
//! ID tokens are RS256 JWTs signed with one of Google's published keys. The
//! token is accepted when the signature verifies against the key named by the
//! header `kid`, it has not expired, the issuer is Google and the audience is
//! one of our OAuth client ids.

use jsonwebtoken::{Algorithm, Validation, decode, decode_header};
use serde::Deserialize;
use tracing::debug;

use super::{IdentityPayload, Provider};
use crate::auth::error::{AuthError, AuthResult};
use crate::auth::jwks::JwksCache;

/// Google's JWKS endpoint.
pub const DEFAULT_GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";

/// Issuers Google puts in `iss`.
pub const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Claims read from a Google ID token.
#[derive(Debug, Deserialize)]
struct GoogleIdClaims {
    sub: String,
    email: Option<String>,
    email_verified: Option<bool>,
    given_name: Option<String>,
    family_name: Option<String>,
}

impl From<GoogleIdClaims> for IdentityPayload {
    fn from(claims: GoogleIdClaims) -> Self {
        Self {
            email: claims.email,
            username: None,
            first_name: claims.given_name.unwrap_or_default(),
            last_name: claims.family_name.unwrap_or_default(),
        }
    }
}

/// Verifies Google ID tokens against Google's signing keys.
pub struct GoogleVerifier {
    client_ids: Vec<String>,
    issuers: Vec<String>,
    keys: JwksCache,
}

impl GoogleVerifier {
    pub fn new(client_ids: Vec<String>, keys: JwksCache) -> Self {
        Self {
            client_ids,
            issuers: GOOGLE_ISSUERS.iter().map(|s| s.to_string()).collect(),
            keys,
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&self.client_ids);
        validation.set_issuer(&self.issuers);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation
    }

    pub async fn verify(&self, id_token: &str) -> AuthResult<IdentityPayload> {
        if self.client_ids.is_empty() {
            return Err(AuthError::InvalidToken(
                "Google sign-in has no client id configured".to_string(),
            ));
        }

        let header = decode_header(id_token)
            .map_err(|e| AuthError::InvalidToken(format!("Invalid ID token header: {}", e)))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken(format!(
                "Unexpected ID token algorithm: {:?}",
                header.alg
            )));
        }

        let key = self
            .keys
            .get_key(header.kid.as_deref())
            .await
            .map_err(|e| AuthError::InvalidToken(format!("{} signing key: {}", Provider::Google, e)))?;

        let claims = decode::<GoogleIdClaims>(id_token, &key, &self.validation())
            .map_err(|e| AuthError::InvalidToken(format!("ID token rejected: {}", e)))?
            .claims;

        if claims.email_verified == Some(false) {
            return Err(AuthError::InvalidToken(
                "Google account email is not verified".to_string(),
            ));
        }

        debug!("Google ID token verified for subject {}", claims.sub);
        Ok(claims.into())
    }
}
