//! Session token issuance and verification.
//!
//! Session tokens are compact HS256 JWS strings carrying the username in
//! `sub`, the user id in `userId` and the comma-joined role names in `roles`.
//! They are stateless: nothing is stored server side and a token dies at `exp`.

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::auth::context::Principal;
use crate::auth::error::{AuthError, AuthResult};
use crate::types::{RoleName, SessionToken};

/// Claims carried by a session token.
///
/// Every field is optional on the wire so that a token missing a claim still
/// decodes and is rejected by the claims check rather than by serde.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// User id
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    /// Comma-joined, sorted role names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<String>,
    /// Issued at (Unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Expiration (Unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl SessionClaims {
    /// Build the claims for `principal`, valid for `ttl_seconds` from now.
    ///
    /// Fails when the expiry is not representable.
    pub fn for_principal(principal: &Principal, ttl_seconds: i64) -> AuthResult<Self> {
        let now = Utc::now();
        let exp = TimeDelta::try_seconds(ttl_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                AuthError::Internal(format!("Session lifetime out of range: {}s", ttl_seconds))
            })?;
        Ok(Self {
            sub: Some(principal.username().to_string()),
            user_id: Some(principal.user_id()),
            roles: Some(principal.joined_roles()),
            iat: Some(now.timestamp()),
            exp: Some(exp.timestamp()),
        })
    }

    /// Turn verified claims into a principal.
    ///
    /// Returns `None` when `sub` or `roles` is missing or empty, or when
    /// `userId` is missing.
    pub fn into_principal(self) -> Option<Principal> {
        let username = self.sub.filter(|s| !s.is_empty())?;
        let roles: Vec<RoleName> = self
            .roles?
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(RoleName::from)
            .collect();
        if roles.is_empty() {
            return None;
        }
        let user_id = self.user_id?;

        Some(Principal::new(user_id, username, roles))
    }
}

/// Signs and verifies session tokens with a shared secret.
#[derive(Clone)]
pub struct SessionTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_seconds: i64,
}

impl SessionTokenCodec {
    pub fn new(secret: &[u8], ttl_seconds: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl_seconds,
        }
    }

    /// Issue a session token for `principal`.
    pub fn generate(&self, principal: &Principal) -> AuthResult<SessionToken> {
        let claims = SessionClaims::for_principal(principal, self.ttl_seconds)?;
        self.sign(&claims)
    }

    /// Sign arbitrary claims with this codec's secret.
    pub fn sign(&self, claims: &SessionClaims) -> AuthResult<SessionToken> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map(SessionToken::new)
            .map_err(|e| AuthError::Internal(format!("Failed to sign session token: {}", e)))
    }

    /// Verify signature and expiry, returning the raw claims.
    pub fn decode_claims(&self, token: &str) -> AuthResult<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::MalformedToken(e.to_string()))
    }

    /// Resolve a bearer token to a principal.
    ///
    /// Absent, empty, tampered, expired or incomplete tokens all yield `None`;
    /// callers treat that as "not authenticated".
    pub fn parse(&self, token: Option<&str>) -> Option<Principal> {
        let token = token.filter(|t| !t.is_empty())?;

        let claims = match self.decode_claims(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!("Rejected session token: {}", e);
                return None;
            }
        };

        let principal = claims.into_principal();
        if principal.is_none() {
            debug!("Rejected session token: required claims missing");
        }
        principal
    }
}
