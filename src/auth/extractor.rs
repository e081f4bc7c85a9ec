//! Request extractors that attach the caller's identity to handlers.
//!
//! The session token travels in `Authorization: Bearer <token>`. A missing or
//! rejected token yields an anonymous [`AuthContext`]; handlers that require a
//! caller take [`Authenticated`] instead and reject with 401.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use http::header::AUTHORIZATION;
use http::request::Parts;

use crate::auth::context::{AuthContext, Principal};
use crate::auth::error::AuthError;
use crate::auth::token::SessionTokenCodec;

/// Extract the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively; anything but exactly
/// `Bearer <token>` yields `None`.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next()?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    Some(token)
}

fn context_from_parts(parts: &Parts, codec: &SessionTokenCodec) -> AuthContext {
    let token = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token);

    match codec.parse(token) {
        Some(principal) => AuthContext::authenticated(principal),
        None => AuthContext::anonymous(),
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    Arc<SessionTokenCodec>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let codec = Arc::<SessionTokenCodec>::from_ref(state);
        Ok(context_from_parts(parts, &codec))
    }
}

/// The authenticated principal; rejects anonymous requests.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Principal);

impl<S> FromRequestParts<S> for Authenticated
where
    Arc<SessionTokenCodec>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let codec = Arc::<SessionTokenCodec>::from_ref(state);
        let ctx = context_from_parts(parts, &codec);
        ctx.current_authentication().cloned().map(Authenticated)
    }
}
