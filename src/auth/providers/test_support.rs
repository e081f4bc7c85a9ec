//! In-process stand-ins for Google's JWKS endpoint and the Facebook Graph API.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Value, json};

use super::{FacebookVerifier, GoogleVerifier};
use crate::auth::bearer_token;
use crate::auth::jwks::JwksCache;

pub const TEST_GOOGLE_CLIENT_ID: &str = "bookshelf-test.apps.googleusercontent.com";
pub const TEST_KID: &str = "bookshelf-test-key";
pub const TEST_FACEBOOK_APP_ID: &str = "424242";
pub const TEST_FACEBOOK_APP_SECRET: &str = "bookshelf-test-app-secret";

const TEST_KEY_PEM: &[u8] = include_bytes!("../../../tests/fixtures/google_rsa_test_key.pem");
const TEST_KEY_MODULUS: &str = include_str!("../../../tests/fixtures/google_rsa_test_key.n");

/// Facebook access token known to the fake Graph API.
struct Grant {
    app_id: String,
    profile: Value,
}

type Grants = Arc<HashMap<String, Grant>>;

/// Facebook `/me` body.
pub fn facebook_profile(id: &str, email: Option<&str>, first_name: &str, last_name: &str) -> Value {
    let mut profile = json!({
        "id": id,
        "first_name": first_name,
        "last_name": last_name,
    });
    if let Some(email) = email {
        profile["email"] = json!(email);
    }
    profile
}

/// Fields of a Google ID token minted by [`google_id_token`].
#[derive(Debug, Clone)]
pub struct GoogleTokenSpec {
    pub email: String,
    pub given_name: String,
    pub family_name: String,
    pub audience: String,
    pub email_verified: bool,
    pub expires_in: i64,
}

impl GoogleTokenSpec {
    pub fn new(email: &str, given_name: &str, family_name: &str) -> Self {
        Self {
            email: email.to_string(),
            given_name: given_name.to_string(),
            family_name: family_name.to_string(),
            audience: TEST_GOOGLE_CLIENT_ID.to_string(),
            email_verified: true,
            expires_in: 3600,
        }
    }
}

/// Sign an ID token with the fixture RSA key.
pub fn google_id_token(spec: &GoogleTokenSpec) -> String {
    let now = Utc::now().timestamp();
    let claims = json!({
        "iss": "https://accounts.google.com",
        "aud": spec.audience,
        "sub": format!("google-{}", spec.email),
        "email": spec.email,
        "email_verified": spec.email_verified,
        "given_name": spec.given_name,
        "family_name": spec.family_name,
        "iat": now,
        "exp": now + spec.expires_in,
    });

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TEST_KID.to_string());
    let key = EncodingKey::from_rsa_pem(TEST_KEY_PEM).unwrap();
    encode(&header, &claims, &key).unwrap()
}

fn jwks_document() -> Value {
    json!({
        "keys": [{
            "kty": "RSA",
            "kid": TEST_KID,
            "alg": "RS256",
            "use": "sig",
            "n": TEST_KEY_MODULUS.trim(),
            "e": "AQAB",
        }]
    })
}

async fn certs() -> Json<Value> {
    Json(jwks_document())
}

fn oauth_error(message: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": {
                "message": message,
                "type": "OAuthException",
                "code": 190
            }
        })),
    )
}

async fn debug_token(
    State(grants): State<Grants>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    let app_token = format!("{}|{}", TEST_FACEBOOK_APP_ID, TEST_FACEBOOK_APP_SECRET);
    if params.get("access_token") != Some(&app_token) {
        return oauth_error("Invalid OAuth access token signature.");
    }

    let grant = params
        .get("input_token")
        .and_then(|token| grants.get(token));
    let data = match grant {
        Some(grant) => json!({
            "app_id": grant.app_id,
            "type": "USER",
            "is_valid": true,
            "user_id": grant.profile["id"],
        }),
        None => json!({
            "is_valid": false,
            "error": { "code": 190, "message": "Invalid OAuth access token." },
        }),
    };
    (StatusCode::OK, Json(json!({ "data": data })))
}

async fn me(State(grants): State<Grants>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let grant = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .and_then(|token| grants.get(token));

    match grant {
        Some(grant) => (StatusCode::OK, Json(grant.profile.clone())),
        None => oauth_error("Invalid OAuth access token."),
    }
}

async fn slow_debug_token() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({ "data": { "is_valid": false } }))
}

/// Fake provider endpoints bound to an ephemeral local port.
pub struct FakeProviders {
    pub base_url: String,
}

impl FakeProviders {
    /// Serve `/certs` (JWKS), `/debug_token` and `/me` (Graph token
    /// inspection and profile lookup), and `/slow/debug_token` (never answers
    /// within a short client timeout).
    ///
    /// Every access token is issued to [`TEST_FACEBOOK_APP_ID`].
    pub async fn spawn(facebook_profiles: Vec<(&str, Value)>) -> Self {
        Self::spawn_with_apps(
            facebook_profiles
                .into_iter()
                .map(|(token, profile)| (token, TEST_FACEBOOK_APP_ID, profile))
                .collect(),
        )
        .await
    }

    /// Like [`FakeProviders::spawn`], with the issuing app given per token.
    pub async fn spawn_with_apps(facebook_grants: Vec<(&str, &str, Value)>) -> Self {
        let grants: Grants = Arc::new(
            facebook_grants
                .into_iter()
                .map(|(token, app_id, profile)| {
                    let grant = Grant {
                        app_id: app_id.to_string(),
                        profile,
                    };
                    (token.to_string(), grant)
                })
                .collect(),
        );

        let app = Router::new()
            .route("/certs", get(certs))
            .route("/debug_token", get(debug_token))
            .route("/me", get(me))
            .route("/slow/debug_token", get(slow_debug_token))
            .with_state(grants);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
        }
    }

    pub fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    pub fn jwks_cache(&self) -> JwksCache {
        JwksCache::new(format!("{}/certs", self.base_url), 3600, true, Self::client())
    }

    pub fn google_verifier(&self) -> GoogleVerifier {
        GoogleVerifier::new(vec![TEST_GOOGLE_CLIENT_ID.to_string()], self.jwks_cache())
    }

    pub fn facebook_verifier(&self) -> FacebookVerifier {
        FacebookVerifier::new(
            self.base_url.clone(),
            TEST_FACEBOOK_APP_ID,
            TEST_FACEBOOK_APP_SECRET,
            Self::client(),
        )
    }
}
