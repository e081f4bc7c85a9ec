// REST API endpoints for authentication

use axum::{
    Router,
    extract::{FromRef, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{
    Authenticated, AuthResult, FederatedLogin, PasswordLogin, Principal, Provider,
    SessionTokenCodec,
};

/// Shared services behind the router.
#[derive(Clone)]
pub struct AppState {
    pub codec: Arc<SessionTokenCodec>,
    pub passwords: Arc<PasswordLogin>,
    pub federated: Arc<FederatedLogin>,
}

impl FromRef<AppState> for Arc<SessionTokenCodec> {
    fn from_ref(state: &AppState) -> Self {
        state.codec.clone()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedLoginRequest {
    pub id_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/auths", post(login))
        .route("/api/v1/auths/google", post(google_login))
        .route("/api/v1/auths/facebook", post(facebook_login))
        .route("/api/v1/auths/me", get(me))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

fn issue(state: &AppState, principal: &Principal) -> AuthResult<Json<TokenResponse>> {
    let token = state.codec.generate(principal)?;
    Ok(Json(TokenResponse {
        token: token.into_inner(),
    }))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AuthResult<Json<TokenResponse>> {
    let principal = state
        .passwords
        .login(&payload.username, &payload.password)
        .await?;
    issue(&state, &principal)
}

async fn federated_login(
    state: &AppState,
    provider: Provider,
    payload: FederatedLoginRequest,
) -> AuthResult<Json<TokenResponse>> {
    let principal = state
        .federated
        .login_with_provider(provider, &payload.id_token)
        .await?;
    issue(state, &principal)
}

async fn google_login(
    State(state): State<AppState>,
    Json(payload): Json<FederatedLoginRequest>,
) -> AuthResult<Json<TokenResponse>> {
    federated_login(&state, Provider::Google, payload).await
}

async fn facebook_login(
    State(state): State<AppState>,
    Json(payload): Json<FederatedLoginRequest>,
) -> AuthResult<Json<TokenResponse>> {
    federated_login(&state, Provider::Facebook, payload).await
}

async fn me(Authenticated(principal): Authenticated) -> Json<Principal> {
    Json(principal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, header};
    use tower::ServiceExt;

    use crate::auth::providers::test_support::{
        FakeProviders, GoogleTokenSpec, facebook_profile, google_id_token,
    };
    use crate::auth::{IdentityVerifier, hash_password};
    use crate::store::memory::{MemoryRoleStore, MemoryUserStore, user};
    use crate::types::{ADMIN_ROLE, DEFAULT_ROLE};

    struct TestApp {
        router: Router,
        codec: Arc<SessionTokenCodec>,
        users: Arc<MemoryUserStore>,
        _fake: FakeProviders,
    }

    async fn test_app() -> TestApp {
        let fake = FakeProviders::spawn(vec![(
            "fb-frank",
            facebook_profile("77", Some("frank@example.com"), "Frank", "Castle"),
        )])
        .await;

        let users = Arc::new(MemoryUserStore::new());
        let roles = Arc::new(MemoryRoleStore::new());
        let mut admin = user("root", roles.id_of(ADMIN_ROLE));
        admin.password = hash_password("hunter2").unwrap();
        users.insert(admin);

        let codec = Arc::new(SessionTokenCodec::new(b"api-test-secret", 3600));
        let state = AppState {
            codec: codec.clone(),
            passwords: Arc::new(PasswordLogin::new(users.clone(), roles.clone())),
            federated: Arc::new(
                FederatedLogin::new(users.clone(), roles)
                    .with_verifier(IdentityVerifier::Google(fake.google_verifier()))
                    .with_verifier(IdentityVerifier::Facebook(fake.facebook_verifier())),
            ),
        };

        TestApp {
            router: create_router(state),
            codec,
            users,
            _fake: fake,
        }
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = test_app().await;
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let (status, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_password_login_returns_token() {
        let app = test_app().await;

        let (status, body) = send(
            &app.router,
            post_json(
                "/api/v1/auths",
                serde_json::json!({ "username": "root", "password": "hunter2" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let principal = app.codec.parse(body["token"].as_str()).unwrap();
        assert_eq!(principal.username().as_str(), "root");
        assert_eq!(principal.joined_roles(), ADMIN_ROLE);
    }

    #[tokio::test]
    async fn test_bad_password_is_unauthorized() {
        let app = test_app().await;

        let (status, body) = send(
            &app.router,
            post_json(
                "/api/v1/auths",
                serde_json::json!({ "username": "root", "password": "wrong" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, serde_json::json!({ "error": "unauthorized" }));
    }

    #[tokio::test]
    async fn test_google_login_provisions_once() {
        let app = test_app().await;
        let id_token = google_id_token(&GoogleTokenSpec::new("gina@example.com", "Gina", "Linetti"));

        let mut ids = Vec::new();
        for _ in 0..2 {
            let (status, body) = send(
                &app.router,
                post_json(
                    "/api/v1/auths/google",
                    serde_json::json!({ "idToken": id_token }),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::OK);

            let principal = app.codec.parse(body["token"].as_str()).unwrap();
            assert_eq!(principal.username().as_str(), "gina@example.com");
            assert_eq!(principal.joined_roles(), DEFAULT_ROLE);
            ids.push(principal.user_id());
        }

        assert_eq!(ids[0], ids[1]);
        assert_eq!(app.users.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_facebook_login() {
        let app = test_app().await;

        let (status, body) = send(
            &app.router,
            post_json(
                "/api/v1/auths/facebook",
                serde_json::json!({ "idToken": "fb-frank" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let principal = app.codec.parse(body["token"].as_str()).unwrap();
        assert_eq!(principal.username().as_str(), "frank@example.com");

        let (status, body) = send(
            &app.router,
            post_json(
                "/api/v1/auths/facebook",
                serde_json::json!({ "idToken": "revoked" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");
    }

    #[tokio::test]
    async fn test_me_requires_token() {
        let app = test_app().await;
        let (_, body) = send(
            &app.router,
            post_json(
                "/api/v1/auths",
                serde_json::json!({ "username": "root", "password": "hunter2" }),
            ),
        )
        .await;
        let token = body["token"].as_str().unwrap().to_string();

        let request = Request::builder()
            .uri("/api/v1/auths/me")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "root");
        assert_eq!(body["roles"], serde_json::json!([ADMIN_ROLE]));
        assert!(body["userId"].is_string());

        let request = Request::builder()
            .uri("/api/v1/auths/me")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");
    }
}
