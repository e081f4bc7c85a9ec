// Core modules
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod store;
pub mod types;

// Re-export key types and functions
pub use api::{AppState, create_router};
pub use auth::{AuthContext, AuthError, FederatedLogin, PasswordLogin, Principal, SessionTokenCodec};
pub use config::AppConfig;
pub use db::{DatabaseConfig, SurrealRoleStore, SurrealUserStore, create_connection, ensure_schema};

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use auth::providers::{FacebookVerifier, GoogleVerifier, IdentityVerifier};
use auth::JwksCache;

/// Connect to the database, make sure the schema and built-in roles exist,
/// and wire the auth services described by `config`.
pub async fn create_app_state(config: &AppConfig) -> Result<AppState> {
    config.validate()?;

    let db = create_connection(config.database.clone()).await?;
    ensure_schema(&db).await?;

    let roles = Arc::new(SurrealRoleStore::new(db.clone()));
    roles.ensure_default_roles().await?;
    let users = Arc::new(SurrealUserStore::new(db));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.provider_timeout_seconds))
        .build()?;

    let mut federated = FederatedLogin::new(users.clone(), roles.clone());

    let facebook = &config.facebook;
    if facebook.app_id.is_empty() || facebook.app_secret.is_empty() {
        info!("No Facebook app credentials configured; Facebook login disabled");
    } else {
        federated = federated.with_verifier(IdentityVerifier::Facebook(FacebookVerifier::new(
            facebook.graph_url.clone(),
            facebook.app_id.clone(),
            facebook.app_secret.clone(),
            client.clone(),
        )));
    }

    if config.google.client_ids.is_empty() {
        info!("No Google client ids configured; Google login disabled");
    } else {
        let keys = JwksCache::new(
            config.google.jwks_url.clone(),
            config.google.jwks_cache_seconds,
            true,
            client,
        );
        federated = federated.with_verifier(IdentityVerifier::Google(GoogleVerifier::new(
            config.google.client_ids.clone(),
            keys,
        )));
    }

    let codec = SessionTokenCodec::new(config.jwt.secret.as_bytes(), config.jwt.expiration_seconds);

    Ok(AppState {
        codec: Arc::new(codec),
        passwords: Arc::new(PasswordLogin::new(users, roles)),
        federated: Arc::new(federated),
    })
}
