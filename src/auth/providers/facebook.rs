//! Facebook access token verification through the Graph API.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use super::{IdentityPayload, Provider, transport_error};
use crate::auth::error::{AuthError, AuthResult};

/// Graph API base URL.
pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com";

const PROFILE_FIELDS: &str = "id,email,first_name,last_name";

/// Profile returned by `GET /me`.
#[derive(Debug, Deserialize)]
struct GraphProfile {
    id: String,
    email: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

impl From<GraphProfile> for IdentityPayload {
    fn from(profile: GraphProfile) -> Self {
        let username = profile
            .email
            .clone()
            .filter(|e| !e.is_empty())
            .unwrap_or(profile.id);
        Self {
            email: profile.email,
            username: Some(username),
            first_name: profile.first_name.unwrap_or_default(),
            last_name: profile.last_name.unwrap_or_default(),
        }
    }
}

/// `GET /debug_token` envelope.
#[derive(Debug, Deserialize)]
struct DebugTokenResponse {
    data: TokenInspection,
}

#[derive(Debug, Deserialize)]
struct TokenInspection {
    app_id: Option<String>,
    #[serde(default)]
    is_valid: bool,
    user_id: Option<String>,
}

/// Verifies Facebook access tokens by asking the Graph API which app they
/// were issued to and who owns them.
pub struct FacebookVerifier {
    graph_url: String,
    app_id: String,
    app_secret: String,
    client: reqwest::Client,
}

impl FacebookVerifier {
    pub fn new(
        graph_url: impl Into<String>,
        app_id: impl Into<String>,
        app_secret: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            graph_url: graph_url.into(),
            app_id: app_id.into(),
            app_secret: app_secret.into(),
            client,
        }
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> AuthResult<Url> {
        Url::parse_with_params(
            &format!("{}/{}", self.graph_url.trim_end_matches('/'), path),
            params,
        )
        .map_err(|e| AuthError::Internal(format!("Invalid Graph API URL: {}", e)))
    }

    fn debug_token_url(&self, access_token: &str) -> AuthResult<Url> {
        let app_token = format!("{}|{}", self.app_id, self.app_secret);
        self.endpoint(
            "debug_token",
            &[("input_token", access_token), ("access_token", &app_token)],
        )
    }

    fn profile_url(&self) -> AuthResult<Url> {
        self.endpoint("me", &[("fields", PROFILE_FIELDS)])
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> AuthResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(Provider::Facebook, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Graph API {} returned HTTP {}", what, status);
            return Err(AuthError::InvalidToken(format!(
                "Graph API {} returned HTTP {}",
                what, status
            )));
        }

        response.json().await.map_err(|e| {
            AuthError::InvalidToken(format!(
                "Invalid Graph API {} response: {}",
                what,
                e.without_url()
            ))
        })
    }

    /// Check that `access_token` is live and was issued to the configured app.
    async fn inspect(&self, access_token: &str) -> AuthResult<TokenInspection> {
        if self.app_id.is_empty() || self.app_secret.is_empty() {
            return Err(AuthError::InvalidToken(
                "Facebook app credentials are not configured".to_string(),
            ));
        }

        let url = self.debug_token_url(access_token)?;
        let inspection = self
            .get_json::<DebugTokenResponse>(self.client.get(url), "debug_token")
            .await?
            .data;

        if !inspection.is_valid {
            return Err(AuthError::InvalidToken(
                "Facebook access token is not valid".to_string(),
            ));
        }
        match inspection.app_id.as_deref() {
            Some(app_id) if app_id == self.app_id => Ok(inspection),
            other => {
                warn!(
                    "Facebook access token issued to app {:?}, expected {}",
                    other, self.app_id
                );
                Err(AuthError::InvalidToken(
                    "Facebook access token was issued to another app".to_string(),
                ))
            }
        }
    }

    pub async fn verify(&self, access_token: &str) -> AuthResult<IdentityPayload> {
        let inspection = self.inspect(access_token).await?;

        let request = self.client.get(self.profile_url()?).bearer_auth(access_token);
        let profile: GraphProfile = self.get_json(request, "profile").await?;

        if let Some(user_id) = inspection.user_id.as_deref() {
            if user_id != profile.id {
                return Err(AuthError::InvalidToken(
                    "Facebook profile does not match the token owner".to_string(),
                ));
            }
        }

        debug!("Facebook token verified for profile {}", profile.id);
        Ok(profile.into())
    }
}
