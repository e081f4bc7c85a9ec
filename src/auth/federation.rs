//! Login through a third-party identity provider.
//!
//! A verified provider identity maps onto a local account by username. The
//! first login provisions the account with the default role; later logins
//! reuse it untouched.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::context::Principal;
use crate::auth::error::{AuthError, AuthResult};
use crate::auth::password::{principal_for_user, random_password_hash};
use crate::auth::providers::{IdentityPayload, IdentityVerifier, Provider};
use crate::store::{NewUser, RoleStore, StoreError, UserStore};
use crate::types::{DEFAULT_ROLE, RoleName, Username};

/// Resolves provider identities to local principals.
pub struct FederatedLogin {
    verifiers: HashMap<Provider, IdentityVerifier>,
    users: Arc<dyn UserStore>,
    roles: Arc<dyn RoleStore>,
}

impl FederatedLogin {
    pub fn new(users: Arc<dyn UserStore>, roles: Arc<dyn RoleStore>) -> Self {
        Self {
            verifiers: HashMap::new(),
            users,
            roles,
        }
    }

    /// Register the verifier for its provider, replacing any previous one.
    pub fn with_verifier(mut self, verifier: IdentityVerifier) -> Self {
        self.verifiers.insert(verifier.provider(), verifier);
        self
    }

    pub fn supports(&self, provider: Provider) -> bool {
        self.verifiers.contains_key(&provider)
    }

    /// Verify `token` with `provider` and return the local principal,
    /// provisioning the account on first login.
    pub async fn login_with_provider(&self, provider: Provider, token: &str) -> AuthResult<Principal> {
        let verifier = self.verifiers.get(&provider).ok_or_else(|| {
            AuthError::InvalidToken(format!("{} login is not configured", provider))
        })?;

        let payload = verifier.verify(token).await?;
        let key = provider
            .login_key(&payload)
            .ok_or_else(|| {
                AuthError::InvalidToken(format!("{} identity has no usable username", provider))
            })?
            .to_string();

        if let Some(user) = self.users.find_by_username(&key).await? {
            let principal = principal_for_user(&user, self.roles.as_ref()).await?;
            info!("{} login for existing user {}", provider, principal.username());
            return Ok(principal);
        }

        match self.provision(&key, payload).await {
            Ok(principal) => {
                info!("{} login provisioned user {}", provider, principal.username());
                Ok(principal)
            }
            Err(AuthError::Store(StoreError::Conflict(msg))) => {
                warn!("Concurrent first login for {}: {}", key, msg);
                let user = self
                    .users
                    .find_by_username(&key)
                    .await?
                    .ok_or(AuthError::AccountConflict(msg))?;
                principal_for_user(&user, self.roles.as_ref()).await
            }
            Err(e) => Err(e),
        }
    }

    async fn provision(&self, key: &str, payload: IdentityPayload) -> AuthResult<Principal> {
        let role_id = self.roles.find_id_by_name(DEFAULT_ROLE).await?;
        let new_user = NewUser {
            username: Username::new(key),
            password: random_password_hash()?,
            first_name: payload.first_name,
            last_name: payload.last_name,
            avatar: None,
            enabled: true,
            role_id,
        };

        let created = self.users.create(new_user).await?;
        Ok(Principal::new(
            created.id,
            created.username,
            [RoleName::new(DEFAULT_ROLE)],
        ))
    }
}
