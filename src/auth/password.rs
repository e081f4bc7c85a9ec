//! Local username/password accounts.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::context::Principal;
use crate::auth::error::{AuthError, AuthResult};
use crate::store::{RoleStore, User, UserStore};

/// Hash a plaintext password into an Argon2 PHC string.
pub fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a plaintext password against a stored PHC string.
///
/// An unparseable hash never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("Stored password hash is unusable: {}", e);
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Hash of a random value nobody knows, for accounts that only log in
/// through a provider.
pub fn random_password_hash() -> AuthResult<String> {
    hash_password(&Uuid::new_v4().to_string())
}

/// Build the principal for a stored user.
///
/// Disabled accounts are refused; the role id is resolved to its name.
pub(crate) async fn principal_for_user(user: &User, roles: &dyn RoleStore) -> AuthResult<Principal> {
    if !user.enabled {
        return Err(AuthError::Disabled);
    }
    let role = roles.find_role_name(user.role_id).await?;
    Ok(Principal::new(user.id, user.username.clone(), [role]))
}

/// Username/password login against the user store.
pub struct PasswordLogin {
    users: Arc<dyn UserStore>,
    roles: Arc<dyn RoleStore>,
}

impl PasswordLogin {
    pub fn new(users: Arc<dyn UserStore>, roles: Arc<dyn RoleStore>) -> Self {
        Self { users, roles }
    }

    /// Authenticate a local account.
    ///
    /// Unknown usernames and wrong passwords fail the same way.
    pub async fn login(&self, username: &str, password: &str) -> AuthResult<Principal> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(AuthError::BadCredentials)?;

        if !verify_password(password, &user.password) {
            debug!("Password mismatch for {}", username);
            return Err(AuthError::BadCredentials);
        }

        let principal = principal_for_user(&user, self.roles.as_ref()).await?;
        info!("User {} logged in with password", principal.username());
        Ok(principal)
    }
}
