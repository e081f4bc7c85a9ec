//! User and role store interfaces consumed by the auth core.
//!
//! The auth code only talks to these traits. `crate::db` provides the
//! SurrealDB-backed implementations used by the server binary.

#[cfg(test)]
pub(crate) mod memory;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::types::{RoleName, Username};

/// A local user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: Username,
    /// Argon2 PHC string. Federated accounts carry a random, unusable value.
    #[serde(skip_serializing)]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub enabled: bool,
    pub role_id: Uuid,
}

/// Payload for creating a user; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: Username,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub enabled: bool,
    pub role_id: Uuid,
}

impl NewUser {
    /// Attach an id, producing the stored representation.
    pub fn into_user(self, id: Uuid) -> User {
        User {
            id,
            username: self.username,
            password: self.password,
            first_name: self.first_name,
            last_name: self.last_name,
            avatar: self.avatar,
            enabled: self.enabled,
            role_id: self.role_id,
        }
    }
}

/// Store errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The referenced record does not exist
    NotFound(String),
    /// A unique constraint rejected the write (e.g. duplicate username)
    Conflict(String),
    /// Backend failure
    Database(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
            Self::Conflict(msg) => write!(f, "Conflict: {}", msg),
            Self::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;

/// User record store.
///
/// Implementations must reject a `create` whose username already exists with
/// [`StoreError::Conflict`].
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Case-insensitive search over username, first and last name.
    async fn find(&self, fragment: &str) -> StoreResult<Vec<User>>;

    async fn create(&self, user: NewUser) -> StoreResult<User>;

    async fn update(&self, user: User) -> StoreResult<User>;

    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

/// Role lookups.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Name of the role with the given id.
    async fn find_role_name(&self, role_id: Uuid) -> StoreResult<RoleName>;

    /// Id of the role with the given name.
    async fn find_id_by_name(&self, name: &str) -> StoreResult<Uuid>;
}
