//! In-memory stores used by the auth tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use super::{NewUser, RoleStore, StoreError, StoreResult, User, UserStore};
use crate::types::{ADMIN_ROLE, DEFAULT_ROLE, RoleName};

/// User store backed by a `Vec`, counting `create` calls.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
    creates: AtomicUsize,
    /// Inserted right before the next `create`, mimicking a concurrent login
    /// that wins the race for the same username.
    racing: Mutex<Option<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        self.users.lock().unwrap().push(user);
    }

    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    pub fn race_next_create(&self, winner: User) {
        *self.racing.lock().unwrap() = Some(winner);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username.as_str() == username)
            .cloned())
    }

    async fn find(&self, fragment: &str) -> StoreResult<Vec<User>> {
        let needle = fragment.to_lowercase();
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| {
                u.username.as_str().to_lowercase().contains(&needle)
                    || u.first_name.to_lowercase().contains(&needle)
                    || u.last_name.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if let Some(winner) = self.racing.lock().unwrap().take() {
            self.insert(winner);
        }

        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict(format!(
                "username {} already exists",
                user.username
            )));
        }
        let created = user.into_user(Uuid::new_v4());
        users.push(created.clone());
        Ok(created)
    }

    async fn update(&self, user: User) -> StoreResult<User> {
        let mut users = self.users.lock().unwrap();
        let slot = users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user.id)))?;
        *slot = user.clone();
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
            return Err(StoreError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }
}

/// Role store holding the two built-in roles.
pub struct MemoryRoleStore {
    roles: Vec<(Uuid, RoleName)>,
}

impl MemoryRoleStore {
    pub fn new() -> Self {
        Self {
            roles: vec![
                (Uuid::new_v4(), RoleName::new(ADMIN_ROLE)),
                (Uuid::new_v4(), RoleName::new(DEFAULT_ROLE)),
            ],
        }
    }

    pub fn id_of(&self, name: &str) -> Uuid {
        self.roles
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(id, _)| *id)
            .unwrap()
    }
}

#[async_trait]
impl RoleStore for MemoryRoleStore {
    async fn find_role_name(&self, role_id: Uuid) -> StoreResult<RoleName> {
        self.roles
            .iter()
            .find(|(id, _)| *id == role_id)
            .map(|(_, name)| name.clone())
            .ok_or_else(|| StoreError::NotFound(format!("role {}", role_id)))
    }

    async fn find_id_by_name(&self, name: &str) -> StoreResult<Uuid> {
        self.roles
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(id, _)| *id)
            .ok_or_else(|| StoreError::NotFound(format!("role {}", name)))
    }
}

/// An enabled user with the given username and role.
pub fn user(username: &str, role_id: Uuid) -> User {
    NewUser {
        username: username.into(),
        password: String::new(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        avatar: None,
        enabled: true,
        role_id,
    }
    .into_user(Uuid::new_v4())
}
