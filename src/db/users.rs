//! SurrealDB-backed user store.

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::schema::UserRecord;
use crate::db::{Db, store_error};
use crate::store::{NewUser, StoreError, StoreResult, User, UserStore};

pub struct SurrealUserStore {
    db: Db,
}

impl SurrealUserStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    fn into_users(records: Vec<UserRecord>) -> StoreResult<Vec<User>> {
        records.into_iter().map(User::try_from).collect()
    }

    fn first(records: Vec<UserRecord>) -> StoreResult<Option<User>> {
        records.into_iter().next().map(User::try_from).transpose()
    }
}

#[async_trait]
impl UserStore for SurrealUserStore {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let mut res = self
            .db
            .query("SELECT * FROM user WHERE uid = $uid LIMIT 1")
            .bind(("uid", id.to_string()))
            .await
            .map_err(store_error)?;

        let records: Vec<UserRecord> = res.take(0).map_err(store_error)?;
        Self::first(records)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let mut res = self
            .db
            .query("SELECT * FROM user WHERE username = $username LIMIT 1")
            .bind(("username", username.to_string()))
            .await
            .map_err(store_error)?;

        let records: Vec<UserRecord> = res.take(0).map_err(store_error)?;
        Self::first(records)
    }

    async fn find(&self, fragment: &str) -> StoreResult<Vec<User>> {
        let query = r#"
            SELECT * FROM user
            WHERE string::lowercase(username) CONTAINS $fragment
               OR string::lowercase(first_name) CONTAINS $fragment
               OR string::lowercase(last_name) CONTAINS $fragment
            ORDER BY username
        "#;

        let mut res = self
            .db
            .query(query)
            .bind(("fragment", fragment.to_lowercase()))
            .await
            .map_err(store_error)?;

        let records: Vec<UserRecord> = res.take(0).map_err(store_error)?;
        Self::into_users(records)
    }

    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let query = r#"
            CREATE user CONTENT {
                uid: $uid,
                username: $username,
                password: $password,
                first_name: $first_name,
                last_name: $last_name,
                avatar: $avatar,
                enabled: $enabled,
                role_uid: $role_uid
            }
        "#;

        let mut res = self
            .db
            .query(query)
            .bind(("uid", Uuid::new_v4().to_string()))
            .bind(("username", user.username.into_inner()))
            .bind(("password", user.password))
            .bind(("first_name", user.first_name))
            .bind(("last_name", user.last_name))
            .bind(("avatar", user.avatar))
            .bind(("enabled", user.enabled))
            .bind(("role_uid", user.role_id.to_string()))
            .await
            .map_err(store_error)?;

        let records: Vec<UserRecord> = res.take(0).map_err(store_error)?;
        Self::first(records)?
            .ok_or_else(|| StoreError::Database("Failed to create user".to_string()))
    }

    async fn update(&self, user: User) -> StoreResult<User> {
        let query = r#"
            UPDATE user SET
                username = $username,
                password = $password,
                first_name = $first_name,
                last_name = $last_name,
                avatar = $avatar,
                enabled = $enabled,
                role_uid = $role_uid
            WHERE uid = $uid
            RETURN AFTER
        "#;

        let id = user.id;
        let mut res = self
            .db
            .query(query)
            .bind(("uid", id.to_string()))
            .bind(("username", user.username.into_inner()))
            .bind(("password", user.password))
            .bind(("first_name", user.first_name))
            .bind(("last_name", user.last_name))
            .bind(("avatar", user.avatar))
            .bind(("enabled", user.enabled))
            .bind(("role_uid", user.role_id.to_string()))
            .await
            .map_err(store_error)?;

        let records: Vec<UserRecord> = res.take(0).map_err(store_error)?;
        Self::first(records)?.ok_or_else(|| StoreError::NotFound(format!("user {}", id)))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let mut res = self
            .db
            .query("DELETE user WHERE uid = $uid RETURN BEFORE")
            .bind(("uid", id.to_string()))
            .await
            .map_err(store_error)?;

        let records: Vec<UserRecord> = res.take(0).map_err(store_error)?;
        if records.is_empty() {
            return Err(StoreError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }
}
