//! SurrealDB-backed role store.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::db::schema::{RoleRecord, parse_uid};
use crate::db::{Db, store_error};
use crate::store::{RoleStore, StoreError, StoreResult};
use crate::types::{ADMIN_ROLE, DEFAULT_ROLE, RoleName};

pub struct SurrealRoleStore {
    db: Db,
}

impl SurrealRoleStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    async fn find_by_name(&self, name: &str) -> StoreResult<Option<RoleRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM role WHERE name = $name LIMIT 1")
            .bind(("name", name.to_string()))
            .await
            .map_err(store_error)?;

        let records: Vec<RoleRecord> = res.take(0).map_err(store_error)?;
        Ok(records.into_iter().next())
    }

    /// Create the role unless it already exists; returns its id.
    pub async fn ensure_role(&self, name: &str) -> StoreResult<Uuid> {
        if let Some(existing) = self.find_by_name(name).await? {
            return existing.role_id();
        }

        let mut res = self
            .db
            .query("CREATE role CONTENT { uid: $uid, name: $name }")
            .bind(("uid", Uuid::new_v4().to_string()))
            .bind(("name", name.to_string()))
            .await
            .map_err(store_error)?;

        let records: Vec<RoleRecord> = res.take(0).map_err(store_error)?;
        let created = records
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Database(format!("Failed to create role {}", name)))?;
        info!("Created role {}", name);
        created.role_id()
    }

    /// Seed the built-in roles.
    pub async fn ensure_default_roles(&self) -> StoreResult<()> {
        for name in [ADMIN_ROLE, DEFAULT_ROLE] {
            self.ensure_role(name).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl RoleStore for SurrealRoleStore {
    async fn find_role_name(&self, role_id: Uuid) -> StoreResult<RoleName> {
        let mut res = self
            .db
            .query("SELECT * FROM role WHERE uid = $uid LIMIT 1")
            .bind(("uid", role_id.to_string()))
            .await
            .map_err(store_error)?;

        let records: Vec<RoleRecord> = res.take(0).map_err(store_error)?;
        records
            .into_iter()
            .next()
            .map(|record| record.role_name())
            .ok_or_else(|| StoreError::NotFound(format!("role {}", role_id)))
    }

    async fn find_id_by_name(&self, name: &str) -> StoreResult<Uuid> {
        let record = self
            .find_by_name(name)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("role {}", name)))?;
        parse_uid(&record.uid)
    }
}
