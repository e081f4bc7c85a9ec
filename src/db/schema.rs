use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use uuid::Uuid;

use crate::store::{StoreError, User};
use crate::types::RoleName;

/// Persisted representation of a local account (table: `user`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Database identifier
    pub id: RecordId,
    /// Public UUID of the account
    pub uid: String,
    pub username: String,
    /// Argon2 PHC string
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
    pub enabled: bool,
    /// UUID of the account's role
    pub role_uid: String,
}

/// Persisted role (table: `role`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRecord {
    pub id: RecordId,
    pub uid: String,
    pub name: String,
}

pub(crate) fn parse_uid(value: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(value)
        .map_err(|e| StoreError::Database(format!("Invalid uid {:?}: {}", value, e)))
}

impl TryFrom<UserRecord> for User {
    type Error = StoreError;

    fn try_from(record: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uid(&record.uid)?,
            username: record.username.into(),
            password: record.password,
            first_name: record.first_name,
            last_name: record.last_name,
            avatar: record.avatar,
            enabled: record.enabled,
            role_id: parse_uid(&record.role_uid)?,
        })
    }
}

impl RoleRecord {
    pub fn role_id(&self) -> Result<Uuid, StoreError> {
        parse_uid(&self.uid)
    }

    pub fn role_name(&self) -> RoleName {
        RoleName::new(self.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(uid: &str) -> UserRecord {
        UserRecord {
            id: RecordId::from(("user", "abc")),
            uid: uid.to_string(),
            username: "alice".to_string(),
            password: "$argon2id$hash".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
            avatar: Some("https://example.com/a.png".to_string()),
            enabled: true,
            role_uid: Uuid::new_v4().to_string(),
        }
    }

    #[test]
    fn test_user_record_conversion() {
        let uid = Uuid::new_v4();
        let user = User::try_from(record(&uid.to_string())).unwrap();

        assert_eq!(user.id, uid);
        assert_eq!(user.username.as_str(), "alice");
        assert_eq!(user.avatar.as_deref(), Some("https://example.com/a.png"));
    }

    #[test]
    fn test_user_record_with_bad_uid() {
        assert!(matches!(
            User::try_from(record("not-a-uuid")),
            Err(StoreError::Database(_))
        ));
    }
}
