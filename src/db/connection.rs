use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;

pub type Db = Surreal<Any>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: env::var("SURREALDB_URL").unwrap_or_else(|_| "memory".to_string()),
            namespace: env::var("SURREALDB_NAMESPACE").unwrap_or_else(|_| "bookshelf".to_string()),
            database: env::var("SURREALDB_DATABASE").unwrap_or_else(|_| "auth".to_string()),
            username: env::var("SURREALDB_USERNAME").ok(),
            password: env::var("SURREALDB_PASSWORD").ok(),
        }
    }
}

pub async fn create_connection(config: DatabaseConfig) -> Result<Db> {
    let db = surrealdb::engine::any::connect(config.url).await?;

    // Sign in if credentials are provided
    if let (Some(username), Some(password)) = (config.username, config.password) {
        db.signin(Root {
            username: &username,
            password: &password,
        })
        .await?;
    }

    db.use_ns(config.namespace).use_db(config.database).await?;

    Ok(db)
}

pub async fn ensure_schema(db: &Db) -> Result<()> {
    let schema_queries = vec![
        // Local accounts, keyed by `uid`
        "DEFINE TABLE IF NOT EXISTS user SCHEMAFULL;
         DEFINE FIELD IF NOT EXISTS uid ON TABLE user TYPE string;
         DEFINE FIELD IF NOT EXISTS username ON TABLE user TYPE string;
         DEFINE FIELD IF NOT EXISTS password ON TABLE user TYPE string;
         DEFINE FIELD IF NOT EXISTS first_name ON TABLE user TYPE string;
         DEFINE FIELD IF NOT EXISTS last_name ON TABLE user TYPE string;
         DEFINE FIELD IF NOT EXISTS avatar ON TABLE user TYPE option<string>;
         DEFINE FIELD IF NOT EXISTS enabled ON TABLE user TYPE bool DEFAULT true;
         DEFINE FIELD IF NOT EXISTS role_uid ON TABLE user TYPE string;",

        // Roles
        "DEFINE TABLE IF NOT EXISTS role SCHEMAFULL;
         DEFINE FIELD IF NOT EXISTS uid ON TABLE role TYPE string;
         DEFINE FIELD IF NOT EXISTS name ON TABLE role TYPE string;",

        // Indexes
        "DEFINE INDEX IF NOT EXISTS user_username ON TABLE user COLUMNS username UNIQUE;
         DEFINE INDEX IF NOT EXISTS user_uid ON TABLE user COLUMNS uid UNIQUE;
         DEFINE INDEX IF NOT EXISTS role_name ON TABLE role COLUMNS name UNIQUE;
         DEFINE INDEX IF NOT EXISTS role_uid ON TABLE role COLUMNS uid UNIQUE;",
    ];

    for query in schema_queries {
        db.query(query).await?.check()?;
    }

    Ok(())
}
