use chrono::{TimeDelta, Utc};
use serde::Deserialize;
use std::{env, fs, path::Path, path::PathBuf};

use crate::auth::DEFAULT_CACHE_TTL_SECONDS;
use crate::auth::providers::{DEFAULT_GOOGLE_JWKS_URL, DEFAULT_GRAPH_URL};
use crate::db::DatabaseConfig;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "BOOKSHELF_AUTH_CONFIG";

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "auth.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JwtConfig {
    /// HMAC secret for session tokens
    pub secret: String,
    /// Session token lifetime
    pub expiration_seconds: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            expiration_seconds: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GoogleConfig {
    /// OAuth client ids accepted as ID token audience
    pub client_ids: Vec<String>,
    pub jwks_url: String,
    pub jwks_cache_seconds: u64,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_ids: Vec::new(),
            jwks_url: DEFAULT_GOOGLE_JWKS_URL.to_string(),
            jwks_cache_seconds: DEFAULT_CACHE_TTL_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FacebookConfig {
    pub graph_url: String,
    /// App that access tokens must have been issued to
    pub app_id: String,
    pub app_secret: String,
}

impl Default for FacebookConfig {
    fn default() -> Self {
        Self {
            graph_url: DEFAULT_GRAPH_URL.to_string(),
            app_id: String::new(),
            app_secret: String::new(),
        }
    }
}

/// Service configuration read from `auth.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub jwt: JwtConfig,
    pub google: GoogleConfig,
    pub facebook: FacebookConfig,
    /// Timeout for every outbound provider call
    pub provider_timeout_seconds: u64,
    pub database: DatabaseConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            jwt: JwtConfig::default(),
            google: GoogleConfig::default(),
            facebook: FacebookConfig::default(),
            provider_timeout_seconds: 10,
            database: DatabaseConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `$BOOKSHELF_AUTH_CONFIG`, else `./auth.json`, else defaults.
    ///
    /// A path given through the environment must exist.
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(p) = env::var(CONFIG_PATH_ENV) {
            return Self::from_path(PathBuf::from(p));
        }

        let candidate = PathBuf::from(DEFAULT_CONFIG_FILE);
        if candidate.exists() {
            return Self::from_path(candidate);
        }

        Ok(Self::default())
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Could not read config file {}: {}", path.display(), e)
        })?;
        Self::from_json(&raw)
    }

    /// Parse a config document and expand `${VAR}` references.
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = serde_json::from_str(raw)?;
        Ok(cfg.expanded())
    }

    fn expanded(mut self) -> Self {
        self.jwt.secret = expand_env_vars(&self.jwt.secret);
        self.google.client_ids = self
            .google
            .client_ids
            .into_iter()
            .map(|id| expand_env_vars(&id))
            .collect();
        self.google.jwks_url = expand_env_vars(&self.google.jwks_url);
        self.facebook.graph_url = expand_env_vars(&self.facebook.graph_url);
        self.facebook.app_id = expand_env_vars(&self.facebook.app_id);
        self.facebook.app_secret = expand_env_vars(&self.facebook.app_secret);
        self.database.url = expand_env_vars(&self.database.url);
        if let Some(username) = self.database.username.as_mut() {
            *username = expand_env_vars(username);
        }
        if let Some(password) = self.database.password.as_mut() {
            *password = expand_env_vars(password);
        }
        self
    }

    /// Reject configurations the server cannot start with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let secret = self.jwt.secret.trim();
        if secret.is_empty() {
            return Err(anyhow::anyhow!(
                "jwt.secret must be set (config file, --jwt-secret or JWT_SECRET)"
            ));
        }
        if secret.contains("${") {
            return Err(anyhow::anyhow!(
                "jwt.secret references an unset environment variable: {}",
                secret
            ));
        }
        if self.jwt.expiration_seconds <= 0 {
            return Err(anyhow::anyhow!(
                "jwt.expirationSeconds must be positive, got {}",
                self.jwt.expiration_seconds
            ));
        }
        let expiry = TimeDelta::try_seconds(self.jwt.expiration_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl));
        if expiry.is_none() {
            return Err(anyhow::anyhow!(
                "jwt.expirationSeconds is out of range: {}",
                self.jwt.expiration_seconds
            ));
        }
        if self.provider_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("providerTimeoutSeconds must be positive"));
        }
        Ok(())
    }
}

fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next(); // consume '{'
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
            if let Ok(val) = env::var(&name) {
                out.push_str(&val);
            } else {
                out.push_str("${");
                out.push_str(&name);
                out.push('}');
            }
        } else {
            out.push(ch);
        }
    }

    out
}
