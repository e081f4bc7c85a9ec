//! Signing key set for provider-issued ID tokens.
//!
//! Fetches a JWKS document (Google publishes its keys at
//! `https://www.googleapis.com/oauth2/v3/certs`), keeps the RSA signing keys
//! by `kid`, and refreshes them once the cache TTL has passed.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use base64::Engine;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Default cache TTL in seconds (1 hour).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600;

/// Maximum age of a key set served after a failed refresh (24 hours).
pub const MAX_STALE_CACHE_SECONDS: u64 = 86400;

/// A single JSON Web Key.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type (e.g., "RSA")
    pub kty: String,
    /// Key ID, matched against the token header `kid`
    pub kid: Option<String>,
    /// Algorithm (e.g., "RS256")
    pub alg: Option<String>,
    /// Key use ("sig" or "enc")
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    /// RSA modulus (base64url)
    pub n: Option<String>,
    /// RSA exponent (base64url)
    pub e: Option<String>,
    /// X.509 certificate chain (standard base64 DER)
    pub x5c: Option<Vec<String>>,
}

/// A JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksDocument {
    pub keys: Vec<Jwk>,
}

#[derive(Default)]
struct KeySet {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Option<Instant>,
}

impl KeySet {
    fn lookup(&self, kid: Option<&str>) -> Option<DecodingKey> {
        match kid {
            Some(k) => self.keys.get(k).cloned(),
            None if self.keys.len() == 1 => self.keys.values().next().cloned(),
            None => None,
        }
    }

    fn age(&self) -> Option<Duration> {
        self.fetched_at.map(|t| t.elapsed())
    }
}

/// Thread-safe JWKS cache.
pub struct JwksCache {
    jwks_url: String,
    cache_ttl: Duration,
    allow_stale: bool,
    state: RwLock<KeySet>,
    client: reqwest::Client,
}

impl JwksCache {
    /// Create a cache that fetches from `jwks_url` with the given client.
    ///
    /// The client carries the outbound timeout.
    pub fn new(
        jwks_url: impl Into<String>,
        cache_ttl_seconds: u64,
        allow_stale: bool,
        client: reqwest::Client,
    ) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            cache_ttl: Duration::from_secs(cache_ttl_seconds),
            allow_stale,
            state: RwLock::new(KeySet::default()),
            client,
        }
    }

    /// Get the decoding key for `kid`.
    ///
    /// A token without `kid` is only accepted when the set holds exactly one
    /// key. Refreshes when the cache is older than the TTL or the key is
    /// unknown (providers rotate keys ahead of use).
    pub async fn get_key(&self, kid: Option<&str>) -> Result<DecodingKey, JwksCacheError> {
        {
            let state = self.state.read().await;
            let fresh = state.age().is_some_and(|age| age <= self.cache_ttl);
            if fresh && let Some(key) = state.lookup(kid) {
                return Ok(key);
            }
        }

        match self.refresh().await {
            Ok(()) => self.state.read().await.lookup(kid).ok_or_else(|| match kid {
                Some(k) => JwksCacheError::KeyNotFound(k.to_string()),
                None => JwksCacheError::NoKeysAvailable,
            }),
            Err(e) => {
                if self.allow_stale {
                    let state = self.state.read().await;
                    let stale_ok = state
                        .age()
                        .is_some_and(|age| age < Duration::from_secs(MAX_STALE_CACHE_SECONDS));
                    if stale_ok && let Some(key) = state.lookup(kid) {
                        warn!("JWKS refresh from {} failed, using stale keys: {}", self.jwks_url, e);
                        return Ok(key);
                    }
                }
                Err(e)
            }
        }
    }

    /// Fetch the key set and replace the cache.
    pub async fn refresh(&self) -> Result<(), JwksCacheError> {
        debug!("Fetching JWKS from {}", self.jwks_url);

        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| JwksCacheError::FetchError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(JwksCacheError::FetchError(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        let document: JwksDocument = response
            .json()
            .await
            .map_err(|e| JwksCacheError::ParseError(e.to_string()))?;

        let keys = Self::signing_keys(document);
        if keys.is_empty() {
            return Err(JwksCacheError::NoValidKeys);
        }

        debug!("Cached {} signing keys from {}", keys.len(), self.jwks_url);
        let mut state = self.state.write().await;
        state.keys = keys;
        state.fetched_at = Some(Instant::now());
        Ok(())
    }

    /// Keep the RSA signature keys of a document, keyed by `kid`.
    fn signing_keys(document: JwksDocument) -> HashMap<String, DecodingKey> {
        let mut keys = HashMap::new();

        for jwk in document.keys {
            if jwk.kty != "RSA" {
                debug!("Skipping non-RSA key: {}", jwk.kty);
                continue;
            }
            if jwk.key_use.as_deref() == Some("enc") {
                debug!("Skipping encryption key");
                continue;
            }

            match Self::decoding_key(&jwk) {
                Ok(key) => {
                    let kid = jwk.kid.clone().unwrap_or_else(|| "default".to_string());
                    keys.insert(kid, key);
                }
                Err(e) => warn!("Failed to parse JWK: {}", e),
            }
        }

        keys
    }

    /// Convert a JWK to a jsonwebtoken DecodingKey.
    ///
    /// RSA components are preferred; `x5c` is only used when `n`/`e` are absent.
    fn decoding_key(jwk: &Jwk) -> Result<DecodingKey, JwksCacheError> {
        if let (Some(n), Some(e)) = (&jwk.n, &jwk.e) {
            return DecodingKey::from_rsa_components(n, e)
                .map_err(|e| JwksCacheError::ParseError(format!("Invalid RSA components: {}", e)));
        }

        let cert = jwk
            .x5c
            .as_ref()
            .and_then(|chain| chain.first())
            .ok_or_else(|| JwksCacheError::ParseError("RSA key without n/e or x5c".to_string()))?;
        let der = base64::engine::general_purpose::STANDARD
            .decode(cert)
            .map_err(|e| JwksCacheError::ParseError(format!("Invalid x5c: {}", e)))?;

        Ok(DecodingKey::from_rsa_der(&der))
    }

    /// Number of cached keys.
    #[cfg(test)]
    pub async fn key_count(&self) -> usize {
        self.state.read().await.keys.len()
    }
}

/// Errors that can occur when working with the JWKS cache.
#[derive(Debug, Clone)]
pub enum JwksCacheError {
    /// Failed to fetch JWKS from endpoint.
    FetchError(String),
    /// Failed to parse JWKS response.
    ParseError(String),
    /// No usable signing keys in the document.
    NoValidKeys,
    /// Key with specified kid not found.
    KeyNotFound(String),
    /// No key could be chosen for a token without `kid`.
    NoKeysAvailable,
}

impl std::fmt::Display for JwksCacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FetchError(msg) => write!(f, "Failed to fetch JWKS: {}", msg),
            Self::ParseError(msg) => write!(f, "Failed to parse JWKS: {}", msg),
            Self::NoValidKeys => write!(f, "No valid keys found in JWKS"),
            Self::KeyNotFound(kid) => write!(f, "Key not found: {}", kid),
            Self::NoKeysAvailable => write!(f, "No keys available in cache"),
        }
    }
}

impl std::error::Error for JwksCacheError {}
