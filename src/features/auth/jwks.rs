//! Signing keys of the identity provider.
//!
//! Keys are fetched from the configured JWKS endpoint and kept for the cache
//! TTL. An unknown `kid` triggers a refresh to pick up rotated keys, at most
//! once per `MIN_REFRESH_INTERVAL`.

use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Minimum gap between two refreshes caused by unknown key ids
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct KeySet {
    keys: Vec<SigningKey>,
}

/// One JWK entry; only RSA signature keys carry `n` and `e`
#[derive(Debug, Deserialize)]
struct SigningKey {
    kid: String,
    kty: String,
    #[serde(rename = "use", default)]
    key_use: Option<String>,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
}

/// RSA verification keys by `kid`; other key types and encryption keys are
/// skipped.
fn rsa_verification_keys(set: KeySet) -> Result<HashMap<String, DecodingKey>, JwksError> {
    let mut keys = HashMap::new();

    for key in set.keys {
        if key.kty != "RSA" || key.key_use.as_deref().is_some_and(|u| u != "sig") {
            debug!(kid = %key.kid, kty = %key.kty, "Skipping non-RSA or non-signing JWK");
            continue;
        }

        let (Some(n), Some(e)) = (key.n.as_deref(), key.e.as_deref()) else {
            warn!(kid = %key.kid, "RSA JWK without modulus or exponent");
            continue;
        };

        let decoding_key = DecodingKey::from_rsa_components(n, e)
            .map_err(|err| JwksError::KeyConversionError(format!("{}: {}", key.kid, err)))?;
        keys.insert(key.kid, decoding_key);
    }

    Ok(keys)
}

struct KeyCache {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
}

impl KeyCache {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }

    /// Cached key, `None` once the cache has expired
    fn lookup(&self, kid: &str, ttl: Duration) -> Option<DecodingKey> {
        if !self.is_fresh(ttl) {
            return None;
        }
        self.keys.get(kid).cloned()
    }
}

/// Fetches and caches the identity provider's RSA signing keys
pub struct JwksClient {
    jwks_url: String,
    client: reqwest::Client,
    cache: Arc<RwLock<Option<KeyCache>>>,
    cache_ttl: Duration,
}

impl JwksClient {
    pub fn new(jwks_url: String, cache_ttl: Duration) -> Self {
        Self {
            jwks_url,
            client: reqwest::Client::new(),
            cache: Arc::new(RwLock::new(None)),
            cache_ttl,
        }
    }

    pub async fn get_key(&self, kid: &str) -> Result<DecodingKey, JwksError> {
        let refresh_needed = {
            let cache = self.cache.read().await;
            match cache.as_ref() {
                Some(cached) => {
                    if let Some(key) = cached.lookup(kid, self.cache_ttl) {
                        return Ok(key);
                    }
                    // fresh cache without this kid: only refetch if not done just now
                    !cached.is_fresh(self.cache_ttl)
                        || cached.fetched_at.elapsed() >= MIN_REFRESH_INTERVAL
                }
                None => true,
            }
        };

        if !refresh_needed {
            return Err(JwksError::KeyNotFound(kid.to_string()));
        }

        debug!(kid = %kid, url = %self.jwks_url, "JWKS cache miss, refreshing keys");
        let keys = self.fetch_keys().await?;
        let key = keys.get(kid).cloned();

        *self.cache.write().await = Some(KeyCache {
            keys,
            fetched_at: Instant::now(),
        });

        key.ok_or_else(|| JwksError::KeyNotFound(kid.to_string()))
    }

    async fn fetch_keys(&self) -> Result<HashMap<String, DecodingKey>, JwksError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| JwksError::FetchError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(JwksError::FetchError(format!(
                "Failed to fetch JWKS: HTTP {}",
                response.status()
            )));
        }

        let set: KeySet = response
            .json()
            .await
            .map_err(|e| JwksError::ParseError(e.to_string()))?;

        let keys = rsa_verification_keys(set)?;
        debug!(count = keys.len(), "JWKS keys refreshed");

        Ok(keys)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    #[error("Failed to fetch JWKS: {0}")]
    FetchError(String),

    #[error("Failed to parse JWKS: {0}")]
    ParseError(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Failed to convert key: {0}")]
    KeyConversionError(String),
}
