//! JWKS client for fetching and caching the identity provider's public keys.
//!
//! The key set is fetched once at startup and kept for the process lifetime.
//! Lookups never trigger a fetch: a token signed with a key that is not in
//! the cached set is rejected. Key rotation at the provider therefore needs
//! either a restart or an explicit call to [`JwksClient::refresh`].

use crate::errors::DrinksError;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::instrument;

/// Timeout for a single JWKS fetch.
const JWKS_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// JSON Web Key from the JWKS endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA", "EC" or "OKP").
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// Algorithm the key is meant for, if the provider states one.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Curve name for EC/OKP keys.
    #[serde(default)]
    pub crv: Option<String>,

    /// EC x coordinate or OKP public key (base64url).
    #[serde(default)]
    pub x: Option<String>,

    /// EC y coordinate (base64url).
    #[serde(default)]
    pub y: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// Client holding the trusted signing keys.
///
/// Constructed explicitly and shared via `Arc`; there is no module-level
/// key state.
pub struct JwksClient {
    /// URL to the JWKS endpoint. `None` for clients built from a fixed key set.
    jwks_url: Option<String>,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,

    /// Trusted keys by key ID.
    keys: Arc<RwLock<HashMap<String, Jwk>>>,
}

impl JwksClient {
    /// Create a client for `jwks_url` with an empty key set.
    ///
    /// Call [`refresh`](Self::refresh) before serving requests.
    pub fn new(jwks_url: String) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(JWKS_FETCH_TIMEOUT_SECONDS))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "drinks.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url: Some(jwks_url),
            http_client,
            keys: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a client that trusts exactly `keys` and has no endpoint.
    pub fn from_keys(keys: Vec<Jwk>) -> Self {
        Self {
            jwks_url: None,
            http_client: reqwest::Client::new(),
            keys: Arc::new(RwLock::new(index_keys(keys))),
        }
    }

    /// Look up a trusted key by ID.
    ///
    /// # Errors
    ///
    /// Returns `DrinksError::UnknownSigningKey` if no cached key has this ID.
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn get_key(&self, kid: &str) -> Result<Jwk, DrinksError> {
        let keys = self.keys.read().await;
        match keys.get(kid) {
            Some(key) => Ok(key.clone()),
            None => {
                tracing::debug!(target: "drinks.auth.jwks", kid = %kid, "Key not found in trusted key set");
                Err(DrinksError::UnknownSigningKey)
            }
        }
    }

    /// Number of trusted keys currently cached.
    pub async fn key_count(&self) -> usize {
        self.keys.read().await.len()
    }

    /// Fetch the JWKS and replace the cached key set.
    ///
    /// Returns the number of usable signing keys. The previous set is kept
    /// if the fetch fails.
    ///
    /// # Errors
    ///
    /// Returns `DrinksError::ServiceUnavailable` if the endpoint cannot be
    /// reached, answers with an error status, or returns an unparseable
    /// document, and if the client has no endpoint.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<usize, DrinksError> {
        let Some(jwks_url) = self.jwks_url.as_deref() else {
            return Err(DrinksError::ServiceUnavailable(
                "No JWKS endpoint configured".to_string(),
            ));
        };

        tracing::debug!(target: "drinks.auth.jwks", url = %jwks_url, "Fetching JWKS");

        let response = self.http_client.get(jwks_url).send().await.map_err(|e| {
            tracing::error!(target: "drinks.auth.jwks", error = %e, "Failed to fetch JWKS");
            DrinksError::ServiceUnavailable("Identity provider unavailable".to_string())
        })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "drinks.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(DrinksError::ServiceUnavailable(
                "Identity provider unavailable".to_string(),
            ));
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "drinks.auth.jwks", error = %e, "Failed to parse JWKS response");
            DrinksError::ServiceUnavailable("Identity provider unavailable".to_string())
        })?;

        let keys = index_keys(jwks.keys);
        let key_count = keys.len();

        tracing::info!(target: "drinks.auth.jwks", key_count, "JWKS key set loaded");

        *self.keys.write().await = keys;

        Ok(key_count)
    }
}

/// Index signing keys by `kid`, dropping keys that cannot be selected.
fn index_keys(keys: Vec<Jwk>) -> HashMap<String, Jwk> {
    keys.into_iter()
        .filter(|key| key.key_use.as_deref().map_or(true, |u| u == "sig"))
        .filter_map(|key| match key.kid.clone() {
            Some(kid) if !kid.is_empty() => Some((kid, key)),
            _ => {
                tracing::debug!(target: "drinks.auth.jwks", kty = %key.kty, "Skipping JWK without kid");
                None
            }
        })
        .collect()
}
