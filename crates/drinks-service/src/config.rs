//! Drinks service configuration.
//!
//! Configuration is loaded from environment variables. All sensitive
//! fields are redacted in Debug output.

use common::jwt::{
    parse_algorithm_allow_list, AlgorithmPolicyError, DEFAULT_ALGORITHMS, DEFAULT_LEEWAY,
    MAX_LEEWAY,
};
use jsonwebtoken::Algorithm;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Drinks service configuration.
///
/// Database URL is redacted in Debug output to prevent credential leakage.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL. `None` selects the in-memory store.
    pub database_url: Option<String>,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Identity provider domain, e.g. "tenant.auth0.com".
    pub auth_domain: String,

    /// Expected `aud` claim (the API identifier registered with the provider).
    pub api_audience: String,

    /// Expected `iss` claim.
    pub auth_issuer: String,

    /// URL of the JWKS endpoint holding the trusted signing keys.
    pub jwks_url: String,

    /// Signing algorithms a token may declare.
    pub jwt_algorithms: Vec<Algorithm>,

    /// Leeway in seconds applied to `exp` validation.
    pub jwt_leeway_seconds: u64,

    /// Purge the store and insert the demo drink at startup.
    pub reset_store_on_start: bool,

    /// Seconds to wait for in-flight requests on shutdown.
    pub drain_seconds: u64,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("bind_address", &self.bind_address)
            .field("auth_domain", &self.auth_domain)
            .field("api_audience", &self.api_audience)
            .field("auth_issuer", &self.auth_issuer)
            .field("jwks_url", &self.jwks_url)
            .field("jwt_algorithms", &self.jwt_algorithms)
            .field("jwt_leeway_seconds", &self.jwt_leeway_seconds)
            .field("reset_store_on_start", &self.reset_store_on_start)
            .field("drain_seconds", &self.drain_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWT algorithm configuration: {0}")]
    InvalidAlgorithms(#[from] AlgorithmPolicyError),

    #[error("Invalid JWT leeway configuration: {0}")]
    InvalidLeeway(String),

    #[error("Invalid boolean for {name}: '{value}'")]
    InvalidBool { name: String, value: String },

    #[error("Invalid drain period configuration: {0}")]
    InvalidDrainSeconds(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let auth_domain = required(vars, "AUTH_DOMAIN")?;
        let api_audience = required(vars, "API_AUDIENCE")?;

        let database_url = vars
            .get("DATABASE_URL")
            .filter(|url| !url.is_empty())
            .cloned();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let auth_issuer = vars
            .get("AUTH_ISSUER")
            .cloned()
            .unwrap_or_else(|| format!("https://{}/", auth_domain));

        let jwks_url = vars
            .get("JWKS_URL")
            .cloned()
            .unwrap_or_else(|| format!("https://{}/.well-known/jwks.json", auth_domain));

        let jwt_algorithms = parse_algorithm_allow_list(
            vars.get("JWT_ALGORITHMS")
                .map(String::as_str)
                .unwrap_or(DEFAULT_ALGORITHMS),
        )?;

        // Parse JWT leeway with validation
        let jwt_leeway_seconds = if let Some(value_str) = vars.get("JWT_LEEWAY_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidLeeway(format!(
                    "JWT_LEEWAY_SECONDS must be a non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value > MAX_LEEWAY.as_secs() {
                return Err(ConfigError::InvalidLeeway(format!(
                    "JWT_LEEWAY_SECONDS must not exceed {} seconds, got {}",
                    MAX_LEEWAY.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_LEEWAY.as_secs()
        };

        let reset_store_on_start = parse_bool(vars, "RESET_STORE_ON_START")?;

        let drain_seconds = match vars.get("DRAIN_SECONDS") {
            Some(value_str) => value_str.parse().map_err(|e| {
                ConfigError::InvalidDrainSeconds(format!(
                    "DRAIN_SECONDS must be a non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?,
            None => 0,
        };

        Ok(Config {
            database_url,
            bind_address,
            auth_domain,
            api_audience,
            auth_issuer,
            jwks_url,
            jwt_algorithms,
            jwt_leeway_seconds,
            reset_store_on_start,
            drain_seconds,
        })
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|value| !value.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_bool(vars: &HashMap<String, String>, name: &str) -> Result<bool, ConfigError> {
    match vars.get(name).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes") => Ok(true),
        Some(v) if matches!(v.as_str(), "" | "0" | "false" | "no") => Ok(false),
        Some(v) => Err(ConfigError::InvalidBool {
            name: name.to_string(),
            value: v,
        }),
    }
}
