//! Builder patterns for test token claims
//!
//! Provides a fluent API for the claim sets the identity provider would
//! issue, including deliberately broken ones.

use chrono::{Duration, Utc};
use serde_json::{json, Value};

/// Issuer the test server is configured to trust.
pub const TEST_ISSUER: &str = "https://drinks-test.example.com/";

/// Audience the test server is configured to require.
pub const TEST_AUDIENCE: &str = "drinks-api";

/// Builder for test JWT claims
///
/// Defaults to a token the test server accepts, with no permissions.
///
/// # Example
/// ```rust,ignore
/// let claims = TestTokenBuilder::new()
///     .for_user("auth0|barista")
///     .with_permissions(&["get:drinks-detail", "post:drinks"])
///     .expires_in(3600)
///     .build();
/// ```
pub struct TestTokenBuilder {
    sub: String,
    iss: String,
    aud: Value,
    exp: i64,
    iat: i64,
    permissions: Option<Value>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: "auth0|test-user".to_string(),
            iss: TEST_ISSUER.to_string(),
            aud: json!([TEST_AUDIENCE]),
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
            permissions: Some(json!([])),
        }
    }

    /// Set the subject
    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set the issuer
    pub fn issued_by(mut self, issuer: &str) -> Self {
        self.iss = issuer.to_string();
        self
    }

    /// Set a single audience
    pub fn for_audience(mut self, audience: &str) -> Self {
        self.aud = json!(audience);
        self
    }

    /// Grant permission strings
    pub fn with_permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = Some(json!(permissions));
        self
    }

    /// Use an arbitrary JSON value as the `permissions` claim
    pub fn with_raw_permissions(mut self, permissions: Value) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Omit the `permissions` claim entirely
    pub fn without_permissions(mut self) -> Self {
        self.permissions = None;
        self
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        let mut claims = json!({
            "sub": self.sub,
            "iss": self.iss,
            "aud": self.aud,
            "exp": self.exp,
            "iat": self.iat,
        });

        if let (Some(permissions), Some(map)) = (self.permissions, claims.as_object_mut()) {
            map.insert("permissions".to_string(), permissions);
        }

        claims
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
