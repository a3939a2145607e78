//! Verified authorization claims.
//!
//! `AuthClaims` can only be built by the token verification path, so every
//! instance a handler sees has passed signature, issuer, audience, expiry and
//! permission-shape checks. The `subject` is redacted in Debug output.

use std::collections::BTreeSet;
use std::fmt;

/// Claims extracted from a verified bearer token.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthClaims {
    subject: String,
    issuer: String,
    audience: Vec<String>,
    expires_at: i64,
    permissions: BTreeSet<String>,
}

impl AuthClaims {
    pub(crate) fn new(
        subject: String,
        issuer: String,
        audience: Vec<String>,
        expires_at: i64,
        permissions: BTreeSet<String>,
    ) -> Self {
        Self {
            subject,
            issuer,
            audience,
            expires_at,
            permissions,
        }
    }

    /// Subject (user or client ID).
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Issuer the token was validated against.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Audiences listed in the token.
    pub fn audience(&self) -> &[String] {
        &self.audience
    }

    /// Expiration timestamp (Unix epoch seconds).
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// Permission strings granted to the bearer.
    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }

    /// Exact membership test. No wildcard or prefix matching.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

impl fmt::Debug for AuthClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthClaims")
            .field("subject", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("expires_at", &self.expires_at)
            .field("permissions", &self.permissions)
            .finish()
    }
}
