//! Permission gate for drink operations.
//!
//! Each protected operation names exactly one required permission. The check
//! is plain set membership on the verified claims: there is no hierarchy, so
//! holding `delete:drinks` grants nothing else.

use crate::auth::claims::AuthClaims;
use crate::errors::DrinksError;
use crate::observability::metrics::record_auth_failure;
use std::fmt;

/// Permissions the drinks API understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Read the long projection (recipe with parts).
    GetDrinksDetail,
    PostDrinks,
    PatchDrinks,
    DeleteDrinks,
}

impl Permission {
    /// Wire form, as carried in the token's `permissions` claim.
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::GetDrinksDetail => "get:drinks-detail",
            Permission::PostDrinks => "post:drinks",
            Permission::PatchDrinks => "patch:drinks",
            Permission::DeleteDrinks => "delete:drinks",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check that `claims` grant `required`.
///
/// # Errors
///
/// Returns `DrinksError::Forbidden` when the permission is absent.
pub fn authorize(claims: &AuthClaims, required: Permission) -> Result<(), DrinksError> {
    if claims.has_permission(required.as_str()) {
        return Ok(());
    }

    tracing::debug!(
        target: "drinks.auth.permissions",
        required = %required,
        granted = ?claims.permissions(),
        "Permission not granted"
    );
    let err = DrinksError::Forbidden;
    record_auth_failure(err.code());
    Err(err)
}
