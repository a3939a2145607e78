//! Bearer token verification.
//!
//! Validates incoming JWTs against the trusted key set held by
//! [`JwksClient`] and turns them into [`AuthClaims`].
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The declared algorithm must be in the configured allow-list and match
//!   the key type; `none` and `HS*` never pass
//! - Signature is verified before any claim is trusted
//! - `aud`, `iss` and `exp` are mandatory

use crate::auth::claims::AuthClaims;
use crate::auth::jwks::{Jwk, JwksClient};
use crate::config::Config;
use crate::errors::DrinksError;
use common::jwt::{key_type_for, parse_header};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;

/// What a token must satisfy besides a valid signature.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    /// Required `aud` value.
    pub audience: String,

    /// Required `iss` value.
    pub issuer: String,

    /// Algorithms a token may declare.
    pub algorithms: Vec<Algorithm>,

    /// Leeway in seconds for `exp`.
    pub leeway_seconds: u64,
}

impl ValidationPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            audience: config.api_audience.clone(),
            issuer: config.auth_issuer.clone(),
            algorithms: config.jwt_algorithms.clone(),
            leeway_seconds: config.jwt_leeway_seconds,
        }
    }
}

/// `aud` may be a single string or an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

/// Claims as they appear on the wire, before shape checks.
#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default)]
    sub: String,
    iss: String,
    aud: Audience,
    exp: i64,
    #[serde(default)]
    permissions: Option<serde_json::Value>,
}

/// JWT validator backed by a trusted key set.
pub struct JwtValidator {
    /// Source of trusted signing keys.
    jwks_client: Arc<JwksClient>,

    policy: ValidationPolicy,
}

impl JwtValidator {
    pub fn new(jwks_client: Arc<JwksClient>, policy: ValidationPolicy) -> Self {
        Self {
            jwks_client,
            policy,
        }
    }

    /// Validate a JWT and return its claims.
    ///
    /// # Checks, in order
    ///
    /// 1. Header parses and carries `kid` and `alg` (`InvalidHeaderFormat`)
    /// 2. `kid` names a trusted key (`UnknownSigningKey`)
    /// 3. `alg` is allowed and fits the key; signature verifies (`InvalidSignature`)
    /// 4. `exp` in the future (`TokenExpired`); `aud`/`iss` match (`ClaimMismatch`)
    /// 5. `permissions` is an array of strings (`PermissionsClaimMissing`)
    #[instrument(skip_all)]
    pub async fn validate(&self, token: &str) -> Result<AuthClaims, DrinksError> {
        let header = parse_header(token).map_err(|e| {
            tracing::debug!(target: "drinks.auth.jwt", error = ?e, "Token header rejected");
            DrinksError::InvalidHeaderFormat
        })?;

        let jwk = self.jwks_client.get_key(&header.kid).await?;

        let algorithm = Algorithm::from_str(&header.alg)
            .ok()
            .filter(|alg| self.policy.algorithms.contains(alg))
            .ok_or_else(|| {
                tracing::warn!(target: "drinks.auth.jwt", alg = %header.alg, "Token algorithm not allowed");
                DrinksError::InvalidSignature
            })?;

        let decoding_key = decoding_key_for(&jwk, algorithm)?;

        let mut validation = Validation::new(algorithm);
        validation.set_audience(&[&self.policy.audience]);
        validation.set_issuer(&[&self.policy.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.validate_exp = true;
        validation.leeway = self.policy.leeway_seconds;

        let token_data = decode::<RawClaims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!(target: "drinks.auth.jwt", error = %e, "Token verification failed");
            map_verification_error(e.kind())
        })?;

        let claims = into_auth_claims(token_data.claims)?;

        tracing::debug!(
            target: "drinks.auth.jwt",
            permission_count = claims.permissions().len(),
            "Token validated successfully"
        );
        Ok(claims)
    }
}

/// Build a decoding key from `jwk` for tokens declaring `algorithm`.
fn decoding_key_for(jwk: &Jwk, algorithm: Algorithm) -> Result<DecodingKey, DrinksError> {
    let expected_kty = key_type_for(algorithm);
    if jwk.kty != expected_kty {
        tracing::warn!(
            target: "drinks.auth.jwt",
            kty = %jwk.kty,
            expected = expected_kty,
            "JWK key type does not fit token algorithm"
        );
        return Err(DrinksError::InvalidSignature);
    }

    if let Some(alg) = &jwk.alg {
        if Algorithm::from_str(alg).ok() != Some(algorithm) {
            tracing::warn!(target: "drinks.auth.jwt", jwk_alg = %alg, "JWK algorithm does not match token");
            return Err(DrinksError::InvalidSignature);
        }
    }

    let missing = |field: &str| {
        tracing::error!(target: "drinks.auth.jwt", kid = ?jwk.kid, field, "JWK missing key material");
        DrinksError::InvalidSignature
    };

    let key = match jwk.kty.as_str() {
        "RSA" => {
            let n = jwk.n.as_deref().ok_or_else(|| missing("n"))?;
            let e = jwk.e.as_deref().ok_or_else(|| missing("e"))?;
            DecodingKey::from_rsa_components(n, e)
        }
        "EC" => {
            let x = jwk.x.as_deref().ok_or_else(|| missing("x"))?;
            let y = jwk.y.as_deref().ok_or_else(|| missing("y"))?;
            DecodingKey::from_ec_components(x, y)
        }
        "OKP" => {
            if jwk.crv.as_deref().is_some_and(|crv| crv != "Ed25519") {
                tracing::warn!(target: "drinks.auth.jwt", crv = ?jwk.crv, "Unsupported OKP curve");
                return Err(DrinksError::InvalidSignature);
            }
            let x = jwk.x.as_deref().ok_or_else(|| missing("x"))?;
            DecodingKey::from_ed_components(x)
        }
        _ => return Err(DrinksError::InvalidSignature),
    };

    key.map_err(|e| {
        tracing::error!(target: "drinks.auth.jwt", error = %e, "Invalid JWK key material");
        DrinksError::InvalidSignature
    })
}

fn map_verification_error(kind: &ErrorKind) -> DrinksError {
    match kind {
        ErrorKind::ExpiredSignature => DrinksError::TokenExpired,
        ErrorKind::InvalidAudience
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidSubject
        | ErrorKind::ImmatureSignature
        | ErrorKind::MissingRequiredClaim(_)
        | ErrorKind::Json(_) => DrinksError::ClaimMismatch,
        _ => DrinksError::InvalidSignature,
    }
}

fn into_auth_claims(raw: RawClaims) -> Result<AuthClaims, DrinksError> {
    let permissions = match raw.permissions {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(permission) => Ok(permission),
                _ => Err(DrinksError::PermissionsClaimMissing),
            })
            .collect::<Result<BTreeSet<String>, DrinksError>>()?,
        other => {
            tracing::warn!(
                target: "drinks.auth.jwt",
                present = other.is_some(),
                "Token has no usable permissions claim; check the identity provider's RBAC settings"
            );
            return Err(DrinksError::PermissionsClaimMissing);
        }
    };

    let audience = match raw.aud {
        Audience::One(aud) => vec![aud],
        Audience::Many(auds) => auds,
    };

    Ok(AuthClaims::new(
        raw.sub,
        raw.iss,
        audience,
        raw.exp,
        permissions,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    fn okp_jwk(alg: Option<&str>, x: Option<&str>) -> Jwk {
        Jwk {
            kty: "OKP".to_string(),
            kid: Some("test-key".to_string()),
            alg: alg.map(str::to_string),
            key_use: Some("sig".to_string()),
            n: None,
            e: None,
            crv: Some("Ed25519".to_string()),
            x: x.map(str::to_string),
            y: None,
        }
    }

    fn policy(algorithms: Vec<Algorithm>) -> ValidationPolicy {
        ValidationPolicy {
            audience: "drinks".to_string(),
            issuer: "https://coffee.example.com/".to_string(),
            algorithms,
            leeway_seconds: 0,
        }
    }

    fn unsigned_token(header: &str) -> String {
        let header_b64 = URL_SAFE_NO_PAD.encode(header);
        let payload_b64 = URL_SAFE_NO_PAD.encode(
            r#"{"sub":"u","iss":"https://coffee.example.com/","aud":"drinks","exp":9999999999,"permissions":[]}"#,
        );
        format!("{header_b64}.{payload_b64}.fake_signature")
    }

    fn raw(permissions: Option<serde_json::Value>) -> RawClaims {
        RawClaims {
            sub: "auth0|1".to_string(),
            iss: "https://coffee.example.com/".to_string(),
            aud: Audience::Many(vec!["drinks".to_string(), "userinfo".to_string()]),
            exp: 9_999_999_999,
            permissions,
        }
    }

    // =========================================================================
    // decoding_key_for
    // =========================================================================

    #[test]
    fn test_decoding_key_rejects_kty_mismatch() {
        let jwk = okp_jwk(None, Some("11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"));
        assert!(matches!(
            decoding_key_for(&jwk, Algorithm::RS256),
            Err(DrinksError::InvalidSignature)
        ));
    }

    #[test]
    fn test_decoding_key_rejects_jwk_alg_mismatch() {
        let mut jwk = okp_jwk(Some("RS256"), Some("11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"));
        jwk.kty = "OKP".to_string();
        assert!(matches!(
            decoding_key_for(&jwk, Algorithm::EdDSA),
            Err(DrinksError::InvalidSignature)
        ));
    }

    #[test]
    fn test_decoding_key_rejects_missing_material() {
        let jwk = okp_jwk(Some("EdDSA"), None);
        assert!(matches!(
            decoding_key_for(&jwk, Algorithm::EdDSA),
            Err(DrinksError::InvalidSignature)
        ));
    }

    #[test]
    fn test_decoding_key_rejects_other_curves() {
        let mut jwk = okp_jwk(None, Some("11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"));
        jwk.crv = Some("X25519".to_string());
        assert!(matches!(
            decoding_key_for(&jwk, Algorithm::EdDSA),
            Err(DrinksError::InvalidSignature)
        ));
    }

    #[test]
    fn test_decoding_key_accepts_ed25519() {
        let jwk = okp_jwk(Some("EdDSA"), Some("11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"));
        assert!(decoding_key_for(&jwk, Algorithm::EdDSA).is_ok());
    }

    // =========================================================================
    // validate (paths that stop before signature verification)
    // =========================================================================

    #[tokio::test]
    async fn test_validate_rejects_garbage_header() {
        let validator = JwtValidator::new(
            Arc::new(JwksClient::from_keys(Vec::new())),
            policy(vec![Algorithm::EdDSA]),
        );

        assert!(matches!(
            validator.validate("not-a-token").await,
            Err(DrinksError::InvalidHeaderFormat)
        ));
    }

    #[tokio::test]
    async fn test_validate_rejects_unknown_kid() {
        let validator = JwtValidator::new(
            Arc::new(JwksClient::from_keys(vec![okp_jwk(
                Some("EdDSA"),
                Some("11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"),
            )])),
            policy(vec![Algorithm::EdDSA]),
        );
        let token = unsigned_token(r#"{"alg":"EdDSA","typ":"JWT","kid":"someone-else"}"#);

        assert!(matches!(
            validator.validate(&token).await,
            Err(DrinksError::UnknownSigningKey)
        ));
    }

    #[tokio::test]
    async fn test_validate_rejects_none_algorithm() {
        let validator = JwtValidator::new(
            Arc::new(JwksClient::from_keys(vec![okp_jwk(
                None,
                Some("11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"),
            )])),
            policy(vec![Algorithm::EdDSA]),
        );
        let token = unsigned_token(r#"{"alg":"none","typ":"JWT","kid":"test-key"}"#);

        assert!(matches!(
            validator.validate(&token).await,
            Err(DrinksError::InvalidSignature)
        ));
    }

    #[tokio::test]
    async fn test_validate_rejects_algorithm_outside_allow_list() {
        let validator = JwtValidator::new(
            Arc::new(JwksClient::from_keys(vec![okp_jwk(
                None,
                Some("11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"),
            )])),
            policy(vec![Algorithm::RS256]),
        );
        let token = unsigned_token(r#"{"alg":"EdDSA","typ":"JWT","kid":"test-key"}"#);

        assert!(matches!(
            validator.validate(&token).await,
            Err(DrinksError::InvalidSignature)
        ));
    }

    #[tokio::test]
    async fn test_validate_rejects_forged_signature() {
        let validator = JwtValidator::new(
            Arc::new(JwksClient::from_keys(vec![okp_jwk(
                Some("EdDSA"),
                Some("11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo"),
            )])),
            policy(vec![Algorithm::EdDSA]),
        );
        let token = unsigned_token(r#"{"alg":"EdDSA","typ":"JWT","kid":"test-key"}"#);

        assert!(matches!(
            validator.validate(&token).await,
            Err(DrinksError::InvalidSignature)
        ));
    }

    // =========================================================================
    // error mapping and claim shaping
    // =========================================================================

    #[test]
    fn test_map_verification_error() {
        assert!(matches!(
            map_verification_error(&ErrorKind::ExpiredSignature),
            DrinksError::TokenExpired
        ));
        assert!(matches!(
            map_verification_error(&ErrorKind::InvalidAudience),
            DrinksError::ClaimMismatch
        ));
        assert!(matches!(
            map_verification_error(&ErrorKind::InvalidIssuer),
            DrinksError::ClaimMismatch
        ));
        assert!(matches!(
            map_verification_error(&ErrorKind::MissingRequiredClaim("aud".to_string())),
            DrinksError::ClaimMismatch
        ));
        assert!(matches!(
            map_verification_error(&ErrorKind::InvalidSignature),
            DrinksError::InvalidSignature
        ));
        assert!(matches!(
            map_verification_error(&ErrorKind::InvalidAlgorithm),
            DrinksError::InvalidSignature
        ));
    }

    #[test]
    fn test_into_auth_claims_collects_permissions() {
        let claims = into_auth_claims(raw(Some(serde_json::json!([
            "post:drinks",
            "get:drinks-detail",
            "post:drinks"
        ]))))
        .unwrap();

        assert_eq!(claims.permissions().len(), 2);
        assert!(claims.has_permission("post:drinks"));
        assert!(claims.has_permission("get:drinks-detail"));
        assert_eq!(claims.audience().len(), 2);
    }

    #[test]
    fn test_into_auth_claims_accepts_empty_permissions() {
        let claims = into_auth_claims(raw(Some(serde_json::json!([])))).unwrap();
        assert!(claims.permissions().is_empty());
    }

    #[test]
    fn test_into_auth_claims_rejects_missing_permissions() {
        assert!(matches!(
            into_auth_claims(raw(None)),
            Err(DrinksError::PermissionsClaimMissing)
        ));
    }

    #[test]
    fn test_into_auth_claims_rejects_wrong_shape() {
        assert!(matches!(
            into_auth_claims(raw(Some(serde_json::json!("post:drinks")))),
            Err(DrinksError::PermissionsClaimMissing)
        ));
        assert!(matches!(
            into_auth_claims(raw(Some(serde_json::json!(["post:drinks", 7])))),
            Err(DrinksError::PermissionsClaimMissing)
        ));
    }

    #[test]
    fn test_single_audience_string() {
        let mut claims = raw(Some(serde_json::json!([])));
        claims.aud = Audience::One("drinks".to_string());

        let claims = into_auth_claims(claims).unwrap();
        assert_eq!(claims.audience(), ["drinks".to_string()]);
    }
}
