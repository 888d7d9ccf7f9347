//! Bearer token verification.
//!
//! Callers present HS256 tokens minted by the identity service with a
//! shared secret. This server never issues tokens in production;
//! [`issue_token`] exists for operator tooling and tests.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mediaq_core::types::DbId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default allowance for clock drift between this server and the issuer.
const DEFAULT_LEEWAY_SECS: u64 = 30;

/// The claims this server reads from a token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Caller's user id.
    pub sub: DbId,
    /// `admin`, `creator` or `viewer`.
    pub role: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Token id, carried through to logs only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// Token verification settings.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Shared HMAC secret.
    pub secret: String,
    /// Required `iss` claim; any issuer is accepted when unset.
    pub issuer: Option<String>,
    /// Seconds of `exp` leeway.
    pub leeway_secs: u64,
}

impl JwtConfig {
    /// Load from the environment.
    ///
    /// | Env Var          | Required | Default |
    /// |------------------|----------|---------|
    /// | `JWT_SECRET`     | **yes**  | --      |
    /// | `JWT_ISSUER`     | no       | unset   |
    /// | `JWT_LEEWAY_SECS`| no       | `30`    |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is missing or empty, or if
    /// `JWT_LEEWAY_SECS` is not a number.
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").unwrap_or_default();
        assert!(!secret.is_empty(), "JWT_SECRET must be set and non-empty");

        let issuer = std::env::var("JWT_ISSUER")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let leeway_secs = match std::env::var("JWT_LEEWAY_SECS") {
            Ok(v) => v.parse().expect("JWT_LEEWAY_SECS must be a valid u64"),
            Err(_) => DEFAULT_LEEWAY_SECS,
        };

        Self {
            secret,
            issuer,
            leeway_secs,
        }
    }

    /// Config with only a secret, as used in tests.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            issuer: None,
            leeway_secs: DEFAULT_LEEWAY_SECS,
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway_secs;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        validation
    }
}

/// Verify signature, expiry and (if configured) issuer, and return the
/// claims.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &config.validation(),
    )?;
    Ok(data.claims)
}

/// Mint a token valid for `ttl`, stamped with the configured issuer.
pub fn issue_token(
    user_id: DbId,
    role: &str,
    ttl: Duration,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        exp: (now + ttl).timestamp(),
        iat: Some(now.timestamp()),
        iss: config.issuer.clone(),
        jti: Some(Uuid::new_v4().to_string()),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig::with_secret("test-secret")
    }

    #[test]
    fn issued_token_validates() {
        let token = issue_token(42, "creator", Duration::minutes(5), &config()).unwrap();
        let claims = validate_token(&token, &config()).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, "creator");
        assert!(claims.jti.is_some());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token(1, "admin", Duration::minutes(5), &config()).unwrap();
        assert!(validate_token(&token, &JwtConfig::with_secret("another")).is_err());
    }

    #[test]
    fn expiry_honours_leeway() {
        let token = issue_token(1, "admin", Duration::seconds(-10), &config()).unwrap();
        assert!(validate_token(&token, &config()).is_ok());

        let strict = JwtConfig {
            leeway_secs: 0,
            ..config()
        };
        assert!(validate_token(&token, &strict).is_err());
    }

    #[test]
    fn issuer_is_enforced_when_configured() {
        let token = issue_token(1, "viewer", Duration::minutes(5), &config()).unwrap();
        let pinned = JwtConfig {
            issuer: Some("identity.internal".into()),
            ..config()
        };
        assert!(validate_token(&token, &pinned).is_err());

        let token = issue_token(1, "viewer", Duration::minutes(5), &pinned).unwrap();
        assert_eq!(
            validate_token(&token, &pinned).unwrap().iss.as_deref(),
            Some("identity.internal")
        );
    }
}
