//! Bearer-token verification.
//!
//! The identity service signs HS256 access tokens with a secret it shares
//! with this engine. Only `sub` and `role` are consumed; `iss` is enforced
//! when `JWT_ISSUER` is configured. [`JwtConfig::issue`] mints tokens for
//! backend producers and the test suite.

use std::fmt;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use voyage_core::types::UserId;

const DEFAULT_TOKEN_TTL_MINS: i64 = 15;

/// Access-token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Opaque user id owned by the identity service.
    pub sub: UserId,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Shared-secret token settings.
#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Lifetime of tokens minted by [`JwtConfig::issue`].
    pub token_ttl_mins: i64,
    /// Expected `iss`. `None` accepts any issuer.
    pub issuer: Option<String>,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("token_ttl_mins", &self.token_ttl_mins)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl JwtConfig {
    /// Read `JWT_SECRET` (required), `JWT_ACCESS_EXPIRY_MINS` (default `15`)
    /// and `JWT_ISSUER` (optional). Panics on a missing secret or a bad TTL.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok()).unwrap_or_else(|e| panic!("{e}"))
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let secret = get("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or("JWT_SECRET must be set and non-empty")?;
        let token_ttl_mins = match get("JWT_ACCESS_EXPIRY_MINS") {
            None => DEFAULT_TOKEN_TTL_MINS,
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|mins| *mins > 0)
                .ok_or_else(|| {
                    format!("JWT_ACCESS_EXPIRY_MINS must be a positive integer, got '{raw}'")
                })?,
        };
        Ok(Self {
            secret,
            token_ttl_mins,
            issuer: get("JWT_ISSUER").filter(|s| !s.is_empty()),
        })
    }

    /// Sign a token for `user_id` acting as `role`.
    pub fn issue(&self, user_id: &str, role: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let iat = chrono::Utc::now().timestamp();
        let claims = AccessClaims {
            sub: user_id.to_string(),
            role: role.to_string(),
            exp: iat + self.token_ttl_mins * 60,
            iat,
            iss: self.issuer.clone(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    /// Check signature, expiry and issuer, then return the claims.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        match &self.issuer {
            Some(issuer) => {
                validation.set_required_spec_claims(&["exp", "sub", "iss"]);
                validation.set_issuer(&[issuer]);
            }
            None => validation.set_required_spec_claims(&["exp", "sub"]),
        }
        let data = decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.into(),
            token_ttl_mins: 15,
            issuer: None,
        }
    }

    fn lookup(vars: &[(&str, &str)]) -> Result<JwtConfig, String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        JwtConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn issued_token_verifies() {
        let cfg = config("shared-with-identity");
        let token = cfg.issue("guest-42", "service").unwrap();
        let claims = cfg.verify(&token).unwrap();
        assert_eq!(claims.sub, "guest-42");
        assert_eq!(claims.role, "service");
        assert_eq!(claims.exp - claims.iat, 15 * 60);
        assert_eq!(claims.iss, None);
    }

    #[test]
    fn stale_token_is_rejected() {
        // Ten minutes in the past clears the 60 s leeway.
        let cfg = JwtConfig {
            token_ttl_mins: -10,
            ..config("shared-with-identity")
        };
        let token = cfg.issue("guest-1", "user").unwrap();
        assert!(cfg.verify(&token).is_err());
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let token = config("identity-a").issue("guest-1", "user").unwrap();
        assert!(config("identity-b").verify(&token).is_err());
    }

    #[test]
    fn issuer_is_enforced_only_when_configured() {
        let strict = JwtConfig {
            issuer: Some("voyage-identity".into()),
            ..config("s")
        };
        let anonymous = config("s").issue("guest-1", "user").unwrap();
        assert!(strict.verify(&anonymous).is_err());

        let stamped = strict.issue("guest-1", "user").unwrap();
        assert_eq!(strict.verify(&stamped).unwrap().iss.as_deref(), Some("voyage-identity"));
        assert!(config("s").verify(&stamped).is_ok());
    }

    #[test]
    fn env_lookup_requires_secret_and_positive_ttl() {
        assert!(lookup(&[]).is_err());
        assert!(lookup(&[("JWT_SECRET", "")]).is_err());
        assert!(lookup(&[("JWT_SECRET", "s"), ("JWT_ACCESS_EXPIRY_MINS", "0")]).is_err());

        let cfg = lookup(&[("JWT_SECRET", "s"), ("JWT_ISSUER", "voyage-identity")]).unwrap();
        assert_eq!(cfg.token_ttl_mins, DEFAULT_TOKEN_TTL_MINS);
        assert_eq!(cfg.issuer.as_deref(), Some("voyage-identity"));
    }

    #[test]
    fn debug_hides_secret() {
        let shown = format!("{:?}", config("hunter2"));
        assert!(!shown.contains("hunter2"));
    }
}
