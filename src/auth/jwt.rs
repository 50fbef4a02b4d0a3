use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use super::claims::Claims;
use crate::{config::JwtConfig, error::AuthError, state::AppState};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// HS256 signing and verification keys plus the token lifetime.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl JwtKeys {
    /// Builds keys from a shared secret. A blank secret is a configuration
    /// error and must stop startup.
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, AuthError> {
        if secret.trim().is_empty() {
            return Err(AuthError::Config("JWT secret is empty".into()));
        }
        if ttl.is_zero() {
            return Err(AuthError::Config("JWT ttl must be positive".into()));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    /// Builds keys from config. A ttl that cannot be added to the current
    /// time is rejected here rather than on the first `sign`.
    pub fn from_config(cfg: &JwtConfig) -> Result<Self, AuthError> {
        if cfg.ttl_days <= 0 {
            return Err(AuthError::Config(format!(
                "JWT ttl must be positive, got {} days",
                cfg.ttl_days
            )));
        }
        let ttl_secs = (cfg.ttl_days as u64)
            .checked_mul(SECS_PER_DAY)
            .filter(|s| *s <= i64::MAX as u64)
            .ok_or_else(|| {
                AuthError::Config(format!("JWT ttl of {} days overflows", cfg.ttl_days))
            })?;
        OffsetDateTime::now_utc()
            .checked_add(TimeDuration::seconds(ttl_secs as i64))
            .ok_or_else(|| {
                AuthError::Config(format!(
                    "JWT ttl of {} days is past the supported date range",
                    cfg.ttl_days
                ))
            })?;
        Self::new(&cfg.secret, Duration::from_secs(ttl_secs))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Signs a token for `user_id` issued at `now`.
    pub fn sign_at(&self, user_id: Uuid, now: OffsetDateTime) -> Result<String, AuthError> {
        let exp = i64::try_from(self.ttl.as_secs())
            .ok()
            .and_then(|secs| now.checked_add(TimeDuration::seconds(secs)))
            .ok_or_else(|| AuthError::Internal(anyhow::anyhow!("token expiry out of range")))?;
        let claims = Claims {
            id: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(e.into()))?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    pub fn sign(&self, user_id: Uuid) -> Result<String, AuthError> {
        self.sign_at(user_id, OffsetDateTime::now_utc())
    }

    /// Checks signature and expiry.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        debug!(user_id = %data.claims.id, "jwt verified");
        Ok(data.claims)
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}

/// Extracts and validates a bearer token, yielding the user id.
#[derive(Debug)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::Unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or(AuthError::Unauthorized("Invalid Authorization header"))?;

        match keys.verify(token) {
            Ok(claims) => Ok(AuthUser(claims.id)),
            Err(_) => {
                warn!("invalid or expired token");
                Err(AuthError::Unauthorized("Invalid or expired token"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THIRTY_DAYS: u64 = 30 * 24 * 60 * 60;

    fn make_keys(secret: &str) -> JwtKeys {
        JwtKeys::new(secret, Duration::from_secs(THIRTY_DAYS)).expect("keys")
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let keys = make_keys("dev-secret");
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.id, user_id);
        assert_eq!(claims.exp - claims.iat, THIRTY_DAYS as usize);
    }

    #[test]
    fn claims_are_deterministic_for_a_fixed_instant() {
        let keys = make_keys("dev-secret");
        let user_id = Uuid::new_v4();
        let now = time::macros::datetime!(2030-01-01 00:00 UTC);
        let a = keys.sign_at(user_id, now).unwrap();
        let b = keys.sign_at(user_id, now).unwrap();
        assert_eq!(a, b);
        let claims = keys.verify(&a).unwrap();
        assert_eq!(claims.iat, now.unix_timestamp() as usize);
        assert_eq!(
            claims.exp,
            (now + TimeDuration::days(30)).unix_timestamp() as usize
        );
    }

    #[test]
    fn payload_uses_underscore_id() {
        let keys = make_keys("dev-secret");
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id).unwrap();
        let data = decode::<serde_json::Value>(
            &token,
            &DecodingKey::from_secret(b"dev-secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims["_id"], user_id.to_string());
    }

    #[test]
    fn verify_rejects_other_secret() {
        let token = make_keys("secret-a").sign(Uuid::new_v4()).unwrap();
        assert!(make_keys("secret-b").verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = make_keys("dev-secret");
        let issued = OffsetDateTime::now_utc() - TimeDuration::days(31);
        let token = keys.sign_at(Uuid::new_v4(), issued).unwrap();
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn blank_secret_is_a_config_error() {
        for secret in ["", "   "] {
            let err = JwtKeys::new(secret, Duration::from_secs(60)).unwrap_err();
            assert!(matches!(err, AuthError::Config(_)));
        }
    }

    #[test]
    fn non_positive_ttl_is_a_config_error() {
        let cfg = JwtConfig {
            secret: "dev-secret".into(),
            ttl_days: 0,
        };
        assert!(matches!(
            JwtKeys::from_config(&cfg),
            Err(AuthError::Config(_))
        ));
    }

    #[test]
    fn from_config_uses_days() {
        let cfg = JwtConfig {
            secret: "dev-secret".into(),
            ttl_days: 30,
        };
        let keys = JwtKeys::from_config(&cfg).unwrap();
        assert_eq!(keys.ttl(), Duration::from_secs(THIRTY_DAYS));
    }

    #[test]
    fn huge_ttl_is_rejected_at_startup() {
        for ttl_days in [10_000_000, i64::MAX] {
            let cfg = JwtConfig {
                secret: "dev-secret".into(),
                ttl_days,
            };
            assert!(
                matches!(JwtKeys::from_config(&cfg), Err(AuthError::Config(_))),
                "{ttl_days}"
            );
        }
    }

    #[test]
    fn sign_reports_out_of_range_expiry_instead_of_panicking() {
        let keys = JwtKeys::new("dev-secret", Duration::from_secs(u64::MAX)).unwrap();
        let err = keys.sign(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AuthError::Internal(_)));

        let keys = make_keys("dev-secret");
        let err = keys
            .sign_at(Uuid::new_v4(), time::PrimitiveDateTime::MAX.assume_utc())
            .unwrap_err();
        assert!(matches!(err, AuthError::Internal(_)));
    }
}
