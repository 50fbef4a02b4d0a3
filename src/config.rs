use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

use crate::auth::password::DEFAULT_COST;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub bcrypt_cost: u32,
    pub default_group: String,
}

/// Parses an optional numeric variable. Present but unparsable is an error,
/// not a silent default.
fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key} must be a number, got {raw:?}: {e}")),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: lookup("JWT_SECRET").context("JWT_SECRET is not set")?,
            ttl_days: parse_or(&lookup, "JWT_TTL_DAYS", 30)?,
        };
        let bcrypt_cost = parse_or(&lookup, "BCRYPT_COST", DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            anyhow::bail!("BCRYPT_COST must be between 4 and 31, got {bcrypt_cost}");
        }
        Ok(Self {
            database_url,
            jwt,
            bcrypt_cost,
            default_group: lookup("DEFAULT_GROUP").unwrap_or_else(|| "users".into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("DATABASE_URL", "postgres://localhost/auth"),
        ("JWT_SECRET", "dev-secret"),
    ];

    #[test]
    fn defaults_apply() {
        let cfg = load(&REQUIRED).expect("config");
        assert_eq!(cfg.jwt.ttl_days, 30);
        assert_eq!(cfg.bcrypt_cost, 10);
        assert_eq!(cfg.default_group, "users");
    }

    #[test]
    fn missing_secret_is_fatal() {
        let err = load(&[("DATABASE_URL", "postgres://localhost/auth")]).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn missing_database_url_is_fatal() {
        let err = load(&[("JWT_SECRET", "dev-secret")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn out_of_range_cost_is_fatal() {
        for cost in ["3", "32"] {
            let mut vars = REQUIRED.to_vec();
            vars.push(("BCRYPT_COST", cost));
            let err = load(&vars).unwrap_err();
            assert!(err.to_string().contains("BCRYPT_COST"), "{cost}");
        }
    }

    #[test]
    fn unparsable_numbers_are_fatal() {
        for (key, value) in [("BCRYPT_COST", "ten"), ("JWT_TTL_DAYS", "30d")] {
            let mut vars = REQUIRED.to_vec();
            vars.push((key, value));
            let err = load(&vars).unwrap_err();
            assert!(err.to_string().contains(key), "{key}");
        }
    }

    #[test]
    fn overrides_are_read() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("BCRYPT_COST", "12"),
            ("JWT_TTL_DAYS", "7"),
            ("DEFAULT_GROUP", "staff"),
        ]);
        let cfg = load(&vars).expect("config");
        assert_eq!(cfg.bcrypt_cost, 12);
        assert_eq!(cfg.jwt.ttl_days, 7);
        assert_eq!(cfg.default_group, "staff");
    }
}
