use anyhow::{bail, Context};
use serde::Deserialize;
use tracing::warn;

/// Signing secret used when `JWT_SECRET` is unset outside production.
pub const DEV_FALLBACK_SECRET: &str = "open";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    Development,
    Test,
    Production,
}

impl AppEnv {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(AppEnv::Development),
            "test" => Ok(AppEnv::Test),
            "production" | "prod" => Ok(AppEnv::Production),
            other => bail!("unknown APP_ENV {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: AppEnv,
    pub database_url: String,
    pub max_connections: u32,
    pub jwt: JwtConfig,
    /// When false the authorization gate lets every request through.
    pub require_auth: bool,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = match lookup("APP_ENV") {
            Some(raw) => AppEnv::parse(&raw)?,
            None => AppEnv::Development,
        };

        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

        let secret = match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(s) if env == AppEnv::Production && s == DEV_FALLBACK_SECRET => {
                bail!("JWT_SECRET must not be the development fallback in production")
            }
            Some(s) => s,
            None if env == AppEnv::Production => bail!("JWT_SECRET must be set in production"),
            None => {
                warn!(?env, "JWT_SECRET not set; using the development fallback secret");
                DEV_FALLBACK_SECRET.to_string()
            }
        };

        let jwt = JwtConfig {
            secret,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "staylink".into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "staylink-clients".into()),
            ttl_minutes: parse_or(&lookup, "JWT_TTL_MINUTES", 60)?,
        };

        let require_auth = parse_or(&lookup, "AUTH_REQUIRED", true)?;
        if !require_auth && env == AppEnv::Production {
            bail!("AUTH_REQUIRED=false is not allowed in production");
        }

        Ok(Self {
            env,
            database_url,
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 10)?,
            jwt,
            require_auth,
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "APP_PORT", 3000)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn development_falls_back_to_dev_secret() {
        let cfg = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x")])).unwrap();
        assert_eq!(cfg.env, AppEnv::Development);
        assert_eq!(cfg.jwt.secret, DEV_FALLBACK_SECRET);
        assert!(cfg.require_auth);
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.jwt.ttl_minutes, 60);
    }

    #[test]
    fn production_requires_a_real_secret() {
        let missing = AppConfig::from_lookup(lookup(&[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://x"),
        ]));
        assert!(missing.is_err());

        let fallback = AppConfig::from_lookup(lookup(&[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", DEV_FALLBACK_SECRET),
        ]));
        assert!(fallback.is_err());

        let ok = AppConfig::from_lookup(lookup(&[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "a-long-random-secret"),
        ]))
        .unwrap();
        assert_eq!(ok.jwt.secret, "a-long-random-secret");
    }

    #[test]
    fn auth_switch_is_refused_in_production() {
        let err = AppConfig::from_lookup(lookup(&[
            ("APP_ENV", "production"),
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s3cret"),
            ("AUTH_REQUIRED", "false"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("AUTH_REQUIRED"));

        let cfg = AppConfig::from_lookup(lookup(&[
            ("APP_ENV", "test"),
            ("DATABASE_URL", "postgres://x"),
            ("AUTH_REQUIRED", "false"),
        ]))
        .unwrap();
        assert!(!cfg.require_auth);
    }

    #[test]
    fn rejects_garbage_numbers() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("APP_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("APP_PORT"));
    }
}
