use std::env;

use anyhow::{Context, bail};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub request_timeout_secs: u64,
    pub db_max_connections: u32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = database_url()?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        if jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", 3000);
        let token_ttl_hours = parse_or("TOKEN_TTL_HOURS", 24);
        let request_timeout_secs = parse_or("REQUEST_TIMEOUT_SECS", 30);
        let db_max_connections = parse_or("DB_MAX_CONNECTIONS", 10);
        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            token_ttl_hours,
            request_timeout_secs,
            db_max_connections,
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Only the database location, for tools that never issue tokens.
pub fn database_url() -> anyhow::Result<String> {
    env::var("DATABASE_URL").context("DATABASE_URL is not set")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_values_fall_back_to_defaults() {
        assert_eq!(parse_or("STOREFRONT_UNSET_PORT_FOR_TEST", 3000u16), 3000);
        assert_eq!(parse_or("STOREFRONT_UNSET_TTL_FOR_TEST", 24i64), 24);
    }
}
