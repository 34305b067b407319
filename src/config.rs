use std::{env, num::NonZeroU32};

use crate::middleware::throttle::{DEFAULT_ANON_PER_MINUTE, DEFAULT_USER_PER_MINUTE};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub anon_rate_per_minute: NonZeroU32,
    pub user_rate_per_minute: NonZeroU32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|n| n.parse::<u32>().ok())
            .unwrap_or(10);
        let anon_rate_per_minute = rate_from_env("THROTTLE_ANON_PER_MINUTE", DEFAULT_ANON_PER_MINUTE);
        let user_rate_per_minute = rate_from_env("THROTTLE_USER_PER_MINUTE", DEFAULT_USER_PER_MINUTE);
        Ok(Self {
            port,
            database_url,
            jwt_secret,
            host,
            max_connections,
            anon_rate_per_minute,
            user_rate_per_minute,
        })
    }
}

fn rate_from_env(key: &str, default: NonZeroU32) -> NonZeroU32 {
    env::var(key)
        .ok()
        .and_then(|n| n.parse::<NonZeroU32>().ok())
        .unwrap_or(default)
}
