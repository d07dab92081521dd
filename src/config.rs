use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub token_ttl: usize,
    pub api_prefix: String,

    // Rate limiting
    pub rate_limit_enabled: bool,
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_scan_per_min: u32,
    pub rate_protected_per_min: u32,

    // QR attendance channel
    pub qr_default_expiry_hours: i64,
    pub qr_scan_require_auth: bool,

    pub log_dir: String,
    pub log_level: String,
}

/// Reads `key`, falling back to `default` when it is unset.
fn env_or<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow!("{key}={raw:?} is invalid: {e}"))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.trim().is_empty() {
            return Err(anyhow!("JWT_SECRET must not be empty"));
        }

        Ok(Self {
            server_addr: env_or("SERVER_ADDR", "0.0.0.0:5000")?,
            database_url: env_or("DATABASE_URL", "sqlite://data/attendance.db")?,
            jwt_secret,
            token_ttl: env_or("TOKEN_TTL", "86400")?, // 24h
            api_prefix: env_or("API_PREFIX", "/api")?,

            rate_limit_enabled: env_or("RATE_LIMIT_ENABLED", "true")?,
            rate_login_per_min: env_or("RATE_LOGIN_PER_MIN", "60")?,
            rate_register_per_min: env_or("RATE_REGISTER_PER_MIN", "30")?,
            rate_scan_per_min: env_or("RATE_SCAN_PER_MIN", "120")?,
            rate_protected_per_min: env_or("RATE_PROTECTED_PER_MIN", "1000")?,

            qr_default_expiry_hours: env_or("QR_DEFAULT_EXPIRY_HOURS", "24")?,
            qr_scan_require_auth: env_or("QR_SCAN_REQUIRE_AUTH", "false")?,

            log_dir: env_or("LOG_DIR", "logs")?,
            log_level: env_or("LOG_LEVEL", "info")?,
        })
    }
}
