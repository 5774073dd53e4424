// src/config.rs

use std::env;

use dotenvy::dotenv;
use thiserror::Error;

/// Thirty days, the lifetime of a session cookie.
const DEFAULT_JWT_EXPIRATION: u64 = 60 * 60 * 24 * 30;
/// Ten years.
const MAX_JWT_EXPIRATION: u64 = 60 * 60 * 24 * 365 * 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Session lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub port: u16,
    /// Allowed CORS origin(s), comma-separated.
    pub frontend_url: String,
    /// Marks the session cookie `Secure`. On when APP_ENV=production.
    pub cookie_secure: bool,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub storage: Option<StorageConfig>,
}

/// Object storage for post/comment images. Absent when S3_BUCKET is unset.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    /// Base URL images are served from (CDN in front of the bucket).
    pub public_url: String,
    /// Lifetime of presigned upload URLs, in seconds.
    pub upload_url_ttl: u64,
    pub cdn_purge_url: Option<String>,
    pub cdn_purge_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let jwt_expiration =
            session_lifetime(parsed("JWT_EXPIRATION", DEFAULT_JWT_EXPIRATION)?)?;
        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let port = parsed("PORT", 8080)?;
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let cookie_secure = env::var("APP_ENV").is_ok_and(|v| v == "production");

        let storage = match optional("S3_BUCKET") {
            Some(bucket) => {
                let region =
                    env::var("S3_REGION").unwrap_or_else(|_| "ap-southeast-2".to_string());
                let public_url = env::var("S3_PUBLIC_URL")
                    .unwrap_or_else(|_| format!("https://{}.s3.{}.amazonaws.com", bucket, region));
                Some(StorageConfig {
                    bucket,
                    region,
                    public_url,
                    upload_url_ttl: parsed("UPLOAD_URL_TTL", 60)?,
                    cdn_purge_url: optional("CDN_PURGE_URL"),
                    cdn_purge_token: optional("CDN_PURGE_TOKEN"),
                })
            }
            None => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            port,
            frontend_url,
            cookie_secure,
            admin_username: optional("ADMIN_USERNAME"),
            admin_password: optional("ADMIN_PASSWORD"),
            storage,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

/// Session lifetimes must be positive and fit the cookie's `Max-Age`.
fn session_lifetime(seconds: u64) -> Result<u64, ConfigError> {
    if seconds == 0 || seconds > MAX_JWT_EXPIRATION {
        return Err(ConfigError::Invalid {
            key: "JWT_EXPIRATION",
            value: seconds.to_string(),
        });
    }
    Ok(seconds)
}
