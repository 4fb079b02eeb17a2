// Application configuration loaded from the environment

use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Minimum accepted length for the HMAC signing secret
const MIN_SECRET_LEN: usize = 32;

/// Errors raised while reading configuration at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("JWT_SECRET must be at least 32 bytes long")]
    WeakSecret,
}

/// Where revoked tokens are recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenylistBackend {
    Postgres,
    Redis,
}

impl FromStr for DenylistBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" => Ok(DenylistBackend::Postgres),
            "redis" => Ok(DenylistBackend::Redis),
            other => Err(format!("unknown denylist backend: {}", other)),
        }
    }
}

/// Token lifetimes and signing material
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Access token lifetime in minutes
    pub ttl_minutes: i64,
    /// Window, counted from `iat`, during which an expired token may be renewed
    pub refresh_ttl_minutes: i64,
}

/// Login throttling parameters
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub per_second: u64,
    pub burst_size: u32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub denylist_backend: DenylistBackend,
    pub redis_url: Option<String>,
    pub require_https: bool,
    pub login_rate_limit: RateLimitConfig,
}

impl AppConfig {
    /// Build the configuration from environment variables.
    /// `.env` is expected to have been loaded by the caller.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;

        let secret = required("JWT_SECRET")?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret);
        }

        let denylist_backend: DenylistBackend = parsed("DENYLIST_BACKEND", DenylistBackend::Postgres)?;
        let redis_url = env::var("REDIS_URL").ok();
        if denylist_backend == DenylistBackend::Redis && redis_url.is_none() {
            return Err(ConfigError::Missing("REDIS_URL"));
        }

        let jwt = JwtConfig {
            secret,
            ttl_minutes: parsed("JWT_TTL", 60)?,
            refresh_ttl_minutes: parsed("JWT_REFRESH_TTL", 20160)?,
        };
        if jwt.ttl_minutes <= 0 {
            return Err(ConfigError::Invalid { name: "JWT_TTL", value: jwt.ttl_minutes.to_string() });
        }
        if jwt.refresh_ttl_minutes < jwt.ttl_minutes {
            return Err(ConfigError::Invalid {
                name: "JWT_REFRESH_TTL",
                value: jwt.refresh_ttl_minutes.to_string(),
            });
        }

        let login_rate_limit = RateLimitConfig {
            per_second: parsed("LOGIN_RATE_PER_SECOND", 1)?,
            burst_size: parsed("LOGIN_RATE_BURST", 5)?,
        };
        if login_rate_limit.per_second == 0 || login_rate_limit.burst_size == 0 {
            return Err(ConfigError::Invalid {
                name: "LOGIN_RATE_PER_SECOND",
                value: format!("{}/{}", login_rate_limit.per_second, login_rate_limit.burst_size),
            });
        }

        Ok(Self {
            database_url,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parsed("PORT", 8080)?,
            jwt,
            denylist_backend,
            redis_url,
            require_https: parsed("REQUIRE_HTTPS", false)?,
            login_rate_limit,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
