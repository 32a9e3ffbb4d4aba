//! Server configuration

use std::str::FromStr;
use std::time::Duration;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Log output configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default filter directive when RUST_LOG is not set
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    /// Write daily-rolling files here instead of stdout
    pub dir: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            dir: None,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    pub host: String,
    pub port: u16,
    /// PostgreSQL connection URL
    pub database_url: String,
    pub database_max_connections: u32,
    /// Apply pending migrations at startup
    pub run_migrations: bool,
    /// Path prefix for the REST API, e.g. `/api`
    pub api_prefix: String,
    /// API version segment, e.g. `v1`
    pub api_version: String,
    /// Allowed CORS origins
    pub cors_origins: Vec<String>,
    /// Global per-IP limit: `rate_limit_max` requests per `rate_limit_window`
    pub rate_limit_window: Duration,
    pub rate_limit_max: u32,
    /// HMAC key for the session cookie
    pub cookie_secret: String,
    /// HS256 key for access tokens
    pub jwt_secret: String,
    pub jwt_expires_hours: i64,
    /// Start the WebSocket notification hub
    pub realtime_enabled: bool,
    pub log: LogConfig,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Parse an optional env var, failing loudly on malformed values.
    fn parse_env<T>(name: &str, default: T) -> Result<T, BoxError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match std::env::var(name) {
            Ok(raw) if !raw.trim().is_empty() => raw
                .trim()
                .parse()
                .map_err(|e| format!("invalid value for {name}: {e}").into()),
            _ => Ok(default),
        }
    }

    fn string_env(name: &str, default: &str) -> String {
        std::env::var(name)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| default.into())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = Self::string_env("ENVIRONMENT", "development");

        let database_url = std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;

        let cors_origins = Self::string_env("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let log_format = Self::string_env("LOG_FORMAT", "pretty");

        Ok(Self {
            host: Self::string_env("HOST", "0.0.0.0"),
            port: Self::parse_env("PORT", 3000)?,
            database_url,
            database_max_connections: Self::parse_env("DATABASE_MAX_CONNECTIONS", 10)?,
            run_migrations: Self::parse_env("RUN_MIGRATIONS", true)?,
            api_prefix: Self::string_env("API_PREFIX", "/api"),
            api_version: Self::string_env("API_VERSION", "v1"),
            cors_origins,
            rate_limit_window: Duration::from_millis(Self::parse_env(
                "RATE_LIMIT_WINDOW_MS",
                900_000,
            )?),
            rate_limit_max: Self::parse_env("RATE_LIMIT_MAX", 100)?,
            cookie_secret: Self::require_secret("COOKIE_SECRET", &environment)?,
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            jwt_expires_hours: Self::parse_env("JWT_EXPIRES_HOURS", 24)?,
            realtime_enabled: Self::parse_env("REALTIME_ENABLED", true)?,
            log: LogConfig {
                level: Self::string_env("LOG_LEVEL", "info"),
                json: log_format.eq_ignore_ascii_case("json"),
                dir: std::env::var("LOG_DIR").ok().filter(|s| !s.trim().is_empty()),
            },
            environment,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base path of the versioned REST API, e.g. `/api/v1`
    pub fn api_base_path(&self) -> String {
        let prefix = self.api_prefix.trim_matches('/');
        let version = self.api_version.trim_matches('/');
        match (prefix.is_empty(), version.is_empty()) {
            (true, true) => "/api".into(),
            (true, false) => format!("/{version}"),
            (false, true) => format!("/{prefix}"),
            (false, false) => format!("/{prefix}/{version}"),
        }
    }
}

impl Default for Config {
    /// Development defaults without a database URL
    fn default() -> Self {
        Self {
            environment: "development".into(),
            host: "127.0.0.1".into(),
            port: 3000,
            database_url: String::new(),
            database_max_connections: 10,
            run_migrations: false,
            api_prefix: "/api".into(),
            api_version: "v1".into(),
            cors_origins: vec!["http://localhost:5173".into()],
            rate_limit_window: Duration::from_secs(15 * 60),
            rate_limit_max: 100,
            cookie_secret: "dev-COOKIE_SECRET-not-for-production".into(),
            jwt_secret: "dev-JWT_SECRET-not-for-production".into(),
            jwt_expires_hours: 24,
            realtime_enabled: true,
            log: LogConfig::default(),
        }
    }
}
