use voyage_events::retention::{validate_retention_days, DEFAULT_RETENTION_DAYS};

use crate::auth::jwt::JwtConfig;

/// Which store adapters back the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl StoreBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Some(StoreBackend::Memory),
            "postgres" | "postgresql" => Some(StoreBackend::Postgres),
            _ => None,
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Store adapter selection (default: in-memory).
    pub store_backend: StoreBackend,
    /// Required when `store_backend` is `Postgres`.
    pub database_url: Option<String>,
    /// Per-channel send timeout in seconds (default: `10`).
    pub channel_timeout_secs: u64,
    /// Notifications older than this many days are swept (default: `90`,
    /// accepted: `1..=3650`).
    pub retention_days: i64,
    /// JWT token configuration.
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `STORE_BACKEND`        | `memory`                   |
    /// | `DATABASE_URL`         | -- (required for postgres) |
    /// | `CHANNEL_TIMEOUT_SECS` | `10`                       |
    /// | `RETENTION_DAYS`       | `90`                       |
    ///
    /// Push and SMTP credentials are read by the gateways themselves.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let raw_backend = std::env::var("STORE_BACKEND").unwrap_or_else(|_| "memory".into());
        let store_backend = StoreBackend::parse(&raw_backend)
            .unwrap_or_else(|| panic!("STORE_BACKEND must be 'memory' or 'postgres', got '{raw_backend}'"));

        let database_url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());

        let channel_timeout_secs: u64 = std::env::var("CHANNEL_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("CHANNEL_TIMEOUT_SECS must be a valid u64");

        let retention_days = parse_retention_days(std::env::var("RETENTION_DAYS").ok().as_deref())
            .unwrap_or_else(|e| panic!("{e}"));

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            store_backend,
            database_url,
            channel_timeout_secs,
            retention_days,
            jwt,
        }
    }
}

/// Parse `RETENTION_DAYS`, falling back to the default when unset.
fn parse_retention_days(raw: Option<&str>) -> Result<i64, String> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_RETENTION_DAYS);
    };
    let days: i64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("RETENTION_DAYS must be an integer, got '{raw}'"))?;
    validate_retention_days(days).map_err(|e| format!("RETENTION_DAYS: {e}"))?;
    Ok(days)
}
