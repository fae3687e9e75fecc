/// Board API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string (recruiter usage counters live here).
    pub database_url: String,
    /// Shared secret used to verify credentials issued by the identity provider.
    pub jwt_secret: String,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Heartbeat interval advertised in READY. A client silent for 1.5x this
    /// long is disconnected.
    pub heartbeat_interval_ms: u64,
}

/// Default for `GATEWAY_HEARTBEAT_INTERVAL_MS`.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 41_250;

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_var("DATABASE_URL"),
            jwt_secret: required_var("JWT_SECRET"),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4010),
            heartbeat_interval_ms: std::env::var("GATEWAY_HEARTBEAT_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|ms| *ms > 0)
                .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL_MS),
        }
    }
}

fn required_var(name: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| panic!("{name} env var is required"))
}
