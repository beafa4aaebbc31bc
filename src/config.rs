//! Session configuration loaded from environment variables.
//!
//! Values are read once at startup. A `.env` file is honored for local
//! development.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default refresh period. Must stay comfortably below the access token
/// lifetime issued by the identity provider (5 minutes by default).
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(90);

/// Default per-request timeout for backend calls.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_IDENTITY_PATH: &str = "/web/user_info";

/// What the refresh task does after a failed refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshFailurePolicy {
    /// Log the failure and let the next tick try again.
    KeepArmed,
    /// Disarm the timer, clear stored tokens and drop to anonymous.
    #[default]
    StopOnFailure,
}

impl FromStr for RefreshFailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" | "keep-armed" | "retry" => Ok(Self::KeepArmed),
            "stop" | "stop-on-failure" => Ok(Self::StopOnFailure),
            other => Err(ConfigError::Invalid(
                "CONSOLE_REFRESH_FAILURE_POLICY",
                format!("unknown policy '{}'", other),
            )),
        }
    }
}

/// Session configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend API origin hosting the `/web/*` OIDC agent endpoints
    pub api_url: String,
    /// URL the console is served from (initial page location)
    pub app_url: String,
    /// Who-am-i endpoint path, relative to `api_url`
    pub identity_path: String,
    pub refresh_interval: Duration,
    pub refresh_failure_policy: RefreshFailurePolicy,
    pub http_timeout: Duration,
    /// JSON file backing the token store. `None` keeps tokens in memory.
    pub token_store_path: Option<PathBuf>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            app_url: "http://localhost:3000/".to_string(),
            identity_path: DEFAULT_IDENTITY_PATH.to_string(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            refresh_failure_policy: RefreshFailurePolicy::default(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            token_store_path: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let api_url = env::var("CONSOLE_API_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .map_err(|_| ConfigError::Missing("CONSOLE_API_URL"))?;

        let refresh_interval = match env::var("CONSOLE_REFRESH_INTERVAL_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    ConfigError::Invalid("CONSOLE_REFRESH_INTERVAL_SECS", raw.clone())
                })?;
                if secs == 0 {
                    return Err(ConfigError::Invalid(
                        "CONSOLE_REFRESH_INTERVAL_SECS",
                        "must be greater than zero".to_string(),
                    ));
                }
                Duration::from_secs(secs)
            }
            Err(_) => DEFAULT_REFRESH_INTERVAL,
        };

        let refresh_failure_policy = match env::var("CONSOLE_REFRESH_FAILURE_POLICY") {
            Ok(raw) => raw.parse()?,
            Err(_) => RefreshFailurePolicy::default(),
        };

        let http_timeout = env::var("CONSOLE_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT);

        Ok(Self {
            api_url,
            app_url: env::var("CONSOLE_APP_URL")
                .unwrap_or_else(|_| "http://localhost:3000/".to_string()),
            identity_path: env::var("CONSOLE_IDENTITY_PATH")
                .unwrap_or_else(|_| DEFAULT_IDENTITY_PATH.to_string()),
            refresh_interval,
            refresh_failure_policy,
            http_timeout,
            token_store_path: env::var("CONSOLE_TOKEN_STORE").ok().map(PathBuf::from),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
