//! Configuration module for graphauth.

use serde::Deserialize;
use std::net::IpAddr;
use std::path::Path;

use crate::auth::DigestAlgorithm;
use crate::{GraphAuthError, Result};

/// Web API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Host address to bind.
    #[serde(default = "default_web_host")]
    pub host: String,
    /// Port number for the Web API.
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// JWT secret key (required).
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token expiry in seconds.
    #[serde(default = "default_jwt_access_expiry")]
    pub jwt_access_token_expiry_secs: u64,
    /// Refresh token expiry in days.
    #[serde(default = "default_jwt_refresh_expiry")]
    pub jwt_refresh_token_expiry_days: u64,
    /// Whether to serve the image pool as static files.
    #[serde(default = "default_serve_static")]
    pub serve_static: bool,
    /// Path to the image directory.
    #[serde(default = "default_static_path")]
    pub static_path: String,
    /// Rate limit for login and registration (requests per minute per IP).
    #[serde(default = "default_login_rate_limit")]
    pub login_rate_limit: u32,
    /// Rate limit for the rest of the API (requests per minute per IP).
    #[serde(default = "default_api_rate_limit")]
    pub api_rate_limit: u32,
    /// Reverse proxies whose `X-Forwarded-For` / `X-Real-IP` headers are
    /// honoured. Empty means rate limits key on the peer address only.
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
}

fn default_web_host() -> String {
    "127.0.0.1".to_string()
}

fn default_web_port() -> u16 {
    8000
}

fn default_jwt_access_expiry() -> u64 {
    900 // 15 minutes
}

fn default_jwt_refresh_expiry() -> u64 {
    7
}

fn default_serve_static() -> bool {
    true
}

fn default_static_path() -> String {
    "static/images".to_string()
}

fn default_login_rate_limit() -> u32 {
    10
}

fn default_api_rate_limit() -> u32 {
    100
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            cors_origins: vec![],
            jwt_secret: String::new(),
            jwt_access_token_expiry_secs: default_jwt_access_expiry(),
            jwt_refresh_token_expiry_days: default_jwt_refresh_expiry(),
            serve_static: default_serve_static(),
            static_path: default_static_path(),
            login_rate_limit: default_login_rate_limit(),
            api_rate_limit: default_api_rate_limit(),
            trusted_proxies: vec![],
        }
    }
}

impl WebConfig {
    /// Parse `trusted_proxies` into addresses.
    pub fn trusted_proxy_addrs(&self) -> Result<Vec<IpAddr>> {
        self.trusted_proxies
            .iter()
            .map(|p| {
                p.trim().parse::<IpAddr>().map_err(|_| {
                    GraphAuthError::Config(format!("web.trusted_proxies: invalid IP address {p:?}"))
                })
            })
            .collect()
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/graphauth.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/graphauth.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Graphical password configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphicalConfig {
    /// Minimum number of images in a sequence.
    #[serde(default = "default_min_images")]
    pub min_images: usize,
    /// Maximum number of images in a sequence.
    #[serde(default = "default_max_images")]
    pub max_images: usize,
    /// Salt length in bytes.
    #[serde(default = "default_salt_length")]
    pub salt_length: usize,
    /// Digest algorithm (sha256 / sha512).
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Explicit image pool. Empty means "use the image directory, or the
    /// built-in pool if the directory does not exist".
    #[serde(default)]
    pub images: Vec<String>,
}

fn default_min_images() -> usize {
    4
}

fn default_max_images() -> usize {
    6
}

fn default_salt_length() -> usize {
    16
}

fn default_algorithm() -> String {
    "sha256".to_string()
}

impl Default for GraphicalConfig {
    fn default() -> Self {
        Self {
            min_images: default_min_images(),
            max_images: default_max_images(),
            salt_length: default_salt_length(),
            algorithm: default_algorithm(),
            images: vec![],
        }
    }
}

/// Minimum accepted salt length in bytes.
pub const MIN_SALT_LENGTH: usize = 8;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Web API configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Graphical password configuration.
    #[serde(default)]
    pub graphical: GraphicalConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(GraphAuthError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| GraphAuthError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `GRAPHAUTH_JWT_SECRET`: Override the JWT secret key
    /// - `GRAPHAUTH_DATABASE_PATH`: Override the database file path
    pub fn apply_env_overrides(&mut self) {
        if let Ok(jwt_secret) = std::env::var("GRAPHAUTH_JWT_SECRET") {
            if !jwt_secret.is_empty() {
                self.web.jwt_secret = jwt_secret;
            }
        }
        if let Ok(path) = std::env::var("GRAPHAUTH_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.web.jwt_secret.is_empty() {
            return Err(GraphAuthError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via GRAPHAUTH_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }

        self.web.trusted_proxy_addrs()?;

        let graphical = &self.graphical;
        if graphical.min_images == 0 {
            return Err(GraphAuthError::Config(
                "graphical.min_images must be at least 1".to_string(),
            ));
        }
        if graphical.min_images > graphical.max_images {
            return Err(GraphAuthError::Config(format!(
                "graphical.min_images ({}) exceeds graphical.max_images ({})",
                graphical.min_images, graphical.max_images
            )));
        }
        if graphical.salt_length < MIN_SALT_LENGTH {
            return Err(GraphAuthError::Config(format!(
                "graphical.salt_length must be at least {MIN_SALT_LENGTH} bytes"
            )));
        }
        graphical
            .algorithm
            .parse::<DigestAlgorithm>()
            .map_err(GraphAuthError::Config)?;

        Ok(())
    }
}
