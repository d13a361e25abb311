//! Configuration management for PubHarvest services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{env}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration (gateway)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Redis configuration (response cache)
    #[serde(default)]
    pub redis: RedisConfig,

    /// NCBI E-utilities configuration
    #[serde(default)]
    pub eutils: EutilsConfig,

    /// Background sync configuration (ingestion service)
    #[serde(default)]
    pub sync: SyncConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    /// Redis URL
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Key prefix for namespacing
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// TTL for cached search results, in seconds (6 hours)
    #[serde(default = "default_result_ttl")]
    pub result_ttl_secs: u64,
}

/// NCBI E-utilities client configuration.
///
/// `tool` and `email` identify the caller per NCBI usage policy; set the
/// email to a monitored address in deployment configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EutilsConfig {
    /// ESearch endpoint
    #[serde(default = "default_esearch_url")]
    pub esearch_url: String,

    /// ESummary endpoint
    #[serde(default = "default_esummary_url")]
    pub esummary_url: String,

    /// Upstream database identifier
    #[serde(default = "default_eutils_db")]
    pub db: String,

    /// Caller tool name
    #[serde(default = "default_tool")]
    pub tool: String,

    /// Caller contact email
    #[serde(default)]
    pub email: String,

    /// Result cap per search (one batch, no pagination)
    #[serde(default = "default_retmax")]
    pub retmax: u32,

    /// Per-call request timeout in seconds
    #[serde(default = "default_eutils_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Interval between full refresh sweeps, in seconds
    #[serde(default = "default_sync_interval")]
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Prometheus metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_database_url() -> String {
    "postgres://localhost/pubharvest".to_string()
}
fn default_max_connections() -> u32 {
    10
}
fn default_min_connections() -> u32 {
    2
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    300
}
fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}
fn default_key_prefix() -> String {
    "pubharvest".to_string()
}
fn default_result_ttl() -> u64 {
    6 * 3600
}
fn default_esearch_url() -> String {
    "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi".to_string()
}
fn default_esummary_url() -> String {
    "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esummary.fcgi".to_string()
}
fn default_eutils_db() -> String {
    "pubmed".to_string()
}
fn default_tool() -> String {
    "pubharvest".to_string()
}
fn default_retmax() -> u32 {
    100
}
fn default_eutils_timeout() -> u64 {
    20
}
fn default_sync_interval() -> u64 {
    6 * 3600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_json_logging() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9090
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__EUTILS__EMAIL=ops@example.org
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific file plus environment overrides
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// TTL for cached search results
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.redis.result_ttl_secs)
    }

    /// Per-call timeout for upstream requests
    pub fn eutils_timeout(&self) -> Duration {
        Duration::from_secs(self.eutils.timeout_secs)
    }

    /// Interval between full refresh sweeps
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync.interval_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
            result_ttl_secs: default_result_ttl(),
        }
    }
}

impl Default for EutilsConfig {
    fn default() -> Self {
        Self {
            esearch_url: default_esearch_url(),
            esummary_url: default_esummary_url(),
            db: default_eutils_db(),
            tool: default_tool(),
            email: String::new(),
            retmax: default_retmax(),
            timeout_secs: default_eutils_timeout(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sync_interval(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            redis: RedisConfig::default(),
            eutils: EutilsConfig::default(),
            sync: SyncConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
