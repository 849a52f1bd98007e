use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::{Level, level_filters::LevelFilter};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Environment variable holding the config path.
pub const CONFIG_PATH_ENV: &str = "PFDNS_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
pub enum LogLevel {
    #[serde(rename = "trace")]
    Trace,
    #[serde(rename = "debug")]
    Debug,
    #[default]
    #[serde(rename = "info")]
    Info,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "error")]
    Error,
}

impl From<LogLevel> for Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        LevelFilter::from_level(Level::from(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerConfig {
    /// IP address to listen on for DNS queries.
    #[serde(default = "default_server_ip")]
    pub ip: String,
    /// Port to listen on for DNS queries.
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Logging level for the server.
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
    /// Per-request deadline in milliseconds, shared by device lookups and forwarding.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: default_server_ip(),
            port: default_server_port(),
            log_level: default_log_level(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            pool_size: default_pool_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverConfig {
    Forwarder {
        #[serde(default)]
        upstreams: Vec<SocketAddr>,
    },
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::Forwarder { upstreams: vec![] }
    }
}

/// The `[pfdns]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PfdnsConfig {
    /// Whether devices must be registered to get real answers.
    #[serde(default)]
    pub enforcement: bool,
    /// Portal address handed out to devices that are not let through.
    pub redirect_to: String,
    /// Blackhole directive: absent or `[]` for the defaults, `["disabled"]`, or `["<fqdn.>", "<ip>"]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blackhole: Option<Vec<String>>,
}

/// The optional `[blackhole]` section for the standalone blackhole.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BlackholeConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_blackhole_cname")]
    pub cname: String,
    #[serde(default = "default_blackhole_address")]
    pub address: String,
}

impl Default for BlackholeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cname: default_blackhole_cname(),
            address: default_blackhole_address(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    pub pfdns: Option<PfdnsConfig>,
    #[serde(default)]
    pub blackhole: BlackholeConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),
    #[error("invalid config: {0}")]
    Decode(String),
}

/// Parse a config from its TOML text.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Decode(e.message().into()))
}

/// Load the config for the dns server.
pub fn load_config(config_path: &str) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(config_path).map_err(|_| ConfigError::NotFound(config_path.into()))?;
    parse_config(&content)
}

fn default_db_path() -> String {
    "pf.db".into()
}

fn default_pool_size() -> usize {
    16
}

fn default_server_ip() -> String {
    "0.0.0.0".into()
}

fn default_server_port() -> u16 {
    53
}

fn default_log_level() -> LogLevel {
    LogLevel::default()
}

fn default_timeout_ms() -> u64 {
    2000
}

pub(crate) fn default_blackhole_cname() -> String {
    "localhost.localdomain.".into()
}

pub(crate) fn default_blackhole_address() -> String {
    "127.0.0.1".into()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
