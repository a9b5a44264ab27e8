//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

use fleetline_pipeline::QueuePolicy;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Pipeline settings: flush interval, topics, queue policy.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Anomaly scoring settings.
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Built-in telemetry simulator settings.
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Busy timeout for SQLite connections, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled SQLite connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "fleetline_pipeline=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Overflow behaviour for a bounded event queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest queued record to admit the new one.
    DropOldest,
    /// Discard the incoming record.
    DropNewest,
}

/// Pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Batch window length in seconds.
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,

    /// Topic machines publish telemetry on.
    #[serde(default = "default_inbound_topic")]
    pub inbound_topic: String,

    /// Topic anomaly alerts are published on.
    #[serde(default = "default_outbound_topic")]
    pub outbound_topic: String,

    /// Event queue capacity. Unset means unbounded (non-blocking ingestion
    /// at the cost of unbounded memory under sustained overload).
    #[serde(default)]
    pub queue_capacity: Option<usize>,

    /// What to shed when a bounded queue is full.
    #[serde(default = "default_overflow_policy")]
    pub overflow_policy: OverflowPolicy,
}

impl PipelineConfig {
    /// Resolves the configured capacity and overflow policy into a queue
    /// policy.
    pub fn queue_policy(&self) -> QueuePolicy {
        match (self.queue_capacity, self.overflow_policy) {
            (None, _) => QueuePolicy::Unbounded,
            (Some(capacity), OverflowPolicy::DropOldest) => QueuePolicy::DropOldest { capacity },
            (Some(capacity), OverflowPolicy::DropNewest) => QueuePolicy::DropNewest { capacity },
        }
    }
}

/// Anomaly scoring configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringConfig {
    /// Path to the JSON rule model. Unset disables scoring.
    #[serde(default)]
    pub model_path: Option<String>,
}

/// Built-in telemetry simulator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatorConfig {
    /// Whether the simulator task runs at all.
    #[serde(default)]
    pub enabled: bool,

    /// Milliseconds between simulated samples.
    #[serde(default = "default_simulator_interval_ms")]
    pub interval_ms: u64,

    /// Probability (0.0–1.0) that a sample carries an injected anomaly.
    #[serde(default = "default_anomaly_probability")]
    pub anomaly_probability: f64,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    5000
}

fn default_db_path() -> String {
    "fleetline.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_flush_interval_secs() -> u64 {
    10
}

fn default_inbound_topic() -> String {
    "machines/data".to_string()
}

fn default_outbound_topic() -> String {
    "machines/alerts".to_string()
}

fn default_overflow_policy() -> OverflowPolicy {
    OverflowPolicy::DropOldest
}

fn default_simulator_interval_ms() -> u64 {
    3_000
}

fn default_anomaly_probability() -> f64 {
    0.3
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
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: default_flush_interval_secs(),
            inbound_topic: default_inbound_topic(),
            outbound_topic: default_outbound_topic(),
            queue_capacity: None,
            overflow_policy: default_overflow_policy(),
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: default_simulator_interval_ms(),
            anomaly_probability: default_anomaly_probability(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `FLEETLINE_HOST` overrides `server.host`
/// - `FLEETLINE_PORT` overrides `server.port`
/// - `FLEETLINE_DB_PATH` overrides `database.path`
/// - `FLEETLINE_LOG_LEVEL` overrides `logging.level`
/// - `FLEETLINE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `FLEETLINE_FLUSH_INTERVAL_SECS` overrides `pipeline.flush_interval_secs`
/// - `FLEETLINE_INBOUND_TOPIC` overrides `pipeline.inbound_topic`
/// - `FLEETLINE_OUTBOUND_TOPIC` overrides `pipeline.outbound_topic`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(host) = std::env::var("FLEETLINE_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("FLEETLINE_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(db_path) = std::env::var("FLEETLINE_DB_PATH") {
        config.database.path = db_path;
    }
    if let Ok(level) = std::env::var("FLEETLINE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("FLEETLINE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(secs) = std::env::var("FLEETLINE_FLUSH_INTERVAL_SECS") {
        if let Ok(parsed) = secs.parse() {
            config.pipeline.flush_interval_secs = parsed;
        }
    }
    if let Ok(topic) = std::env::var("FLEETLINE_INBOUND_TOPIC") {
        config.pipeline.inbound_topic = topic;
    }
    if let Ok(topic) = std::env::var("FLEETLINE_OUTBOUND_TOPIC") {
        config.pipeline.outbound_topic = topic;
    }

    Ok(config)
}
