//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub server: ServerConfig,
    pub relay: RelayConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory holding the canvas client assets
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

/// Relay tuning: deadlines, queue sizes and the echo policy
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RelayConfig {
    /// Deadline for a single frame write to a client
    pub write_timeout: Duration,
    /// Maximum silence tolerated from a peer, refreshed by pong frames
    pub liveness_timeout: Duration,
    /// Interval between ping probes; must be shorter than `liveness_timeout`
    pub probe_interval: Duration,
    /// Capacity of each connection's outgoing queue
    pub queue_capacity: usize,
    /// Largest inbound frame accepted, in bytes
    pub max_message_size: usize,
    /// Whether a sender receives its own broadcasts
    pub echo_to_sender: bool,
    /// Capacity of the registry's command channel
    pub intake_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        let liveness_timeout = Duration::from_millis(default_liveness_timeout_ms());
        Self {
            write_timeout: Duration::from_millis(default_write_timeout_ms()),
            liveness_timeout,
            probe_interval: probe_interval_for(liveness_timeout),
            queue_capacity: default_queue_capacity(),
            max_message_size: default_max_message_size(),
            echo_to_sender: true,
            intake_capacity: default_intake_capacity(),
        }
    }
}

impl RelayConfig {
    /// Check the invariants the connection pumps rely on
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` if a probe could not fire before the
    /// liveness deadline, or if a capacity or size is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe_interval.is_zero() || self.probe_interval >= self.liveness_timeout {
            return Err(ConfigError::InvalidValue(
                "RELAY_PROBE_INTERVAL_MS",
                format!(
                    "{}ms must be non-zero and below the liveness timeout of {}ms",
                    self.probe_interval.as_millis(),
                    self.liveness_timeout.as_millis()
                ),
            ));
        }
        if self.write_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "RELAY_WRITE_TIMEOUT_MS",
                "must be non-zero".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "RELAY_QUEUE_CAPACITY",
                "must be non-zero".to_string(),
            ));
        }
        if self.max_message_size == 0 {
            return Err(ConfigError::InvalidValue(
                "RELAY_MAX_MESSAGE_SIZE",
                "must be non-zero".to_string(),
            ));
        }
        if self.intake_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "RELAY_INTAKE_CAPACITY",
                "must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Probe at 90% of the liveness deadline
fn probe_interval_for(liveness_timeout: Duration) -> Duration {
    liveness_timeout * 9 / 10
}

// Default value functions
fn default_app_name() -> String {
    "paint-relay".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_static_dir() -> String {
    "./public".to_string()
}

fn default_write_timeout_ms() -> u64 {
    10_000
}

fn default_liveness_timeout_ms() -> u64 {
    60_000
}

fn default_queue_capacity() -> usize {
    256
}

fn default_max_message_size() -> usize {
    512
}

fn default_intake_capacity() -> usize {
    1024
}

/// Parse an optional variable, rejecting values that are present but malformed
fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        None => Ok(None),
    }
}

fn parse_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<bool>, ConfigError> {
    match lookup(name) {
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue(name, raw)),
        },
        None => Ok(None),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a variable is set to an unparseable value or the
    /// resulting relay settings are inconsistent.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source
    ///
    /// # Errors
    /// Same as [`AppConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = match lookup("APP_ENV") {
            Some(raw) => {
                Environment::parse(&raw).ok_or(ConfigError::InvalidValue("APP_ENV", raw))?
            }
            None => default_env(),
        };

        let liveness_timeout = Duration::from_millis(
            parse_var(&lookup, "RELAY_LIVENESS_TIMEOUT_MS")?
                .unwrap_or_else(default_liveness_timeout_ms),
        );
        let probe_interval = parse_var::<u64>(&lookup, "RELAY_PROBE_INTERVAL_MS")?
            .map_or_else(|| probe_interval_for(liveness_timeout), Duration::from_millis);

        let relay = RelayConfig {
            write_timeout: Duration::from_millis(
                parse_var(&lookup, "RELAY_WRITE_TIMEOUT_MS")?
                    .unwrap_or_else(default_write_timeout_ms),
            ),
            liveness_timeout,
            probe_interval,
            queue_capacity: parse_var(&lookup, "RELAY_QUEUE_CAPACITY")?
                .unwrap_or_else(default_queue_capacity),
            max_message_size: parse_var(&lookup, "RELAY_MAX_MESSAGE_SIZE")?
                .unwrap_or_else(default_max_message_size),
            echo_to_sender: parse_bool(&lookup, "RELAY_ECHO_TO_SENDER")?.unwrap_or(true),
            intake_capacity: parse_var(&lookup, "RELAY_INTAKE_CAPACITY")?
                .unwrap_or_else(default_intake_capacity),
        };
        relay.validate()?;

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env,
            },
            server: ServerConfig {
                host: lookup("RELAY_HOST").unwrap_or_else(default_host),
                port: parse_var(&lookup, "RELAY_PORT")?.unwrap_or_else(default_port),
                static_dir: lookup("RELAY_STATIC_DIR").unwrap_or_else(default_static_dir),
            },
            relay,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSettings {
                name: default_app_name(),
                env: default_env(),
            },
            server: ServerConfig::default(),
            relay: RelayConfig::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
