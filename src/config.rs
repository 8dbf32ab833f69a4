//! # Configuration Management
//!
//! Centralized configuration for the wire-protocol layer.
//!
//! Sections map to the pieces of the stack: [`WireConfig`] for framing and
//! per-connection queues, [`ServerConfig`]/[`ClientConfig`] for the two
//! transport entry points, [`LoggingConfig`] for the tracing bootstrap.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()` / `from_toml()`
//! - Environment-variable overrides via `from_env()`
//! - Direct instantiation with defaults
//!
//! Validation is collected (`validate()` returns every problem at once) and
//! enforced (`validate_strict()` maps the list into a startup-fatal
//! [`Misconfiguration`](WireError::Misconfiguration)).

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::core::codec::OPCODE_LEN;
use crate::core::frame::DEFAULT_MAX_FRAME_LEN;
use crate::error::{Result, WireError};

/// Root configuration covering every section.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct NetworkConfig {
    /// Framing and per-connection wire settings.
    #[serde(default)]
    pub wire: WireConfig,

    /// Server-specific configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Client-specific configuration.
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NetworkConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| WireError::Misconfiguration(format!("failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| WireError::Misconfiguration(format!("failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| WireError::Misconfiguration(format!("failed to parse TOML: {e}")))
    }

    /// Defaults overridden by environment variables where present.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("GAME_PROTOCOL_SERVER_ADDRESS") {
            config.server.address = addr;
        }

        if let Ok(raw) = std::env::var("GAME_PROTOCOL_MAX_FRAME_LEN") {
            if let Ok(val) = raw.parse::<usize>() {
                config.wire.max_frame_len = val;
            }
        }

        if let Ok(raw) = std::env::var("GAME_PROTOCOL_OUTBOUND_QUEUE_LIMIT") {
            if let Ok(val) = raw.parse::<usize>() {
                config.wire.outbound_queue_limit = val;
            }
        }

        if let Ok(raw) = std::env::var("GAME_PROTOCOL_QUIET_PERIOD_MS") {
            if let Ok(val) = raw.parse::<u64>() {
                config.wire.quiet_period = Duration::from_millis(val);
            }
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration.
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content.
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# failed to generate example config"))
    }

    /// Save configuration to a file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| WireError::Misconfiguration(format!("failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| WireError::Misconfiguration(format!("failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate every section. An empty list means the configuration is
    /// usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.wire.validate());
        errors.extend(self.server.validate());
        errors.extend(self.client.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and fail startup on the first problem set.
    pub fn validate_strict(&self) -> Result<()> {
        collect_strict(self.validate())
    }
}

fn collect_strict(errors: Vec<String>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(WireError::Misconfiguration(format!(
            "configuration validation failed:\n  - {}",
            errors.join("\n  - ")
        )))
    }
}

/// Framing and per-connection wire settings.
///
/// The length-field layout itself is fixed (2-byte big-endian prefix
/// counting opcode + payload, fully stripped after framing); only the
/// ceiling and queue behavior are configurable.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WireConfig {
    /// Maximum frame body length (opcode + payload) in bytes.
    pub max_frame_len: usize,

    /// Capacity of each connection's outbound packet queue; a full queue
    /// makes sends fail fast instead of blocking the caller.
    pub outbound_queue_limit: usize,

    /// How long teardown waits for in-flight outbound writes to flush
    /// before the transport is closed.
    #[serde(with = "duration_serde")]
    pub quiet_period: Duration,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            outbound_queue_limit: 1024,
            quiet_period: Duration::from_secs(3),
        }
    }
}

impl WireConfig {
    /// Validate wire settings.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_frame_len < OPCODE_LEN {
            errors.push(format!(
                "max_frame_len {} cannot hold a {OPCODE_LEN} byte opcode",
                self.max_frame_len
            ));
        } else if self.max_frame_len > u16::MAX as usize {
            errors.push(format!(
                "max_frame_len {} exceeds the 2-byte length field ceiling of {}",
                self.max_frame_len,
                u16::MAX
            ));
        }

        if self.outbound_queue_limit == 0 {
            errors.push("outbound_queue_limit must be greater than 0".to_string());
        } else if self.outbound_queue_limit > 1_000_000 {
            errors.push(format!(
                "outbound_queue_limit too large: {} (max recommended: 1,000,000)",
                self.outbound_queue_limit
            ));
        }

        if self.quiet_period.as_millis() < 10 {
            errors.push("quiet_period too short (minimum: 10ms)".to_string());
        } else if self.quiet_period.as_secs() > 30 {
            errors.push("quiet_period too long (maximum: 30s)".to_string());
        }

        errors
    }

    /// Validate and fail on the first problem set.
    pub fn validate_strict(&self) -> Result<()> {
        collect_strict(self.validate())
    }
}

/// Server-specific configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen address (e.g. "127.0.0.1:7777").
    pub address: String,

    /// Maximum number of concurrent connections.
    pub max_connections: usize,

    /// Timeout for graceful server shutdown once signalled.
    #[serde(with = "duration_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1:7777"),
            max_connections: 1000,
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("server address cannot be empty".to_string());
        } else if self.address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "invalid server address format: '{}' (expected format: '0.0.0.0:7777')",
                self.address
            ));
        }

        if self.max_connections == 0 {
            errors.push("max_connections must be greater than 0".to_string());
        } else if self.max_connections > 100_000 {
            errors.push(format!(
                "max_connections very high: {} (ensure system resources can support this)",
                self.max_connections
            ));
        }

        if self.shutdown_timeout.as_secs() < 1 {
            errors.push("shutdown_timeout too short (minimum: 1s)".to_string());
        } else if self.shutdown_timeout.as_secs() > 60 {
            errors.push("shutdown_timeout too long (maximum: 60s)".to_string());
        }

        errors
    }
}

/// Client-specific configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Target server address.
    pub address: String,

    /// Timeout for connection attempts.
    #[serde(with = "duration_serde")]
    pub connection_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1:7777"),
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    /// Validate client configuration.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("client address cannot be empty".to_string());
        } else if self.address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "invalid client address format: '{}' (expected format: 'host:7777')",
                self.address
            ));
        }

        if self.connection_timeout.as_millis() < 100 {
            errors.push("connection_timeout too short (minimum: 100ms)".to_string());
        } else if self.connection_timeout.as_secs() > 300 {
            errors.push("connection_timeout too long (maximum: 300s)".to_string());
        }

        errors
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs.
    pub app_name: String,

    /// Log level.
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs.
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("game-protocol"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("app_name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "app_name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization (milliseconds).
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization.
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("invalid log level: {level_str}")))
    }
}
