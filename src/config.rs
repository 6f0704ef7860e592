//! # Configuration Management
//!
//! Centralized configuration for the calculation server.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Environment variables via `from_env()` / `apply_env()`
//! - Direct instantiation with defaults
//!
//! Defaults reproduce the historical deployment: port 33333, login `user`,
//! credentials in `vcalc.conf`. The accepted login and the listen address are
//! configuration, not code.

use crate::core::message::LOGIN_LEN;
use crate::error::{constants, ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use tracing::Level;

/// Default TCP port
pub const DEFAULT_PORT: u16 = 33333;

/// Default accepted login
pub const DEFAULT_LOGIN: &str = "user";

/// Default credential database path
pub const DEFAULT_CREDENTIALS_PATH: &str = "vcalc.conf";

/// Default log file path (used when file logging is switched on)
pub const DEFAULT_LOG_FILE: &str = "vcalc.log";

/// Highest privileged port; ports 1..=1023 are refused.
const MAX_PRIVILEGED_PORT: u16 = 1023;

/// Top-level settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Settings {
    /// Listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Settings {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path).map_err(|e| {
            ProtocolError::ConfigError(format!("{}: {e}", constants::ERR_CONFIG_OPEN))
        })?;

        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(|e| {
            ProtocolError::ConfigError(format!("{}: {e}", constants::ERR_CONFIG_READ))
        })?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content).map_err(|e| {
            ProtocolError::ConfigError(format!("{}: {e}", constants::ERR_CONFIG_PARSE))
        })
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env();
        settings
    }

    /// Override fields from `VCALC_*` environment variables
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = var("VCALC_SERVER_ADDRESS") {
            self.server.address = addr;
        }

        if let Some(login) = var("VCALC_ACCEPTED_LOGIN") {
            self.auth.accepted_login = login;
        }

        if let Some(path) = var("VCALC_CREDENTIALS_PATH") {
            self.auth.credentials_path = path;
        }

        if let Some(path) = var("VCALC_LOG_FILE") {
            self.logging.log_to_file = true;
            self.logging.log_file_path = Some(path);
        }

        if let Some(level) = var("VCALC_LOG_LEVEL") {
            if let Ok(level) = level.parse::<Level>() {
                self.logging.log_level = level;
            }
        }
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut settings = Self::default();
        mutator(&mut settings);
        settings
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            ProtocolError::ConfigError(format!("{}: {e}", constants::ERR_CONFIG_SERIALIZE))
        })?;

        std::fs::write(path, content).map_err(|e| {
            ProtocolError::ConfigError(format!("{}: {e}", constants::ERR_CONFIG_WRITE))
        })?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.auth.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen address (e.g., "0.0.0.0:33333")
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: format!("0.0.0.0:{DEFAULT_PORT}"),
        }
    }
}

impl ServerConfig {
    /// Replace the port, keeping the host part
    pub fn set_port(&mut self, port: u16) {
        let ip = self
            .address
            .parse::<SocketAddr>()
            .map(|addr| addr.ip())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        self.address = SocketAddr::new(ip, port).to_string();
    }

    /// Validate listener configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Server address cannot be empty".to_string());
            return errors;
        }

        match self.address.parse::<SocketAddr>() {
            Err(_) => errors.push(format!(
                "Invalid server address format: '{}' (expected format: '0.0.0.0:33333')",
                self.address
            )),
            Ok(addr) if (1..=MAX_PRIVILEGED_PORT).contains(&addr.port()) => errors.push(format!(
                "Privileged port not allowed: {} (use 1024-65535, or 0 for ephemeral)",
                addr.port()
            )),
            Ok(_) => {}
        }

        errors
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// The only login the server accepts (exactly 4 characters)
    pub accepted_login: String,

    /// Path to the `login:secret` credential database
    pub credentials_path: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            accepted_login: String::from(DEFAULT_LOGIN),
            credentials_path: String::from(DEFAULT_CREDENTIALS_PATH),
        }
    }
}

impl AuthConfig {
    /// Validate authentication configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        let login = &self.accepted_login;
        if login.len() != LOGIN_LEN || !login.bytes().all(|b| b.is_ascii_graphic()) {
            errors.push(format!(
                "Accepted login must be exactly {LOGIN_LEN} printable ASCII characters: '{login}'"
            ));
        }

        if self.credentials_path.is_empty() {
            errors.push("Credentials path cannot be empty".to_string());
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to log to file
    pub log_to_file: bool,

    /// Path to log file (if log_to_file is true)
    pub log_file_path: Option<String>,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("vcalc"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        if self.log_to_file {
            if let Some(ref path) = self.log_file_path {
                if let Some(parent) = Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        errors.push(format!(
                            "Log file directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            } else {
                errors.push("log_file_path must be specified when log_to_file is true".to_string());
            }
        }

        if !self.log_to_console && !self.log_to_file {
            errors
                .push("At least one logging output (console or file) must be enabled".to_string());
        }

        errors
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
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

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
