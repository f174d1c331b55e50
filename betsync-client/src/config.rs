//! Client configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via CLI_CONFIG or --config)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Placeholder in `data.path` replaced by the agency id.
const ID_PLACEHOLDER: &str = "{id}";

/// Client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Agency identity.
    pub client: IdentityConfig,
    /// Server connection.
    pub server: ServerConfig,
    /// Batch upload.
    pub batch: BatchConfig,
    /// Bet file.
    pub data: DataConfig,
    /// Logging.
    pub log: LogConfig,
}

impl ClientConfig {
    /// Loads configuration from an optional file, then applies environment
    /// variable overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Self::from_yaml(&content).map_err(|e| ConfigError::ParseError(path.to_path_buf(), e))
    }

    fn from_yaml(content: &str) -> Result<Self, String> {
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    }

    fn apply_env_overrides(&mut self) {
        self.client.apply_env_overrides();
        self.server.apply_env_overrides();
        self.batch.apply_env_overrides();
        self.data.apply_env_overrides();
        self.log.apply_env_overrides();
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.address.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "server.address is empty".to_string(),
            ));
        }
        if self.batch.max_amount == 0 {
            return Err(ConfigError::ValidationError(
                "batch.max_amount must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the agency id as sent on the wire.
    pub fn agency(&self) -> String {
        self.client.id.to_string()
    }

    /// Returns the bet file path with the agency id substituted.
    pub fn data_path(&self) -> PathBuf {
        let raw = self.data.path.to_string_lossy();
        if raw.contains(ID_PLACEHOLDER) {
            PathBuf::from(raw.replace(ID_PLACEHOLDER, &self.agency()))
        } else {
            self.data.path.clone()
        }
    }
}

/// Agency identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Numeric agency id.
    pub id: u32,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self { id: 1 }
    }
}

impl IdentityConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("CLI_ID") {
            if let Ok(parsed) = id.parse() {
                self.id = parsed;
            }
        }
    }
}

/// Server connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server address as `host:port`; hostnames are resolved on connect.
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: format!("127.0.0.1:{}", betsync_protocol::DEFAULT_PORT),
        }
    }
}

impl ServerConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("CLI_SERVER_ADDRESS") {
            if !addr.is_empty() {
                self.address = addr;
            }
        }
    }
}

/// Batch upload configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum number of bets per frame.
    pub max_amount: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { max_amount: 100 }
    }
}

impl BatchConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(amount) = std::env::var("CLI_BATCH_MAX_AMOUNT") {
            if let Ok(n) = amount.parse() {
                self.max_amount = n;
            }
        }
    }
}

/// Bet file configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Path to the agency's CSV file. `{id}` is replaced by the agency id.
    pub path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/agency-{id}.csv"),
        }
    }
}

impl DataConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("CLI_DATA_PATH") {
            self.path = PathBuf::from(path);
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default tracing filter, used when RUST_LOG is unset.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LogConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("CLI_LOG_LEVEL") {
            self.level = level.to_lowercase();
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.client.id, 1);
        assert_eq!(config.server.address, "127.0.0.1:12345");
        assert_eq!(config.batch.max_amount, 100);
        assert_eq!(config.log.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_data_path_placeholder() {
        let mut config = ClientConfig::default();
        config.client.id = 4;
        assert_eq!(config.data_path(), PathBuf::from("./data/agency-4.csv"));

        config.data.path = PathBuf::from("/bets.csv");
        assert_eq!(config.data_path(), PathBuf::from("/bets.csv"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ClientConfig::from_yaml(
            "client:\n  id: 3\nserver:\n  address: server:12345\nbatch:\n  max_amount: 5000\n",
        )
        .unwrap();
        assert_eq!(config.client.id, 3);
        assert_eq!(config.server.address, "server:12345");
        assert_eq!(config.batch.max_amount, 5000);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "batch:\n  max_amount: 7\nlog:\n  level: debug").unwrap();
        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.batch.max_amount, 7);
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_from_missing_file() {
        let result = ClientConfig::from_file("/nonexistent/betsync.yaml");
        assert!(matches!(result, Err(ConfigError::IoError(..))));
    }

    #[test]
    fn test_invalid_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "batch: [not, a, map").unwrap();
        let result = ClientConfig::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(..))));
    }

    #[test]
    fn test_validation() {
        let mut config = ClientConfig::default();
        config.batch.max_amount = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let mut config = ClientConfig::default();
        config.server.address = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = ClientConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed = ClientConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.server.address, config.server.address);
        assert_eq!(parsed.data.path, config.data.path);
    }
}
