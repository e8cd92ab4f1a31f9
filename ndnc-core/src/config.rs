use std::time::Duration;
use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encoding::{wire_format_by_name, WireFormat};
use crate::security::validator::DEFAULT_MAX_STEPS;

/// Largest packet a forwarder accepts
pub const DEFAULT_MAX_PACKET_SIZE: usize = 8800;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Unknown wire format: {0}")]
    UnknownWireFormat(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub face: FaceConfig,
    pub security: SecurityConfig,
    pub encoding: EncodingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceConfig {
    pub host: String,
    pub port: u16,
    /// Lifetime given to Interests that do not set one
    pub interest_lifetime_ms: u64,
    pub max_packet_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Certificates fetched before a validation gives up
    pub max_steps: u32,
    /// Re-expressions of a certificate Interest after a timeout
    pub certificate_fetch_retries: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    pub default_wire_format: String,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6363,
            interest_lifetime_ms: 4000,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            certificate_fetch_retries: 1,
        }
    }
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            default_wire_format: "0.2".to_string(),
        }
    }
}

impl FaceConfig {
    pub fn interest_lifetime(&self) -> Duration {
        Duration::from_millis(self.interest_lifetime_ms)
    }
}

impl EncodingConfig {
    pub fn wire_format(&self) -> Result<&'static dyn WireFormat, ConfigError> {
        wire_format_by_name(&self.default_wire_format)
            .ok_or_else(|| ConfigError::UnknownWireFormat(self.default_wire_format.clone()))
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if !path.as_ref().exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.encoding.wire_format()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path().join("ndnc.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.face.max_packet_size, 8800);
        assert_eq!(config.face.interest_lifetime(), Duration::from_secs(4));
        assert_eq!(config.encoding.wire_format().unwrap().name(), "0.2");
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ndnc.toml");

        let mut config = Config::default();
        config.face.port = 6364;
        config.security.max_steps = 3;
        config.encoding.default_wire_format = "0.1".to_string();
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ndnc.toml");
        fs::write(&path, "[face]\nhost = \"10.0.0.1\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.face.host, "10.0.0.1");
        assert_eq!(config.face.port, 6363);
        assert_eq!(config.security, SecurityConfig::default());
    }

    #[test]
    fn test_unknown_wire_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ndnc.toml");
        fs::write(&path, "[encoding]\ndefault_wire_format = \"0.3\"\n").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::UnknownWireFormat(_))));
    }
}
