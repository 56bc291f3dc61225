//! Configuration management for pktvis

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ViewerError};
use crate::filter::CombinePolicy;

/// Application directory name under the platform config/data dirs
const APP_DIR: &str = "pktvis";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Packet source
    pub transport: TransportConfig,
    /// Initial filter settings
    pub filter: FilterConfig,
    /// Capture file import
    pub capture: CaptureConfig,
    /// Dump export
    pub export: ExportConfig,
    /// Logging
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Decoder websocket `host:port`. Unset means the local bus.
    pub address: Option<String>,
    /// Local bus channel name
    pub bus_channel: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// How the name and content filters combine (`and` / `or`)
    pub combine: CombinePolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Ports the server listens on.
    ///
    /// A captured frame whose source port is in this list is attributed to
    /// the server, anything else to the client.
    pub server_ports: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory receiving `dump-<timestamp>.json` files
    pub dump_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: String,
    /// Log file used while the terminal UI is running
    pub file: PathBuf,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            address: None,
            bus_channel: "sniffer://visualizer/packet".to_string(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            server_ports: vec![22101, 22102],
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dump_dir: data_dir().join("dumps"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: data_dir().join("pktvis.log"),
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

impl Config {
    /// Get default configuration file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(PathBuf::from).unwrap_or_else(Self::default_path);

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ViewerError::ReadFile {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&content)
            .map_err(|e| ViewerError::Config(format!("{}: {e}", path.display())))
    }

    /// Save configuration to file
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = path.map(PathBuf::from).unwrap_or_else(Self::default_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, self.to_toml()?)?;
        Ok(path)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ViewerError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.filter.combine, CombinePolicy::And);
        assert_eq!(config.transport.address, None);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[transport]\naddress = \"127.0.0.1:1234\"\n\n[filter]\ncombine = \"or\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.transport.address.as_deref(), Some("127.0.0.1:1234"));
        assert_eq!(config.transport.bus_channel, TransportConfig::default().bus_channel);
        assert_eq!(config.filter.combine, CombinePolicy::Or);
        assert_eq!(config.capture.server_ports, vec![22101, 22102]);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.capture.server_ports = vec![4000];
        config.save(Some(&path)).unwrap();

        assert_eq!(Config::load(Some(&path)).unwrap(), config);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[filter]\ncombine = \"xor\"\n").unwrap();

        assert!(matches!(Config::load(Some(&path)), Err(ViewerError::Config(_))));
    }
}
