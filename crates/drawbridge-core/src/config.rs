//! Configuration loading and defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level Drawbridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub surface: Option<SurfaceConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

/// Surface asset server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port for the asset server; 0 binds an ephemeral port and the
    /// discovered value is substituted into the embedding document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
}

/// Settings for the embedded drawing surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurfaceConfig {
    /// Extension filter for library imports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_extension: Option<String>,

    /// Library file offered to the import flow when no dialog is available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_path: Option<String>,

    /// Name of the host-registered command the surface triggers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_command: Option<String>,

    /// Directory surface exports are written to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl BridgeConfig {
    /// Load config from a JSON5 file. A missing file yields the defaults.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(crate::error::BridgeError::Io)?;

        let config: BridgeConfig = json5::from_str(&raw)
            .map_err(|e| crate::error::BridgeError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Default config file location: `~/.drawbridge/config.json`.
    pub fn config_dir() -> PathBuf {
        data_dir().join("config.json")
    }

    pub fn server_port(&self) -> u16 {
        self.server.as_ref().and_then(|s| s.port).unwrap_or(0)
    }

    pub fn bind(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.bind.clone())
            .unwrap_or_else(|| "127.0.0.1".to_string())
    }

    pub fn library_extension(&self) -> String {
        self.surface
            .as_ref()
            .and_then(|s| s.library_extension.clone())
            .unwrap_or_else(|| "sketchlib".to_string())
    }

    pub fn library_path(&self) -> Option<PathBuf> {
        self.surface
            .as_ref()
            .and_then(|s| s.library_path.as_ref())
            .map(PathBuf::from)
    }

    pub fn import_command(&self) -> String {
        self.surface
            .as_ref()
            .and_then(|s| s.import_command.clone())
            .unwrap_or_else(|| "drawbridge.import".to_string())
    }

    pub fn export_dir(&self) -> PathBuf {
        self.surface
            .as_ref()
            .and_then(|s| s.export_dir.as_ref())
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir().join("exports"))
    }

    pub fn log_level(&self) -> String {
        self.logging
            .as_ref()
            .and_then(|l| l.level.clone())
            .unwrap_or_else(|| "info".to_string())
    }

    /// Save config to a file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Base directory for Drawbridge data: `~/.drawbridge/`
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".drawbridge")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.server_port(), 0);
        assert_eq!(config.bind(), "127.0.0.1");
        assert_eq!(config.library_extension(), "sketchlib");
        assert_eq!(config.import_command(), "drawbridge.import");
        assert!(config.library_path().is_none());
    }

    #[test]
    fn test_json5_parse() {
        let raw = r#"{
            // comments are allowed
            server: { port: 4617, bind: "0.0.0.0" },
            surface: { library_extension: "lib", export_dir: "/tmp/exports" },
        }"#;
        let config: BridgeConfig = json5::from_str(raw).unwrap();
        assert_eq!(config.server_port(), 4617);
        assert_eq!(config.bind(), "0.0.0.0");
        assert_eq!(config.library_extension(), "lib");
        assert_eq!(config.export_dir(), PathBuf::from("/tmp/exports"));
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = BridgeConfig::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config.server_port(), 0);
    }

    #[test]
    fn test_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = BridgeConfig::default();
        config.server = Some(ServerConfig {
            port: Some(9100),
            bind: None,
        });
        config.save(&path).unwrap();

        let loaded = BridgeConfig::load(&path).unwrap();
        assert_eq!(loaded.server_port(), 9100);
    }
}
