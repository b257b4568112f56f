use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tui: TuiConfig,
    pub layout: LayoutConfig,
}

/// Event loop and input settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuiConfig {
    /// Tick interval in milliseconds for the event loop.
    pub tick_rate_ms: u64,
    /// Capture the mouse so terms can be clicked.
    pub mouse_enabled: bool,
}

/// Column geometry, in terminal cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub column_width: u16,
    pub column_gap: u16,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 250,
            mouse_enabled: true,
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            column_width: 36,
            column_gap: 1,
        }
    }
}

impl TuiConfig {
    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms.max(1))
    }
}

impl AppConfig {
    /// Load from an explicit path. Errors are reported, not papered over.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        log::info!("loaded config from {}", path.display());
        Ok(config.sanitized())
    }

    /// Load `<config_dir>/fathom/config.toml`.
    /// Returns `Default` if the file is missing or unparseable.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        if !config_path.exists() {
            log::debug!(
                "no config file at {}, using defaults",
                config_path.display()
            );
            return Self::default();
        }
        match Self::from_path(&config_path) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("{err}; using defaults");
                Self::default()
            }
        }
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("fathom").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("fathom.toml"))
    }

    fn sanitized(mut self) -> Self {
        // Two border cells plus at least one cell of text.
        self.layout.column_width = self.layout.column_width.max(3);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.tui.tick_rate_ms, 250);
        assert!(config.tui.mouse_enabled);
        assert_eq!(config.layout.column_width, 36);
        assert_eq!(config.layout.column_gap, 1);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: AppConfig = toml::from_str("[layout]\ncolumn_width = 48\n").unwrap();
        assert_eq!(config.layout.column_width, 48);
        assert_eq!(config.layout.column_gap, 1);
        assert_eq!(config.tui.tick_rate_ms, 250);
    }

    #[test]
    fn test_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[tui]\nmouse_enabled = false\n[layout]\ncolumn_width = 1\n").unwrap();
        let config = AppConfig::from_path(&path).unwrap();
        assert!(!config.tui.mouse_enabled);
        assert_eq!(config.layout.column_width, 3);
    }

    #[test]
    fn test_from_path_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[layout\n").unwrap();
        assert!(matches!(
            AppConfig::from_path(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_from_path_reports_missing_file() {
        assert!(matches!(
            AppConfig::from_path(Path::new("/no/such/fathom.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
