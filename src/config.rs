// ⚙️ Configuration - optional TOML file, overridden by CLI flags / env

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "family-records.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON document holding every category's records
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            path: PathBuf::from("family_data.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. "info" or "family_records=debug"
    pub level: String,
    /// Write logs here instead of stderr
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    /// Load config from a TOML file; a missing file means defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Apply command-line / environment overrides on top of the file.
    pub fn with_overrides(
        mut self,
        data: Option<PathBuf>,
        bind: Option<String>,
        log_level: Option<String>,
    ) -> Self {
        if let Some(path) = data {
            self.store.path = path;
        }
        if let Some(bind) = bind {
            self.server.bind = bind;
        }
        if let Some(level) = log_level {
            self.logging.level = level;
        }
        self
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.store.path, PathBuf::from("family_data.json"));
        assert_eq!(config.server.bind, "0.0.0.0:3000");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("family-records.toml");
        fs::write(
            &path,
            "[store]\npath = \"/srv/family/data.json\"\n\n[logging]\nfile = \"family.log\"\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.store.path, PathBuf::from("/srv/family/data.json"));
        assert_eq!(config.logging.file, Some(PathBuf::from("family.log")));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("family-records.toml");
        fs::write(&path, "[store\npath = 3").unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_overrides_win() {
        let config = Config::default().with_overrides(
            Some(PathBuf::from("other.json")),
            None,
            Some("debug".to_string()),
        );

        assert_eq!(config.store.path, PathBuf::from("other.json"));
        assert_eq!(config.server.bind, "0.0.0.0:3000");
        assert_eq!(config.logging.level, "debug");
    }
}
