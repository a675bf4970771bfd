// ABOUTME: Configuration management for the bosun application
// ABOUTME: Loads settings from a YAML file and lets BOSUN_* environment variables override them

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Host the model runs on; commands run locally when unset
    #[serde(default)]
    pub host: Option<String>,

    /// Environment files merged beneath the ones given on the command line
    #[serde(default)]
    pub environ_files: Vec<PathBuf>,

    #[serde(default)]
    pub strict_overlay: bool,

    /// Lowest-precedence environment values
    #[serde(default)]
    pub defaults: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            host: None,
            environ_files: Vec::new(),
            strict_overlay: false,
            defaults: Map::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file path or default locations
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => Self::find_config_file(),
        };

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Invalid configuration file {}", config_path.display()))?
        } else {
            Config::default()
        };

        config.merge_env()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> PathBuf {
        for path in ["bosun.yaml", "bosun.yml", ".bosun.yaml", ".bosun.yml"] {
            let path = PathBuf::from(path);
            if path.exists() {
                return path;
            }
        }

        if let Some(home_dir) = dirs::home_dir() {
            let home_config = home_dir.join(".bosun").join("config.yaml");
            if home_config.exists() {
                return home_config;
            }
        }

        // Default path (may not exist)
        PathBuf::from("bosun.yaml")
    }

    /// Merge environment variables into configuration
    fn merge_env(&mut self) -> Result<()> {
        if let Ok(level) = std::env::var("BOSUN_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("BOSUN_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(host) = std::env::var("BOSUN_HOST") {
            self.host = if host.is_empty() { None } else { Some(host) };
        }
        if let Ok(strict) = std::env::var("BOSUN_STRICT_OVERLAY") {
            self.strict_overlay = strict
                .parse()
                .with_context(|| format!("BOSUN_STRICT_OVERLAY must be true or false, got '{}'", strict))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
        assert!(config.host.is_none());
        assert!(!config.strict_overlay);
    }

    #[test]
    fn test_load_config_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("bosun.yaml");
        fs::write(
            &config_path,
            r#"
logging:
  level: debug
  format: compact
environ_files:
  - /exp/environ.yaml
defaults:
  platform: cray
  npes: 32
"#,
        )
        .unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.logging.format, "compact");
        assert_eq!(config.environ_files, vec![PathBuf::from("/exp/environ.yaml")]);
        assert_eq!(config.defaults["platform"], "cray");
        assert_eq!(config.defaults["npes"], 32);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let config = Config::load(Some(temp_dir.path().join("absent.yaml"))).unwrap();
        assert!(config.environ_files.is_empty());
        assert!(config.defaults.is_empty());
    }
}
