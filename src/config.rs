use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::Show;

const APP_DIR: &str = "datum";
const DATABASE_PATH_VAR: &str = "DATUM_DATABASE_PATH";
const SHOW_VAR: &str = "DATUM_SHOW";

/// Where a setting's value came from, reported by `datum config show`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl ConfigSource {
    fn as_str(&self) -> &'static str {
        match self {
            ConfigSource::Default => "default",
            ConfigSource::File => "file",
            ConfigSource::Environment => "environment",
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    fn set(&mut self, value: T, source: ConfigSource) {
        self.value = value;
        self.source = source;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// SQLite document store
    pub database_path: ConfigValue<PathBuf>,
    pub show: ConfigValue<Show>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    show: Option<Show>,
}

impl Config {
    /// Layers the YAML file over defaults, then `DATUM_*` variables over both.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self {
            database_path: ConfigValue::new(
                Self::default_data_dir().join("datum.db"),
                ConfigSource::Default,
            ),
            show: ConfigValue::new(Show::default(), ConfigSource::Default),
            config_file: None,
        };

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            config.apply_file(&path)?;
        }
        config.apply_env()?;

        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e))?;
        let file: ConfigFile = serde_yaml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e))?;

        if let Some(db_path) = file.database_path {
            let db_path = match path.parent() {
                Some(dir) if db_path.is_relative() => dir.join(db_path),
                _ => db_path,
            };
            self.database_path.set(db_path, ConfigSource::File);
        }
        if let Some(level) = file.show {
            self.show.set(level, ConfigSource::File);
        }
        self.config_file = Some(path.to_path_buf());
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(db_path) = std::env::var(DATABASE_PATH_VAR) {
            self.database_path
                .set(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Ok(level) = std::env::var(SHOW_VAR) {
            let level = level
                .parse()
                .map_err(|e| ConfigError::InvalidValue(SHOW_VAR.to_string(), e))?;
            self.show.set(level, ConfigSource::Environment);
        }
        Ok(())
    }

    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(String, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(name, e) => {
                write!(f, "Invalid value for {}: {}", name, e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load(Some(config_path)).unwrap();
        assert!(config
            .database_path
            .value
            .to_string_lossy()
            .contains("datum.db"));
        assert_eq!(config.database_path.source, ConfigSource::Default);
        assert_eq!(config.show.value, Show::Standard);
        assert_eq!(config.show.source, ConfigSource::Default);
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "database_path: /custom/path/db.sqlite").unwrap();
        writeln!(file, "show: verbose").unwrap();

        let config = Config::load(Some(config_path.clone())).unwrap();
        assert_eq!(
            config.database_path.value,
            PathBuf::from("/custom/path/db.sqlite")
        );
        assert_eq!(config.database_path.source, ConfigSource::File);
        assert_eq!(config.show.value, Show::Verbose);
        assert_eq!(config.show.source, ConfigSource::File);
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_relative_database_path_resolves_against_config_dir() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "database_path: data/datum.db").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(
            config.database_path.value,
            temp_dir.path().join("data/datum.db")
        );
    }

    #[test]
    #[ignore] // Run with --ignored; env vars can pollute parallel tests
    fn test_env_var_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "show: minimal").unwrap();

        std::env::set_var(SHOW_VAR, "none");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.show.value, Show::None);
        assert_eq!(config.show.source, ConfigSource::Environment);

        std::env::remove_var(SHOW_VAR);
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load(Some(config_path));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_invalid_show_level_in_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "show: loud").unwrap();

        assert!(Config::load(Some(config_path)).is_err());
    }
}
