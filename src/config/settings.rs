//! TOML-based configuration for cubegraph.
//!
//! Supports a config file (cubegraph.toml) with environment variable
//! expansion in the database path.
//!
//! Example configuration:
//! ```toml
//! [database]
//! path = "${HOME}/.cubegraph/cube_model.db"
//! sample_data = true
//!
//! [model]
//! name = "Cube Model"
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "CUBEGRAPH_CONFIG";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Failed to determine data directory")]
    NoDataDir,
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub model: ModelSettings,
    pub logging: LoggingSettings,
}

/// Where the cube store lives.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Database file (supports ${ENV_VAR} expansion). Defaults to the
    /// platform data directory.
    pub path: Option<String>,

    /// Seed the sample model when the database is empty.
    pub sample_data: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Name given to models saved by the CLI.
    pub name: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            name: crate::store::DEFAULT_STORE_MODEL_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `CUBEGRAPH_CONFIG`
    /// 2. `./cubegraph.toml`
    /// 3. `<config_dir>/cubegraph/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("cubegraph.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("cubegraph").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// The database path with environment variables expanded, or the
    /// default `<data_dir>/cubegraph/cube_model.db`.
    pub fn database_path(&self) -> Result<PathBuf, SettingsError> {
        match &self.database.path {
            Some(path) => Ok(PathBuf::from(expand_env_vars(path)?)),
            None => {
                let base = dirs::data_dir().ok_or(SettingsError::NoDataDir)?;
                Ok(base.join("cubegraph").join("cube_model.db"))
            }
        }
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR`; a `$` not followed by a name is kept.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            let end = braced.find('}').unwrap_or(braced.len());
            let close = usize::from(end < braced.len());
            (&braced[..end], 1 + end + close)
        } else {
            let end = after
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        if consumed == 0 {
            result.push('$');
        } else {
            let value =
                env::var(name).map_err(|_| SettingsError::MissingEnvVar(name.to_string()))?;
            result.push_str(&value);
        }
        rest = &after[consumed..];
    }

    result.push_str(rest);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars_braces() {
        env::set_var("CUBEGRAPH_TEST_VAR", "hello");
        assert_eq!(expand_env_vars("${CUBEGRAPH_TEST_VAR}").unwrap(), "hello");
        assert_eq!(
            expand_env_vars("prefix_${CUBEGRAPH_TEST_VAR}_suffix").unwrap(),
            "prefix_hello_suffix"
        );
        env::remove_var("CUBEGRAPH_TEST_VAR");
    }

    #[test]
    fn test_expand_env_vars_no_braces() {
        env::set_var("CUBEGRAPH_TEST_VAR2", "world");
        assert_eq!(expand_env_vars("$CUBEGRAPH_TEST_VAR2").unwrap(), "world");
        assert_eq!(expand_env_vars("$CUBEGRAPH_TEST_VAR2/x.db").unwrap(), "world/x.db");
        env::remove_var("CUBEGRAPH_TEST_VAR2");
    }

    #[test]
    fn test_expand_env_vars_lone_dollar() {
        assert_eq!(expand_env_vars("cost$").unwrap(), "cost$");
        assert_eq!(expand_env_vars("a $ b").unwrap(), "a $ b");
        assert_eq!(expand_env_vars("plain").unwrap(), "plain");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let result = expand_env_vars("${CUBEGRAPH_NONEXISTENT_12345}");
        assert!(matches!(result, Err(SettingsError::MissingEnvVar(_))));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[database]
path = "./data/cubes.db"
sample_data = true

[model]
name = "Shop"

[logging]
level = "debug"
"#;

        let settings: Settings = toml::from_str(toml).unwrap();
        assert_eq!(settings.database.path.as_deref(), Some("./data/cubes.db"));
        assert!(settings.database.sample_data);
        assert_eq!(settings.model.name, "Shop");
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(
            settings.database_path().unwrap(),
            PathBuf::from("./data/cubes.db")
        );
    }

    #[test]
    fn test_default_settings() {
        let settings: Settings = toml::from_str("").unwrap();
        assert!(settings.database.path.is_none());
        assert!(!settings.database.sample_data);
        assert_eq!(settings.model.name, "Cube Model");
        assert_eq!(settings.logging.level, "warn");
    }

    #[test]
    fn test_missing_file() {
        let err = Settings::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, SettingsError::FileNotFound(_)));
    }
}
