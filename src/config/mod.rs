//! Configuration module for cubegraph.
//!
//! Handles the settings file and environment variable expansion.

mod settings;

pub use settings::{
    expand_env_vars, DatabaseSettings, LoggingSettings, ModelSettings, Settings, SettingsError,
    CONFIG_ENV_VAR,
};
