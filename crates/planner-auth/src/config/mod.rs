//! Configuration management
//!
//! Supports configuration loading with precedence: env > file > CLI > defaults

mod builder;
mod env;
mod file;

pub use builder::{Config, ConfigBuilder, HttpConfig, TelemetryConfig};

use std::path::Path;

use crate::Result;

/// Load configuration with precedence: env > file > defaults
pub fn load_config() -> Result<ConfigBuilder> {
    load_config_with(ConfigBuilder::new())
}

/// Layer the discovered config file and the environment over `builder`.
pub fn load_config_with(mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
    if let Some(path) = file::find_config_file() {
        tracing::info!("Loading configuration from {}", path.display());
        builder = file::load_from_file(&path, builder)?;
    }

    env::load_from_env(builder)
}

/// Load configuration from a specific file path
pub fn load_config_from_path(path: &Path) -> Result<ConfigBuilder> {
    load_config_from_path_with(path, ConfigBuilder::new())
}

/// Layer a specific config file and the environment over `builder`.
pub fn load_config_from_path_with(path: &Path, builder: ConfigBuilder) -> Result<ConfigBuilder> {
    let builder = file::load_from_file(path, builder)?;
    env::load_from_env(builder)
}
