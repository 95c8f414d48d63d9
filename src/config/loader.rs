use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use eyre::{Context, Result};

use crate::config::models::EngineConfig;

/// Prefix of environment overrides, e.g. `SHIPFEE__CACHE__TTL=30m`
pub const ENV_PREFIX: &str = "SHIPFEE";

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Load configuration from a file using the config crate
/// Supports multiple formats: YAML, JSON, TOML, etc.
pub async fn load_config(config_path: &str) -> Result<EngineConfig> {
    load_config_sync(config_path)
}

/// Load configuration synchronously, applying `SHIPFEE__*` overrides
pub fn load_config_sync(config_path: &str) -> Result<EngineConfig> {
    load_with_env(config_path, env_source())
}

/// Load defaults plus environment overrides when no file is given
pub fn load_from_env() -> Result<EngineConfig> {
    Config::builder()
        .add_source(env_source())
        .build()
        .context("Failed to read environment configuration")?
        .try_deserialize()
        .context("Failed to deserialize environment configuration")
}

fn load_with_env(config_path: &str, env: Environment) -> Result<EngineConfig> {
    let config_path = Path::new(config_path);

    // Determine file format based on extension
    let format = match config_path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => FileFormat::Yaml,
        Some("json") => FileFormat::Json,
        _ => FileFormat::Toml,
    };

    let settings = Config::builder()
        .add_source(File::new(
            config_path
                .to_str()
                .ok_or_else(|| eyre::eyre!("Invalid UTF-8 path: {}", config_path.display()))?,
            format,
        ))
        .add_source(env)
        .build()
        .with_context(|| format!("Failed to build config from {}", config_path.display()))?;

    let engine_config: EngineConfig = settings.try_deserialize().with_context(|| {
        format!(
            "Failed to deserialize config from {}",
            config_path.display()
        )
    })?;

    Ok(engine_config)
}
