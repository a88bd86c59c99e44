use std::env;
use std::path::{Path, PathBuf};

use crate::config::{ConfigError, WatchConfig};

pub const CONFIG_ENV: &str = "STATUSWATCH_CONFIG";
pub const QUIET_PERIOD_ENV: &str = "STATUSWATCH_QUIET_MS";

/// Picks the config file to load: an explicit path wins, then
/// `STATUSWATCH_CONFIG`, then `.statuswatch/config.toml` under the root.
pub fn resolve_config_path(root: Option<&Path>, explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path);
    }

    if let Ok(path) = env::var(CONFIG_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let candidate = root?.join(".statuswatch").join("config.toml");
    candidate.is_file().then_some(candidate)
}

pub fn load_config(
    root: Option<&Path>,
    explicit: Option<PathBuf>,
) -> Result<WatchConfig, ConfigError> {
    let config = match resolve_config_path(root, explicit) {
        Some(path) => load_config_file(&path)?,
        None => WatchConfig::default(),
    };
    let config = apply_env_overrides(config, |key| env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

pub fn load_config_file(path: &Path) -> Result<WatchConfig, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
    }

    let contents = std::fs::read_to_string(path)?;
    toml::from_str(&contents).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_env_overrides<F>(mut config: WatchConfig, lookup: F) -> Result<WatchConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(QUIET_PERIOD_ENV) {
        config.quiet_period_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: QUIET_PERIOD_ENV.to_string(),
            value: raw.clone(),
        })?;
    }
    Ok(config)
}
