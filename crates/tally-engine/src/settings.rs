//! Configuration loading.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults (`EngineConfig::default()`)
//! 2. an optional TOML file
//! 3. `TALLY__`-prefixed environment variables, `__` between path segments,
//!    e.g. `TALLY__SCORING__HOURLY_VOTE_LIMIT=30`
//!
//! The result is validated before it is returned.

use std::collections::HashMap;
use std::path::Path;

use config::{Config, Environment, File};
use tracing::debug;

use tally_core::config::EngineConfig;
use tally_core::error::ConfigError;

pub const ENV_PREFIX: &str = "TALLY";

/// Load configuration from `path` (if given) and the process environment.
pub fn load(path: Option<&Path>) -> Result<EngineConfig, ConfigError> {
    load_with(path, environment())
}

/// Like [`load`], but reads environment overrides from `vars` instead of the
/// process environment.
pub fn load_from_vars(path: Option<&Path>, vars: HashMap<String, String>) -> Result<EngineConfig, ConfigError> {
    load_with(path, environment().source(Some(vars)))
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

fn load_with(path: Option<&Path>, env: Environment) -> Result<EngineConfig, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        debug!(path = %path.display(), "settings: reading configuration file");
        builder = builder.add_source(File::from(path).required(true));
    }
    let config: EngineConfig = builder
        .add_source(env)
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| ConfigError::Load(e.to_string()))?;
    config.validate()?;
    Ok(config)
}
