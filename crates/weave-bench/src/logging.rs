//! Process setup for benchmark binaries: logging and config files.

use std::fs;
use std::path::Path;

use weave_collision::CollisionConfig;
use weave_types::{WeaveError, WeaveResult};

/// Installs a `fmt` subscriber for benchmark binaries.
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();
}

/// Loads and validates a collision config from a TOML file.
pub fn load_config(path: impl AsRef<Path>) -> WeaveResult<CollisionConfig> {
    let text = fs::read_to_string(path)?;
    let config: CollisionConfig =
        toml::from_str(&text).map_err(|e| WeaveError::Serialization(e.to_string()))?;
    config.validate()?;
    Ok(config)
}
