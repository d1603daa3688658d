// SPDX-FileCopyrightText: 2026 Omnirelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loading and validation for Omnirelay.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    AssignmentConfig, OmnirelayConfig, PlatformCredentials, PlatformsConfig, QueueConfig,
    ServerConfig, StorageConfig,
};

use omnirelay_core::RelayError;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Load configuration and reject values the components cannot run with.
pub fn load_and_validate() -> Result<OmnirelayConfig, RelayError> {
    let config = load_config().map_err(|e| RelayError::Config(e.to_string()))?;
    validate(&config)?;
    Ok(config)
}

/// Validate a loaded configuration.
pub fn validate(config: &OmnirelayConfig) -> Result<(), RelayError> {
    if !VALID_LOG_LEVELS.contains(&config.server.log_level.as_str()) {
        return Err(RelayError::Config(format!(
            "server.log_level must be one of {VALID_LOG_LEVELS:?}, got {:?}",
            config.server.log_level
        )));
    }
    if config.queue.max_attempts < 1 {
        return Err(RelayError::Config(
            "queue.max_attempts must be at least 1".into(),
        ));
    }
    if config.queue.visibility_timeout_secs < 1 {
        return Err(RelayError::Config(
            "queue.visibility_timeout_secs must be at least 1".into(),
        ));
    }
    if config.queue.batch_size == 0 {
        return Err(RelayError::Config("queue.batch_size must be nonzero".into()));
    }
    if config.storage.database_path.is_empty() {
        return Err(RelayError::Config(
            "storage.database_path must not be empty".into(),
        ));
    }
    Ok(())
}
