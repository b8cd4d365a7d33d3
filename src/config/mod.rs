//! Configuration parsing and types.

pub mod env;
pub mod parser;
pub mod types;
pub mod validate;

use std::path::Path;

use tracing::{info, warn};

use crate::common::error::ConfigError;

pub use types::*;

/// Load the config file (if present), apply environment overrides and validate.
///
/// A missing file is not an error by itself: the token may come from the
/// environment alone.
pub fn load_and_validate(path: &str) -> Result<Config, ConfigError> {
    let mut doc = if Path::new(path).exists() {
        parser::load_document(path)?
    } else {
        info!("No config file at {}, using environment only", path);
        parser::empty_document()
    };

    for var in env::check_empty_env_vars() {
        warn!("Environment variable {} is set but empty", var);
    }

    env::apply_env_overrides(&mut doc);

    let config = parser::config_from_document(&doc)?;
    validate::validate_config(&config)?;
    Ok(config)
}
