//! Configuration validation.

use super::Config;
use crate::error::{MoveError, Result};

const URI_SCHEMES: [&str; 2] = ["mongodb://", "mongodb+srv://"];

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    check_server("sourceServer", &config.source_server)?;
    check_server("targetServer", &config.target_server)?;

    if config.session.page_size == 0 {
        return Err(MoveError::Config(
            "session.pageSize must be at least 1".into(),
        ));
    }
    if config.session.tick_interval_ms == 0 {
        return Err(MoveError::Config(
            "session.tickIntervalMs must be at least 1".into(),
        ));
    }

    Ok(())
}

fn check_server(key: &str, uri: &str) -> Result<()> {
    if uri.trim().is_empty() {
        return Err(MoveError::Config(format!(
            "config value \"{}\" is missing",
            key
        )));
    }
    if !URI_SCHEMES.iter().any(|scheme| uri.starts_with(scheme)) {
        return Err(MoveError::Config(format!(
            "config value \"{}\" must start with mongodb:// or mongodb+srv://",
            key
        )));
    }
    Ok(())
}
