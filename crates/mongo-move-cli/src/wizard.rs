//! Interactive configuration wizard for creating/editing config files.

use dialoguer::{Confirm, Input, Select};
use mongo_move::{health_check, Config, MongoStore, MoveError, SessionConfig};
use std::path::Path;
use thiserror::Error;

/// Result type for wizard operations.
pub type WizardResult<T> = Result<T, WizardError>;

/// Ways the wizard can stop without writing a config.
#[derive(Debug, Error)]
pub enum WizardError {
    /// User chose Abort or declined to save.
    #[error("Configuration cancelled")]
    Cancelled,

    /// Terminal prompt could not be shown or read.
    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    /// Config file could not be written.
    #[error("Could not write config: {0}")]
    Write(#[from] std::io::Error),

    /// Entered settings were rejected or could not be serialized.
    #[error(transparent)]
    Invalid(#[from] MoveError),
}

impl From<WizardError> for MoveError {
    fn from(e: WizardError) -> Self {
        match e {
            WizardError::Write(e) => MoveError::Io(e),
            WizardError::Invalid(e) => e,
            other => MoveError::Config(other.to_string()),
        }
    }
}

/// Run the configuration wizard.
pub async fn run_wizard(output: &Path, force: bool) -> WizardResult<()> {
    println!();
    println!("mongo-move - Configuration Wizard");
    println!("=================================");
    println!();

    let existing = if output.exists() && !force {
        println!("File already exists: {}\n", output.display());
        let options = &["Edit existing configuration", "Overwrite with new", "Abort"];
        let selection = Select::new()
            .with_prompt("What would you like to do?")
            .items(options)
            .default(0)
            .interact()?;
        match selection {
            0 => match Config::load(output) {
                Ok(config) => Some(config),
                Err(e) => {
                    println!("Warning: Could not parse existing file: {}", e);
                    println!("Starting with fresh configuration.\n");
                    None
                }
            },
            1 => None,
            _ => return Err(WizardError::Cancelled),
        }
    } else {
        None
    };

    let source_server = prompt_uri(
        "Source server",
        existing
            .as_ref()
            .map(|c| c.source_server.as_str())
            .unwrap_or("mongodb://localhost:27018"),
    )?;
    let target_server = prompt_uri(
        "Target server",
        existing
            .as_ref()
            .map(|c| c.target_server.as_str())
            .unwrap_or("mongodb://localhost:27017"),
    )?;
    let session = prompt_session(existing.as_ref().map(|c| &c.session))?;

    let config = Config {
        source_server,
        target_server,
        session,
    };
    config.validate()?;

    print_summary(&config);

    if Confirm::new()
        .with_prompt("Test server connections?")
        .default(false)
        .interact()?
    {
        test_connections(&config).await;
    }

    if !Confirm::new()
        .with_prompt(format!("Save to {}?", output.display()))
        .default(true)
        .interact()?
    {
        return Err(WizardError::Cancelled);
    }

    let json = config.to_json()?;
    std::fs::write(output, json)?;

    println!("\nConfiguration saved to {}", output.display());
    println!("Run 'mongo-move tui' to start copying.");

    Ok(())
}

fn prompt_uri(prompt: &str, default: &str) -> WizardResult<String> {
    Ok(Input::new()
        .with_prompt(format!("  {}", prompt))
        .default(default.to_string())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.starts_with("mongodb://") || input.starts_with("mongodb+srv://") {
                Ok(())
            } else {
                Err("must start with mongodb:// or mongodb+srv://")
            }
        })
        .interact_text()?)
}

fn prompt_session(existing: Option<&SessionConfig>) -> WizardResult<SessionConfig> {
    let defaults = existing.cloned().unwrap_or_default();
    if !Confirm::new()
        .with_prompt("Adjust session settings?")
        .default(false)
        .interact()?
    {
        return Ok(defaults);
    }

    let page_size: usize = Input::new()
        .with_prompt("  Rows per page")
        .default(defaults.page_size)
        .interact_text()?;
    let reveal_delay_ms: u64 = Input::new()
        .with_prompt("  Reveal delay after loading (ms)")
        .default(defaults.reveal_delay_ms)
        .interact_text()?;
    let server_selection_timeout_secs: u64 = Input::new()
        .with_prompt("  Server selection timeout (s)")
        .default(defaults.server_selection_timeout_secs)
        .interact_text()?;

    Ok(SessionConfig {
        page_size,
        reveal_delay_ms,
        server_selection_timeout_secs,
        ..defaults
    })
}

fn print_summary(config: &Config) {
    println!();
    println!("Configuration Summary");
    println!("---------------------");
    println!("  Source: {}", mongo_move::config::redact_uri(&config.source_server));
    println!("  Target: {}", mongo_move::config::redact_uri(&config.target_server));
    println!("  Page size: {}", config.session.page_size);
    println!();
}

async fn test_connections(config: &Config) {
    println!("\nTesting connections...");
    let timeout = config.session.server_selection_timeout();

    let source = MongoStore::connect(&config.source_server, timeout).await;
    let target = MongoStore::connect(&config.target_server, timeout).await;
    let (source, target) = match (source, target) {
        (Ok(s), Ok(t)) => (s, t),
        (Err(e), _) | (_, Err(e)) => {
            println!("  Failed to initialize: {}\n", e);
            return;
        }
    };

    let health = health_check(&source, &target).await;
    print_endpoint(
        "Source",
        health.source_connected,
        health.source_latency_ms,
        &health.source_error,
    );
    print_endpoint(
        "Target",
        health.target_connected,
        health.target_latency_ms,
        &health.target_error,
    );
    if !health.healthy {
        println!("\n  Warning: One or more connections failed.");
    }
    println!();
}

pub fn print_endpoint(name: &str, connected: bool, latency_ms: u64, error: &Option<String>) {
    println!(
        "  {}: {} ({}ms)",
        name,
        if connected { "OK" } else { "FAILED" },
        latency_ms
    );
    if let Some(err) = error {
        println!("    Error: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wizard_errors_keep_exit_codes() {
        let write: MoveError = WizardError::Write(std::io::Error::other("read-only")).into();
        assert_eq!(write.exit_code(), 7);

        let invalid = Config::new("", "mongodb://localhost").validate().unwrap_err();
        let invalid: MoveError = WizardError::from(invalid).into();
        assert!(invalid.to_string().contains("sourceServer"));
        assert_eq!(invalid.exit_code(), 1);

        let cancelled: MoveError = WizardError::Cancelled.into();
        assert_eq!(cancelled.to_string(), "Configuration error: Configuration cancelled");
    }
}
