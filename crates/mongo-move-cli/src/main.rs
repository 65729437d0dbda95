//! mongo-move CLI - interactive collection copying between MongoDB servers.

mod wizard;

#[cfg(feature = "tui")]
mod tui;

use clap::{Parser, Subcommand};
use mongo_move::{health_check, Config, DocumentStore, MongoStore, MoveError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "mongo-move")]
#[command(about = "Copy collections between MongoDB servers")]
#[command(version)]
struct Cli {
    /// Path to JSON (or YAML) configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the interactive copy session
    #[cfg(feature = "tui")]
    Tui,

    /// Create or edit a configuration file interactively
    Init {
        /// Output path for configuration file [default: config.json]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Force overwrite existing file without confirmation
        #[arg(long, short)]
        force: bool,
    },

    /// Test connections to both servers
    HealthCheck {
        /// Output the result as JSON
        #[arg(long)]
        output_json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MoveError> {
    let cli = Cli::parse();

    // No logging setup for wizard - keeps terminal clean for interactive prompts
    if let Commands::Init { output, force } = cli.command {
        let output_path = output.unwrap_or_else(|| PathBuf::from("config.json"));
        wizard::run_wizard(&output_path, force).await?;
        return Ok(());
    }

    // The TUI manages its own terminal and log routing
    #[cfg(feature = "tui")]
    if let Commands::Tui = cli.command {
        return tui::run(&cli.config).await;
    }

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| MoveError::Config(e.to_string()))?;

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Init { .. } => unreachable!(), // Handled above
        #[cfg(feature = "tui")]
        Commands::Tui => unreachable!(), // Handled above
        Commands::HealthCheck { output_json } => {
            let timeout = config.session.server_selection_timeout();
            let source = MongoStore::connect(&config.source_server, timeout).await?;
            let target = MongoStore::connect(&config.target_server, timeout).await?;
            let result = health_check(&source, &target).await;

            if output_json {
                println!("{}", result.to_json()?);
            } else {
                println!("Health Check Results:");
                wizard::print_endpoint(
                    "Source",
                    result.source_connected,
                    result.source_latency_ms,
                    &result.source_error,
                );
                if result.source_connected {
                    println!("    Databases: {}", result.source_databases);
                }
                wizard::print_endpoint(
                    "Target",
                    result.target_connected,
                    result.target_latency_ms,
                    &result.target_error,
                );
                if result.target_connected {
                    println!("    Databases: {}", result.target_databases);
                }
                println!(
                    "\n  Overall: {}",
                    if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
                );
            }

            if !result.healthy {
                let server = if result.source_connected {
                    target.label()
                } else {
                    source.label()
                };
                return Err(MoveError::connection(server, "health check failed"));
            }
        }
    }

    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
