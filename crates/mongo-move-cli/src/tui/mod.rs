//! Interactive terminal UI for mongo-move.
//!
//! Walks the user through choosing a source and target database, pairing
//! collections, reviewing the pairs and copying them concurrently, with
//! streaming log output underneath.

mod actions;
mod app;
mod events;
mod logging;
mod ui;
mod widgets;

use crate::tui::app::App;
use crate::tui::events::{AppEvent, EventHandler};
use crate::tui::logging::{LogLine, TuiLogLayer};
use crate::tui::ui::render;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use mongo_move::{Catalog, Config, DocumentStore, MongoStore, MoveError, TransferEngine};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::panic;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Type alias for the terminal backend.
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Setup the terminal for TUI mode.
pub fn setup_terminal() -> Result<Tui, MoveError> {
    enable_raw_mode()
        .map_err(|e| MoveError::Config(format!("Failed to enable raw mode: {}", e)))?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)
        .map_err(|e| MoveError::Config(format!("Failed to enter alternate screen: {}", e)))?;
    Terminal::new(CrosstermBackend::new(stdout))
        .map_err(|e| MoveError::Config(format!("Failed to create terminal: {}", e)))
}

/// Restore the terminal to normal mode.
pub fn restore_terminal(terminal: &mut Tui) -> Result<(), MoveError> {
    disable_raw_mode()
        .map_err(|e| MoveError::Config(format!("Failed to disable raw mode: {}", e)))?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .map_err(|e| MoveError::Config(format!("Failed to leave alternate screen: {}", e)))?;
    terminal
        .show_cursor()
        .map_err(|e| MoveError::Config(format!("Failed to show cursor: {}", e)))?;
    Ok(())
}

/// Install a panic hook that restores the terminal before panicking.
fn install_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));
}

/// Run the TUI application.
pub async fn run<P: AsRef<Path>>(config_path: P) -> Result<(), MoveError> {
    // Load config BEFORE setting up terminal so errors display properly
    let config = Config::load(config_path.as_ref())?;
    let timeout = config.session.server_selection_timeout();

    let source: Arc<dyn DocumentStore> =
        Arc::new(MongoStore::connect(&config.source_server, timeout).await?);
    let target: Arc<dyn DocumentStore> =
        Arc::new(MongoStore::connect(&config.target_server, timeout).await?);

    install_panic_hook();
    let mut terminal = setup_terminal()?;

    let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(100);
    let filtering = Arc::new(AtomicBool::new(false));
    let cancel = CancellationToken::new();

    // Route tracing into the log panel
    let (log_tx, mut log_rx) = mpsc::channel::<LogLine>(500);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mongo_move=debug"));
    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(TuiLogLayer::new(log_tx))
        .try_init()
    {
        eprintln!("Warning: Failed to set up TUI logging: {}", e);
    }

    let log_event_tx = event_tx.clone();
    tokio::spawn(async move {
        while let Some(line) = log_rx.recv().await {
            if log_event_tx.send(AppEvent::Log(line)).await.is_err() {
                break;
            }
        }
    });

    let mut app = App::new(
        config.session.clone(),
        Catalog::new(source.clone(), target.clone()),
        TransferEngine::new(source.clone(), target.clone()),
        source.label().to_string(),
        target.label().to_string(),
        event_tx.clone(),
        filtering.clone(),
        cancel.clone(),
    );

    let event_handler = EventHandler::new(event_tx, filtering, cancel.clone());
    tokio::spawn(async move {
        event_handler.run().await;
    });

    app.start();

    // Main event loop
    let result = loop {
        if let Err(e) = terminal.draw(|frame| render(frame, &app)) {
            break Err(MoveError::Io(e));
        }

        match event_rx.recv().await {
            Some(event) => match app.handle_event(event).await {
                Ok(true) => break Ok(()),
                Ok(false) => {}
                Err(e) => tracing::error!("{}", e),
            },
            None => break Ok(()),
        }
    };

    cancel.cancel();
    restore_terminal(&mut terminal)?;
    if result.is_ok() {
        println!("See you next time!");
    }
    result
}
