//! Event handling for the TUI.
//!
//! Handles keyboard input and tick events, converting them to AppEvents.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use mongo_move::Message;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::tui::logging::LogLine;

/// Application events that drive state changes.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Quit the application.
    Quit,

    /// Periodic tick for UI animation.
    Tick,

    /// Input or async result for the copy session.
    Session(Message),

    /// Reveal the freshly loaded lists (carries the load generation).
    Reveal(u64),

    /// Log line from tracing.
    Log(LogLine),

    /// Move the highlighted row.
    Up,
    Down,

    /// Change table page.
    PrevPage,
    NextPage,

    /// Select the highlighted row (space).
    Select,

    /// Begin typing a filter.
    StartFilter,

    /// Character input while filtering.
    FilterInput(char),

    /// Backspace while filtering.
    FilterBackspace,

    /// Keep the filter and leave filter input (Enter).
    ApplyFilter,

    /// Drop the filter and leave filter input (Esc).
    ClearFilter,

    /// Clear the filter or back out of a pending pick (Esc).
    Back,

    /// Switch between mapping and review (Tab).
    ToggleView,

    /// Start copying (Enter / s).
    StartCopy,

    /// Delete the highlighted mapping.
    DeleteMapping,

    /// Change rows per page.
    ShrinkPage,
    GrowPage,

    /// Toggle help overlay.
    ToggleHelp,

    /// Start over once copying is complete.
    Restart,
}

/// Event handler that polls for keyboard and tick events.
pub struct EventHandler {
    tx: mpsc::Sender<AppEvent>,
    tick_rate: Duration,
    filtering: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl EventHandler {
    /// Create a new event handler.
    pub fn new(
        tx: mpsc::Sender<AppEvent>,
        filtering: Arc<AtomicBool>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            tx,
            tick_rate: Duration::from_millis(100),
            filtering,
            cancel,
        }
    }

    /// Run the event handler loop.
    pub async fn run(self) {
        while !self.cancel.is_cancelled() {
            // Poll for crossterm events with timeout
            if event::poll(self.tick_rate).unwrap_or(false) {
                if let Ok(Event::Key(key)) = event::read() {
                    if let Some(app_event) = self.handle_key(key) {
                        if self.tx.send(app_event).await.is_err() {
                            break;
                        }
                    }
                }
            } else if self.tx.send(AppEvent::Tick).await.is_err() {
                break;
            }
        }
    }

    /// Convert a key event to an app event.
    fn handle_key(&self, key: KeyEvent) -> Option<AppEvent> {
        map_key(key, self.filtering.load(Ordering::Relaxed))
    }
}

/// Key map. Filter input captures printable keys.
pub fn map_key(key: KeyEvent, filtering: bool) -> Option<AppEvent> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(AppEvent::Quit),
            _ => None,
        };
    }

    if filtering {
        return match key.code {
            KeyCode::Esc => Some(AppEvent::ClearFilter),
            KeyCode::Enter => Some(AppEvent::ApplyFilter),
            KeyCode::Backspace => Some(AppEvent::FilterBackspace),
            KeyCode::Up => Some(AppEvent::Up),
            KeyCode::Down => Some(AppEvent::Down),
            KeyCode::Char(c) => Some(AppEvent::FilterInput(c)),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('q') => Some(AppEvent::Quit),
        KeyCode::Up | KeyCode::Char('k') => Some(AppEvent::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(AppEvent::Down),
        KeyCode::Left | KeyCode::Char('h') => Some(AppEvent::PrevPage),
        KeyCode::Right | KeyCode::Char('l') => Some(AppEvent::NextPage),
        KeyCode::Char(' ') => Some(AppEvent::Select),
        KeyCode::Char('/') => Some(AppEvent::StartFilter),
        KeyCode::Esc => Some(AppEvent::Back),
        KeyCode::Tab => Some(AppEvent::ToggleView),
        KeyCode::Enter | KeyCode::Char('s') => Some(AppEvent::StartCopy),
        KeyCode::Delete | KeyCode::Char('d') => Some(AppEvent::DeleteMapping),
        KeyCode::Char('u') => Some(AppEvent::ShrinkPage),
        KeyCode::Char('i') => Some(AppEvent::GrowPage),
        KeyCode::Char('?') => Some(AppEvent::ToggleHelp),
        KeyCode::Char('r') => Some(AppEvent::Restart),
        _ => None,
    }
}
