//! Application state for the TUI.
//!
//! Follows the Elm architecture pattern:
//! - Model: App wraps the copy [`Session`] plus view state (tables, logs)
//! - Update: handle_event turns key presses and async results into session messages
//! - View: Separate ui module renders state to terminal
//!
//! Session effects run as spawned tokio tasks that report back through the
//! event channel, so every state change happens on the event loop.

use crate::tui::events::AppEvent;
use crate::tui::logging::LogLine;
use crate::tui::widgets::{SelectableTable, TableRow};
use mongo_move::orchestrator::spawn_copy;
use mongo_move::session::{CONTEXT_COLLECTIONS, CONTEXT_DATABASES};
use mongo_move::{
    Catalog, CopyOutcome, Effect, Focus, Message, MoveError, Session, SessionConfig, Stage,
    TransferEngine,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Maximum number of log lines to keep in memory.
const MAX_LOG_LINES: usize = 1000;

/// Which table receives navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveTable {
    Source,
    Target,
    Mappings,
}

/// Main application state.
pub struct App {
    /// The copy session.
    pub session: Session,

    /// Source databases, then source collections.
    pub source_table: SelectableTable,

    /// Target databases, then target collections.
    pub target_table: SelectableTable,

    /// Mappings under review.
    pub mapping_table: SelectableTable,

    /// Whether freshly loaded lists are shown yet.
    pub revealed: bool,

    /// Bumped on every load so stale reveals are ignored.
    reveal_generation: u64,

    /// UI tick counter for the loading spinner.
    pub spinner_tick: u64,

    /// Log output buffer (ring buffer).
    pub logs: VecDeque<LogLine>,

    /// Whether help overlay is shown.
    pub show_help: bool,

    /// Whether filter input is active (shared with event handler).
    pub filtering: Arc<AtomicBool>,

    /// Credential-free server labels for titles.
    pub source_label: String,
    pub target_label: String,

    /// When copying started / finished (to freeze the timer).
    pub copy_started_at: Option<Instant>,
    pub copy_finished_at: Option<Instant>,

    settings: SessionConfig,
    catalog: Catalog,
    engine: TransferEngine,

    /// Event sender for spawning background tasks.
    event_tx: mpsc::Sender<AppEvent>,

    /// Copy tasks report here; a forwarder relays into the event channel.
    copy_tx: mpsc::Sender<CopyOutcome>,

    /// Stops timers and the event handler on quit.
    cancel: CancellationToken,
}

impl App {
    /// Create the application. Must be called inside a tokio runtime.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: SessionConfig,
        catalog: Catalog,
        engine: TransferEngine,
        source_label: String,
        target_label: String,
        event_tx: mpsc::Sender<AppEvent>,
        filtering: Arc<AtomicBool>,
        cancel: CancellationToken,
    ) -> Self {
        let (copy_tx, mut copy_rx) = mpsc::channel::<CopyOutcome>(100);

        // Spawn copy result forwarder
        let forward_tx = event_tx.clone();
        tokio::spawn(async move {
            while let Some(outcome) = copy_rx.recv().await {
                let event = AppEvent::Session(Message::CopyFinished(outcome));
                if forward_tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        let page_size = settings.page_size;
        Self {
            session: Session::new(),
            source_table: SelectableTable::new("Source", vec!["Database"], page_size),
            target_table: SelectableTable::new("Target", vec!["Database"], page_size),
            mapping_table: SelectableTable::new(
                "Mappings",
                vec!["Source", "Target", "Status"],
                page_size,
            ),
            revealed: false,
            reveal_generation: 0,
            spinner_tick: 0,
            logs: VecDeque::with_capacity(MAX_LOG_LINES),
            show_help: false,
            filtering,
            source_label,
            target_label,
            copy_started_at: None,
            copy_finished_at: None,
            settings,
            catalog,
            engine,
            event_tx,
            copy_tx,
            cancel,
        }
    }

    /// Kick off the session's initial fetch.
    pub fn start(&mut self) {
        self.sync_tables();
        for effect in self.session.start() {
            self.run_effect(effect);
        }
    }

    /// Handle an application event. Returns true if the app should quit.
    pub async fn handle_event(&mut self, event: AppEvent) -> Result<bool, MoveError> {
        match event {
            AppEvent::Quit => {
                self.cancel.cancel();
                return Ok(true);
            }

            AppEvent::Tick => {
                self.spinner_tick = self.spinner_tick.wrapping_add(1);
            }

            AppEvent::Log(line) => self.add_log(line),

            AppEvent::Reveal(generation) => {
                if generation == self.reveal_generation {
                    self.revealed = true;
                }
            }

            AppEvent::Session(message) => self.dispatch(message),

            AppEvent::Up => self.with_active_table(SelectableTable::move_up),
            AppEvent::Down => self.with_active_table(SelectableTable::move_down),
            AppEvent::PrevPage => self.with_active_table(SelectableTable::prev_page),
            AppEvent::NextPage => self.with_active_table(SelectableTable::next_page),

            AppEvent::Select => self.select(),

            AppEvent::StartFilter => {
                if let Some(table) = self.active_table_mut() {
                    table.filtering = true;
                    self.filtering.store(true, Ordering::Relaxed);
                }
            }

            AppEvent::FilterInput(c) => self.with_active_table(|t| t.push_filter(c)),

            AppEvent::FilterBackspace => self.with_active_table(SelectableTable::pop_filter),

            AppEvent::ApplyFilter => {
                self.with_active_table(|t| t.filtering = false);
                self.filtering.store(false, Ordering::Relaxed);
            }

            AppEvent::ClearFilter => {
                self.with_active_table(|t| {
                    t.clear_filter();
                });
                self.filtering.store(false, Ordering::Relaxed);
            }

            AppEvent::Back => {
                if self.show_help {
                    self.show_help = false;
                } else if self.active_table_mut().is_some_and(|t| t.clear_filter()) {
                    // Filter cleared
                } else if self.session.pending().is_some() {
                    self.dispatch(Message::CancelPending);
                }
            }

            AppEvent::ToggleView => self.dispatch(Message::ToggleReview),

            AppEvent::StartCopy => self.dispatch(Message::StartCopy),

            AppEvent::DeleteMapping => {
                let id = self
                    .mapping_table
                    .selected_key()
                    .and_then(|key| self.session.mappings().get(key))
                    .map(|m| m.id);
                match id {
                    Some(id) if self.active_table() == Some(ActiveTable::Mappings) => {
                        self.dispatch(Message::DeleteMapping(id))
                    }
                    _ => debug!("No mapping highlighted to delete"),
                }
            }

            AppEvent::ShrinkPage => {
                let size = self.source_table.page_size().saturating_sub(1);
                self.set_page_size(size);
            }

            AppEvent::GrowPage => {
                let size = self.source_table.page_size() + 1;
                self.set_page_size(size);
            }

            AppEvent::ToggleHelp => self.show_help = !self.show_help,

            AppEvent::Restart => self.dispatch(Message::Restart),
        }
        Ok(false)
    }

    /// Apply a session message and run the effects it produces.
    fn dispatch(&mut self, message: Message) {
        let loaded = matches!(
            message,
            Message::DatabasesLoaded(_) | Message::CollectionsLoaded(_)
        );
        let before = self.session.stage();

        match self.session.update(message) {
            Ok(effects) => {
                if loaded {
                    self.schedule_reveal();
                }
                if self.session.stage() != before {
                    self.on_stage_change();
                }
                self.sync_tables();
                for effect in effects {
                    self.run_effect(effect);
                }
            }
            Err(e) if e.is_state_error() => debug!("Rejected action: {}", e),
            Err(e) => warn!("Action failed: {}", e),
        }
    }

    fn on_stage_change(&mut self) {
        self.filtering.store(false, Ordering::Relaxed);
        match self.session.stage() {
            Stage::ChoosingSourceDb => {
                self.revealed = false;
                self.copy_started_at = None;
                self.copy_finished_at = None;
                self.source_table.clear_filter();
                self.target_table.clear_filter();
            }
            Stage::LoadingCollections => {
                self.revealed = false;
                self.source_table.clear_filter();
                self.target_table.clear_filter();
            }
            Stage::CopyingInProgress => {
                self.copy_started_at = Some(Instant::now());
                self.copy_finished_at = None;
            }
            Stage::Complete => self.copy_finished_at = Some(Instant::now()),
            _ => {}
        }
    }

    /// Hide the lists for the reveal delay after a load.
    fn schedule_reveal(&mut self) {
        self.reveal_generation += 1;
        let delay = self.settings.reveal_delay();
        if delay.is_zero() {
            self.revealed = true;
            return;
        }
        self.revealed = false;
        self.send_later(delay, AppEvent::Reveal(self.reveal_generation));
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::FetchDatabases => {
                let catalog = self.catalog.clone();
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    let message = match catalog.load_databases().await {
                        Ok(lists) => Message::DatabasesLoaded(lists),
                        Err(e) => Message::LoadFailed {
                            context: CONTEXT_DATABASES.to_string(),
                            error: e.to_string(),
                        },
                    };
                    let _ = tx.send(AppEvent::Session(message)).await;
                });
            }

            Effect::FetchCollections {
                source_db,
                target_db,
            } => {
                let catalog = self.catalog.clone();
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    let message = match catalog.load_collections(&source_db, &target_db).await {
                        Ok(pools) => Message::CollectionsLoaded(pools),
                        Err(e) => Message::LoadFailed {
                            context: CONTEXT_COLLECTIONS.to_string(),
                            error: e.to_string(),
                        },
                    };
                    let _ = tx.send(AppEvent::Session(message)).await;
                });
            }

            Effect::Copy(request) => {
                spawn_copy(self.engine.clone(), request, self.copy_tx.clone());
            }

            Effect::ScheduleTick(id) => {
                self.send_later(
                    self.settings.tick_interval(),
                    AppEvent::Session(Message::Tick(id)),
                );
            }
        }
    }

    /// Deliver an event after a delay unless the app quits first.
    fn send_later(&self, delay: Duration, event: AppEvent) {
        let tx = self.event_tx.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = tx.send(event).await;
                }
            }
        });
    }

    /// Turn the highlighted row into a session pick.
    fn select(&mut self) {
        if !self.revealed {
            return;
        }
        let message = match self.active_table() {
            Some(ActiveTable::Source) => {
                let Some(key) = self.source_table.selected_key() else {
                    return;
                };
                match self.session.stage() {
                    Stage::ChoosingSourceDb => match self.session.databases().source.get(key) {
                        Some(name) => Message::ChooseSourceDatabase(name.clone()),
                        None => return,
                    },
                    _ => Message::PickSource(key),
                }
            }
            Some(ActiveTable::Target) => {
                let Some(key) = self.target_table.selected_key() else {
                    return;
                };
                match self.session.stage() {
                    Stage::ChoosingTargetDb => match self.session.databases().target.get(key) {
                        Some(name) => Message::ChooseTargetDatabase(name.clone()),
                        None => return,
                    },
                    _ => Message::PickTarget(key),
                }
            }
            Some(ActiveTable::Mappings) | None => return,
        };
        self.dispatch(message);
    }

    /// Table receiving navigation keys in the current stage.
    pub fn active_table(&self) -> Option<ActiveTable> {
        match (self.session.stage(), self.session.focus()) {
            (Stage::ChoosingSourceDb, _) => Some(ActiveTable::Source),
            (Stage::ChoosingTargetDb, _) => Some(ActiveTable::Target),
            (Stage::MappingCollections, Focus::SourceList) => Some(ActiveTable::Source),
            (Stage::MappingCollections, Focus::TargetList) => Some(ActiveTable::Target),
            (Stage::ReviewingMappings, _) => Some(ActiveTable::Mappings),
            _ => None,
        }
    }

    fn active_table_mut(&mut self) -> Option<&mut SelectableTable> {
        match self.active_table()? {
            ActiveTable::Source => Some(&mut self.source_table),
            ActiveTable::Target => Some(&mut self.target_table),
            ActiveTable::Mappings => Some(&mut self.mapping_table),
        }
    }

    fn with_active_table(&mut self, f: impl FnOnce(&mut SelectableTable)) {
        if let Some(table) = self.active_table_mut() {
            f(table);
        }
    }

    fn set_page_size(&mut self, size: usize) {
        for table in [
            &mut self.source_table,
            &mut self.target_table,
            &mut self.mapping_table,
        ] {
            table.set_page_size(size);
        }
    }

    /// Rebuild table rows from the session.
    fn sync_tables(&mut self) {
        let active = self.active_table();
        self.source_table.focused = active == Some(ActiveTable::Source);
        self.target_table.focused = active == Some(ActiveTable::Target);
        self.mapping_table.focused = active == Some(ActiveTable::Mappings);

        match self.session.stage() {
            Stage::ChoosingSourceDb | Stage::ChoosingTargetDb => {
                let databases = self.session.databases();
                self.source_table.set_headers(vec!["Database"]);
                self.target_table.set_headers(vec!["Database"]);
                self.source_table
                    .set_title(format!("Source databases ({})", self.source_label));
                self.target_table
                    .set_title(format!("Target databases ({})", self.target_label));
                self.source_table.set_rows(name_rows(&databases.source));
                self.target_table.set_rows(name_rows(&databases.target));
            }
            _ => {
                let pools = self.session.pools();
                let source_db = self.session.source_db().unwrap_or_default();
                let target_db = self.session.target_db().unwrap_or_default();
                self.source_table.set_headers(vec!["Collection", "Documents"]);
                self.target_table.set_headers(vec!["Collection", "Documents"]);
                self.source_table
                    .set_title(format!("Source collections ({})", source_db));
                self.target_table
                    .set_title(format!("Target collections ({})", target_db));
                self.source_table
                    .set_rows(collection_rows(pools.source.iter()));
                self.target_table
                    .set_rows(collection_rows(pools.target.iter()));
            }
        }

        let rows = self
            .session
            .mappings()
            .iter()
            .enumerate()
            .map(|(i, m)| {
                TableRow::new(
                    i,
                    vec![
                        m.source.name.clone(),
                        m.target.name.clone(),
                        m.status.to_string(),
                    ],
                )
            })
            .collect();
        self.mapping_table.set_rows(rows);
    }

    /// Add a log line.
    pub fn add_log(&mut self, line: LogLine) {
        if self.logs.len() >= MAX_LOG_LINES {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }

    /// Get elapsed copy time as Duration.
    pub fn elapsed(&self) -> Duration {
        match (self.copy_started_at, self.copy_finished_at) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// Format elapsed time as HH:MM:SS.
    pub fn elapsed_formatted(&self) -> String {
        let secs = self.elapsed().as_secs();
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        let secs = secs % 60;
        format!("{:02}:{:02}:{:02}", hours, mins, secs)
    }
}

/// Database rows sorted by name; keys stay indices into the session's list.
fn name_rows(names: &[String]) -> Vec<TableRow> {
    let mut rows: Vec<TableRow> = names
        .iter()
        .enumerate()
        .map(|(i, name)| TableRow::new(i, vec![name.clone()]))
        .collect();
    rows.sort_by(|a, b| a.cells[0].cmp(&b.cells[0]));
    rows
}

fn collection_rows<'a>(
    collections: impl Iterator<Item = &'a mongo_move::CollectionInfo>,
) -> Vec<TableRow> {
    collections
        .enumerate()
        .map(|(i, c)| TableRow::new(i, vec![c.name.clone(), c.record_count.to_string()]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongo_move::{CopyStatus, MemoryStore};
    use mongodb::bson::doc;

    fn settings(reveal_delay_ms: u64) -> SessionConfig {
        SessionConfig {
            reveal_delay_ms,
            tick_interval_ms: 10,
            ..SessionConfig::default()
        }
    }

    fn app(
        source: MemoryStore,
        target: MemoryStore,
        reveal_delay_ms: u64,
    ) -> (App, mpsc::Receiver<AppEvent>, Arc<MemoryStore>) {
        let source = Arc::new(source);
        let target = Arc::new(target);
        let (tx, rx) = mpsc::channel(100);
        let app = App::new(
            settings(reveal_delay_ms),
            Catalog::new(source.clone(), target.clone()),
            TransferEngine::new(source, target.clone()),
            "src".into(),
            "tgt".into(),
            tx,
            Arc::new(AtomicBool::new(false)),
            CancellationToken::new(),
        );
        (app, rx, target)
    }

    async fn pump_until(
        app: &mut App,
        rx: &mut mpsc::Receiver<AppEvent>,
        done: impl Fn(&App) -> bool,
    ) {
        while !done(app) {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("timed out waiting for event")
                .expect("event channel closed");
            app.handle_event(event).await.unwrap();
        }
    }

    async fn press(app: &mut App, events: &[AppEvent]) {
        for event in events {
            assert!(!app.handle_event(event.clone()).await.unwrap());
        }
    }

    fn shop() -> MemoryStore {
        MemoryStore::new("src")
            .with_collection("shop", "users", vec![doc! { "n": 1 }, doc! { "n": 2 }])
            .with_collection("shop", "orders", vec![doc! { "n": 3 }])
    }

    fn backup() -> MemoryStore {
        MemoryStore::new("tgt")
            .with_collection("backup", "users", vec![doc! { "old": true }])
            .with_collection("backup", "orders", Vec::new())
    }

    async fn reach_mapping(app: &mut App, rx: &mut mpsc::Receiver<AppEvent>) {
        app.start();
        pump_until(app, rx, |a| !a.session.databases().source.is_empty()).await;
        press(app, &[AppEvent::Select, AppEvent::Select]).await;
        pump_until(app, rx, |a| a.session.stage() == Stage::MappingCollections).await;
    }

    #[tokio::test]
    async fn test_full_flow_to_complete() {
        let (mut app, mut rx, target) = app(shop(), backup(), 0);
        reach_mapping(&mut app, &mut rx).await;
        assert_eq!(app.source_table.rows().len(), 2);
        assert_eq!(app.active_table(), Some(ActiveTable::Source));

        // Map users -> users, then orders -> orders (forces review)
        press(&mut app, &[AppEvent::Select, AppEvent::Select]).await;
        assert_eq!(app.session.mappings().len(), 1);
        press(&mut app, &[AppEvent::Select, AppEvent::Select]).await;
        assert_eq!(app.session.stage(), Stage::ReviewingMappings);
        assert_eq!(app.mapping_table.rows().len(), 2);

        press(&mut app, &[AppEvent::StartCopy]).await;
        assert_eq!(app.session.stage(), Stage::CopyingInProgress);
        assert!(app.copy_started_at.is_some());

        pump_until(&mut app, &mut rx, |a| a.session.stage() == Stage::Complete).await;
        assert!(app.copy_finished_at.is_some());
        assert!(app
            .session
            .mappings()
            .iter()
            .all(|m| m.status == CopyStatus::Done));
        assert_eq!(target.documents("backup", "users").await.len(), 2);
        assert_eq!(target.documents("backup", "orders").await.len(), 1);
    }

    #[tokio::test]
    async fn test_database_tables_sorted_by_name() {
        let source = MemoryStore::new("src")
            .with_collection("zeta", "a", vec![doc! { "n": 1 }])
            .with_collection("alpha", "b", vec![doc! { "n": 2 }]);
        let (mut app, mut rx, _) = app(source, backup(), 0);
        app.start();
        pump_until(&mut app, &mut rx, |a| !a.session.databases().source.is_empty()).await;

        let names: Vec<_> = app
            .source_table
            .visible()
            .iter()
            .map(|row| row.cells[0].clone())
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);

        press(&mut app, &[AppEvent::Select]).await;
        assert_eq!(app.session.source_db(), Some("alpha"));
    }

    #[tokio::test]
    async fn test_filter_selects_matching_row() {
        let (mut app, mut rx, _) = app(shop(), backup(), 0);
        reach_mapping(&mut app, &mut rx).await;

        press(&mut app, &[AppEvent::StartFilter]).await;
        assert!(app.filtering.load(Ordering::Relaxed));
        for c in "ord".chars() {
            press(&mut app, &[AppEvent::FilterInput(c)]).await;
        }
        press(&mut app, &[AppEvent::ApplyFilter, AppEvent::Select]).await;
        assert!(!app.filtering.load(Ordering::Relaxed));
        assert_eq!(app.session.pending().map(|c| c.name.as_str()), Some("orders"));
        assert_eq!(app.active_table(), Some(ActiveTable::Target));

        // Esc backs out of the pending pick
        press(&mut app, &[AppEvent::Back]).await;
        assert!(app.session.pending().is_none());
        assert_eq!(app.source_table.rows().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_from_review() {
        let (mut app, mut rx, _) = app(shop(), backup(), 0);
        reach_mapping(&mut app, &mut rx).await;
        press(
            &mut app,
            &[AppEvent::Select, AppEvent::Select, AppEvent::ToggleView],
        )
        .await;
        assert_eq!(app.session.stage(), Stage::ReviewingMappings);

        press(&mut app, &[AppEvent::DeleteMapping]).await;
        assert!(app.session.mappings().is_empty());
        assert_eq!(app.session.stage(), Stage::MappingCollections);
        assert_eq!(app.source_table.rows().len(), 2);
    }

    #[tokio::test]
    async fn test_select_ignored_until_revealed() {
        let (mut app, mut rx, _) = app(shop(), backup(), 60_000);
        app.start();
        pump_until(&mut app, &mut rx, |a| {
            !a.session.databases().source.is_empty()
        })
        .await;
        assert!(!app.revealed);

        press(&mut app, &[AppEvent::Select]).await;
        assert_eq!(app.session.stage(), Stage::ChoosingSourceDb);

        // A stale reveal is ignored
        press(&mut app, &[AppEvent::Reveal(0)]).await;
        assert!(!app.revealed);
        press(&mut app, &[AppEvent::Reveal(1)]).await;
        assert!(app.revealed);
    }

    #[tokio::test]
    async fn test_load_failure_is_fatal() {
        let (mut app, mut rx, _) = app(shop(), MemoryStore::unreachable("tgt"), 0);
        app.start();
        pump_until(&mut app, &mut rx, |a| a.session.fatal().is_some()).await;
        let fatal = app.session.fatal().unwrap();
        assert_eq!(fatal.context, CONTEXT_DATABASES);

        // Input is inert after a fatal error
        press(&mut app, &[AppEvent::Select, AppEvent::Restart]).await;
        assert!(app.session.fatal().is_some());
    }

    #[tokio::test]
    async fn test_quit_cancels_background_work() {
        let (mut app, _rx, _) = app(shop(), backup(), 0);
        let cancel = app.cancel.clone();
        assert!(app.handle_event(AppEvent::Quit).await.unwrap());
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_log_buffer_is_bounded() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let _guard = runtime.enter();
        let (mut app, _rx, _) = app(shop(), backup(), 0);
        for i in 0..(MAX_LOG_LINES + 5) {
            app.add_log(LogLine {
                level: tracing::Level::INFO,
                text: i.to_string(),
            });
        }
        assert_eq!(app.logs.len(), MAX_LOG_LINES);
        assert_eq!(app.logs.front().map(|l| l.text.as_str()), Some("5"));
    }
}
