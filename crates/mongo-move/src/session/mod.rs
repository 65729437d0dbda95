//! Session state machine for the guided copy workflow.
//!
//! [`Session::update`] is the only place session state changes. It takes one
//! [`Message`] at a time and returns the [`Effect`]s the caller must run
//! (fetches, copies, progress ticks). Effects report back as further messages,
//! so all mutation stays serialized in the single owner of the session.
//!
//! A rejected message returns an error and leaves the session untouched.

use std::fmt;
use tracing::{debug, info};

use crate::catalog::{CollectionInfo, CollectionPools, DatabaseLists};
use crate::error::{MoveError, Result};
use crate::mapping::{Mapping, MappingBuilder, MappingId};
use crate::orchestrator::{CopyOrchestrator, CopyOutcome, CopyRequest, Reconciled};

/// Step of the guided workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ChoosingSourceDb,
    ChoosingTargetDb,
    LoadingCollections,
    MappingCollections,
    ReviewingMappings,
    CopyingInProgress,
    Complete,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::ChoosingSourceDb => "Choose source database",
            Stage::ChoosingTargetDb => "Choose target database",
            Stage::LoadingCollections => "Loading collections",
            Stage::MappingCollections => "Map collections",
            Stage::ReviewingMappings => "Review mappings",
            Stage::CopyingInProgress => "Copying",
            Stage::Complete => "Complete",
        };
        f.write_str(s)
    }
}

/// Which list receives selection input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    SourceList,
    TargetList,
    MappingList,
}

/// Error that halted the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalError {
    pub text: String,
    /// What the session was doing, e.g. "getting databases".
    pub context: String,
}

/// Input to the session: user actions and async results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    DatabasesLoaded(DatabaseLists),
    CollectionsLoaded(CollectionPools),
    LoadFailed { context: String, error: String },
    ChooseSourceDatabase(String),
    ChooseTargetDatabase(String),
    /// Pick the source pool entry at this index.
    PickSource(usize),
    /// Pick the target pool entry at this index.
    PickTarget(usize),
    CancelPending,
    ToggleReview,
    DeleteMapping(MappingId),
    StartCopy,
    CopyFinished(CopyOutcome),
    Tick(MappingId),
    Restart,
}

/// Work the session asks its owner to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchDatabases,
    FetchCollections { source_db: String, target_db: String },
    Copy(CopyRequest),
    /// Deliver `Message::Tick(id)` after one tick interval.
    ScheduleTick(MappingId),
}

/// Fetch contexts used in fatal errors.
pub const CONTEXT_DATABASES: &str = "getting databases";
pub const CONTEXT_COLLECTIONS: &str = "getting collections";

/// State of one interactive copy session.
#[derive(Debug)]
pub struct Session {
    stage: Stage,
    focus: Focus,
    databases: DatabaseLists,
    source_db: Option<String>,
    target_db: Option<String>,
    pools: CollectionPools,
    builder: MappingBuilder,
    orchestrator: CopyOrchestrator,
    fatal: Option<FatalError>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            stage: Stage::ChoosingSourceDb,
            focus: Focus::SourceList,
            databases: DatabaseLists::default(),
            source_db: None,
            target_db: None,
            pools: CollectionPools::default(),
            builder: MappingBuilder::new(),
            orchestrator: CopyOrchestrator::new(),
            fatal: None,
        }
    }

    /// Effects to run when the session begins.
    pub fn start(&self) -> Vec<Effect> {
        info!("Session started: {}", self.stage);
        vec![Effect::FetchDatabases]
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn databases(&self) -> &DatabaseLists {
        &self.databases
    }

    pub fn source_db(&self) -> Option<&str> {
        self.source_db.as_deref()
    }

    pub fn target_db(&self) -> Option<&str> {
        self.target_db.as_deref()
    }

    pub fn pools(&self) -> &CollectionPools {
        &self.pools
    }

    pub fn mappings(&self) -> &[Mapping] {
        self.builder.mappings()
    }

    pub fn pending(&self) -> Option<&CollectionInfo> {
        self.builder.pending()
    }

    pub fn fatal(&self) -> Option<&FatalError> {
        self.fatal.as_ref()
    }

    pub fn is_batch_complete(&self) -> bool {
        self.orchestrator.is_batch_complete(self.builder.mappings())
    }

    /// Apply one message.
    ///
    /// After a fatal error every message is ignored.
    pub fn update(&mut self, message: Message) -> Result<Vec<Effect>> {
        if self.fatal.is_some() {
            debug!("Session halted, ignoring {:?}", message);
            return Ok(Vec::new());
        }

        match message {
            Message::DatabasesLoaded(lists) => {
                self.expect_stage(Stage::ChoosingSourceDb)?;
                info!(
                    "Databases loaded: {} source, {} target",
                    lists.source.len(),
                    lists.target.len()
                );
                self.databases = lists;
                Ok(Vec::new())
            }

            Message::LoadFailed { context, error } => {
                info!("Session halted while {}: {}", context, error);
                self.fatal = Some(FatalError {
                    text: error,
                    context,
                });
                Ok(Vec::new())
            }

            Message::ChooseSourceDatabase(name) => {
                self.expect_stage(Stage::ChoosingSourceDb)?;
                if !self.databases.source.contains(&name) {
                    return Err(MoveError::invalid_state(format!(
                        "source database {} is not listed",
                        name
                    )));
                }
                self.source_db = Some(name);
                self.enter(Stage::ChoosingTargetDb);
                Ok(Vec::new())
            }

            Message::ChooseTargetDatabase(name) => {
                self.expect_stage(Stage::ChoosingTargetDb)?;
                if !self.databases.target.contains(&name) {
                    return Err(MoveError::invalid_state(format!(
                        "target database {} is not listed",
                        name
                    )));
                }
                let source_db = self.source_db.clone().unwrap_or_default();
                self.target_db = Some(name.clone());
                self.enter(Stage::LoadingCollections);
                Ok(vec![Effect::FetchCollections {
                    source_db,
                    target_db: name,
                }])
            }

            Message::CollectionsLoaded(pools) => {
                self.expect_stage(Stage::LoadingCollections)?;
                info!(
                    "Collections loaded: {} source, {} target",
                    pools.source.len(),
                    pools.target.len()
                );
                self.pools = pools;
                self.enter(Stage::MappingCollections);
                Ok(Vec::new())
            }

            Message::PickSource(index) => {
                self.expect_stage(Stage::MappingCollections)?;
                self.expect_focus(Focus::SourceList)?;
                self.builder.pick_source(&mut self.pools.source, index)?;
                self.focus = Focus::TargetList;
                Ok(Vec::new())
            }

            Message::PickTarget(index) => {
                self.expect_stage(Stage::MappingCollections)?;
                self.expect_focus(Focus::TargetList)?;
                let id = self.builder.pick_target(&mut self.pools.target, index)?;
                debug!("Created mapping {}", id);
                if self.pools.target.is_empty() || self.pools.source.is_empty() {
                    self.enter(Stage::ReviewingMappings);
                } else {
                    self.focus = Focus::SourceList;
                }
                Ok(Vec::new())
            }

            Message::CancelPending => {
                self.expect_stage(Stage::MappingCollections)?;
                match self.builder.cancel_pending(&mut self.pools.source) {
                    Some(name) => {
                        debug!("Returned {} to the source pool", name);
                        self.focus = Focus::SourceList;
                        Ok(Vec::new())
                    }
                    None => Err(MoveError::invalid_state("no source collection picked")),
                }
            }

            Message::ToggleReview => match self.stage {
                Stage::ReviewingMappings => {
                    self.enter(Stage::MappingCollections);
                    Ok(Vec::new())
                }
                Stage::MappingCollections => {
                    if self.focus != Focus::SourceList {
                        return Err(MoveError::invalid_state(
                            "finish the pending mapping before reviewing",
                        ));
                    }
                    if self.builder.mappings().is_empty() {
                        return Err(MoveError::invalid_state("no mappings to review"));
                    }
                    self.enter(Stage::ReviewingMappings);
                    Ok(Vec::new())
                }
                other => Err(MoveError::invalid_state(format!(
                    "cannot toggle review while in {}",
                    other
                ))),
            },

            Message::DeleteMapping(id) => {
                self.expect_stage(Stage::ReviewingMappings)?;
                let removed = self.builder.delete_mapping(
                    id,
                    &mut self.pools.source,
                    &mut self.pools.target,
                )?;
                debug!(
                    "Deleted mapping {}: {} -> {}",
                    removed.id, removed.source.name, removed.target.name
                );
                if self.builder.mappings().is_empty() {
                    self.enter(Stage::MappingCollections);
                }
                Ok(Vec::new())
            }

            Message::StartCopy => {
                self.expect_stage(Stage::ReviewingMappings)?;
                let source_db = self.source_db.clone().unwrap_or_default();
                let target_db = self.target_db.clone().unwrap_or_default();
                let requests = self
                    .orchestrator
                    .start(&mut self.builder, &source_db, &target_db)?;
                self.enter(Stage::CopyingInProgress);

                let mut effects = Vec::with_capacity(requests.len() * 2);
                for request in requests {
                    effects.push(Effect::ScheduleTick(request.id));
                    effects.push(Effect::Copy(request));
                }
                Ok(effects)
            }

            Message::CopyFinished(outcome) => {
                if let Reconciled::Ignored = self.orchestrator.reconcile(&mut self.builder, outcome)
                {
                    return Ok(Vec::new());
                }
                if self.stage == Stage::CopyingInProgress && self.is_batch_complete() {
                    self.enter(Stage::Complete);
                }
                Ok(Vec::new())
            }

            Message::Tick(id) => {
                if self.orchestrator.tick(&mut self.builder, id) {
                    Ok(vec![Effect::ScheduleTick(id)])
                } else {
                    Ok(Vec::new())
                }
            }

            Message::Restart => {
                self.expect_stage(Stage::Complete)?;
                self.databases = DatabaseLists::default();
                self.source_db = None;
                self.target_db = None;
                self.pools = CollectionPools::default();
                self.builder.reset();
                self.orchestrator.reset();
                self.enter(Stage::ChoosingSourceDb);
                Ok(vec![Effect::FetchDatabases])
            }
        }
    }

    fn enter(&mut self, stage: Stage) {
        info!("Stage: {} -> {}", self.stage, stage);
        self.stage = stage;
        self.focus = match stage {
            Stage::ReviewingMappings | Stage::CopyingInProgress | Stage::Complete => {
                Focus::MappingList
            }
            _ => Focus::SourceList,
        };
    }

    fn expect_stage(&self, stage: Stage) -> Result<()> {
        if self.stage != stage {
            return Err(MoveError::invalid_state(format!(
                "expected stage {}, session is in {}",
                stage, self.stage
            )));
        }
        Ok(())
    }

    fn expect_focus(&self, focus: Focus) -> Result<()> {
        if self.focus != focus {
            return Err(MoveError::invalid_state(format!(
                "expected focus {:?}, focus is {:?}",
                focus, self.focus
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CollectionPool};
    use crate::mapping::CopyStatus;
    use crate::store::MemoryStore;
    use crate::transfer::TransferEngine;
    use mongodb::bson::{doc, Document};
    use proptest::prelude::*;
    use std::collections::VecDeque;
    use std::sync::Arc;

    fn docs(n: i32) -> Vec<Document> {
        (0..n).map(|i| doc! {"i": i}).collect()
    }

    struct Harness {
        session: Session,
        catalog: Catalog,
        engine: TransferEngine,
        target: Arc<MemoryStore>,
    }

    impl Harness {
        fn new(source: MemoryStore, target: MemoryStore) -> Self {
            let source = Arc::new(source);
            let target = Arc::new(target);
            Self {
                session: Session::new(),
                catalog: Catalog::new(source.clone(), target.clone()),
                engine: TransferEngine::new(source, target.clone()),
                target,
            }
        }

        /// Scenario A/B servers.
        fn scenario() -> Self {
            let source = MemoryStore::new("source")
                .with_collection("app", "users", docs(120))
                .with_collection("app", "logs", vec![]);
            let target = MemoryStore::new("target")
                .with_collection("backup", "users", docs(5))
                .with_collection("backup", "archive", docs(2));
            Self::new(source, target)
        }

        /// Run effects to completion; ticks are delivered once each.
        async fn run(&mut self, effects: Vec<Effect>) {
            let mut queue: VecDeque<Effect> = effects.into();
            while let Some(effect) = queue.pop_front() {
                let message = match effect {
                    Effect::FetchDatabases => match self.catalog.load_databases().await {
                        Ok(lists) => Message::DatabasesLoaded(lists),
                        Err(e) => Message::LoadFailed {
                            context: CONTEXT_DATABASES.into(),
                            error: e.to_string(),
                        },
                    },
                    Effect::FetchCollections {
                        source_db,
                        target_db,
                    } => match self.catalog.load_collections(&source_db, &target_db).await {
                        Ok(pools) => Message::CollectionsLoaded(pools),
                        Err(e) => Message::LoadFailed {
                            context: CONTEXT_COLLECTIONS.into(),
                            error: e.to_string(),
                        },
                    },
                    Effect::Copy(request) => {
                        let result = self
                            .engine
                            .copy_collection(
                                &request.source_db,
                                &request.source_collection,
                                &request.target_db,
                                &request.target_collection,
                            )
                            .await
                            .map_err(|e| e.to_string());
                        Message::CopyFinished(CopyOutcome {
                            id: request.id,
                            result,
                        })
                    }
                    Effect::ScheduleTick(_) => continue,
                };
                let more = self.session.update(message).unwrap();
                queue.extend(more);
            }
        }

        async fn choose_databases(&mut self, source: &str, target: &str) {
            let start = self.session.start();
            self.run(start).await;
            self.session
                .update(Message::ChooseSourceDatabase(source.into()))
                .unwrap();
            let effects = self
                .session
                .update(Message::ChooseTargetDatabase(target.into()))
                .unwrap();
            self.run(effects).await;
        }

        fn source_index(&self, name: &str) -> usize {
            self.session
                .pools()
                .source
                .iter()
                .position(|c| c.name == name)
                .unwrap()
        }

        fn target_index(&self, name: &str) -> usize {
            self.session
                .pools()
                .target
                .iter()
                .position(|c| c.name == name)
                .unwrap()
        }

        fn map(&mut self, source: &str, target: &str) {
            let s = self.source_index(source);
            self.session.update(Message::PickSource(s)).unwrap();
            let t = self.target_index(target);
            self.session.update(Message::PickTarget(t)).unwrap();
        }
    }

    #[tokio::test]
    async fn test_database_and_collection_loading() {
        let mut h = Harness::scenario();
        h.choose_databases("app", "backup").await;

        assert_eq!(h.session.stage(), Stage::MappingCollections);
        assert_eq!(h.session.focus(), Focus::SourceList);
        assert_eq!(h.session.source_db(), Some("app"));
        assert_eq!(h.session.target_db(), Some("backup"));
        let users = h.session.pools().source.get(0).unwrap();
        assert_eq!((users.name.as_str(), users.record_count), ("users", 120));
    }

    #[tokio::test]
    async fn test_unlisted_database_rejected() {
        let mut h = Harness::scenario();
        let start = h.session.start();
        h.run(start).await;
        assert!(h
            .session
            .update(Message::ChooseSourceDatabase("nope".into()))
            .is_err());
        assert_eq!(h.session.stage(), Stage::ChoosingSourceDb);
    }

    #[tokio::test]
    async fn test_scenario_a_copy_replaces_target() {
        let mut h = Harness::scenario();
        h.choose_databases("app", "backup").await;
        h.map("users", "users");
        h.session.update(Message::ToggleReview).unwrap();

        let effects = h.session.update(Message::StartCopy).unwrap();
        assert_eq!(h.session.stage(), Stage::CopyingInProgress);
        h.run(effects).await;

        assert_eq!(h.session.stage(), Stage::Complete);
        let mapping = &h.session.mappings()[0];
        assert_eq!(mapping.status, CopyStatus::Done);
        assert_eq!(mapping.copied, Some(120));
        assert_eq!(h.target.delete_calls(), 1);
        assert_eq!(h.target.documents("backup", "users").await, docs(120));
    }

    #[tokio::test]
    async fn test_scenario_b_empty_source_fails_mapping() {
        let mut h = Harness::scenario();
        h.choose_databases("app", "backup").await;
        h.map("logs", "archive");
        h.session.update(Message::ToggleReview).unwrap();
        let effects = h.session.update(Message::StartCopy).unwrap();
        h.run(effects).await;

        let mapping = &h.session.mappings()[0];
        assert_eq!(mapping.status, CopyStatus::Failed);
        assert!(mapping
            .error_detail
            .as_deref()
            .unwrap()
            .contains("no records in source collection app.logs"));
        assert_eq!(h.target.delete_calls(), 0);
        assert_eq!(h.target.documents("backup", "archive").await.len(), 2);
        assert_eq!(h.session.stage(), Stage::Complete);
    }

    #[tokio::test]
    async fn test_scenario_c_cancel_pending_restores_source() {
        let mut h = Harness::scenario();
        h.choose_databases("app", "backup").await;
        let users = h.source_index("users");
        h.session.update(Message::PickSource(users)).unwrap();
        assert_eq!(h.session.focus(), Focus::TargetList);
        assert!(!h.session.pools().source.contains("users"));

        h.session.update(Message::CancelPending).unwrap();
        assert!(h.session.pending().is_none());
        assert!(h.session.pools().source.contains("users"));
        assert_eq!(h.session.pools().source.len(), 2);
        assert_eq!(h.session.focus(), Focus::SourceList);
        assert!(h.session.update(Message::CancelPending).is_err());
    }

    #[tokio::test]
    async fn test_scenario_d_reverse_completion_order() {
        let source = MemoryStore::new("source")
            .with_collection("app", "a", docs(3))
            .with_collection("app", "b", docs(4))
            .with_collection("app", "c", docs(1));
        let target = MemoryStore::new("target")
            .with_collection("bk", "x", vec![])
            .with_collection("bk", "y", vec![])
            .with_collection("bk", "z", vec![]);
        let mut h = Harness::new(source, target);
        h.choose_databases("app", "bk").await;
        h.map("a", "x");
        h.map("b", "y");
        h.session.update(Message::ToggleReview).unwrap();

        let effects = h.session.update(Message::StartCopy).unwrap();
        let requests: Vec<CopyRequest> = effects
            .into_iter()
            .filter_map(|e| match e {
                Effect::Copy(request) => Some(request),
                _ => None,
            })
            .collect();
        assert_eq!(requests.len(), 2);

        for request in requests.iter().rev() {
            let stats = h
                .engine
                .copy_collection(
                    &request.source_db,
                    &request.source_collection,
                    &request.target_db,
                    &request.target_collection,
                )
                .await
                .map_err(|e| e.to_string());
            h.session
                .update(Message::CopyFinished(CopyOutcome {
                    id: request.id,
                    result: stats,
                }))
                .unwrap();
        }

        let copied: Vec<_> = h.session.mappings().iter().map(|m| m.copied).collect();
        assert_eq!(copied, vec![Some(3), Some(4)]);
        assert_eq!(h.session.stage(), Stage::Complete);
    }

    #[tokio::test]
    async fn test_forced_review_when_target_pool_empties() {
        let source = MemoryStore::new("source")
            .with_collection("app", "a", docs(1))
            .with_collection("app", "b", docs(1));
        let target = MemoryStore::new("target").with_collection("bk", "x", vec![]);
        let mut h = Harness::new(source, target);
        h.choose_databases("app", "bk").await;
        h.map("a", "x");
        assert_eq!(h.session.stage(), Stage::ReviewingMappings);
        assert_eq!(h.session.focus(), Focus::MappingList);
    }

    #[tokio::test]
    async fn test_forced_review_when_source_pool_empties() {
        let source = MemoryStore::new("source").with_collection("app", "a", docs(1));
        let target = MemoryStore::new("target")
            .with_collection("bk", "x", vec![])
            .with_collection("bk", "y", vec![]);
        let mut h = Harness::new(source, target);
        h.choose_databases("app", "bk").await;
        h.map("a", "x");
        assert_eq!(h.session.stage(), Stage::ReviewingMappings);
        assert_eq!(h.session.pools().target.len(), 1);
    }

    #[tokio::test]
    async fn test_toggle_review_rules() {
        let mut h = Harness::scenario();
        h.choose_databases("app", "backup").await;
        assert!(h.session.update(Message::ToggleReview).is_err());

        h.map("users", "users");
        let logs = h.source_index("logs");
        h.session.update(Message::PickSource(logs)).unwrap();
        assert!(h.session.update(Message::ToggleReview).is_err());
        assert_eq!(h.session.stage(), Stage::MappingCollections);

        h.session.update(Message::CancelPending).unwrap();
        h.session.update(Message::ToggleReview).unwrap();
        assert_eq!(h.session.stage(), Stage::ReviewingMappings);
        h.session.update(Message::ToggleReview).unwrap();
        assert_eq!(h.session.stage(), Stage::MappingCollections);
        assert_eq!(h.session.focus(), Focus::SourceList);
    }

    #[tokio::test]
    async fn test_deleting_last_mapping_leaves_review() {
        let mut h = Harness::scenario();
        h.choose_databases("app", "backup").await;
        h.map("users", "users");
        h.session.update(Message::ToggleReview).unwrap();
        let id = h.session.mappings()[0].id;

        h.session.update(Message::DeleteMapping(id)).unwrap();
        assert_eq!(h.session.stage(), Stage::MappingCollections);
        assert_eq!(h.session.pools().source.len(), 2);
        assert_eq!(h.session.pools().target.len(), 2);
        assert!(matches!(
            h.session.update(Message::DeleteMapping(id)),
            Err(MoveError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_no_toggle_or_delete_while_copying() {
        let mut h = Harness::scenario();
        h.choose_databases("app", "backup").await;
        h.map("users", "users");
        h.session.update(Message::ToggleReview).unwrap();
        let effects = h.session.update(Message::StartCopy).unwrap();
        assert!(effects.contains(&Effect::ScheduleTick(h.session.mappings()[0].id)));

        let id = h.session.mappings()[0].id;
        assert!(h.session.update(Message::ToggleReview).is_err());
        assert!(h.session.update(Message::DeleteMapping(id)).is_err());
        assert!(h.session.update(Message::StartCopy).is_err());
        assert_eq!(h.session.stage(), Stage::CopyingInProgress);
    }

    #[tokio::test]
    async fn test_ticks_reschedule_until_done() {
        let mut h = Harness::scenario();
        h.choose_databases("app", "backup").await;
        h.map("users", "users");
        h.session.update(Message::ToggleReview).unwrap();
        h.session.update(Message::StartCopy).unwrap();
        let id = h.session.mappings()[0].id;

        assert_eq!(
            h.session.update(Message::Tick(id)).unwrap(),
            vec![Effect::ScheduleTick(id)]
        );
        h.session
            .update(Message::CopyFinished(CopyOutcome {
                id,
                result: Ok(Default::default()),
            }))
            .unwrap();
        assert!(h.session.update(Message::Tick(id)).unwrap().is_empty());
        assert_eq!(h.session.mappings()[0].ticks, 1);
    }

    #[tokio::test]
    async fn test_fatal_error_halts_session() {
        let source = MemoryStore::new("source").with_collection("app", "a", docs(1));
        let mut h = Harness::new(source, MemoryStore::unreachable("target"));
        let start = h.session.start();
        h.run(start).await;

        let fatal = h.session.fatal().unwrap();
        assert_eq!(fatal.context, CONTEXT_DATABASES);
        assert!(fatal.text.contains("target"));
        assert!(h
            .session
            .update(Message::ChooseSourceDatabase("app".into()))
            .unwrap()
            .is_empty());
        assert_eq!(h.session.stage(), Stage::ChoosingSourceDb);
    }

    #[tokio::test]
    async fn test_collection_load_failure_halts_session() {
        let source = MemoryStore::new("source")
            .with_collection("app", "a", docs(1))
            .fail_counts();
        let target = MemoryStore::new("target").with_collection("bk", "x", vec![]);
        let mut h = Harness::new(source, target);
        h.choose_databases("app", "bk").await;

        let fatal = h.session.fatal().unwrap().clone();
        assert_eq!(fatal.context, CONTEXT_COLLECTIONS);
        assert!(fatal.text.contains("counting app.a"));
        assert_eq!(h.session.stage(), Stage::LoadingCollections);

        let late = Message::CollectionsLoaded(CollectionPools::default());
        assert!(h.session.update(late).unwrap().is_empty());
        assert!(h.session.update(Message::PickSource(0)).unwrap().is_empty());
        assert_eq!(h.session.stage(), Stage::LoadingCollections);
        assert_eq!(h.session.fatal(), Some(&fatal));
    }

    #[tokio::test]
    async fn test_restart_keeps_ids_unique() {
        let mut h = Harness::scenario();
        h.choose_databases("app", "backup").await;
        h.map("users", "users");
        h.session.update(Message::ToggleReview).unwrap();
        let effects = h.session.update(Message::StartCopy).unwrap();
        h.run(effects).await;
        let first = h.session.mappings()[0].id;
        assert!(h.session.is_batch_complete());

        let effects = h.session.update(Message::Restart).unwrap();
        assert_eq!(effects, vec![Effect::FetchDatabases]);
        assert_eq!(h.session.stage(), Stage::ChoosingSourceDb);
        assert!(h.session.mappings().is_empty());
        h.run(effects).await;
        h.session
            .update(Message::ChooseSourceDatabase("app".into()))
            .unwrap();
        let effects = h
            .session
            .update(Message::ChooseTargetDatabase("backup".into()))
            .unwrap();
        h.run(effects).await;
        h.map("users", "archive");
        assert_ne!(h.session.mappings()[0].id, first);
    }

    #[derive(Debug, Clone)]
    enum Action {
        PickSource(usize),
        PickTarget(usize),
        Cancel,
        Toggle,
        Delete(usize),
    }

    fn action() -> impl Strategy<Value = Action> {
        prop_oneof![
            (0..6usize).prop_map(Action::PickSource),
            (0..6usize).prop_map(Action::PickTarget),
            Just(Action::Cancel),
            Just(Action::Toggle),
            (0..4usize).prop_map(Action::Delete),
        ]
    }

    fn mapping_session(source: &[&str], target: &[&str]) -> Session {
        let mut session = Session::new();
        let lists = DatabaseLists {
            source: vec!["s".into()],
            target: vec!["t".into()],
        };
        session.update(Message::DatabasesLoaded(lists)).unwrap();
        session
            .update(Message::ChooseSourceDatabase("s".into()))
            .unwrap();
        session
            .update(Message::ChooseTargetDatabase("t".into()))
            .unwrap();
        let pool = |names: &[&str]| {
            CollectionPool::new(names.iter().map(|n| CollectionInfo::new(*n, 1)).collect())
        };
        session
            .update(Message::CollectionsLoaded(CollectionPools {
                source: pool(source),
                target: pool(target),
            }))
            .unwrap();
        session
    }

    fn sorted(names: impl Iterator<Item = String>) -> Vec<String> {
        let mut names: Vec<String> = names.collect();
        names.sort();
        names
    }

    proptest! {
        #[test]
        fn test_pool_exclusivity(actions in prop::collection::vec(action(), 0..40)) {
            let source = ["a", "b", "c", "d"];
            let target = ["w", "x", "y", "z", "v"];
            let mut session = mapping_session(&source, &target);

            for action in actions {
                let message = match action {
                    Action::PickSource(i) => Message::PickSource(i),
                    Action::PickTarget(i) => Message::PickTarget(i),
                    Action::Cancel => Message::CancelPending,
                    Action::Toggle => Message::ToggleReview,
                    Action::Delete(k) => {
                        let mappings = session.mappings();
                        let id = if mappings.is_empty() {
                            MappingId::new(1000)
                        } else {
                            mappings[k % mappings.len()].id
                        };
                        Message::DeleteMapping(id)
                    }
                };
                let _ = session.update(message);

                let sources = sorted(
                    session.pools().source.iter().map(|c| c.name.clone())
                        .chain(session.pending().map(|c| c.name.clone()))
                        .chain(session.mappings().iter().map(|m| m.source.name.clone())),
                );
                let targets = sorted(
                    session.pools().target.iter().map(|c| c.name.clone())
                        .chain(session.mappings().iter().map(|m| m.target.name.clone())),
                );
                prop_assert_eq!(sources, sorted(source.iter().map(|s| s.to_string())));
                prop_assert_eq!(targets, sorted(target.iter().map(|s| s.to_string())));

                let mut ids: Vec<_> = session.mappings().iter().map(|m| m.id).collect();
                let before = ids.len();
                ids.dedup();
                prop_assert_eq!(ids.len(), before);
            }
        }
    }
}
