//! Copy orchestrator - dispatches one copy per mapping and reconciles results.
//!
//! Copies run as independent tokio tasks. Each task reports exactly one
//! [`CopyOutcome`] tagged with its mapping id; outcomes may arrive in any
//! order and are applied to the matching mapping only.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{MoveError, Result};
use crate::mapping::{CopyStatus, Mapping, MappingBuilder, MappingId};
use crate::transfer::{TransferEngine, TransferStats};

/// One collection copy to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRequest {
    pub id: MappingId,
    pub source_db: String,
    pub source_collection: String,
    pub target_db: String,
    pub target_collection: String,
}

/// Result of a copy, correlated by mapping id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOutcome {
    pub id: MappingId,
    pub result: std::result::Result<TransferStats, String>,
}

/// What applying an outcome did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    Done { id: MappingId, copied: u64 },
    Failed { id: MappingId, detail: String },
    /// No such mapping, or it was not in progress.
    Ignored,
}

/// Tracks whether the batch has been started and applies results.
#[derive(Debug, Default)]
pub struct CopyOrchestrator {
    started: bool,
}

impl CopyOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Mark every not-started mapping as in progress and build its request.
    ///
    /// Refused when the batch already started or there is nothing to copy.
    pub fn start(
        &mut self,
        builder: &mut MappingBuilder,
        source_db: &str,
        target_db: &str,
    ) -> Result<Vec<CopyRequest>> {
        if self.started {
            return Err(MoveError::invalid_state("copy already started"));
        }
        if builder.mappings().is_empty() {
            return Err(MoveError::invalid_state("no mappings to copy"));
        }
        self.started = true;

        let requests: Vec<CopyRequest> = builder
            .mappings_mut()
            .iter_mut()
            .filter(|m| m.status == CopyStatus::NotStarted)
            .map(|m| {
                m.status = CopyStatus::InProgress;
                m.ticks = 0;
                CopyRequest {
                    id: m.id,
                    source_db: source_db.to_string(),
                    source_collection: m.source.name.clone(),
                    target_db: target_db.to_string(),
                    target_collection: m.target.name.clone(),
                }
            })
            .collect();

        info!("Starting copy of {} collections", requests.len());
        Ok(requests)
    }

    /// Apply a copy outcome to its mapping.
    pub fn reconcile(&self, builder: &mut MappingBuilder, outcome: CopyOutcome) -> Reconciled {
        let Some(mapping) = builder.get_mut(outcome.id) else {
            warn!("Ignoring copy result for unknown mapping {}", outcome.id);
            return Reconciled::Ignored;
        };
        if mapping.status != CopyStatus::InProgress {
            warn!(
                "Ignoring copy result for mapping {} with status {}",
                mapping.id, mapping.status
            );
            return Reconciled::Ignored;
        }

        match outcome.result {
            Ok(stats) => {
                mapping.status = CopyStatus::Done;
                mapping.copied = Some(stats.documents_copied);
                info!(
                    "Mapping {} done: {} -> {} ({} documents)",
                    mapping.id, mapping.source.name, mapping.target.name, stats.documents_copied
                );
                Reconciled::Done {
                    id: mapping.id,
                    copied: stats.documents_copied,
                }
            }
            Err(detail) => {
                mapping.status = CopyStatus::Failed;
                mapping.error_detail = Some(detail.clone());
                warn!(
                    "Mapping {} failed: {} -> {}: {}",
                    mapping.id, mapping.source.name, mapping.target.name, detail
                );
                Reconciled::Failed {
                    id: mapping.id,
                    detail,
                }
            }
        }
    }

    /// Advance the progress tick of a mapping.
    ///
    /// Returns false once the mapping is no longer in progress; the tick is
    /// then dropped.
    pub fn tick(&self, builder: &mut MappingBuilder, id: MappingId) -> bool {
        match builder.get_mut(id) {
            Some(mapping) if mapping.status == CopyStatus::InProgress => {
                mapping.ticks += 1;
                true
            }
            _ => false,
        }
    }

    /// True when the batch has at least one mapping and all of them finished.
    pub fn is_batch_complete(&self, mappings: &[Mapping]) -> bool {
        !mappings.is_empty() && mappings.iter().all(|m| m.status.is_terminal())
    }

    /// Forget the batch so a new one can be started.
    pub fn reset(&mut self) {
        self.started = false;
    }
}

/// Run one copy as a tokio task and report its outcome on `tx`.
pub fn spawn_copy(
    engine: TransferEngine,
    request: CopyRequest,
    tx: mpsc::Sender<CopyOutcome>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(
            "Copy {} started: {}.{} -> {}.{}",
            request.id,
            request.source_db,
            request.source_collection,
            request.target_db,
            request.target_collection
        );
        let result = engine
            .copy_collection(
                &request.source_db,
                &request.source_collection,
                &request.target_db,
                &request.target_collection,
            )
            .await
            .map_err(|e| e.to_string());
        let outcome = CopyOutcome {
            id: request.id,
            result,
        };
        if tx.send(outcome).await.is_err() {
            debug!("Copy {} finished after receiver closed", request.id);
        }
    })
}
