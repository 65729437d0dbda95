//! Source to target collection mappings and the builder that pairs them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::{CollectionInfo, CollectionPool};
use crate::error::{MoveError, Result};

/// Correlation id of a mapping. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MappingId(u64);

impl MappingId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MappingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Copy status of a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CopyStatus {
    NotStarted,
    InProgress,
    Done,
    Failed,
}

impl CopyStatus {
    /// Done and Failed never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CopyStatus::Done | CopyStatus::Failed)
    }
}

impl fmt::Display for CopyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CopyStatus::NotStarted => "not started",
            CopyStatus::InProgress => "copying",
            CopyStatus::Done => "done",
            CopyStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A source collection paired with a target collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub id: MappingId,
    pub source: CollectionInfo,
    pub target: CollectionInfo,
    pub status: CopyStatus,
    pub error_detail: Option<String>,
    /// Progress ticks received while in progress; drives the spinner.
    pub ticks: u64,
    /// Documents copied, set once the copy succeeds.
    pub copied: Option<u64>,
}

impl Mapping {
    fn new(id: MappingId, source: CollectionInfo, target: CollectionInfo) -> Self {
        Self {
            id,
            source,
            target,
            status: CopyStatus::NotStarted,
            error_detail: None,
            ticks: 0,
            copied: None,
        }
    }
}

/// Builds mappings from pool picks.
///
/// A source pick waits in the pending slot until a target is picked. Every
/// collection is in exactly one place at a time: its pool, the pending slot,
/// or a mapping.
#[derive(Debug, Default)]
pub struct MappingBuilder {
    mappings: Vec<Mapping>,
    pending: Option<CollectionInfo>,
    next_id: u64,
}

impl MappingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    pub fn mappings_mut(&mut self) -> &mut [Mapping] {
        &mut self.mappings
    }

    pub fn pending(&self) -> Option<&CollectionInfo> {
        self.pending.as_ref()
    }

    pub fn get(&self, id: MappingId) -> Option<&Mapping> {
        self.mappings.iter().find(|m| m.id == id)
    }

    pub fn get_mut(&mut self, id: MappingId) -> Option<&mut Mapping> {
        self.mappings.iter_mut().find(|m| m.id == id)
    }

    /// Move the source entry at `index` into the pending slot.
    pub fn pick_source(&mut self, pool: &mut CollectionPool, index: usize) -> Result<()> {
        if let Some(pending) = &self.pending {
            return Err(MoveError::invalid_state(format!(
                "source {} is already waiting for a target",
                pending.name
            )));
        }
        self.pending = Some(pool.take(index)?);
        Ok(())
    }

    /// Pair the pending source with the target entry at `index`.
    pub fn pick_target(&mut self, pool: &mut CollectionPool, index: usize) -> Result<MappingId> {
        let Some(source) = self.pending.take() else {
            return Err(MoveError::invalid_state("no source collection picked"));
        };
        let target = match pool.take(index) {
            Ok(target) => target,
            Err(e) => {
                self.pending = Some(source);
                return Err(e);
            }
        };
        let id = self.fresh_id();
        self.mappings.push(Mapping::new(id, source, target));
        Ok(id)
    }

    /// Return the pending source, if any, to its pool.
    pub fn cancel_pending(&mut self, source_pool: &mut CollectionPool) -> Option<String> {
        let pending = self.pending.take()?;
        let name = pending.name.clone();
        source_pool.restore(pending);
        Some(name)
    }

    /// Remove a mapping that has not started and give both endpoints back.
    pub fn delete_mapping(
        &mut self,
        id: MappingId,
        source_pool: &mut CollectionPool,
        target_pool: &mut CollectionPool,
    ) -> Result<Mapping> {
        let index = self
            .mappings
            .iter()
            .position(|m| m.id == id)
            .ok_or(MoveError::NotFound(id))?;
        let status = self.mappings[index].status;
        if matches!(status, CopyStatus::InProgress | CopyStatus::Done) {
            return Err(MoveError::Precondition(format!(
                "mapping {} is {}",
                id, status
            )));
        }
        let mapping = self.mappings.remove(index);
        source_pool.restore(mapping.source.clone());
        target_pool.restore(mapping.target.clone());
        Ok(mapping)
    }

    /// Drop all mappings and the pending pick, keeping the id counter.
    pub fn reset(&mut self) {
        self.mappings.clear();
        self.pending = None;
    }

    fn fresh_id(&mut self) -> MappingId {
        self.next_id += 1;
        MappingId(self.next_id)
    }
}
