//! Catalog of selectable databases and collections.
//!
//! Database lists are fetched once per session and never change. Collection
//! pools shrink when an entry is picked for a mapping and grow again when the
//! entry is given back.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::{MoveError, Result};
use crate::store::DocumentStore;

/// A collection and its document count at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub record_count: i64,
}

impl CollectionInfo {
    pub fn new(name: impl Into<String>, record_count: i64) -> Self {
        Self {
            name: name.into(),
            record_count,
        }
    }
}

/// Ordered set of collections still available as mapping endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionPool {
    entries: Vec<CollectionInfo>,
}

impl CollectionPool {
    pub fn new(entries: Vec<CollectionInfo>) -> Self {
        Self { entries }
    }

    /// Remove and return the entry at `index`.
    ///
    /// An out-of-range index leaves the pool untouched.
    pub fn take(&mut self, index: usize) -> Result<CollectionInfo> {
        if index >= self.entries.len() {
            return Err(MoveError::invalid_state(format!(
                "no collection at index {} (pool has {})",
                index,
                self.entries.len()
            )));
        }
        Ok(self.entries.remove(index))
    }

    /// Give an entry back; it goes to the end of the pool.
    pub fn restore(&mut self, entry: CollectionInfo) {
        self.entries.push(entry);
    }

    pub fn get(&self, index: usize) -> Option<&CollectionInfo> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollectionInfo> {
        self.entries.iter()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }
}

/// Database names on each server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseLists {
    pub source: Vec<String>,
    pub target: Vec<String>,
}

/// Collection pools of the chosen source and target databases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionPools {
    pub source: CollectionPool,
    pub target: CollectionPool,
}

/// Loads database lists and collection pools from the two servers.
#[derive(Clone)]
pub struct Catalog {
    source: Arc<dyn DocumentStore>,
    target: Arc<dyn DocumentStore>,
}

impl Catalog {
    pub fn new(source: Arc<dyn DocumentStore>, target: Arc<dyn DocumentStore>) -> Self {
        Self { source, target }
    }

    /// Fetch the database names on both servers.
    ///
    /// Fails as a whole if either server cannot be listed.
    pub async fn load_databases(&self) -> Result<DatabaseLists> {
        let (source, target) =
            tokio::try_join!(self.source.list_databases(), self.target.list_databases())?;
        debug!(
            "Listed {} source and {} target databases",
            source.len(),
            target.len()
        );
        Ok(DatabaseLists { source, target })
    }

    /// Fetch the collections of the chosen databases together with their counts.
    pub async fn load_collections(
        &self,
        source_db: &str,
        target_db: &str,
    ) -> Result<CollectionPools> {
        let (source, target) = tokio::try_join!(
            load_pool(self.source.as_ref(), source_db),
            load_pool(self.target.as_ref(), target_db)
        )?;
        Ok(CollectionPools { source, target })
    }
}

async fn load_pool(store: &dyn DocumentStore, database: &str) -> Result<CollectionPool> {
    let names = store.list_collections(database).await?;
    let mut entries = Vec::with_capacity(names.len());
    for name in names {
        let record_count = store.count_documents(database, &name).await?;
        entries.push(CollectionInfo { name, record_count });
    }
    debug!(
        "Loaded {} collections from {} on {}",
        entries.len(),
        database,
        store.label()
    );
    Ok(CollectionPool::new(entries))
}
