//! Transfer engine: copies one collection from the source server to the target.

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::error::{MoveError, Result};
use crate::store::DocumentStore;

/// Statistics from one collection copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStats {
    /// Documents removed from the target before copying.
    pub documents_deleted: u64,

    /// Documents inserted into the target.
    pub documents_copied: u64,

    /// Wall time of the whole copy.
    pub duration: Duration,
}

/// Copies collections between two stores.
#[derive(Clone)]
pub struct TransferEngine {
    source: Arc<dyn DocumentStore>,
    target: Arc<dyn DocumentStore>,
}

impl TransferEngine {
    pub fn new(source: Arc<dyn DocumentStore>, target: Arc<dyn DocumentStore>) -> Self {
        Self { source, target }
    }

    /// Replace the contents of the target collection with the source's documents.
    ///
    /// An empty source fails before the target is touched. Otherwise the target
    /// is cleared and documents are inserted one at a time in cursor order; the
    /// first failed read or insert aborts the copy and leaves whatever was
    /// already inserted in place.
    pub async fn copy_collection(
        &self,
        source_db: &str,
        source_coll: &str,
        target_db: &str,
        target_coll: &str,
    ) -> Result<TransferStats> {
        let start = Instant::now();

        let count = self.source.count_documents(source_db, source_coll).await?;
        if count == 0 {
            return Err(MoveError::EmptySource {
                database: source_db.to_string(),
                collection: source_coll.to_string(),
            });
        }

        let documents_deleted = self.target.delete_all(target_db, target_coll).await?;
        debug!(
            "Cleared {} documents from {}.{}",
            documents_deleted, target_db, target_coll
        );

        let mut cursor = self
            .source
            .find_all(source_db, source_coll)
            .await
            .map_err(|e| MoveError::transfer(source_coll, e.to_string()))?;

        let mut documents_copied = 0u64;
        while let Some(document) = cursor.next().await {
            let document = document.map_err(|e| MoveError::transfer(source_coll, e.to_string()))?;
            self.target
                .insert_one(target_db, target_coll, document)
                .await
                .map_err(|e| MoveError::transfer(target_coll, e.to_string()))?;
            documents_copied += 1;
        }

        let stats = TransferStats {
            documents_deleted,
            documents_copied,
            duration: start.elapsed(),
        };
        info!(
            "Copied {}.{} -> {}.{}: {} documents in {:?}",
            source_db, source_coll, target_db, target_coll, documents_copied, stats.duration
        );
        Ok(stats)
    }
}
