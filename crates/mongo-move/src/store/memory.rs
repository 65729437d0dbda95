//! In-process document store.
//!
//! Keeps databases and collections in insertion order so listings behave like
//! a real server's. Failure injection covers the cases the copy workflow must
//! survive: an unreachable server, a failing document count, and a read or
//! insert failing mid-stream.

use async_trait::async_trait;
use mongodb::bson::Document;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use super::{DocumentStore, DocumentStream};
use crate::error::{MoveError, Result};

type Collections = Vec<(String, Vec<Document>)>;

/// Document store held entirely in memory.
pub struct MemoryStore {
    label: String,
    databases: Mutex<Vec<(String, Collections)>>,
    unreachable: bool,
    fail_counts: bool,
    fail_reads_after: Option<usize>,
    fail_inserts_after: Option<usize>,
    inserts: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            databases: Mutex::new(Vec::new()),
            unreachable: false,
            fail_counts: false,
            fail_reads_after: None,
            fail_inserts_after: None,
            inserts: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// Create a store where every operation fails with a connection error.
    pub fn unreachable(label: impl Into<String>) -> Self {
        Self {
            unreachable: true,
            ..Self::new(label)
        }
    }

    /// Add (or extend) a collection with the given documents.
    pub fn with_collection(
        mut self,
        database: &str,
        collection: &str,
        documents: Vec<Document>,
    ) -> Self {
        let collections = entry(self.databases.get_mut(), database);
        entry(collections, collection).extend(documents);
        self
    }

    /// Make every `count_documents` call fail with a query error.
    pub fn fail_counts(mut self) -> Self {
        self.fail_counts = true;
        self
    }

    /// Make `find_all` streams yield an error after `n` documents.
    pub fn fail_reads_after(mut self, n: usize) -> Self {
        self.fail_reads_after = Some(n);
        self
    }

    /// Make every insert after the first `n` successful ones fail.
    pub fn fail_inserts_after(mut self, n: usize) -> Self {
        self.fail_inserts_after = Some(n);
        self
    }

    /// Snapshot of a collection's documents (empty when missing).
    pub async fn documents(&self, database: &str, collection: &str) -> Vec<Document> {
        let databases = self.databases.lock().await;
        find(&databases, database)
            .and_then(|collections| find(collections, collection))
            .cloned()
            .unwrap_or_default()
    }

    /// Number of `delete_all` calls received so far.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable {
            return Err(MoveError::connection(
                &self.label,
                "server selection timed out",
            ));
        }
        Ok(())
    }
}

fn find<'a, T>(entries: &'a [(String, T)], name: &str) -> Option<&'a T> {
    entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
}

fn entry<'a, T: Default>(entries: &'a mut Vec<(String, T)>, name: &str) -> &'a mut T {
    let index = match entries.iter().position(|(n, _)| n == name) {
        Some(index) => index,
        None => {
            entries.push((name.to_string(), T::default()));
            entries.len() - 1
        }
    };
    &mut entries[index].1
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_databases(&self) -> Result<Vec<String>> {
        self.check_reachable()?;
        let databases = self.databases.lock().await;
        Ok(databases.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn list_collections(&self, database: &str) -> Result<Vec<String>> {
        self.check_reachable()?;
        let databases = self.databases.lock().await;
        Ok(find(&databases, database)
            .map(|collections| collections.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default())
    }

    async fn count_documents(&self, database: &str, collection: &str) -> Result<i64> {
        self.check_reachable()?;
        if self.fail_counts {
            return Err(MoveError::query(
                format!("counting {}.{}", database, collection),
                "operation exceeded time limit",
            ));
        }
        let databases = self.databases.lock().await;
        let count = find(&databases, database)
            .and_then(|collections| find(collections, collection))
            .map(Vec::len)
            .unwrap_or(0);
        Ok(count as i64)
    }

    async fn delete_all(&self, database: &str, collection: &str) -> Result<u64> {
        self.check_reachable()?;
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut databases = self.databases.lock().await;
        let documents = entry(entry(&mut databases, database), collection);
        let deleted = documents.len() as u64;
        documents.clear();
        Ok(deleted)
    }

    async fn find_all(&self, database: &str, collection: &str) -> Result<DocumentStream> {
        self.check_reachable()?;
        let mut items: Vec<Result<Document>> = self
            .documents(database, collection)
            .await
            .into_iter()
            .map(Ok)
            .collect();
        if let Some(n) = self.fail_reads_after {
            items.truncate(n);
            items.push(Err(MoveError::query(
                format!("reading {}.{}", database, collection),
                "cursor killed",
            )));
        }
        Ok(Box::pin(futures::stream::iter(items)))
    }

    async fn insert_one(
        &self,
        database: &str,
        collection: &str,
        document: Document,
    ) -> Result<()> {
        self.check_reachable()?;
        let done = self.inserts.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_inserts_after {
            if done >= limit {
                return Err(MoveError::query(
                    format!("inserting into {}.{}", database, collection),
                    "connection reset by peer",
                ));
            }
        }
        let mut databases = self.databases.lock().await;
        entry(entry(&mut databases, database), collection).push(document);
        Ok(())
    }

    fn label(&self) -> &str {
        &self.label
    }
}
