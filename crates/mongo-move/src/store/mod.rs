//! Document store abstraction over a single server.
//!
//! [`DocumentStore`] is the only way the catalog and the transfer engine talk
//! to a database server. Two backends exist:
//!
//! - [`MongoStore`]: a real MongoDB deployment via the official driver
//! - [`MemoryStore`]: an in-process store with failure injection, used by tests

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use async_trait::async_trait;
use futures::stream::BoxStream;
use mongodb::bson::Document;

use crate::error::Result;

/// Stream of documents in server cursor order.
pub type DocumentStream = BoxStream<'static, Result<Document>>;

/// Access to the databases and collections of one server.
///
/// Implementations must be `Send + Sync`; a store is shared between the
/// catalog loader and every concurrently running copy.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List database names on the server.
    async fn list_databases(&self) -> Result<Vec<String>>;

    /// List collection names in a database, in listing order.
    async fn list_collections(&self, database: &str) -> Result<Vec<String>>;

    /// Count the documents in a collection.
    async fn count_documents(&self, database: &str, collection: &str) -> Result<i64>;

    /// Delete every document in a collection. Returns the number deleted.
    async fn delete_all(&self, database: &str, collection: &str) -> Result<u64>;

    /// Open a cursor over every document in a collection.
    async fn find_all(&self, database: &str, collection: &str) -> Result<DocumentStream>;

    /// Insert a single document.
    async fn insert_one(&self, database: &str, collection: &str, document: Document)
        -> Result<()>;

    /// Credential-free label identifying the server in logs and errors.
    fn label(&self) -> &str;
}
