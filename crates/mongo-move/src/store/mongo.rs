//! MongoDB-backed document store.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::error::{Error as DriverError, ErrorKind};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use std::time::Duration;
use tracing::debug;

use super::{DocumentStore, DocumentStream};
use crate::config::redact_uri;
use crate::error::{MoveError, Result};

const APP_NAME: &str = "mongo-move";

/// Document store backed by a MongoDB client.
///
/// The client connects lazily; an unreachable server surfaces as a
/// [`MoveError::Connection`] on the first operation once the server selection
/// timeout elapses.
pub struct MongoStore {
    client: Client,
    label: String,
}

impl MongoStore {
    /// Build a client for the given connection string.
    pub async fn connect(uri: &str, server_selection_timeout: Duration) -> Result<Self> {
        let label = redact_uri(uri);
        let mut options = ClientOptions::parse(uri).await.map_err(|e| {
            if is_connection_error(&e) {
                MoveError::connection(&label, e.to_string())
            } else {
                MoveError::Config(format!("invalid connection string {}: {}", label, e))
            }
        })?;
        options.server_selection_timeout = Some(server_selection_timeout);
        options.app_name = Some(APP_NAME.to_string());

        let client =
            Client::with_options(options).map_err(|e| classify(&label, "creating client", e))?;
        debug!("Created client for {}", label);

        Ok(Self { client, label })
    }

    fn collection(&self, database: &str, collection: &str) -> Collection<Document> {
        self.client.database(database).collection(collection)
    }
}

/// Whether a driver error means the server itself could not be reached.
fn is_connection_error(err: &DriverError) -> bool {
    matches!(
        *err.kind,
        ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::ConnectionPoolCleared { .. }
    )
}

fn classify(label: &str, context: &str, err: DriverError) -> MoveError {
    if is_connection_error(&err) {
        MoveError::connection(label, err.to_string())
    } else {
        MoveError::query(context, err.to_string())
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn list_databases(&self) -> Result<Vec<String>> {
        self.client
            .list_database_names()
            .await
            .map_err(|e| classify(&self.label, "listing databases", e))
    }

    async fn list_collections(&self, database: &str) -> Result<Vec<String>> {
        self.client
            .database(database)
            .list_collection_names()
            .await
            .map_err(|e| classify(&self.label, &format!("listing collections in {}", database), e))
    }

    async fn count_documents(&self, database: &str, collection: &str) -> Result<i64> {
        let count = self
            .collection(database, collection)
            .count_documents(doc! {})
            .await
            .map_err(|e| {
                classify(
                    &self.label,
                    &format!("counting {}.{}", database, collection),
                    e,
                )
            })?;
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn delete_all(&self, database: &str, collection: &str) -> Result<u64> {
        let result = self
            .collection(database, collection)
            .delete_many(doc! {})
            .await
            .map_err(|e| {
                classify(
                    &self.label,
                    &format!("clearing {}.{}", database, collection),
                    e,
                )
            })?;
        Ok(result.deleted_count)
    }

    async fn find_all(&self, database: &str, collection: &str) -> Result<DocumentStream> {
        let namespace = format!("{}.{}", database, collection);
        let cursor = self
            .collection(database, collection)
            .find(doc! {})
            .await
            .map_err(|e| classify(&self.label, &format!("reading {}", namespace), e))?;

        let stream =
            cursor.map_err(move |e| MoveError::query(format!("reading {}", namespace), e.to_string()));
        Ok(Box::pin(stream))
    }

    async fn insert_one(
        &self,
        database: &str,
        collection: &str,
        document: Document,
    ) -> Result<()> {
        self.collection(database, collection)
            .insert_one(document)
            .await
            .map_err(|e| {
                classify(
                    &self.label,
                    &format!("inserting into {}.{}", database, collection),
                    e,
                )
            })?;
        Ok(())
    }

    fn label(&self) -> &str {
        &self.label
    }
}
