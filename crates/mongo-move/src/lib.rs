//! # mongo-move
//!
//! Interactive collection copying between two MongoDB servers.
//!
//! The library holds everything except the terminal front end:
//!
//! - **Catalog** of selectable databases and collection pools per server
//! - **Mapping builder** pairing source and target collections with exclusive use
//! - **Session** state machine driving the guided workflow via messages and effects
//! - **Copy orchestration** correlating concurrent copy results by mapping id
//! - **Transfer engine** clearing a target collection and streaming documents across
//!
//! ## Example
//!
//! ```rust,no_run
//! use mongo_move::{Config, MongoStore, TransferEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> mongo_move::Result<()> {
//!     let config = Config::load("config.json")?;
//!     let timeout = config.session.server_selection_timeout();
//!     let source = Arc::new(MongoStore::connect(&config.source_server, timeout).await?);
//!     let target = Arc::new(MongoStore::connect(&config.target_server, timeout).await?);
//!     let engine = TransferEngine::new(source, target);
//!     let stats = engine.copy_collection("app", "users", "app", "users").await?;
//!     println!("Copied {} documents", stats.documents_copied);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod health;
pub mod mapping;
pub mod orchestrator;
pub mod session;
pub mod store;
pub mod transfer;

// Re-exports for convenient access
pub use catalog::{Catalog, CollectionInfo, CollectionPool, CollectionPools, DatabaseLists};
pub use config::{Config, SessionConfig};
pub use error::{MoveError, Result};
pub use health::{health_check, HealthCheckResult};
pub use mapping::{CopyStatus, Mapping, MappingBuilder, MappingId};
pub use orchestrator::{CopyOrchestrator, CopyOutcome, CopyRequest, Reconciled};
pub use session::{Effect, FatalError, Focus, Message, Session, Stage};
pub use store::{DocumentStore, MemoryStore, MongoStore};
pub use transfer::{TransferEngine, TransferStats};
