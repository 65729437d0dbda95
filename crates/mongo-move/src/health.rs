//! Reachability check of both servers.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::Result;
use crate::store::DocumentStore;

/// Outcome of listing databases on the source and target servers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub source_connected: bool,
    pub source_latency_ms: u64,
    pub source_databases: usize,
    pub source_error: Option<String>,
    pub target_connected: bool,
    pub target_latency_ms: u64,
    pub target_databases: usize,
    pub target_error: Option<String>,
    pub healthy: bool,
}

impl HealthCheckResult {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

struct Probe {
    connected: bool,
    latency_ms: u64,
    databases: usize,
    error: Option<String>,
}

async fn probe(store: &dyn DocumentStore) -> Probe {
    let start = Instant::now();
    let result = store.list_databases().await;
    let latency_ms = start.elapsed().as_millis() as u64;
    match result {
        Ok(names) => Probe {
            connected: true,
            latency_ms,
            databases: names.len(),
            error: None,
        },
        Err(e) => Probe {
            connected: false,
            latency_ms,
            databases: 0,
            error: Some(e.to_string()),
        },
    }
}

/// List databases on both servers concurrently and time each call.
pub async fn health_check(
    source: &dyn DocumentStore,
    target: &dyn DocumentStore,
) -> HealthCheckResult {
    let (source, target) = tokio::join!(probe(source), probe(target));
    HealthCheckResult {
        healthy: source.connected && target.connected,
        source_connected: source.connected,
        source_latency_ms: source.latency_ms,
        source_databases: source.databases,
        source_error: source.error,
        target_connected: target.connected,
        target_latency_ms: target.latency_ms,
        target_databases: target.databases,
        target_error: target.error,
    }
}
