//! Per-connection stream session registry
//!
//! Each WebSocket connection has at most one producing stream at a time. A
//! new stream request cancels the previous stream's token before handing out
//! a fresh one, and connection close cancels whatever is still running.
//! Cancellation is cooperative: stream tasks poll the token, so an in-flight
//! gateway call completes before the loop observes the cancellation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::metrics;

/// Registry of active stream tokens keyed by connection id
#[derive(Clone, Default)]
pub struct StreamSessions {
    active: Arc<RwLock<HashMap<u64, CancellationToken>>>,
    next_conn_id: Arc<AtomicU64>,
}

impl StreamSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id for a newly accepted connection
    pub fn next_conn_id(&self) -> u64 {
        self.next_conn_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Begin a stream for a connection, superseding any active one
    ///
    /// Cancels the previous token before inserting the replacement, so the
    /// old stream ceases emitting before the new one starts producing.
    pub async fn begin(&self, conn_id: u64) -> CancellationToken {
        let mut active = self.active.write().await;

        if let Some(previous) = active.remove(&conn_id) {
            previous.cancel();
            metrics::record_stream_replaced();
            info!(conn_id, "Superseded active stream");
        }

        let token = CancellationToken::new();
        active.insert(conn_id, token.clone());
        token
    }

    /// Cancel and drop the session for a closed connection
    pub async fn close(&self, conn_id: u64) {
        let mut active = self.active.write().await;

        if let Some(token) = active.remove(&conn_id) {
            token.cancel();
            info!(conn_id, "Stream session closed");
        } else {
            debug!(conn_id, "No active stream for closed connection");
        }
    }

    /// Cancel every active stream (for graceful shutdown)
    pub async fn cancel_all(&self) {
        let mut active = self.active.write().await;
        let count = active.len();

        for (conn_id, token) in active.drain() {
            token.cancel();
            debug!(conn_id, "Stream cancelled during shutdown");
        }

        info!(count, "All stream sessions cancelled");
    }
}
