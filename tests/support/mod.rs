//! In-process mock Arweave gateway for integration tests
//!
//! Serves the three endpoints the service consumes (`/info`,
//! `/block/height/{h}`, `/graphql`) from scripted data, with switches for
//! failure injection and counters for asserting request behavior.

#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dayfeed::gateway::GatewayClient;
use dayfeed::stream::StreamContext;

/// Unix timestamp of 2023-05-01T00:00:00Z, the day most tests request
pub const DAY_START: i64 = 1_682_899_200;

pub const SECS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone)]
pub struct MockTx {
    pub id: String,
    pub size: u64,
    pub tags: Vec<(String, String)>,
}

impl MockTx {
    pub fn plain(id: &str) -> Self {
        Self {
            id: id.to_string(),
            size: 128,
            tags: vec![("Content-Type".to_string(), "text/plain".to_string())],
        }
    }

    pub fn image(id: &str) -> Self {
        Self {
            id: id.to_string(),
            size: 4096,
            tags: vec![("Content-Type".to_string(), "image/png".to_string())],
        }
    }
}

#[derive(Default)]
pub struct MockLedger {
    /// height -> block timestamp
    pub blocks: BTreeMap<u64, i64>,
    /// height -> transactions, in upstream order
    pub txs: HashMap<u64, Vec<MockTx>>,
    /// Claimed max height for `/info`; falls back to the highest block
    pub info_height: Option<u64>,
    pub fail_info: AtomicBool,
    pub fail_primary_pages: AtomicBool,
    pub fail_fallback_pages: AtomicBool,
    pub block_hits: AtomicUsize,
    pub primary_hits: AtomicUsize,
    pub fallback_hits: AtomicUsize,
    pub page_times: Mutex<Vec<Instant>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_block(mut self, height: u64, timestamp: i64) -> Self {
        self.blocks.insert(height, timestamp);
        self
    }

    pub fn with_txs(mut self, height: u64, txs: Vec<MockTx>) -> Self {
        self.txs.insert(height, txs);
        self
    }

    pub fn with_info_height(mut self, height: u64) -> Self {
        self.info_height = Some(height);
        self
    }

    fn max_height(&self) -> u64 {
        self.info_height
            .unwrap_or_else(|| self.blocks.keys().max().copied().unwrap_or(0))
    }
}

async fn info(State(ledger): State<Arc<MockLedger>>) -> Response {
    if ledger.fail_info.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "info unavailable").into_response();
    }

    Json(json!({
        "network": "mock.N.1",
        "height": ledger.max_height(),
    }))
    .into_response()
}

async fn block(
    State(ledger): State<Arc<MockLedger>>,
    Path(height): Path<u64>,
) -> Response {
    ledger.block_hits.fetch_add(1, Ordering::SeqCst);

    match ledger.blocks.get(&height) {
        Some(timestamp) => Json(json!({
            "timestamp": timestamp,
            "height": height,
            "indep_hash": format!("hash-{}", height),
        }))
        .into_response(),
        None => (StatusCode::NOT_FOUND, "block not found").into_response(),
    }
}

async fn graphql(State(ledger): State<Arc<MockLedger>>, Json(body): Json<Value>) -> Response {
    let query = body["query"].as_str().unwrap_or_default();
    let variables = &body["variables"];
    let height = variables["min"].as_u64().unwrap_or(0);
    let first = variables["first"].as_u64().unwrap_or(100) as usize;
    let after = variables["after"].as_str();

    // The primary query carries pageInfo; the degraded fallback does not.
    let primary = query.contains("pageInfo");

    if primary {
        ledger.primary_hits.fetch_add(1, Ordering::SeqCst);
        ledger.page_times.lock().unwrap().push(Instant::now());
        if ledger.fail_primary_pages.load(Ordering::SeqCst) {
            return (StatusCode::INTERNAL_SERVER_ERROR, "graphql unavailable").into_response();
        }
    } else {
        ledger.fallback_hits.fetch_add(1, Ordering::SeqCst);
        if ledger.fail_fallback_pages.load(Ordering::SeqCst) {
            return (StatusCode::INTERNAL_SERVER_ERROR, "graphql unavailable").into_response();
        }
    }

    let txs = ledger.txs.get(&height).cloned().unwrap_or_default();
    let offset = after.and_then(|c| c.parse::<usize>().ok()).unwrap_or(0);
    let page: Vec<&MockTx> = txs.iter().skip(offset).take(first).collect();
    let end = offset + page.len();

    let edges: Vec<Value> = page
        .iter()
        .map(|tx| {
            json!({
                "node": {
                    "id": tx.id,
                    "data": { "size": tx.size.to_string() },
                    "tags": tx.tags.iter()
                        .map(|(name, value)| json!({"name": name, "value": value}))
                        .collect::<Vec<_>>(),
                }
            })
        })
        .collect();

    let transactions = if primary {
        json!({
            "pageInfo": {
                "hasNextPage": end < txs.len(),
                "endCursor": if edges.is_empty() { Value::Null } else { json!(end.to_string()) },
            },
            "edges": edges,
        })
    } else {
        json!({ "edges": edges })
    };

    Json(json!({ "data": { "transactions": transactions } })).into_response()
}

/// Bind the mock gateway on an ephemeral port and return its base URL
pub async fn spawn_mock(ledger: Arc<MockLedger>) -> String {
    let app = Router::new()
        .route("/info", get(info))
        .route("/block/height/:height", get(block))
        .route("/graphql", post(graphql))
        .with_state(ledger);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock gateway");
    let addr = listener.local_addr().expect("mock gateway addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve mock gateway");
    });

    format!("http://{}", addr)
}

pub fn gateway(base_url: &str) -> GatewayClient {
    GatewayClient::new(base_url.to_string(), Duration::from_secs(5)).expect("gateway client")
}

/// Stream context with near-zero politeness delays for fast tests
pub fn test_ctx(gateway: GatewayClient) -> StreamContext {
    StreamContext {
        gateway,
        page_size: 100,
        probe_delay: Duration::ZERO,
        page_delay: Duration::ZERO,
        block_delay: Duration::from_millis(1),
        send_timeout: Duration::from_secs(5),
        visual_search_days: 7,
    }
}
