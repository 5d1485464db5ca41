//! Paginated transaction fetch with degraded-mode fallback
//!
//! Primary mode walks the gateway's cursor pagination until the last page.
//! When a page request itself fails, the fetcher logs the failure, issues
//! exactly one cursorless first-page request, appends whatever that returns,
//! and stops. A truncated result after upstream instability is accepted
//! behavior; the caller never sees an error.

use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, instrument};

use crate::classify;
use crate::gateway::{GatewayClient, TxEdge};
use crate::metrics;
use crate::protocol::Transaction;

/// Fetch the full transaction set for one block height
#[instrument(skip(gateway, page_delay))]
pub async fn fetch_block_transactions(
    gateway: &GatewayClient,
    height: u64,
    page_size: u32,
    page_delay: Duration,
) -> Vec<Transaction> {
    let mut edges: Vec<TxEdge> = Vec::new();
    let mut after: Option<String> = None;

    loop {
        let page = match gateway
            .transactions_page(height, after.as_deref(), page_size)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                error!(height, error = %e, "GraphQL page request failed, falling back to single page");
                metrics::record_page_fallback();

                match gateway.transactions_fallback_page(height, page_size).await {
                    Ok(fallback_edges) => edges.extend(fallback_edges),
                    Err(fb_err) => {
                        error!(height, error = %fb_err, "GraphQL fallback failed");
                    }
                }
                break;
            }
        };

        edges.extend(page.edges);

        let has_next = match page.page_info {
            Some(info) => {
                after = info.end_cursor;
                info.has_next_page && after.is_some()
            }
            None => false,
        };

        if !has_next {
            break;
        }

        // Be polite to the endpoint between pages.
        tokio::time::sleep(page_delay).await;
    }

    edges.into_iter().map(into_transaction).collect()
}

/// Fold a gateway edge into the client-facing transaction shape
fn into_transaction(edge: TxEdge) -> Transaction {
    let node = edge.node;

    // Later occurrences of a tag name overwrite earlier ones.
    let mut tags: HashMap<String, String> = HashMap::new();
    for tag in node.tags {
        tags.insert(tag.name, tag.value);
    }

    let style = classify::classify(&tags);

    Transaction {
        id: node.id,
        data_size: node.data.size.parse().unwrap_or(0),
        tags,
        content_category: style.category,
        content_color: style.color,
    }
}
