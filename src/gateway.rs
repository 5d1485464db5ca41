use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};

use crate::error::AppError;
use crate::metrics;

/// Client for communicating with the Arweave gateway (REST + GraphQL).
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
}

const TRANSACTIONS_QUERY: &str = r#"
query($min: Int!, $max: Int!, $after: String, $first: Int!) {
  transactions(block: {min: $min, max: $max}, sort: HEIGHT_ASC, first: $first, after: $after) {
    pageInfo { hasNextPage endCursor }
    edges { node { id data { size } tags { name value } } }
  }
}
"#;

const TRANSACTIONS_FALLBACK_QUERY: &str = r#"
query($min: Int!, $max: Int!, $first: Int!) {
  transactions(block: {min: $min, max: $max}, sort: HEIGHT_ASC, first: $first) {
    edges { node { id data { size } tags { name value } } }
  }
}
"#;

#[derive(Debug, Serialize)]
struct GraphQLRequest<V> {
    query: &'static str,
    variables: V,
}

#[derive(Debug, Deserialize)]
struct GraphQLResponse<D> {
    data: Option<D>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

#[derive(Debug, Serialize)]
struct PageVariables<'a> {
    min: u64,
    max: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    after: Option<&'a str>,
    first: u32,
}

#[derive(Debug, Deserialize)]
struct TransactionsData {
    transactions: Option<TransactionsPage>,
}

/// One page of the gateway's cursor-paginated transaction listing
#[derive(Debug, Default, Deserialize)]
pub struct TransactionsPage {
    #[serde(rename = "pageInfo", default)]
    pub page_info: Option<PageInfo>,
    #[serde(default)]
    pub edges: Vec<TxEdge>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageInfo {
    #[serde(rename = "hasNextPage")]
    pub has_next_page: bool,
    #[serde(rename = "endCursor", default)]
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TxEdge {
    pub node: TxNode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TxNode {
    pub id: String,
    pub data: TxData,
    #[serde(default)]
    pub tags: Vec<TagPair>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TxData {
    /// The gateway serializes data sizes as decimal strings
    pub size: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagPair {
    pub name: String,
    pub value: String,
}

/// Current chain state from the gateway's `/info` endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkInfo {
    pub height: u64,
}

/// Block metadata from `/block/height/{h}`
///
/// Only the fields the streamer inspects are typed; everything else is kept
/// and passed through to clients untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockRecord {
    pub timestamp: i64,
    pub height: u64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl GatewayClient {
    /// Create a new gateway client with the given base URL and timeout
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::internal_error(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Fetch the current network info (max height)
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn network_info(&self) -> Result<NetworkInfo, AppError> {
        let url = self.endpoint("info");

        let response = self.client.get(&url).send().await.map_err(|e| {
            metrics::record_gateway_request("info", false);
            error!(error = %e, "Failed to fetch network info");
            AppError::upstream_error(format!("Info request failed: {}", e))
        })?;

        if !response.status().is_success() {
            metrics::record_gateway_request("info", false);
            let status = response.status();
            error!(status = %status, "Gateway info returned error");
            return Err(AppError::upstream_error(format!(
                "Gateway returned {} for info",
                status
            )));
        }

        let info: NetworkInfo = response.json().await.map_err(|e| {
            metrics::record_gateway_request("info", false);
            error!(error = %e, "Failed to parse network info");
            AppError::upstream_error(format!("Invalid info response: {}", e))
        })?;

        metrics::record_gateway_request("info", true);
        debug!(height = info.height, "Fetched network info");
        Ok(info)
    }

    /// Fetch block metadata for a height
    ///
    /// A missing or invalid height is an error; callers treat it as
    /// skip-and-continue, not as fatal.
    #[instrument(skip(self))]
    pub async fn block_by_height(&self, height: u64) -> Result<BlockRecord, AppError> {
        let url = self.endpoint(&format!("block/height/{}", height));

        let response = self.client.get(&url).send().await.map_err(|e| {
            metrics::record_gateway_request("block", false);
            debug!(error = %e, height, "Block request failed");
            AppError::upstream_error(format!("Block request failed: {}", e))
        })?;

        if !response.status().is_success() {
            metrics::record_gateway_request("block", false);
            let status = response.status();
            debug!(status = %status, height, "Gateway block lookup returned error");
            return Err(AppError::upstream_error(format!(
                "Gateway returned {} for block {}",
                status, height
            )));
        }

        let block: BlockRecord = response.json().await.map_err(|e| {
            metrics::record_gateway_request("block", false);
            debug!(error = %e, height, "Failed to parse block record");
            AppError::upstream_error(format!("Invalid block response: {}", e))
        })?;

        metrics::record_gateway_request("block", true);
        Ok(block)
    }

    /// Fetch one page of the transaction listing for a single height
    ///
    /// A response without a `transactions` object is treated as an empty final
    /// page, ending pagination without triggering the fallback.
    #[instrument(skip(self, after))]
    pub async fn transactions_page(
        &self,
        height: u64,
        after: Option<&str>,
        first: u32,
    ) -> Result<TransactionsPage, AppError> {
        let page = self
            .graphql_transactions(
                TRANSACTIONS_QUERY,
                PageVariables {
                    min: height,
                    max: height,
                    after,
                    first,
                },
            )
            .await?;

        Ok(page)
    }

    /// Issue the single cursorless fallback request for a height
    #[instrument(skip(self))]
    pub async fn transactions_fallback_page(
        &self,
        height: u64,
        first: u32,
    ) -> Result<Vec<TxEdge>, AppError> {
        let page = self
            .graphql_transactions(
                TRANSACTIONS_FALLBACK_QUERY,
                PageVariables {
                    min: height,
                    max: height,
                    after: None,
                    first,
                },
            )
            .await?;

        Ok(page.edges)
    }

    async fn graphql_transactions(
        &self,
        query: &'static str,
        variables: PageVariables<'_>,
    ) -> Result<TransactionsPage, AppError> {
        let url = self.endpoint("graphql");

        let response = self
            .client
            .post(&url)
            .json(&GraphQLRequest { query, variables })
            .send()
            .await
            .map_err(|e| {
                metrics::record_gateway_request("graphql", false);
                error!(error = %e, "GraphQL request failed");
                AppError::upstream_error(format!("GraphQL request failed: {}", e))
            })?;

        if !response.status().is_success() {
            metrics::record_gateway_request("graphql", false);
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Gateway GraphQL returned error");
            return Err(AppError::upstream_error(format!(
                "Gateway returned {}: {}",
                status, body
            )));
        }

        let gql: GraphQLResponse<TransactionsData> = response.json().await.map_err(|e| {
            metrics::record_gateway_request("graphql", false);
            error!(error = %e, "Failed to parse GraphQL response");
            AppError::upstream_error(format!("Invalid GraphQL response: {}", e))
        })?;

        if let Some(errors) = gql.errors {
            metrics::record_gateway_request("graphql", false);
            let msg = errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(AppError::upstream_error(format!(
                "Gateway GraphQL error: {}",
                msg
            )));
        }

        metrics::record_gateway_request("graphql", true);

        Ok(gql
            .data
            .and_then(|data| data.transactions)
            .unwrap_or_default())
    }
}
