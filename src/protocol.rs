//! WebSocket message types exchanged with clients
//!
//! All messages carry a `type` discriminator. Payload field names follow the
//! original wire format (`data_size`, `isVisual`), so existing frontends keep
//! working.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Client → server requests
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    /// Stream every block of the given day
    GetDay { date: String },
    /// Search backwards from the given day for visual content
    GetDayVisual { date: String },
}

/// Server → client messages
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "loadingStatus")]
    LoadingStatus { message: String },
    #[serde(rename = "newBlock")]
    NewBlock { data: StreamedBlock },
    #[serde(rename = "dayStreamComplete")]
    DayStreamComplete,
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerMessage {
    pub fn loading(message: impl Into<String>) -> Self {
        Self::LoadingStatus {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// One transaction of a streamed block
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: String,
    pub data_size: u64,
    /// Tag map folded from the gateway's ordered tag list, last value wins
    pub tags: HashMap<String, String>,
    #[serde(rename = "contentCategory")]
    pub content_category: &'static str,
    #[serde(rename = "contentColor")]
    pub content_color: u32,
}

/// The unit emitted to the client: one block plus its transactions
#[derive(Debug, Clone, Serialize)]
pub struct StreamedBlock {
    pub height: u64,
    pub timestamp: i64,
    /// Remaining gateway-supplied block fields, passed through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
    pub transactions: Vec<Transaction>,
    #[serde(rename = "isVisual")]
    pub is_visual: bool,
}
