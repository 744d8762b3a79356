use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::MessageBody;

// -- Messages --

/// Query parameters for the message listing endpoint. `before`/`after`
/// filter on creation time; `offset`/`limit` page within the filtered set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MessageQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub body: MessageBody,
}

// -- Threads --

/// Partial update for a thread; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ThreadPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

// -- Read receipts --

/// One-to-one threads: has the recipient read the caller's last message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReceiptStatus {
    pub read: bool,
}

/// Group threads: how many participants read the caller's last message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReceiptCount {
    pub count: u32,
}
