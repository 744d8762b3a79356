use chrono::{DateTime, Utc};
use reqwest::Url;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use grange_types::api::{
    MessageQuery, ReceiptCount, ReceiptStatus, SendMessageRequest, ThreadPatch,
};
use grange_types::models::{Message, Thread, UnreadMarker};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    Url(String),

    #[error("authorization token contains invalid characters")]
    Token,
}

/// Typed client for the cooperative backend's REST API. Holds a connection
/// pool with the bearer token installed as a default header.
#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: Url, token: &str) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let bearer =
            HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| ApiError::Token)?;
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self { base_url, client })
    }

    // -- Messages --

    /// The most recent `limit` messages of a thread, oldest first.
    pub async fn recent_messages(
        &self,
        thread_id: u64,
        limit: u32,
    ) -> Result<Vec<Message>, ApiError> {
        let query = MessageQuery { limit: Some(limit), ..Default::default() };
        self.get_json_with(&format!("api/v1/threads/{}/messages", thread_id), &query).await
    }

    /// Messages created strictly after the given watermark.
    pub async fn messages_after(
        &self,
        thread_id: u64,
        after: DateTime<Utc>,
    ) -> Result<Vec<Message>, ApiError> {
        let query = MessageQuery { after: Some(after), ..Default::default() };
        self.get_json_with(&format!("api/v1/threads/{}/messages", thread_id), &query).await
    }

    /// A page of messages created strictly before the given timestamp, for
    /// backward pagination.
    pub async fn messages_before(
        &self,
        thread_id: u64,
        before: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Message>, ApiError> {
        let query = MessageQuery {
            before: Some(before),
            limit: Some(limit),
            ..Default::default()
        };
        self.get_json_with(&format!("api/v1/threads/{}/messages", thread_id), &query).await
    }

    pub async fn send_message(
        &self,
        thread_id: u64,
        req: &SendMessageRequest,
    ) -> Result<Message, ApiError> {
        self.post_json(&format!("api/v1/threads/{}/messages", thread_id), req).await
    }

    pub async fn delete_message(&self, thread_id: u64, message_id: u64) -> Result<(), ApiError> {
        self.delete(&format!("api/v1/threads/{}/messages/{}", thread_id, message_id)).await
    }

    // -- Threads --

    pub async fn get_thread(&self, thread_id: u64) -> Result<Thread, ApiError> {
        self.get_json(&format!("api/v1/threads/{}", thread_id)).await
    }

    pub async fn list_threads(&self, group_id: u64) -> Result<Vec<Thread>, ApiError> {
        self.get_json(&format!("api/v1/groups/{}/threads", group_id)).await
    }

    pub async fn update_thread(
        &self,
        thread_id: u64,
        patch: &ThreadPatch,
    ) -> Result<Thread, ApiError> {
        let url = self.url(&format!("api/v1/threads/{}", thread_id))?;
        let res = self
            .client
            .patch(url)
            .json(patch)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    // -- Unread markers --

    /// All unread markers of the current user, across every group.
    pub async fn list_unread_markers(&self) -> Result<Vec<UnreadMarker>, ApiError> {
        self.get_json("api/v1/unread").await
    }

    pub async fn delete_unread_marker(&self, marker_id: &str) -> Result<(), ApiError> {
        self.delete(&format!("api/v1/unread/{}", marker_id)).await
    }

    // -- Read receipts --

    /// One-to-one threads: whether the recipient has read the caller's
    /// latest message.
    pub async fn receipt_read(&self, thread_id: u64) -> Result<ReceiptStatus, ApiError> {
        self.get_json(&format!("api/v1/threads/{}/receipt", thread_id)).await
    }

    /// Group threads: how many participants have read the caller's latest
    /// message.
    pub async fn receipt_read_count(&self, thread_id: u64) -> Result<ReceiptCount, ApiError> {
        self.get_json(&format!("api/v1/threads/{}/receipt/count", thread_id)).await
    }

    // -- Plumbing --

    pub(crate) fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url.join(path).map_err(|e| ApiError::Url(e.to_string()))
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.client
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path)?;
        let res = self.client.get(url).send().await?.error_for_status()?;
        Ok(res.json().await?)
    }

    async fn get_json_with<T: DeserializeOwned, Q: Serialize>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;
        let res = self
            .client
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path)?;
        let res = self
            .client
            .post(url)
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(res.json().await?)
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let url = self.url(path)?;
        self.client.delete(url).send().await?.error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://coop.example.org/").unwrap()
    }

    #[test]
    fn rejects_token_with_invalid_characters() {
        let result = ApiClient::new(base(), "bad\ntoken");
        assert!(matches!(result, Err(ApiError::Token)));
    }

    #[test]
    fn routes_join_against_base_url() {
        let client = ApiClient::new(base(), "token").unwrap();
        let url = client.url("api/v1/threads/9/messages").unwrap();
        assert_eq!(url.as_str(), "https://coop.example.org/api/v1/threads/9/messages");
    }
}
