use std::future::Future;

use chrono::{DateTime, Utc};

use grange_api::{ApiClient, ApiError};
use grange_types::api::{ReceiptCount, ReceiptStatus, SendMessageRequest};
use grange_types::models::{Message, Thread};

/// The slice of the REST surface a thread session talks to. Sessions are
/// written against this seam so tests can drive them with an in-memory
/// backend; production wiring uses [`ApiClient`].
pub trait Backend: Send + Sync + 'static {
    fn get_thread(
        &self,
        thread_id: u64,
    ) -> impl Future<Output = Result<Thread, ApiError>> + Send;

    fn recent_messages(
        &self,
        thread_id: u64,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Message>, ApiError>> + Send;

    fn messages_after(
        &self,
        thread_id: u64,
        after: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Message>, ApiError>> + Send;

    fn messages_before(
        &self,
        thread_id: u64,
        before: DateTime<Utc>,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<Message>, ApiError>> + Send;

    fn send_message(
        &self,
        thread_id: u64,
        req: &SendMessageRequest,
    ) -> impl Future<Output = Result<Message, ApiError>> + Send;

    fn delete_unread_marker(
        &self,
        marker_id: &str,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn receipt_read(
        &self,
        thread_id: u64,
    ) -> impl Future<Output = Result<ReceiptStatus, ApiError>> + Send;

    fn receipt_read_count(
        &self,
        thread_id: u64,
    ) -> impl Future<Output = Result<ReceiptCount, ApiError>> + Send;
}

impl Backend for ApiClient {
    async fn get_thread(&self, thread_id: u64) -> Result<Thread, ApiError> {
        ApiClient::get_thread(self, thread_id).await
    }

    async fn recent_messages(&self, thread_id: u64, limit: u32) -> Result<Vec<Message>, ApiError> {
        ApiClient::recent_messages(self, thread_id, limit).await
    }

    async fn messages_after(
        &self,
        thread_id: u64,
        after: DateTime<Utc>,
    ) -> Result<Vec<Message>, ApiError> {
        ApiClient::messages_after(self, thread_id, after).await
    }

    async fn messages_before(
        &self,
        thread_id: u64,
        before: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Message>, ApiError> {
        ApiClient::messages_before(self, thread_id, before, limit).await
    }

    async fn send_message(
        &self,
        thread_id: u64,
        req: &SendMessageRequest,
    ) -> Result<Message, ApiError> {
        ApiClient::send_message(self, thread_id, req).await
    }

    async fn delete_unread_marker(&self, marker_id: &str) -> Result<(), ApiError> {
        ApiClient::delete_unread_marker(self, marker_id).await
    }

    async fn receipt_read(&self, thread_id: u64) -> Result<ReceiptStatus, ApiError> {
        ApiClient::receipt_read(self, thread_id).await
    }

    async fn receipt_read_count(&self, thread_id: u64) -> Result<ReceiptCount, ApiError> {
        ApiClient::receipt_read_count(self, thread_id).await
    }
}
