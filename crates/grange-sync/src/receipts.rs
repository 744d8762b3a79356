use grange_api::ApiError;
use grange_types::models::{Thread, ThreadScope};

use crate::backend::Backend;

/// Whether the current user's latest message in a thread has been seen.
/// One-to-one threads report a flag, group threads a reader count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receipt {
    Direct { read: bool },
    Group { count: u32 },
}

/// Ask the endpoint matching the thread's scope. Callers only start polling
/// once the thread is known, so the scope is always available here.
pub async fn fetch_receipt<B: Backend>(backend: &B, thread: &Thread) -> Result<Receipt, ApiError> {
    match thread.scope {
        ThreadScope::Direct => {
            let status = backend.receipt_read(thread.id).await?;
            Ok(Receipt::Direct { read: status.read })
        }
        ThreadScope::Group => {
            let count = backend.receipt_read_count(thread.id).await?;
            Ok(Receipt::Group { count: count.count })
        }
    }
}
