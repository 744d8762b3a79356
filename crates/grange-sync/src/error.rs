use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] grange_api::ApiError),

    /// The session task has already shut down.
    #[error("thread session is closed")]
    Closed,
}
