mod client;
mod files;

pub use client::{ApiClient, ApiError};
pub use files::FileContent;
