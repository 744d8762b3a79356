mod conn;
mod hub;

pub use conn::{PushConfig, run, spawn};
pub use hub::{NoticeSink, PushHub};
