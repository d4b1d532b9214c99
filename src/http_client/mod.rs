//! Pooled, retrying HTTP clients used by the webhook-based channel senders.

mod client;
mod pool;

pub use client::create_retryable_http_client;
pub use pool::{HttpClientPool, HttpClientPoolError};
