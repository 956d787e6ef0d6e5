// ABOUTME: Error types for session streams and resize negotiation
// Neither kind is ever propagated to the registry; callers log or render them inline

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Stream is read-only")]
    ReadOnly,

    #[error("Stream already closed")]
    Closed,

    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

#[derive(Debug, Error)]
pub enum ResizeError {
    #[error("Invalid resize endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Resize request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Resize rejected with status {0}")]
    Rejected(u16),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("Unsupported stream scheme: {0} (expected ws or wss)")]
    UnsupportedScheme(String),

    #[error("Invalid API host {host}: {reason}")]
    InvalidHost { host: String, reason: String },
}
