//! Error types for the bridge.
//!
//! [`IngestError`] covers payloads that are dropped at the listener.
//! [`BridgeError`] covers the startup and serving failures that end the
//! process.

/// Why an inbound payload was rejected.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The payload bytes are not valid UTF-8.
    #[error("payload is not utf-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),

    /// The payload is not parseable JSON.
    #[error("malformed json: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The payload is JSON, but not an object.
    #[error("expected a json object, got {0}")]
    NotAnObject(&'static str),
}

/// Fatal bridge errors.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The configuration is unusable.
    #[error("config error: {0}")]
    Config(String),

    /// The initial broker connection failed.
    #[error("connect error: {0}")]
    Connect(String),

    /// The broker refused or never confirmed the subscription.
    #[error("subscribe error: {0}")]
    Subscribe(String),

    /// Failed to bind the http listener.
    #[error("bind error: {0}")]
    Bind(String),

    /// The http server stopped with an error.
    #[error("serve error: {0}")]
    Serve(String),
}
