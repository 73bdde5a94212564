//! ==============================================================================
//! server.rs - http endpoint for the latest reading
//! ==============================================================================
//!
//! purpose:
//!     serves the stored reading verbatim as json. the browser client lives on
//!     another origin, so every response carries a wildcard cors header.
//!
//! relationships:
//!     - reads: domain.rs (ReadingStore)
//!     - started by: main.rs
//!
//! ==============================================================================

use crate::config::HttpConfig;
use crate::domain::ReadingStore;
use crate::error::BridgeError;
use axum::{extract::State, http::header, response::IntoResponse, routing::any, Router};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tracing::info;

pub fn build_router(store: ReadingStore, config: &HttpConfig) -> Router {
    Router::new()
        .route(&config.path, any(reading_handler))
        .layer(CorsLayer::permissive())
        .with_state(store)
}

pub async fn run_server(store: ReadingStore, config: &HttpConfig) -> Result<(), BridgeError> {
    let addr: SocketAddr = format!("{}:{}", config.listen_address, config.port)
        .parse()
        .map_err(|e| BridgeError::Bind(format!("invalid address: {e}")))?;

    let app = build_router(store, config);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| BridgeError::Bind(format!("bind failed on {addr}: {e}")))?;

    info!(%addr, path = %config.path, "http server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| BridgeError::Serve(e.to_string()))
}

/// latest reading, always 200
async fn reading_handler(State(store): State<ReadingStore>) -> impl IntoResponse {
    let body = store.snapshot().await;
    ([(header::CONTENT_TYPE, "application/json")], body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_listen_address_is_a_bind_error() {
        let config = HttpConfig {
            listen_address: "not an address".to_string(),
            ..HttpConfig::default()
        };
        let result = run_server(ReadingStore::new(), &config).await;
        assert!(matches!(result, Err(BridgeError::Bind(_))));
    }

    #[tokio::test]
    async fn port_in_use_is_a_bind_error() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let config = HttpConfig {
            listen_address: "127.0.0.1".to_string(),
            port,
            ..HttpConfig::default()
        };
        let result = run_server(ReadingStore::new(), &config).await;
        assert!(matches!(result, Err(BridgeError::Bind(_))));
    }
}
