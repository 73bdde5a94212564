//! ==============================================================================
//! hydro-bridge - latest hydroponic reading, from mqtt to http
//! ==============================================================================
//!
//! the controller publishes a json snapshot to one mqtt topic. the bridge keeps
//! only the newest one and hands it to any http client that asks.
//!
//! ```text
//!     ┌──────────────┐  publish   ┌──────────┐  poll   ┌─────────────────────┐
//!     │  controller  │ ─────────> │  broker  │ ──────> │ mqtt.rs (Listener)  │
//!     └──────────────┘            └──────────┘         └──────────┬──────────┘
//!                                                                 │ ingest.rs
//!                                                      ┌──────────┴──────────┐
//!                                                      │ domain.rs (store)   │
//!                                                      └──────────┬──────────┘
//!                                                                 │ snapshot
//!     ┌──────────────┐        GET /getSensorData       ┌──────────┴──────────┐
//!     │   browser    │ <────────────────────────────── │ server.rs (axum)    │
//!     └──────────────┘                                 └─────────────────────┘
//! ```
//!
//! ==============================================================================

pub mod config;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod mqtt;
pub mod server;
pub mod simulator;
