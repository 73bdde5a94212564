//! ==============================================================================
//! main.rs - bridge entry point
//! ==============================================================================
//!
//! startup order:
//!     1. load + validate configuration
//!     2. initialize logging
//!     3. connect to the broker and subscribe (fatal on failure)
//!     4. spawn the listener loop and, if enabled, the simulator
//!     5. serve http until ctrl-c
//!
//! ==============================================================================

use anyhow::Result;
use hydro_bridge::config::BridgeConfig;
use hydro_bridge::domain::ReadingStore;
use hydro_bridge::ingest::{IngestOptions, Ingestor};
use hydro_bridge::mqtt::Listener;
use hydro_bridge::{server, simulator};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: load configuration
    let config = BridgeConfig::load_or_default();

    // step 2: logging, RUST_LOG wins over the config file
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("hydro-bridge starting");
    config.validate()?;
    config.log_summary();

    // step 3: shared state + broker connection
    let store = ReadingStore::new();
    let ingestor = Ingestor::new(
        store.clone(),
        IngestOptions::from(&config.ingest),
        config.logging.show_sensor_data,
    );
    let listener = match Listener::connect(&config.mqtt, ingestor).await {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, "fatal: broker connection failed");
            return Err(e.into());
        }
    };

    // step 4: background tasks
    if config.simulator.enabled {
        let client = listener.client();
        let topic = listener.topic().to_string();
        let interval = Duration::from_secs(config.simulator.interval_seconds);
        info!(interval_secs = interval.as_secs(), "simulator enabled");
        tokio::spawn(simulator::run_simulator(client, topic, interval));
    }
    tokio::spawn(listener.run());

    // step 5: http server in the foreground
    tokio::select! {
        result = server::run_server(store, &config.http) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
        }
    }

    Ok(())
}
