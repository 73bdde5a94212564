//! ==============================================================================
//! domain.rs - latest reading store and the device payload shape
//! ==============================================================================
//!
//! purpose:
//!     holds the single "latest reading" shared between:
//!     - the mqtt listener (writes every accepted message)
//!     - the web server (reads on every request)
//!
//! relationships:
//!     - written by: ingest.rs (Ingestor::ingest)
//!     - read by: server.rs (reading_handler)
//!     - SensorReading used by: simulator.rs, ingest.rs (log lines)
//!
//! ==============================================================================

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// value served before the first message arrives
pub const EMPTY_READING: &str = "{}";

// ==============================================================================
// reading store
// ==============================================================================
// arc<rwlock<>> like the host's AppState:
// - arc: one handle cloned into the listener and the router
// - rwlock: many concurrent http readers OR one mqtt writer
//
// the value is swapped whole under the write lock, so a reader sees either
// the old text or the new text, never a mix.

/// Cloneable handle to the one retained reading.
#[derive(Clone, Debug)]
pub struct ReadingStore {
    latest: Arc<RwLock<String>>,
    updates: Arc<AtomicU64>,
}

impl ReadingStore {
    pub fn new() -> Self {
        Self {
            latest: Arc::new(RwLock::new(EMPTY_READING.to_string())),
            updates: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Replace the stored reading, returning the one it displaced.
    pub async fn replace(&self, reading: String) -> String {
        let previous = {
            let mut guard = self.latest.write().await;
            std::mem::replace(&mut *guard, reading)
        };
        self.updates.fetch_add(1, Ordering::Relaxed);
        previous
    }

    /// Copy of the current reading.
    pub async fn snapshot(&self) -> String {
        self.latest.read().await.clone()
    }

    /// number of accepted replacements since startup
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }
}

impl Default for ReadingStore {
    fn default() -> Self {
        Self::new()
    }
}

// ==============================================================================
// device payload
// ==============================================================================

/// One snapshot as published by the hydroponic controller.
///
/// field names on the wire are owned by the device firmware.
/// the store never forces payloads through this type; it is only used to
/// build simulated readings and to pick fields for log lines.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// air temperature in celsius (dht22)
    pub temperature: f64,
    /// relative humidity (0-100%)
    pub humidity: f64,
    /// nutrient concentration in ppm
    pub tds: f64,
    /// raw ldr level
    pub light: f64,
    pub ph: f64,
    /// water temperature in celsius (ds18b20)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_temp: Option<f64>,
    #[serde(
        rename = "relay_air_bersih",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub clean_water_relay: Option<bool>,
    #[serde(
        rename = "relay_nutrisi",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub nutrient_relay: Option<bool>,
    #[serde(
        rename = "relay_lampu",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub light_relay: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_store_holds_placeholder() {
        let store = ReadingStore::new();
        assert_eq!(store.snapshot().await, "{}");
        assert_eq!(store.updates(), 0);
    }

    #[tokio::test]
    async fn replace_returns_previous_and_last_write_wins() {
        let store = ReadingStore::new();
        let prev = store.replace(r#"{"a":1}"#.to_string()).await;
        assert_eq!(prev, "{}");

        let prev = store.replace(r#"{"b":2}"#.to_string()).await;
        assert_eq!(prev, r#"{"a":1}"#);
        assert_eq!(store.snapshot().await, r#"{"b":2}"#);
        assert_eq!(store.updates(), 2);
    }

    #[tokio::test]
    async fn clones_share_the_same_cell() {
        let store = ReadingStore::new();
        let writer = store.clone();
        writer.replace(r#"{"x":true}"#.to_string()).await;
        assert_eq!(store.snapshot().await, r#"{"x":true}"#);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_readers_never_see_partial_values() {
        let store = ReadingStore::new();
        let a = format!(r#"{{"tag":"a","pad":"{}"}}"#, "a".repeat(4096));
        let b = format!(r#"{{"tag":"b","pad":"{}"}}"#, "b".repeat(4096));

        let writer = {
            let store = store.clone();
            let (a, b) = (a.clone(), b.clone());
            tokio::spawn(async move {
                for i in 0..500 {
                    let next = if i % 2 == 0 { a.clone() } else { b.clone() };
                    store.replace(next).await;
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut readers = Vec::new();
        for _ in 0..4 {
            let store = store.clone();
            let (a, b) = (a.clone(), b.clone());
            readers.push(tokio::spawn(async move {
                for _ in 0..500 {
                    let seen = store.snapshot().await;
                    assert!(seen == "{}" || seen == a || seen == b);
                    tokio::task::yield_now().await;
                }
            }));
        }

        writer.await.unwrap();
        for r in readers {
            r.await.unwrap();
        }
        assert_eq!(store.updates(), 500);
    }

    #[test]
    fn sensor_reading_uses_device_field_names() {
        let reading = SensorReading {
            temperature: 24.5,
            humidity: 60.2,
            tds: 850.0,
            light: 1200.0,
            ph: 6.5,
            water_temp: Some(22.0),
            clean_water_relay: Some(false),
            nutrient_relay: Some(true),
            light_relay: None,
        };
        let value = serde_json::to_value(&reading).unwrap();
        assert_eq!(value["relay_air_bersih"], false);
        assert_eq!(value["relay_nutrisi"], true);
        assert!(value.get("relay_lampu").is_none());
        assert_eq!(value["water_temp"], 22.0);
    }

    #[test]
    fn sensor_reading_accepts_minimal_payload() {
        let reading: SensorReading = serde_json::from_str(
            r#"{"temperature":24.5,"humidity":60.2,"tds":850,"light":1200,"ph":6.5}"#,
        )
        .unwrap();
        assert_eq!(reading.tds, 850.0);
        assert_eq!(reading.water_temp, None);
        assert_eq!(reading.light_relay, None);
    }
}
