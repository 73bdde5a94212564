//! ==============================================================================
//! simulator.rs - demo publisher
//! ==============================================================================
//!
//! purpose:
//!     publishes random readings to the bridge's own topic so the endpoint has
//!     data without a controller on the network. off unless
//!     `simulator.enabled` is set.
//!
//! relationships:
//!     - publishes through: mqtt.rs (Listener::client)
//!     - payload shape: domain.rs (SensorReading)
//!
//! ==============================================================================

use crate::domain::SensorReading;
use rand::Rng;
use rumqttc::{AsyncClient, QoS};
use std::time::Duration;
use tracing::{debug, warn};

/// A plausible reading: the five fields the controller always sends.
pub fn random_reading<R: Rng + ?Sized>(rng: &mut R) -> SensorReading {
    SensorReading {
        temperature: f64::from(rng.random_range(0..350)) / 10.0 + 15.0,
        humidity: f64::from(rng.random_range(0..1000)) / 10.0,
        tds: f64::from(rng.random_range(0..2000)),
        light: f64::from(rng.random_range(0..4000)),
        ph: f64::from(rng.random_range(0..140)) / 10.0,
        ..SensorReading::default()
    }
}

/// Publish a random reading every `interval` until the process ends.
pub async fn run_simulator(client: AsyncClient, topic: String, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;

        // thread rng is !Send, keep it out of the await points
        let reading = random_reading(&mut rand::rng());
        let payload = match serde_json::to_vec(&reading) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "failed to encode simulated reading");
                continue;
            }
        };

        match client.publish(topic.clone(), QoS::AtMostOnce, false, payload).await {
            Ok(()) => debug!(topic = %topic, "published simulated reading"),
            Err(e) => warn!(error = %e, "failed to publish simulated reading"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_readings_stay_in_range() {
        let mut rng = rand::rng();
        for _ in 0..1000 {
            let r = random_reading(&mut rng);
            assert!((15.0..50.0).contains(&r.temperature));
            assert!((0.0..100.0).contains(&r.humidity));
            assert!((0.0..2000.0).contains(&r.tds));
            assert!((0.0..4000.0).contains(&r.light));
            assert!((0.0..14.0).contains(&r.ph));
            assert_eq!(r.water_temp, None);
        }
    }

    #[test]
    fn simulated_payload_is_accepted_by_ingest() {
        let reading = random_reading(&mut rand::rng());
        let payload = serde_json::to_vec(&reading).unwrap();
        let stored =
            crate::ingest::process_payload(&payload, &crate::ingest::IngestOptions::default())
                .unwrap();
        let back: SensorReading = serde_json::from_str(&stored).unwrap();
        assert_eq!(back.tds, reading.tds);
        assert_eq!(back.light, reading.light);
        assert!((back.temperature - reading.temperature).abs() < 1e-9);
        assert!((back.ph - reading.ph).abs() < 1e-9);
    }
}
