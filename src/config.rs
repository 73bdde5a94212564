//! ==============================================================================
//! config.rs - bridge configuration loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `bridge.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - MqttConfig: broker address, client id, topic, reconnect backoff.
//!     - HttpConfig: listen address, port and path of the reading endpoint.
//!     - IngestConfig: optional timestamp annotation.
//!     - LoggingConfig: default log level, per-reading log lines.
//!     - SimulatorConfig: demo publisher toggle and interval.
//!
//! every section is optional; missing keys take the defaults below.
//!
//! ==============================================================================

use crate::error::BridgeError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// env var naming an explicit config file
pub const CONFIG_ENV: &str = "HYDRO_BRIDGE_CONFIG";

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct BridgeConfig {
    pub mqtt: MqttConfig,
    pub http: HttpConfig,
    pub ingest: IngestConfig,
    pub logging: LoggingConfig,
    pub simulator: SimulatorConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
    pub topic: String,
    pub keep_alive_secs: u64,
    /// how long startup waits for connack + suback
    pub connect_timeout_secs: u64,
    pub reconnect_min_secs: u64,
    pub reconnect_max_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "broker.emqx.io".to_string(),
            broker_port: 1883,
            client_id: "hydro-bridge".to_string(),
            topic: "/sdh-auto-hydroponic".to_string(),
            keep_alive_secs: 30,
            connect_timeout_secs: 10,
            reconnect_min_secs: 1,
            reconnect_max_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub listen_address: String,
    pub port: u16,
    pub path: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0".to_string(),
            port: 8080,
            path: "/getSensorData".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IngestConfig {
    pub add_timestamp: bool,
    pub timestamp_field: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            add_timestamp: false,
            timestamp_field: "timestamp".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// used when RUST_LOG is unset
    pub level: String,
    pub show_sensor_data: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            show_sensor_data: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimulatorConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_seconds: 5,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))
    }

    /// Load with default fallback
    ///
    /// runs before logging is set up, so notices go to stderr.
    pub fn load_or_default() -> Self {
        let paths = match std::env::var_os(CONFIG_ENV) {
            Some(explicit) => vec![PathBuf::from(explicit)],
            None => vec![
                PathBuf::from("config").join("bridge.toml"),
                PathBuf::from("..").join("config").join("bridge.toml"),
            ],
        };

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        eprintln!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        eprintln!("[CONFIG] Warning: Failed to load {}: {}", path.display(), e);
                    }
                }
            }
        }

        eprintln!("[CONFIG] Warning: No config file found - using defaults");
        Self::default()
    }

    /// Reject settings the bridge cannot start with.
    pub fn validate(&self) -> Result<(), BridgeError> {
        let mqtt = &self.mqtt;
        if mqtt.broker_host.trim().is_empty() {
            return Err(BridgeError::Config("mqtt.broker_host is empty".into()));
        }
        if mqtt.broker_port == 0 {
            return Err(BridgeError::Config("mqtt.broker_port must be non-zero".into()));
        }
        if mqtt.topic.is_empty() {
            return Err(BridgeError::Config("mqtt.topic is empty".into()));
        }
        if mqtt.topic.contains(['+', '#']) {
            return Err(BridgeError::Config(format!(
                "mqtt.topic must be a single topic, not a filter: {}",
                mqtt.topic
            )));
        }
        if mqtt.reconnect_min_secs == 0 || mqtt.reconnect_min_secs > mqtt.reconnect_max_secs {
            return Err(BridgeError::Config(format!(
                "mqtt reconnect backoff must satisfy 0 < min <= max (min={}, max={})",
                mqtt.reconnect_min_secs, mqtt.reconnect_max_secs
            )));
        }
        if mqtt.connect_timeout_secs == 0 {
            return Err(BridgeError::Config("mqtt.connect_timeout_secs must be non-zero".into()));
        }
        if self.http.port == 0 {
            return Err(BridgeError::Config("http.port must be non-zero".into()));
        }
        if !self.http.path.starts_with('/') {
            return Err(BridgeError::Config(format!(
                "http.path must start with '/': {}",
                self.http.path
            )));
        }
        // ':' and '*' are axum route parameters, the endpoint is a literal path
        if self.http.path.contains([':', '*']) {
            return Err(BridgeError::Config(format!(
                "http.path must be a literal path: {}",
                self.http.path
            )));
        }
        if self.ingest.add_timestamp && self.ingest.timestamp_field.is_empty() {
            return Err(BridgeError::Config("ingest.timestamp_field is empty".into()));
        }
        if self.simulator.enabled && self.simulator.interval_seconds == 0 {
            return Err(BridgeError::Config(
                "simulator.interval_seconds must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        info!(
            broker = %format!("{}:{}", self.mqtt.broker_host, self.mqtt.broker_port),
            client_id = %self.mqtt.client_id,
            topic = %self.mqtt.topic,
            "mqtt configuration"
        );
        info!(
            listen = %format!("{}:{}", self.http.listen_address, self.http.port),
            path = %self.http.path,
            "http configuration"
        );
        info!(
            add_timestamp = self.ingest.add_timestamp,
            timestamp_field = %self.ingest.timestamp_field,
            simulator = self.simulator.enabled,
            "ingest configuration"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_deployed_device() {
        let config = BridgeConfig::default();
        assert_eq!(config.mqtt.broker_host, "broker.emqx.io");
        assert_eq!(config.mqtt.broker_port, 1883);
        assert_eq!(config.mqtt.topic, "/sdh-auto-hydroponic");
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.http.path, "/getSensorData");
        assert!(!config.ingest.add_timestamp);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = BridgeConfig::from_toml(
            r#"
            [mqtt]
            broker_host = "localhost"

            [ingest]
            add_timestamp = true
            "#,
        )
        .unwrap();
        assert_eq!(config.mqtt.broker_host, "localhost");
        assert_eq!(config.mqtt.broker_port, 1883);
        assert!(config.ingest.add_timestamp);
        assert_eq!(config.ingest.timestamp_field, "timestamp");
        assert_eq!(config.http.listen_address, "0.0.0.0");
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config = BridgeConfig::from_toml("").unwrap();
        assert_eq!(config.mqtt.client_id, "hydro-bridge");
        assert_eq!(config.simulator.interval_seconds, 5);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(BridgeConfig::from_toml("[mqtt\nbroker_port = ").is_err());
        assert!(BridgeConfig::from_toml("[http]\nport = \"eighty\"").is_err());
    }

    #[test]
    fn rejects_wildcard_topic() {
        let mut config = BridgeConfig::default();
        config.mqtt.topic = "sensors/#".to_string();
        assert!(matches!(config.validate(), Err(BridgeError::Config(_))));
        config.mqtt.topic = "sensors/+/hydro".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_backoff() {
        let mut config = BridgeConfig::default();
        config.mqtt.reconnect_min_secs = 60;
        config.mqtt.reconnect_max_secs = 5;
        assert!(config.validate().is_err());
        config.mqtt.reconnect_min_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_http_settings() {
        let mut config = BridgeConfig::default();
        config.http.path = "getSensorData".to_string();
        assert!(config.validate().is_err());

        let mut config = BridgeConfig::default();
        config.http.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_route_syntax_in_http_path() {
        for path in ["/data/*", "/:", "/readings/:id", "/*rest"] {
            let mut config = BridgeConfig::default();
            config.http.path = path.to_string();
            assert!(
                matches!(config.validate(), Err(BridgeError::Config(_))),
                "{path} should be rejected"
            );
        }
    }

    #[test]
    fn simulator_interval_only_checked_when_enabled() {
        let mut config = BridgeConfig::default();
        config.simulator.interval_seconds = 0;
        assert!(config.validate().is_ok());
        config.simulator.enabled = true;
        assert!(config.validate().is_err());
    }
}
