//! ==============================================================================
//! ingest.rs - inbound payload validation and storage
//! ==============================================================================
//!
//! purpose:
//!     turns raw mqtt payload bytes into the stored latest reading.
//!     only structural checks are made: utf-8, json, object. the field set
//!     belongs to the device and is passed through untouched.
//!
//! relationships:
//!     - called by: mqtt.rs (once per publish on the subscribed topic)
//!     - writes: domain.rs (ReadingStore)
//!
//! ==============================================================================

use crate::config::IngestConfig;
use crate::domain::{ReadingStore, SensorReading};
use crate::error::IngestError;
use serde_json::Value;
use tracing::{debug, info, warn};

/// How accepted payloads are rewritten before storage.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub add_timestamp: bool,
    pub timestamp_field: String,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            add_timestamp: false,
            timestamp_field: "timestamp".to_string(),
        }
    }
}

impl From<&IngestConfig> for IngestOptions {
    fn from(config: &IngestConfig) -> Self {
        Self {
            add_timestamp: config.add_timestamp,
            timestamp_field: config.timestamp_field.clone(),
        }
    }
}

/// Validate a payload and produce the text to store.
///
/// with timestamps off the original text is returned verbatim. with them on,
/// the object is re-serialized with the ingestion time (unix ms) under
/// `timestamp_field`, replacing any value the device sent there.
pub fn process_payload(payload: &[u8], options: &IngestOptions) -> Result<String, IngestError> {
    let text = std::str::from_utf8(payload)?;
    let value: Value = serde_json::from_str(text)?;

    let mut fields = match value {
        Value::Object(fields) => fields,
        other => return Err(IngestError::NotAnObject(json_kind(&other))),
    };

    if !options.add_timestamp {
        return Ok(text.to_string());
    }

    fields.insert(options.timestamp_field.clone(), Value::from(timestamp_ms()));
    Ok(serde_json::to_string(&fields)?)
}

/// current unix time in milliseconds
pub fn timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// longest payload prefix echoed into a log line
const LOG_PREVIEW_BYTES: usize = 256;

fn log_preview(payload: &[u8]) -> String {
    let head = &payload[..payload.len().min(LOG_PREVIEW_BYTES)];
    let mut preview = String::from_utf8_lossy(head).into_owned();
    if payload.len() > LOG_PREVIEW_BYTES {
        preview.push_str("...");
    }
    preview
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ==============================================================================
// ingestor - the subscriber callback
// ==============================================================================

/// Applies accepted payloads to the store; drops the rest.
#[derive(Clone, Debug)]
pub struct Ingestor {
    store: ReadingStore,
    options: IngestOptions,
    show_sensor_data: bool,
}

impl Ingestor {
    pub fn new(store: ReadingStore, options: IngestOptions, show_sensor_data: bool) -> Self {
        Self {
            store,
            options,
            show_sensor_data,
        }
    }

    pub fn store(&self) -> &ReadingStore {
        &self.store
    }

    /// Process one payload. Returns whether it was stored.
    pub async fn ingest(&self, payload: &[u8]) -> bool {
        match process_payload(payload, &self.options) {
            Ok(reading) => {
                self.log_reading(&reading);
                self.store.replace(reading).await;
                true
            }
            Err(e) => {
                warn!(
                    error = %e,
                    payload_len = payload.len(),
                    payload = %log_preview(payload),
                    "dropping inbound payload"
                );
                false
            }
        }
    }

    fn log_reading(&self, reading: &str) {
        if !self.show_sensor_data {
            debug!(payload = reading, "reading accepted");
            return;
        }
        match serde_json::from_str::<SensorReading>(reading) {
            Ok(r) => info!(
                temperature = r.temperature,
                humidity = r.humidity,
                tds = r.tds,
                light = r.light,
                ph = r.ph,
                "reading accepted"
            ),
            // device sent a shape we don't recognise, still stored as-is
            Err(_) => info!(payload = reading, "reading accepted"),
        }
    }
}
