//! ==============================================================================
//! mqtt.rs - broker connection and topic subscription
//! ==============================================================================
//!
//! purpose:
//!     keeps one mqtt connection open, subscribes to the configured topic at
//!     qos 0 and hands every publish on it to the ingestor.
//!
//! lifecycle:
//!     1. connect/start: wait for connack + suback. any failure here is fatal.
//!     2. run: poll the event loop forever. rumqttc reconnects on the next
//!        poll after an error; we sleep a doubling backoff between attempts
//!        and resubscribe on every fresh connack (clean session).
//!
//! relationships:
//!     - uses: ingest.rs (Ingestor, the per-message callback)
//!     - client() shared with: simulator.rs
//!
//! ==============================================================================

use crate::config::MqttConfig;
use crate::error::BridgeError;
use crate::ingest::Ingestor;
use rumqttc::{
    AsyncClient, Event, EventLoop, MqttOptions, Packet, Publish, QoS, Request, SubAck, Subscribe,
    SubscribeReasonCode,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// capacity of the client -> event loop request channel
const REQUEST_CHANNEL_CAPACITY: usize = 10;

// ==============================================================================
// reconnect backoff
// ==============================================================================

/// Doubling delay between reconnect attempts, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max, current: min }
    }

    /// Delay to wait now; the following call returns double, up to `max`.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.min;
    }
}

// ==============================================================================
// listener
// ==============================================================================

pub struct Listener {
    client: AsyncClient,
    eventloop: EventLoop,
    topic: String,
    connect_timeout: Duration,
    ingestor: Ingestor,
    backoff: Backoff,
}

impl Listener {
    /// Build the client and event loop. No network traffic happens until
    /// the event loop is polled.
    pub fn new(config: &MqttConfig, ingestor: Ingestor) -> Self {
        let mut options = MqttOptions::new(
            config.client_id.clone(),
            config.broker_host.clone(),
            config.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        options.set_clean_session(true);

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);

        Self {
            client,
            eventloop,
            topic: config.topic.clone(),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            ingestor,
            backoff: Backoff::new(
                Duration::from_secs(config.reconnect_min_secs),
                Duration::from_secs(config.reconnect_max_secs),
            ),
        }
    }

    /// Connect and subscribe, failing if the broker does not confirm both.
    pub async fn connect(config: &MqttConfig, ingestor: Ingestor) -> Result<Self, BridgeError> {
        info!(
            broker = %format!("{}:{}", config.broker_host, config.broker_port),
            client_id = %config.client_id,
            "connecting to mqtt broker"
        );
        let mut listener = Self::new(config, ingestor);
        listener.start().await?;
        Ok(listener)
    }

    /// Handle used to publish on the same connection.
    pub fn client(&self) -> AsyncClient {
        self.client.clone()
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    async fn start(&mut self) -> Result<(), BridgeError> {
        self.client
            .subscribe(self.topic.clone(), QoS::AtMostOnce)
            .await
            .map_err(|e| BridgeError::Subscribe(format!("failed to queue subscription: {e}")))?;

        let timeout = self.connect_timeout;
        tokio::time::timeout(timeout, self.await_subscription())
            .await
            .map_err(|_| {
                BridgeError::Connect(format!("broker did not confirm within {}s", timeout.as_secs()))
            })?
    }

    async fn await_subscription(&mut self) -> Result<(), BridgeError> {
        let mut connected = false;
        loop {
            let event = self.eventloop.poll().await.map_err(|e| {
                if connected {
                    BridgeError::Subscribe(format!("connection lost before suback: {e}"))
                } else {
                    BridgeError::Connect(e.to_string())
                }
            })?;

            match event {
                Event::Incoming(Packet::ConnAck(_)) => {
                    connected = true;
                    info!("mqtt connection established");
                }
                Event::Incoming(Packet::SubAck(ack)) => {
                    check_suback(&ack, &self.topic)?;
                    info!(topic = %self.topic, "subscribed");
                    return Ok(());
                }
                Event::Incoming(Packet::Publish(publish)) => self.on_publish(publish).await,
                _ => {}
            }
        }
    }

    /// Poll the event loop until the process ends.
    pub async fn run(mut self) {
        loop {
            match self.eventloop.poll().await {
                Ok(event) => self.handle_event(event).await,
                Err(e) => {
                    let delay = self.backoff.next_delay();
                    warn!(
                        error = %e,
                        retry_in_secs = delay.as_secs(),
                        "mqtt connection error, reconnecting"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// React to one event from an established session.
    pub async fn handle_event(&mut self, event: Event) {
        match event {
            Event::Incoming(Packet::Publish(publish)) => self.on_publish(publish).await,
            Event::Incoming(Packet::ConnAck(_)) => {
                info!(topic = %self.topic, "mqtt reconnected, resubscribing");
                self.backoff.reset();
                // straight onto the event loop: the request channel may be
                // full of publishes queued during the outage
                let subscribe = Subscribe::new(self.topic.clone(), QoS::AtMostOnce);
                self.eventloop.pending.push_front(Request::Subscribe(subscribe));
            }
            Event::Incoming(Packet::SubAck(ack)) => {
                if let Err(e) = check_suback(&ack, &self.topic) {
                    warn!(error = %e, "resubscription rejected");
                }
            }
            _ => {}
        }
    }

    async fn on_publish(&mut self, publish: Publish) {
        if publish.topic != self.topic {
            debug!(topic = %publish.topic, "ignoring publish on unexpected topic");
            return;
        }
        self.ingestor.ingest(&publish.payload).await;
    }
}

fn check_suback(ack: &SubAck, topic: &str) -> Result<(), BridgeError> {
    if ack
        .return_codes
        .iter()
        .any(|code| matches!(code, SubscribeReasonCode::Failure))
    {
        return Err(BridgeError::Subscribe(format!("broker rejected subscription to {topic}")));
    }
    Ok(())
}
