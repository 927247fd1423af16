//! MQTT bridge for the pH meter.
//!
//! Subscribes to command topics and publishes readings:
//!
//! **Subscribe Topics:**
//! - `ph/calibrate` - Calibration action: `calibrate_ph4`, `calibrate_ph7`,
//!   `calibrate_ph10`, `reset_calibration`, or `{"action": "..."}`
//! - `ph/calibration_mode/set` - `on`/`off` or `{"enabled": true}`
//!
//! **Publish Topics:**
//! - `ph/value` - pH (2 decimals)
//! - `ph/voltage` - Raw probe voltage in mV (1 decimal)
//! - `ph/slope` - Slope in mV/pH (2 decimals)
//! - `ph/temperature` - Temperature in the configured unit (1 decimal)
//! - `ph/status` - `normal`, `out_of_range` or `disconnected`
//! - `ph/state` - Full state JSON after every tick and command
//! - `ph/calibration_mode` - `on`/`off` (retained)
//! - `ph/calibration/result` - `ok` or the error text of the last action
//!
//! # Wiring
//!
//! ```ignore
//! let runtime = MqttRuntimeConfig::from_config(&config.mqtt);
//! let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
//! let outputs = channel_outputs(&runtime, &tx);
//! let meter = PhMeter::new(&config.meter, source, temperature, outputs)?;
//!
//! let handler = MqttHandler::new(Arc::new(SharedMeter::new(meter)), runtime, tx, rx);
//! handler.run().await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::acquisition::VoltageSource;
use crate::config::MqttConfig as SharedMqttConfig;
use crate::messages::{parse_calibration_command, parse_calibration_mode_command};
use crate::pipeline::{Outputs, TickOutcome};
use crate::temperature::TemperatureProvider;
use crate::traits::{SensorSink, TextSink};

use super::shared::SharedMeter;

// ============================================================================
// Configuration
// ============================================================================

/// Runtime MQTT client configuration for `rumqttc`.
///
/// This struct uses `String` for runtime compatibility with the `rumqttc` library.
/// For embedded/no-alloc contexts, use [`crate::config::MqttConfig`] which uses
/// fixed-size `ShortString` types and convert with [`MqttRuntimeConfig::from_config`].
#[derive(Debug, Clone)]
pub struct MqttRuntimeConfig {
    /// MQTT broker hostname
    pub host: String,
    /// MQTT broker port
    pub port: u16,
    /// Client ID
    pub client_id: String,
    /// Topic prefix (default: "ph")
    pub topic_prefix: String,
    /// Username and password, if the broker requires them
    pub credentials: Option<(String, String)>,
    /// How often the tick task polls the meter, in milliseconds
    pub poll_interval_ms: u64,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
}

impl Default for MqttRuntimeConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1883,
            client_id: "ph-meter".to_string(),
            topic_prefix: "ph".to_string(),
            credentials: None,
            poll_interval_ms: 100,
            keep_alive_secs: 30,
        }
    }
}

impl MqttRuntimeConfig {
    /// Create a new config with the given broker address
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Create from shared MqttConfig
    pub fn from_config(config: &SharedMqttConfig) -> Self {
        Self {
            host: config.host.as_str().to_string(),
            port: config.port,
            client_id: config.client_id.as_str().to_string(),
            topic_prefix: config.topic_prefix.as_str().to_string(),
            credentials: config.has_auth().then(|| {
                (
                    config.username.as_str().to_string(),
                    config.password.as_str().to_string(),
                )
            }),
            keep_alive_secs: config.keep_alive_secs,
            ..Default::default()
        }
    }

    /// Set the client ID
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = id.into();
        self
    }

    /// Set the topic prefix
    pub fn topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.topic_prefix = prefix.into();
        self
    }

    /// Set the poll interval
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Full topic for `suffix`
    pub fn topic(&self, suffix: &str) -> String {
        format!("{}/{}", self.topic_prefix, suffix)
    }
}

// ============================================================================
// Channel Sinks
// ============================================================================

/// A message waiting to be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    /// Full topic
    pub topic: String,
    /// Payload text
    pub payload: String,
    /// Retain flag
    pub retain: bool,
}

impl Publication {
    fn new(topic: String, payload: impl Into<String>, retain: bool) -> Self {
        Self {
            topic,
            payload: payload.into(),
            retain,
        }
    }
}

/// Output sink that queues each value as a publication on one topic.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    topic: String,
    tx: UnboundedSender<Publication>,
}

impl ChannelSink {
    /// Sink publishing to `topic`.
    pub fn new(topic: String, tx: UnboundedSender<Publication>) -> Self {
        Self { topic, tx }
    }

    /// Topic this sink publishes to.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    fn send(&self, payload: String) {
        // The publisher task outlives the meter; a closed channel only
        // happens during shutdown.
        let _ = self
            .tx
            .send(Publication::new(self.topic.clone(), payload, true));
    }
}

impl SensorSink for ChannelSink {
    fn publish(&mut self, value: f32) {
        self.send(value.to_string());
    }
}

impl TextSink for ChannelSink {
    fn publish_text(&mut self, text: &str) {
        self.send(text.to_string());
    }
}

/// Outputs with every optional output enabled, each on its own topic.
pub fn channel_outputs(
    config: &MqttRuntimeConfig,
    tx: &UnboundedSender<Publication>,
) -> Outputs<ChannelSink, ChannelSink> {
    let sink = |suffix: &str| ChannelSink::new(config.topic(suffix), tx.clone());
    Outputs::new(sink("value"))
        .with_raw_voltage(sink("voltage"))
        .with_slope(sink("slope"))
        .with_temperature(sink("temperature"))
        .with_status(sink("status"))
}

// ============================================================================
// MQTT Handler
// ============================================================================

/// Meter shared with the MQTT handler.
pub type MqttMeter<V, P> = SharedMeter<V, P, ChannelSink, ChannelSink>;

/// MQTT handler that bridges MQTT messages to the meter
pub struct MqttHandler<V, P>
where
    V: VoltageSource + Send + 'static,
    P: TemperatureProvider + Send + 'static,
{
    state: Arc<MqttMeter<V, P>>,
    config: MqttRuntimeConfig,
    tx: UnboundedSender<Publication>,
    rx: UnboundedReceiver<Publication>,
}

impl<V, P> MqttHandler<V, P>
where
    V: VoltageSource + Send + 'static,
    P: TemperatureProvider + Send + 'static,
{
    /// Create a handler. `tx`/`rx` must be the channel the meter's
    /// [`channel_outputs`] were built with.
    pub fn new(
        state: Arc<MqttMeter<V, P>>,
        config: MqttRuntimeConfig,
        tx: UnboundedSender<Publication>,
        rx: UnboundedReceiver<Publication>,
    ) -> Self {
        Self {
            state,
            config,
            tx,
            rx,
        }
    }

    /// Get a reference to the shared meter.
    pub fn state(&self) -> Arc<MqttMeter<V, P>> {
        Arc::clone(&self.state)
    }

    /// Run the MQTT handler
    ///
    /// This function handles MQTT messages and ticks the meter until shutdown.
    pub async fn run(self) -> Result<(), MqttError> {
        let MqttHandler {
            state,
            config,
            tx,
            mut rx,
        } = self;

        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs as u64));
        if let Some((username, password)) = &config.credentials {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, 10);

        // Subscribe to command topics
        let topics = [
            config.topic("calibrate"),
            config.topic("calibration_mode/set"),
        ];

        for topic in &topics {
            client
                .subscribe(topic, QoS::AtLeastOnce)
                .await
                .map_err(|e| MqttError::Subscribe(e.to_string()))?;
        }

        log::info!("MQTT connecting to {}:{}", config.host, config.port);
        log::info!("Subscribed to: {:?}", topics);

        // Spawn tick task
        let tick_state = Arc::clone(&state);
        let tick_tx = tx.clone();
        let tick_config = config.clone();
        let poll_interval = config.poll_interval_ms.max(1);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(poll_interval));
            loop {
                interval.tick().await;
                for p in handle_tick(&tick_state, &tick_config) {
                    let _ = tick_tx.send(p);
                }
            }
        });

        // Spawn publisher task
        let client_for_publish = client.clone();
        tokio::spawn(async move {
            while let Some(p) = rx.recv().await {
                if let Err(e) = client_for_publish
                    .publish(p.topic, QoS::AtLeastOnce, p.retain, p.payload.into_bytes())
                    .await
                {
                    log::warn!("MQTT publish failed: {}", e);
                }
            }
        });

        // Main event loop
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    for p in handle_message(&state, &config, &publish.topic, &publish.payload) {
                        let _ = tx.send(p);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("MQTT error: {:?}", e);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }
}

/// Poll the meter and return the `state` publication for a published tick.
///
/// Ticks that are not due, or whose acquisition failed, produce nothing.
pub fn handle_tick<V, P>(state: &MqttMeter<V, P>, config: &MqttRuntimeConfig) -> Vec<Publication>
where
    V: VoltageSource,
    P: TemperatureProvider,
{
    match state.poll() {
        Some(TickOutcome::Published(_)) => state_publication(state, &config.topic("state"))
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}

/// Apply one incoming message and return the publications it produces.
///
/// Slope publications from a calibration commit go out through the meter's
/// own sinks, not the returned list.
pub fn handle_message<V, P>(
    state: &MqttMeter<V, P>,
    config: &MqttRuntimeConfig,
    topic: &str,
    payload: &[u8],
) -> Vec<Publication>
where
    V: VoltageSource,
    P: TemperatureProvider,
{
    let suffix = topic
        .strip_prefix(config.topic_prefix.as_str())
        .map(|s| s.trim_start_matches('/'))
        .unwrap_or(topic);

    let mut out = Vec::new();
    match suffix {
        "calibrate" => {
            let result = match parse_calibration_command(payload) {
                Some(action) => match state.dispatch(action) {
                    Ok(_) => "ok".to_string(),
                    Err(e) => e.to_string(),
                },
                None => {
                    log::warn!("unrecognized calibration command on {}", topic);
                    crate::error::ConfigurationError::UnknownAction.to_string()
                }
            };
            out.push(Publication::new(
                config.topic("calibration/result"),
                result,
                false,
            ));
        }

        "calibration_mode/set" => match parse_calibration_mode_command(payload) {
            Some(enabled) => {
                state.set_calibration_mode(enabled);
                out.push(Publication::new(
                    config.topic("calibration_mode"),
                    if enabled { "on" } else { "off" },
                    true,
                ));
            }
            None => log::warn!("unrecognized calibration mode payload on {}", topic),
        },

        _ => return out,
    }

    if let Some(p) = state_publication(state, &config.topic("state")) {
        out.push(p);
    }
    out
}

fn state_publication<V, P>(state: &MqttMeter<V, P>, topic: &str) -> Option<Publication>
where
    V: VoltageSource,
    P: TemperatureProvider,
{
    serde_json::to_string(&state.state())
        .ok()
        .map(|json| Publication::new(topic.to_string(), json, false))
}

/// MQTT-related errors
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// Failed to subscribe to topic
    #[error("MQTT subscribe failed: {0}")]
    Subscribe(String),
}
