//! Relays temperature intents between the local bus and an MQTT broker.
//!
//! Inbound GET/SET publishes become local broadcasts. RESULT and change
//! broadcasts on the local bus are published back to the broker.

use super::client::{MqttClient, MqttMessage};
use super::topic_for;
use crate::config::MqttConfig;
use crate::error::{HvacError, Result};
use crate::messaging::bus::{BroadcastBus, BroadcastReceiver, ReceiverId};
use crate::messaging::intent::{
    ACTION_GET_TEMPERATURE, ACTION_SET_TEMPERATURE, Actions, EXTRA_TEMPERATURE_VALUE, Extra,
    Intent, IntentFilter,
};
use log::{error, info, warn};
use rumqttc::{AsyncClient, QoS};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Hands outbound broadcasts to the relay task.
struct OutboundForwarder {
    tx: mpsc::UnboundedSender<Intent>,
}

impl BroadcastReceiver for OutboundForwarder {
    fn on_receive(&self, intent: &Intent) {
        if self.tx.send(intent.clone()).is_err() {
            warn!("[MQTT] Relay stopped, dropping {}", intent.action());
        }
    }
}

/// How long the relay waits for the first CONNACK before giving up.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct MqttRelay {
    config: MqttConfig,
    actions: Actions,
    bus: Arc<dyn BroadcastBus>,
    connect_timeout: Duration,
}

impl MqttRelay {
    pub fn new(config: MqttConfig, actions: Actions, bus: Arc<dyn BroadcastBus>) -> Self {
        Self {
            config,
            actions,
            bus,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Topics carrying inbound commands.
    pub fn inbound_topics(&self) -> Vec<String> {
        [ACTION_GET_TEMPERATURE, ACTION_SET_TEMPERATURE]
            .into_iter()
            .map(|action| topic_for(&self.config.topic_prefix, action))
            .collect()
    }

    /// Local broadcasts published to the broker.
    pub fn outbound_filter(&self) -> IntentFilter {
        IntentFilter::new([
            self.actions.result_temperature.clone(),
            self.actions.temperature_value.clone(),
        ])
    }

    /// Turn an inbound publish into a namespaced command intent.
    ///
    /// The payload is either empty, a bare number (the temperature) or a
    /// JSON object of extras.
    pub fn decode(&self, message: &MqttMessage) -> Result<Intent> {
        let prefix = self.config.topic_prefix.trim_end_matches('/');
        let action = message
            .topic
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|action| [ACTION_GET_TEMPERATURE, ACTION_SET_TEMPERATURE].contains(action))
            .ok_or_else(|| HvacError::UnknownCommand(message.topic.clone()))?;

        let payload = message.payload.trim();
        let extras = if payload.is_empty() {
            BTreeMap::new()
        } else if let Ok(value) = payload.parse::<f32>() {
            BTreeMap::from([(EXTRA_TEMPERATURE_VALUE.to_string(), Extra::Float(value))])
        } else {
            serde_json::from_str(payload)?
        };

        Ok(Intent::with_extras(self.actions.qualify(action), extras))
    }

    /// Topic and JSON payload for an outbound broadcast.
    pub fn encode(&self, intent: &Intent) -> Result<(String, String)> {
        let action = self
            .actions
            .short_name(intent.action())
            .ok_or_else(|| HvacError::UnknownCommand(intent.action().to_string()))?;
        let payload = serde_json::to_string(intent.extras())?;
        Ok((topic_for(&self.config.topic_prefix, action), payload))
    }

    /// Register on the local bus and spawn the relay task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self) -> RelayHandle {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let bus = self.bus.clone();
        let receiver = bus.register_receiver(
            self.outbound_filter(),
            Arc::new(OutboundForwarder { tx: outbound_tx }),
        );
        let task = tokio::spawn(async move {
            self.run(receiver, outbound_rx).await;
        });

        RelayHandle {
            task,
            bus,
            receiver,
            stopped: AtomicBool::new(false),
        }
    }

    /// Subscribe to the inbound command topics.
    pub async fn subscribe_commands(&self, publisher: &AsyncClient) -> Result<()> {
        for topic in self.inbound_topics() {
            publisher.subscribe(topic, QoS::AtLeastOnce).await?;
        }
        Ok(())
    }

    /// Encode `intent` and publish it to its topic.
    pub async fn publish_intent(&self, publisher: &AsyncClient, intent: &Intent) -> Result<()> {
        let (topic, payload) = self.encode(intent)?;
        publisher
            .publish(topic, QoS::AtLeastOnce, false, payload.into_bytes())
            .await?;
        Ok(())
    }

    async fn run(self, receiver: ReceiverId, outbound: mpsc::UnboundedReceiver<Intent>) {
        self.relay(outbound).await;
        // Nothing drains the forwarder once the loop is gone
        self.bus.unregister_receiver(receiver);
    }

    async fn relay(&self, mut outbound: mpsc::UnboundedReceiver<Intent>) {
        info!(
            "[MQTT] Connecting to {}:{}",
            self.config.broker_host, self.config.broker_port
        );

        let mqtt_client = MqttClient::new(&self.config);
        let publisher = mqtt_client.client();

        let (msg_tx, mut msg_rx) = mpsc::channel::<MqttMessage>(64);
        let (connected_tx, connected_rx) = oneshot::channel();

        // Event loop first, so the connection can be established
        let mqtt_loop = tokio::spawn(async move {
            mqtt_client.run(msg_tx, Some(connected_tx)).await;
        });

        match tokio::time::timeout(self.connect_timeout, connected_rx).await {
            Ok(Ok(())) => info!("[MQTT] Connection established, subscribing to commands"),
            Ok(Err(_)) => {
                warn!("[MQTT] Connection signal channel dropped");
                mqtt_loop.abort();
                return;
            }
            Err(_) => {
                warn!(
                    "[MQTT] Connection timeout after {:?}",
                    self.connect_timeout
                );
                mqtt_loop.abort();
                return;
            }
        }

        if let Err(e) = self.subscribe_commands(&publisher).await {
            error!("[MQTT] Failed to subscribe to commands: {}", e);
            mqtt_loop.abort();
            return;
        }
        info!("[MQTT] Relay started under '{}'", self.config.topic_prefix);

        loop {
            tokio::select! {
                Some(message) = msg_rx.recv() => match self.decode(&message) {
                    Ok(intent) => self.bus.send_broadcast(intent),
                    Err(e) => error!("[MQTT] Dropping message on {}: {}", message.topic, e),
                },
                Some(intent) = outbound.recv() => {
                    if let Err(e) = self.publish_intent(&publisher, &intent).await {
                        warn!("[MQTT] Cannot relay {}: {}", intent.action(), e);
                    }
                }
                else => break,
            }
        }

        mqtt_loop.abort();
    }
}

/// Running relay. Stopping it unregisters from the bus and ends the task.
pub struct RelayHandle {
    task: JoinHandle<()>,
    bus: Arc<dyn BroadcastBus>,
    receiver: ReceiverId,
    stopped: AtomicBool,
}

impl RelayHandle {
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.bus.unregister_receiver(self.receiver);
        self.task.abort();
        info!("[MQTT] Relay stopped");
    }
}

impl Drop for RelayHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::bus::LocalBus;

    fn relay() -> MqttRelay {
        let config = MqttConfig {
            topic_prefix: "car/hvac".to_string(),
            ..MqttConfig::default()
        };
        let bus: Arc<dyn BroadcastBus> = Arc::new(LocalBus::start().unwrap());
        MqttRelay::new(config, Actions::default(), bus)
    }

    fn message(topic: &str, payload: &str) -> MqttMessage {
        MqttMessage {
            topic: topic.to_string(),
            payload: payload.to_string(),
        }
    }

    #[test]
    fn test_inbound_topics() {
        assert_eq!(
            relay().inbound_topics(),
            vec![
                "car/hvac/ACTION_GET_TEMPERATURE".to_string(),
                "car/hvac/ACTION_SET_TEMPERATURE".to_string()
            ]
        );
    }

    #[test]
    fn test_decode_commands() {
        let relay = relay();
        let actions = Actions::default();

        let get = relay
            .decode(&message("car/hvac/ACTION_GET_TEMPERATURE", ""))
            .unwrap();
        assert_eq!(get.action(), actions.get_temperature);
        assert!(get.extras().is_empty());

        let set = relay
            .decode(&message("car/hvac/ACTION_SET_TEMPERATURE", "21.5"))
            .unwrap();
        assert_eq!(set.action(), actions.set_temperature);
        assert_eq!(set.get_float_extra(EXTRA_TEMPERATURE_VALUE, -1.0), 21.5);

        let json = relay
            .decode(&message(
                "car/hvac/ACTION_SET_TEMPERATURE",
                r#"{"TEMPERATURE_VALUE": 24.0}"#,
            ))
            .unwrap();
        assert_eq!(json.get_float_extra(EXTRA_TEMPERATURE_VALUE, -1.0), 24.0);
    }

    #[test]
    fn test_decode_rejects_unknown_topics_and_bad_json() {
        let relay = relay();
        assert!(matches!(
            relay.decode(&message("car/hvac/RESULT_TEMPERATURE", "")),
            Err(HvacError::UnknownCommand(_))
        ));
        assert!(matches!(
            relay.decode(&message("other/ACTION_GET_TEMPERATURE", "")),
            Err(HvacError::UnknownCommand(_))
        ));
        assert!(matches!(
            relay.decode(&message("car/hvac/ACTION_SET_TEMPERATURE", "{warm")),
            Err(HvacError::SerdeJsonError(_))
        ));
    }

    #[test]
    fn test_encode_outbound() {
        let relay = relay();
        let actions = Actions::default();
        let intent = Intent::new(actions.temperature_value.clone())
            .with_float_extra(EXTRA_TEMPERATURE_VALUE, 23.0);

        let (topic, payload) = relay.encode(&intent).unwrap();
        assert_eq!(topic, "car/hvac/TEMPERATURE_VALUE");
        assert_eq!(payload, r#"{"TEMPERATURE_VALUE":23.0}"#);

        assert!(relay.encode(&Intent::new("elsewhere.RESULT")).is_err());
    }

    #[test]
    fn test_encode_keeps_temperature_precision() {
        let relay = relay();
        let intent = Intent::new(Actions::default().temperature_value)
            .with_float_extra(EXTRA_TEMPERATURE_VALUE, 21.1);

        let (_, payload) = relay.encode(&intent).unwrap();
        assert_eq!(payload, r#"{"TEMPERATURE_VALUE":21.1}"#);

        let decoded = relay
            .decode(&message("car/hvac/ACTION_SET_TEMPERATURE", &payload))
            .unwrap();
        assert_eq!(decoded.get_float_extra(EXTRA_TEMPERATURE_VALUE, -1.0), 21.1);
    }

    #[test]
    fn test_client_errors_propagate() {
        let relay = relay();
        let mqtt_client = MqttClient::new(&MqttConfig::default());
        let publisher = mqtt_client.client();
        // Without its event loop the client can no longer queue requests
        drop(mqtt_client);

        tokio_test::block_on(async {
            assert!(matches!(
                relay.subscribe_commands(&publisher).await,
                Err(HvacError::MqttError(_))
            ));
            let intent = Intent::new(Actions::default().result_temperature)
                .with_float_extra(EXTRA_TEMPERATURE_VALUE, 22.0);
            assert!(matches!(
                relay.publish_intent(&publisher, &intent).await,
                Err(HvacError::MqttError(_))
            ));
        });
    }

    #[test]
    fn test_connect_timeout_unregisters_forwarder() {
        let bus = Arc::new(LocalBus::start().unwrap());
        let config = MqttConfig {
            broker_host: "127.0.0.1".to_string(),
            broker_port: 1,
            ..MqttConfig::default()
        };
        let relay = MqttRelay::new(config, Actions::default(), bus.clone())
            .with_connect_timeout(Duration::from_millis(50));

        tokio_test::block_on(async {
            let handle = relay.start();
            assert_eq!(bus.receiver_count(), 1);

            tokio::time::sleep(Duration::from_millis(300)).await;
            assert_eq!(bus.receiver_count(), 0);

            // Stopping afterwards is still fine
            handle.stop();
        });
        assert_eq!(bus.receiver_count(), 0);
    }

    #[test]
    fn test_outbound_filter() {
        let relay = relay();
        let actions = Actions::default();
        let filter = relay.outbound_filter();
        assert!(filter.matches(&Intent::new(actions.result_temperature.clone())));
        assert!(filter.matches(&Intent::new(actions.temperature_value.clone())));
        assert!(!filter.matches(&Intent::new(actions.set_temperature.clone())));
    }

    #[test]
    fn test_start_and_stop_unregister() {
        let bus = Arc::new(LocalBus::start().unwrap());
        let config = MqttConfig {
            broker_host: "127.0.0.1".to_string(),
            broker_port: 1,
            ..MqttConfig::default()
        };
        let relay = MqttRelay::new(config, Actions::default(), bus.clone());

        tokio_test::block_on(async {
            let handle = relay.start();
            assert_eq!(bus.receiver_count(), 1);
            handle.stop();
            handle.stop();
        });
        assert_eq!(bus.receiver_count(), 0);
    }
}
