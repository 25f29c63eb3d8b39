//! MQTT transport for temperature broadcasts.
//!
//! Each bare action name maps to the topic `<prefix>/<ACTION>`, with the
//! intent extras as the JSON payload.

mod client;
mod relay;

pub use client::{MqttClient, MqttMessage};
pub use relay::{MqttRelay, RelayHandle};

/// Topic carrying the bare action `action` under `prefix`.
pub fn topic_for(prefix: &str, action: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), action)
}
