use crate::messaging::intent::DEFAULT_NAMESPACE;
use crate::temperature::{Variant, Zone, ZoneSet};
use crate::ui::InitialValue;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Split one `.env` line into key and value.
///
/// Blank lines and `#` comments yield `None`. Values may contain spaces
/// and may be wrapped in single or double quotes.
fn parse_env_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    let mut value = value.trim();
    if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        value = &value[1..value.len() - 1];
    }
    Some((key, value))
}

/// Load variables from `.env` in the working directory, if present.
/// Variables already set in the environment win.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    let Ok(content) = fs::read_to_string(env_path) else {
        return;
    };

    for (key, value) in content.lines().filter_map(parse_env_line) {
        if std::env::var(key).is_err() {
            // SAFETY: called at startup before any other thread is spawned
            unsafe { std::env::set_var(key, value) };
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub screen: ScreenConfig,
    pub messaging: MessagingConfig,
    pub mqtt: MqttConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenConfig {
    pub variant: Variant,
    /// Zones a user edit or SET command writes to
    pub write_zones: ZoneSet,
    /// Start from the store reading instead of `default_temperature`
    pub read_on_start: bool,
    pub default_temperature: f32,
    /// Show the echo label next to the picker
    pub echo_label: bool,
}

impl ScreenConfig {
    pub fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::SingleZone => Self {
                variant,
                write_zones: ZoneSet::primary(),
                read_on_start: true,
                default_temperature: 22.0,
                echo_label: false,
            },
            Variant::DualZone => Self {
                variant,
                write_zones: ZoneSet::both(),
                read_on_start: false,
                default_temperature: 22.0,
                echo_label: true,
            },
        }
    }

    pub fn initial_value(&self) -> InitialValue {
        if self.read_on_start {
            InitialValue::ReadFromStore(Zone::PRIMARY)
        } else {
            InitialValue::Fixed(self.default_temperature)
        }
    }
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self::for_variant(Variant::SingleZone)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Prefix of every broadcast action name
    pub action_namespace: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MqttConfig {
    pub enabled: bool,
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic_prefix: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "hvac-temperature-bridge".to_string(),
            username: None,
            password: None,
            topic_prefix: "hvac/temperature".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            screen: ScreenConfig::default(),
            messaging: MessagingConfig {
                action_namespace: DEFAULT_NAMESPACE.to_string(),
            },
            mqtt: MqttConfig::default(),
            simulation: SimulationConfig {
                enabled: false,
                interval_secs: 15,
            },
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from defaults plus overrides returned by `lookup`.
    ///
    /// `HVAC_VARIANT` is applied first, so the other screen settings refine
    /// the variant preset. Unparseable values are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(variant) = lookup("HVAC_VARIANT") {
            match variant.parse() {
                Ok(v) => config.screen = ScreenConfig::for_variant(v),
                Err(_) => warn!("Ignoring unknown HVAC_VARIANT '{}'", variant),
            }
        }
        if let Some(zones) = lookup("HVAC_WRITE_ZONES") {
            match zones.parse() {
                Ok(z) => config.screen.write_zones = z,
                Err(e) => warn!("Ignoring HVAC_WRITE_ZONES: {}", e),
            }
        }
        if let Some(flag) = lookup("HVAC_READ_ON_START")
            && let Some(f) = parse_flag(&flag)
        {
            config.screen.read_on_start = f;
        }
        if let Some(temperature) = lookup("HVAC_DEFAULT_TEMPERATURE")
            && let Ok(t) = temperature.parse()
        {
            config.screen.default_temperature = t;
        }
        if let Some(flag) = lookup("HVAC_ECHO_LABEL")
            && let Some(f) = parse_flag(&flag)
        {
            config.screen.echo_label = f;
        }
        if let Some(namespace) = lookup("HVAC_ACTION_NAMESPACE") {
            config.messaging.action_namespace = namespace;
        }

        // MQTT configuration
        if let Some(flag) = lookup("MQTT_ENABLED")
            && let Some(f) = parse_flag(&flag)
        {
            config.mqtt.enabled = f;
        }
        if let Some(host) = lookup("MQTT_BROKER_HOST") {
            config.mqtt.broker_host = host;
        }
        if let Some(port) = lookup("MQTT_BROKER_PORT")
            && let Ok(p) = port.parse()
        {
            config.mqtt.broker_port = p;
        }
        if let Some(client_id) = lookup("MQTT_CLIENT_ID") {
            config.mqtt.client_id = client_id;
        }
        if let Some(username) = lookup("MQTT_USERNAME") {
            config.mqtt.username = Some(username);
        }
        if let Some(password) = lookup("MQTT_PASSWORD") {
            config.mqtt.password = Some(password);
        }
        if let Some(prefix) = lookup("MQTT_TOPIC_PREFIX") {
            config.mqtt.topic_prefix = prefix;
        }

        if let Some(flag) = lookup("HVAC_SIMULATE")
            && let Some(f) = parse_flag(&flag)
        {
            config.simulation.enabled = f;
        }
        if let Some(secs) = lookup("HVAC_SIMULATE_INTERVAL_SECS")
            && let Ok(s) = secs.parse::<u64>()
            && s > 0
        {
            config.simulation.interval_secs = s;
        }

        config
    }
}
