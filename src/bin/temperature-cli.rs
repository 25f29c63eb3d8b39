//! Command line client for a running bridge with the MQTT relay enabled.
//!
//! Usage:
//!   cargo run --bin temperature-cli -- get
//!   cargo run --bin temperature-cli -- set 21.5
//!   cargo run --bin temperature-cli -- watch
//!
//! Publishes GET/SET commands to the relay's topics and prints the RESULT
//! and change notifications that come back.

use clap::{Parser, Subcommand};
use hvac_temperature_bridge::config::{Config, load_dotenv};
use hvac_temperature_bridge::messaging::intent::{
    ACTION_GET_TEMPERATURE, ACTION_SET_TEMPERATURE, EXTRA_TEMPERATURE_VALUE, RESULT_TEMPERATURE,
    TEMPERATURE_VALUE,
};
use hvac_temperature_bridge::messaging::mqtt::{MqttClient, MqttMessage, topic_for};
use log::{error, info, warn};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "temperature-cli", version, about = "Query or set the HVAC target temperature over MQTT")]
struct Args {
    /// Seconds to wait for a reply
    #[arg(long, default_value_t = 5)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask for the current temperature
    Get,
    /// Request a new target temperature
    Set { value: f32 },
    /// Print change notifications until interrupted
    Watch,
}

/// Temperature extra of a notification payload, `None` if absent.
fn temperature_of(payload: &str) -> Option<f64> {
    serde_json::from_str::<Value>(payload)
        .ok()?
        .get(EXTRA_TEMPERATURE_VALUE)?
        .as_f64()
}

#[tokio::main]
async fn main() {
    load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = Config::from_env().mqtt;
    config.client_id = format!("{}-cli", config.client_id);
    let prefix = config.topic_prefix.clone();
    let result_topic = topic_for(&prefix, RESULT_TEMPERATURE);
    let value_topic = topic_for(&prefix, TEMPERATURE_VALUE);

    info!(
        "Connecting to MQTT broker at {}:{}",
        config.broker_host, config.broker_port
    );
    let mqtt_client = MqttClient::new(&config);
    let publisher = mqtt_client.client();

    let (msg_tx, mut msg_rx) = mpsc::channel::<MqttMessage>(32);
    let (connected_tx, connected_rx) = oneshot::channel();
    let mqtt_loop = tokio::spawn(async move {
        mqtt_client.run(msg_tx, Some(connected_tx)).await;
    });

    if tokio::time::timeout(Duration::from_secs(args.timeout), connected_rx)
        .await
        .is_err()
    {
        error!("Could not connect to the broker");
        mqtt_loop.abort();
        std::process::exit(1);
    }

    for topic in [&result_topic, &value_topic] {
        if let Err(e) = publisher
            .subscribe(topic.as_str(), rumqttc::QoS::AtLeastOnce)
            .await
        {
            warn!("Failed to subscribe to {}: {}", topic, e);
        }
    }

    let (topic, payload) = match &args.command {
        Command::Get => (Some(topic_for(&prefix, ACTION_GET_TEMPERATURE)), String::new()),
        Command::Set { value } => (
            Some(topic_for(&prefix, ACTION_SET_TEMPERATURE)),
            serde_json::json!({ EXTRA_TEMPERATURE_VALUE: value }).to_string(),
        ),
        Command::Watch => (None, String::new()),
    };
    if let Some(topic) = topic {
        info!("Publishing to {}", topic);
        if let Err(e) = publisher
            .publish(topic, rumqttc::QoS::AtLeastOnce, false, payload.into_bytes())
            .await
        {
            error!("Failed to publish command: {}", e);
            std::process::exit(1);
        }
    }

    // GET waits for its RESULT, SET for the change it causes
    let wait_for = match args.command {
        Command::Get => Some(result_topic.clone()),
        Command::Set { .. } => Some(value_topic.clone()),
        Command::Watch => None,
    };

    let deadline = tokio::time::sleep(Duration::from_secs(args.timeout));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            Some(message) = msg_rx.recv() => {
                let temperature = temperature_of(&message.payload);
                match temperature {
                    Some(t) if message.topic == result_topic => println!("Temperature: {}", t),
                    Some(t) => println!("Temperature changed: {}", t),
                    None => warn!("Unexpected payload on {}: {}", message.topic, message.payload),
                }
                if wait_for.as_deref() == Some(message.topic.as_str()) {
                    break;
                }
            }
            _ = &mut deadline, if wait_for.is_some() => {
                warn!("No reply within {} seconds", args.timeout);
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                break;
            }
        }
    }

    mqtt_loop.abort();
}
