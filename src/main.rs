use clap::Parser;
use hvac_temperature_bridge::TemperatureScreen;
use hvac_temperature_bridge::config::{Config, load_dotenv};
use hvac_temperature_bridge::messaging::mqtt::MqttRelay;
use hvac_temperature_bridge::messaging::{Actions, LocalBus};
use hvac_temperature_bridge::simulation::run_zone_simulation;
use hvac_temperature_bridge::store::memory::DEFAULT_SIMULATED_TEMPERATURE;
use hvac_temperature_bridge::store::{InMemoryPropertyService, InMemoryPropertyStore};
use hvac_temperature_bridge::temperature::{Variant, Zone};
use log::{error, info, warn};
use std::sync::Arc;
use tokio::signal;
use tokio::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "hvac-temperature-bridge",
    version,
    about = "HVAC target temperature screen backed by a simulated vehicle"
)]
struct Args {
    /// Screen variant: single-zone or dual-zone
    #[arg(long)]
    variant: Option<Variant>,

    /// Relay broadcasts to and from the MQTT broker
    #[arg(long)]
    mqtt: bool,

    /// Periodically change the left zone, as another app would
    #[arg(long)]
    simulate: bool,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() {
    load_dotenv();
    init_logger();
    let args = Args::parse();
    info!("Starting HVAC temperature bridge");

    // A --variant flag takes the place of HVAC_VARIANT
    let variant = args.variant.map(|v| v.to_string());
    let mut config = Config::from_lookup(|key| match key {
        "HVAC_VARIANT" if variant.is_some() => variant.clone(),
        _ => std::env::var(key).ok(),
    });
    config.mqtt.enabled |= args.mqtt;
    config.simulation.enabled |= args.simulate;

    info!("Configuration loaded:");
    info!("  Variant: {}", config.screen.variant);
    info!("  Write zones: {}", config.screen.write_zones);
    let actions = Actions::new(&config.messaging.action_namespace);
    info!("  Action namespace: {}", actions.namespace());
    if config.mqtt.enabled {
        info!(
            "  MQTT: {}:{} under '{}'",
            config.mqtt.broker_host, config.mqtt.broker_port, config.mqtt.topic_prefix
        );
    }

    let store = match InMemoryPropertyStore::with_hvac_zones(DEFAULT_SIMULATED_TEMPERATURE) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to start simulated vehicle: {}", e);
            std::process::exit(1);
        }
    };
    let bus = match LocalBus::start() {
        Ok(bus) => Arc::new(bus),
        Err(e) => {
            error!("Failed to start broadcast bus: {}", e);
            std::process::exit(1);
        }
    };

    // Screen creation reads the store synchronously, keep it off the async workers
    let created = {
        let store = store.clone();
        let bus = bus.clone();
        let screen_config = config.screen.clone();
        let actions = actions.clone();
        tokio::task::spawn_blocking(move || {
            let service = InMemoryPropertyService::new(store);
            TemperatureScreen::create(&screen_config, actions, &service, bus)
        })
        .await
    };
    let screen = match created {
        Ok(Ok(screen)) => Arc::new(screen),
        Ok(Err(e)) => {
            error!("Failed to create temperature screen: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            error!("Screen setup task panicked: {}", e);
            std::process::exit(1);
        }
    };

    let relay = config
        .mqtt
        .enabled
        .then(|| MqttRelay::new(config.mqtt.clone(), actions.clone(), bus.clone()).start());

    let simulation = config.simulation.enabled.then(|| {
        run_zone_simulation(
            store.clone(),
            Zone::Left,
            Duration::from_secs(config.simulation.interval_secs),
        )
    });

    // Render the picker whenever it changes
    let render_screen = screen.clone();
    let render_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(200));
        let mut last_version = None;
        loop {
            interval.tick().await;
            let picker = render_screen.picker();
            let version = picker.version();
            if last_version != Some(version) {
                last_version = Some(version);
                match render_screen.label() {
                    Some(label) => info!("[UI] Picker: {}  Label: {}", picker.value(), label.text()),
                    None => info!("[UI] Picker: {}", picker.value()),
                }
            }
        }
    });

    // Each number typed on stdin is a user edit on the picker. A plain thread,
    // so a pending read never holds up runtime shutdown.
    let input_screen = screen.clone();
    let input_thread = std::thread::Builder::new()
        .name("stdin-input".into())
        .spawn(move || {
            for line in std::io::stdin().lines().map_while(Result::ok) {
                match line.trim().parse::<i32>() {
                    Ok(value) => {
                        input_screen.binding().post_user_edit(value);
                    }
                    Err(_) => warn!("Enter a whole number between 16 and 32"),
                }
            }
        });
    if let Err(e) = input_thread {
        warn!("Failed to start stdin reader, picker is display-only: {}", e);
    }

    info!("HVAC temperature bridge is running");
    info!("  - Type a temperature and press Enter to turn the picker");
    info!("  - Press Ctrl+C to exit");

    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }

    render_task.abort();
    if let Some(task) = simulation {
        task.abort();
    }
    if let Some(relay) = relay {
        relay.stop();
    }

    // Destroy joins the UI thread
    let destroy_screen = screen.clone();
    if let Err(e) = tokio::task::spawn_blocking(move || destroy_screen.destroy()).await {
        error!("Screen teardown task panicked: {}", e);
    }
    bus.shutdown();

    info!("HVAC temperature bridge stopped");
}
