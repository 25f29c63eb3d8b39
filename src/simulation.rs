//! Simulated external changes for development.
//!
//! Stands in for another app or the HVAC head unit changing a zone's
//! target temperature, so the change fan-out can be watched end to end.

use crate::store::InMemoryPropertyStore;
use crate::temperature::{HVAC_TEMPERATURE_SET, Zone};
use log::info;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval};

/// Temperature set on the `step`-th tick: walks 18..=26 and wraps.
pub fn simulated_temperature(step: u32) -> f32 {
    18.0 + (step % 9) as f32
}

/// Spawn a task changing `zone` on the simulated vehicle every `period`.
pub fn run_zone_simulation(
    store: Arc<InMemoryPropertyStore>,
    zone: Zone,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = interval(period);
        // First tick completes immediately
        interval.tick().await;

        let mut step = 0;
        loop {
            interval.tick().await;
            let value = simulated_temperature(step);
            info!("[Sim] {} zone changed externally to {}", zone, value);
            store.inject_hardware_change(HVAC_TEMPERATURE_SET, zone.area_id(), value);
            step = step.wrapping_add(1);
        }
    })
}
