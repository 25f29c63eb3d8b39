//! Dispatches temperature commands and relays store changes as broadcasts.
//!
//! The bridge keeps no state between messages. It is both the broadcast
//! receiver for GET/SET commands and the store's change listener.

use super::bus::{BroadcastBus, BroadcastReceiver};
use super::intent::{Actions, EXTRA_TEMPERATURE_VALUE, Intent, IntentFilter};
use crate::error::{HvacError, Result};
use crate::store::{PropertyEventCallback, PropertyValue, TemperatureAdapter};
use crate::temperature::{HVAC_TEMPERATURE_SET, SENTINEL, Zone, ZoneSet, is_valid};
use crate::ui::TemperatureBinding;
use log::{debug, error, warn};
use std::sync::Arc;

pub struct TemperatureBridge {
    adapter: Arc<TemperatureAdapter>,
    binding: Arc<TemperatureBinding>,
    bus: Arc<dyn BroadcastBus>,
    actions: Actions,
    zones: ZoneSet,
}

impl TemperatureBridge {
    pub fn new(
        adapter: Arc<TemperatureAdapter>,
        binding: Arc<TemperatureBinding>,
        bus: Arc<dyn BroadcastBus>,
        actions: Actions,
        zones: ZoneSet,
    ) -> Self {
        Self {
            adapter,
            binding,
            bus,
            actions,
            zones,
        }
    }

    /// The inbound commands this bridge answers.
    pub fn filter(&self) -> IntentFilter {
        IntentFilter::new([
            self.actions.get_temperature.clone(),
            self.actions.set_temperature.clone(),
        ])
    }

    pub fn actions(&self) -> &Actions {
        &self.actions
    }

    /// Handle one inbound command.
    pub fn handle(&self, intent: &Intent) -> Result<()> {
        let action = intent.action();
        if action == self.actions.get_temperature {
            self.handle_get();
            Ok(())
        } else if action == self.actions.set_temperature {
            let value = intent.get_float_extra(EXTRA_TEMPERATURE_VALUE, SENTINEL);
            self.handle_set(value)
        } else {
            Err(HvacError::UnknownCommand(action.to_string()))
        }
    }

    /// Read the primary zone and broadcast the result, sentinel included.
    fn handle_get(&self) -> f32 {
        let temperature = self.adapter.read_or_sentinel(Zone::PRIMARY);
        debug!("[Bridge] {}: {}", EXTRA_TEMPERATURE_VALUE, temperature);
        self.bus.send_broadcast(
            Intent::new(self.actions.result_temperature.clone())
                .with_float_extra(EXTRA_TEMPERATURE_VALUE, temperature),
        );
        temperature
    }

    fn handle_set(&self, value: f32) -> Result<()> {
        if !is_valid(value) {
            return Err(HvacError::OutOfRangeValue(value));
        }
        self.adapter.write_zones(&self.zones, value);
        debug!("[Bridge] Temperature value: {}", value);
        self.binding.apply_external_value(value);
        Ok(())
    }

    fn handle_change(&self, event: &PropertyValue) {
        if event.property_id != HVAC_TEMPERATURE_SET {
            return;
        }
        debug!(
            "[Bridge] HVAC_TEMPERATURE_SET changed on area 0x{:X}: {} at {}",
            event.area_id,
            event.value,
            event.timestamp.format("%H:%M:%S%.3f")
        );
        self.binding.apply_external_value(event.value);

        debug!("[Bridge] Broadcasting {}: {}", self.actions.temperature_value, event.value);
        self.bus.send_broadcast(
            Intent::new(self.actions.temperature_value.clone())
                .with_float_extra(EXTRA_TEMPERATURE_VALUE, event.value),
        );
    }
}

impl BroadcastReceiver for TemperatureBridge {
    fn on_receive(&self, intent: &Intent) {
        match self.handle(intent) {
            Ok(()) => {}
            Err(e @ (HvacError::UnknownCommand(_) | HvacError::OutOfRangeValue(_))) => {
                error!("[Bridge] {}", e)
            }
            Err(e) => warn!("[Bridge] Failed to handle {}: {}", intent.action(), e),
        }
    }
}

impl PropertyEventCallback for TemperatureBridge {
    fn on_change_event(&self, event: &PropertyValue) {
        self.handle_change(event);
    }

    fn on_error_event(&self, property_id: i32, area_id: i32) {
        if property_id == HVAC_TEMPERATURE_SET {
            error!(
                "[Bridge] Error occurred in HVAC_TEMPERATURE_SET property (area 0x{:X})",
                area_id
            );
        }
    }
}
