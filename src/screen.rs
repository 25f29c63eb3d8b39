//! The temperature screen: owns every piece and their registrations.
//!
//! Creating the screen connects to the property service, builds the picker
//! binding and the bridge, and registers the change listener and the command
//! receiver exactly once. Destroying it undoes both registrations and stops
//! the UI thread. Nothing outlives the screen.

use crate::config::ScreenConfig;
use crate::error::Result;
use crate::messaging::{Actions, BroadcastBus, ReceiverId, TemperatureBridge};
use crate::store::{PropertyService, TemperatureAdapter};
use crate::ui::{EchoLabel, NumberPicker, TemperatureBinding, UiExecutor};
use log::info;
use parking_lot::Mutex;
use std::sync::Arc;

pub struct TemperatureScreen {
    adapter: Arc<TemperatureAdapter>,
    binding: Arc<TemperatureBinding>,
    bridge: Arc<TemperatureBridge>,
    bus: Arc<dyn BroadcastBus>,
    ui: Arc<UiExecutor>,
    receiver: Mutex<Option<ReceiverId>>,
}

impl TemperatureScreen {
    /// Bring the screen up. Fails only if the property service cannot be
    /// reached or the change listener cannot be registered.
    pub fn create(
        config: &ScreenConfig,
        actions: Actions,
        service: &dyn PropertyService,
        bus: Arc<dyn BroadcastBus>,
    ) -> Result<Self> {
        let adapter = Arc::new(TemperatureAdapter::connect(service)?);
        let ui = Arc::new(UiExecutor::start()?);

        let picker = Arc::new(NumberPicker::new());
        let label = config.echo_label.then(|| Arc::new(EchoLabel::new()));
        let binding = Arc::new(TemperatureBinding::new(
            adapter.clone(),
            picker,
            label,
            config.write_zones.clone(),
            ui.clone(),
        ));
        binding.initialize(config.initial_value());

        let bridge = Arc::new(TemperatureBridge::new(
            adapter.clone(),
            binding.clone(),
            bus.clone(),
            actions,
            config.write_zones.clone(),
        ));

        if let Err(e) = adapter.subscribe(bridge.clone()) {
            binding.detach();
            ui.shutdown();
            return Err(e);
        }
        let receiver = bus.register_receiver(bridge.filter(), bridge.clone());

        info!(
            "[Screen] Created ({}, writing {})",
            config.variant, config.write_zones
        );

        Ok(Self {
            adapter,
            binding,
            bridge,
            bus,
            ui,
            receiver: Mutex::new(Some(receiver)),
        })
    }

    pub fn picker(&self) -> &Arc<NumberPicker> {
        self.binding.picker()
    }

    pub fn label(&self) -> Option<&Arc<EchoLabel>> {
        self.binding.label()
    }

    pub fn binding(&self) -> &Arc<TemperatureBinding> {
        &self.binding
    }

    pub fn bridge(&self) -> &Arc<TemperatureBridge> {
        &self.bridge
    }

    pub fn adapter(&self) -> &Arc<TemperatureAdapter> {
        &self.adapter
    }

    pub fn ui(&self) -> &Arc<UiExecutor> {
        &self.ui
    }

    pub fn is_active(&self) -> bool {
        self.receiver.lock().is_some()
    }

    /// Tear the screen down. Idempotent.
    pub fn destroy(&self) {
        let Some(receiver) = self.receiver.lock().take() else {
            return;
        };
        self.bus.unregister_receiver(receiver);
        self.adapter.unsubscribe();
        self.binding.detach();
        self.ui.shutdown();
        info!("[Screen] Destroyed");
    }
}

impl Drop for TemperatureScreen {
    fn drop(&mut self) {
        self.destroy();
    }
}
