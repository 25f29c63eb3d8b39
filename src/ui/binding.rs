//! Binds the temperature picker to the property store.
//!
//! User edits on the picker become store writes. Values arriving from
//! elsewhere (change events, SET commands) are shown through programmatic
//! assignment on the UI thread, which never feeds back into a write.

use super::executor::UiExecutor;
use super::picker::{EchoLabel, NumberPicker};
use crate::store::TemperatureAdapter;
use crate::temperature::{MAX_TEMPERATURE, MIN_TEMPERATURE, Zone, ZoneSet, to_picker_value};
use log::{debug, error, info};
use std::sync::Arc;

/// Where the picker's first value comes from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InitialValue {
    /// Current store reading for the zone; the sentinel if the read fails.
    ReadFromStore(Zone),
    Fixed(f32),
}

pub struct TemperatureBinding {
    adapter: Arc<TemperatureAdapter>,
    picker: Arc<NumberPicker>,
    label: Option<Arc<EchoLabel>>,
    zones: ZoneSet,
    ui: Arc<UiExecutor>,
}

impl TemperatureBinding {
    pub fn new(
        adapter: Arc<TemperatureAdapter>,
        picker: Arc<NumberPicker>,
        label: Option<Arc<EchoLabel>>,
        zones: ZoneSet,
        ui: Arc<UiExecutor>,
    ) -> Self {
        Self {
            adapter,
            picker,
            label,
            zones,
            ui,
        }
    }

    pub fn picker(&self) -> &Arc<NumberPicker> {
        &self.picker
    }

    pub fn label(&self) -> Option<&Arc<EchoLabel>> {
        self.label.as_ref()
    }

    pub fn zones(&self) -> &ZoneSet {
        &self.zones
    }

    /// Set the picker bounds, show the initial value clamped into them and
    /// hook up the user-edit listener. Runs on the UI thread.
    pub fn initialize(self: &Arc<Self>, initial: InitialValue) -> bool {
        let value = match initial {
            InitialValue::ReadFromStore(zone) => self.adapter.read_or_sentinel(zone),
            InitialValue::Fixed(value) => value,
        };

        let binding = Arc::downgrade(self);
        let picker = self.picker.clone();
        self.ui.run_on_ui_thread(move || {
            picker.set_bounds(MIN_TEMPERATURE as i32, MAX_TEMPERATURE as i32);
            let shown = picker.set_value(to_picker_value(value));
            picker.set_on_value_changed_listener(Arc::new(move |_old: i32, new: i32| {
                if let Some(binding) = binding.upgrade() {
                    binding.on_user_edit(new);
                }
            }));
            info!("[UI] Picker initialized to {} (source value {})", shown, value);
        })
    }

    /// The user picked `value`: write it to every configured zone.
    pub fn on_user_edit(&self, value: i32) {
        info!("[UI] User selected {}", value);
        self.adapter.write_zones(&self.zones, value as f32);
        if let Some(label) = &self.label {
            label.set_text(value.to_string());
        }
    }

    /// Show a value that came from outside the picker.
    ///
    /// Out-of-range values are logged and leave the picker untouched.
    pub fn apply_external_value(&self, value: f32) -> bool {
        let picker = self.picker.clone();
        self.ui.run_on_ui_thread(move || {
            let value = to_picker_value(value);
            if picker.contains(value) {
                picker.set_value(value);
                debug!("[UI] Picker updated to {}", value);
            } else {
                error!("[UI] Value {} out of picker range", value);
            }
        })
    }

    /// Queue a user edit on the UI thread, as if the user turned the picker.
    pub fn post_user_edit(&self, value: i32) -> bool {
        let picker = self.picker.clone();
        self.ui.post(move || {
            picker.user_edit(value);
        })
    }

    /// Disconnect the picker from the store.
    pub fn detach(&self) {
        self.picker.clear_listener();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryPropertyStore;
    use crate::temperature::HVAC_TEMPERATURE_SET;

    struct Fixture {
        store: Arc<InMemoryPropertyStore>,
        ui: Arc<UiExecutor>,
        binding: Arc<TemperatureBinding>,
    }

    fn fixture(zones: ZoneSet, label: bool) -> Fixture {
        let store = Arc::new(InMemoryPropertyStore::with_hvac_zones(22.0).unwrap());
        let adapter = Arc::new(TemperatureAdapter::new(store.clone()));
        let ui = Arc::new(UiExecutor::start().unwrap());
        let binding = Arc::new(TemperatureBinding::new(
            adapter,
            Arc::new(NumberPicker::new()),
            label.then(|| Arc::new(EchoLabel::new())),
            zones,
            ui.clone(),
        ));
        Fixture { store, ui, binding }
    }

    #[test]
    fn test_initialize_reads_store() {
        let f = fixture(ZoneSet::primary(), false);
        f.binding.initialize(InitialValue::ReadFromStore(Zone::Right));
        f.ui.barrier().unwrap();

        let picker = f.binding.picker();
        assert_eq!((picker.min_value(), picker.max_value()), (16, 32));
        assert_eq!(picker.value(), 22);
        assert!(picker.has_listener());
    }

    #[test]
    fn test_initialize_clamps_sentinel() {
        let f = fixture(ZoneSet::primary(), false);
        f.store.deny_access(Zone::Right.area_id());
        f.binding.initialize(InitialValue::ReadFromStore(Zone::Right));
        f.ui.barrier().unwrap();

        assert_eq!(f.binding.picker().value(), 16);
        assert_eq!(f.store.set_calls(), 0);
    }

    #[test]
    fn test_user_edit_writes_configured_zones() {
        let f = fixture(ZoneSet::both(), true);
        f.binding.initialize(InitialValue::Fixed(22.0));
        f.binding.post_user_edit(27);
        f.ui.barrier().unwrap();

        assert_eq!(f.store.peek(HVAC_TEMPERATURE_SET, 0x44), Some(27.0));
        assert_eq!(f.store.peek(HVAC_TEMPERATURE_SET, 0x31), Some(27.0));
        assert_eq!(f.binding.label().unwrap().text(), "27");
    }

    #[test]
    fn test_user_edit_primary_only() {
        let f = fixture(ZoneSet::primary(), false);
        f.binding.initialize(InitialValue::Fixed(22.0));
        f.binding.post_user_edit(18);
        f.ui.barrier().unwrap();

        assert_eq!(f.store.peek(HVAC_TEMPERATURE_SET, 0x44), Some(18.0));
        assert_eq!(f.store.peek(HVAC_TEMPERATURE_SET, 0x31), Some(22.0));
        assert_eq!(f.store.set_calls(), 1);
    }

    #[test]
    fn test_external_value_does_not_write() {
        let f = fixture(ZoneSet::both(), false);
        f.binding.initialize(InitialValue::Fixed(22.0));
        f.binding.apply_external_value(30.0);
        f.ui.barrier().unwrap();

        assert_eq!(f.binding.picker().value(), 30);
        assert_eq!(f.store.set_calls(), 0);
    }

    #[test]
    fn test_external_value_out_of_range_ignored() {
        let f = fixture(ZoneSet::primary(), false);
        f.binding.initialize(InitialValue::Fixed(20.0));
        f.ui.barrier().unwrap();
        let version = f.binding.picker().version();

        f.binding.apply_external_value(40.0);
        f.binding.apply_external_value(15.5);
        f.ui.barrier().unwrap();

        assert_eq!(f.binding.picker().value(), 20);
        assert_eq!(f.binding.picker().version(), version);
    }

    #[test]
    fn test_detach_stops_writes() {
        let f = fixture(ZoneSet::primary(), false);
        f.binding.initialize(InitialValue::Fixed(20.0));
        f.ui.barrier().unwrap();

        f.binding.detach();
        f.binding.post_user_edit(25);
        f.ui.barrier().unwrap();

        assert_eq!(f.binding.picker().value(), 25);
        assert_eq!(f.store.set_calls(), 0);
    }
}
