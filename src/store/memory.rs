//! Simulated vehicle property store.
//!
//! Holds float properties per (property id, area id) and delivers change
//! events on its own dispatch thread, the way the vehicle HAL does. Access
//! can be denied per area and the whole transport can be failed to exercise
//! the error paths.

use super::{CallbackId, PropertyEventCallback, PropertyService, PropertyStore, PropertyValue};
use crate::dispatch::DispatchQueue;
use crate::error::{HvacError, PropertyError, Result};
use crate::temperature::{HVAC_TEMPERATURE_SET, Zone};
use log::{debug, info};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Initial target temperature of the simulated vehicle.
pub const DEFAULT_SIMULATED_TEMPERATURE: f32 = 22.0;

enum StoreEvent {
    Change(PropertyValue),
    Error { property_id: i32, area_id: i32 },
}

struct Registration {
    property_id: i32,
    callback: Arc<dyn PropertyEventCallback>,
}

#[derive(Default)]
struct Shared {
    callbacks: RwLock<HashMap<CallbackId, Registration>>,
}

impl Shared {
    // The read lock is held for the whole delivery so that unregistering
    // waits for an in-flight callback to return.
    fn deliver(&self, event: StoreEvent) {
        let callbacks = self.callbacks.read();
        match event {
            StoreEvent::Change(value) => {
                for registration in callbacks.values() {
                    if registration.property_id == value.property_id {
                        registration.callback.on_change_event(&value);
                    }
                }
            }
            StoreEvent::Error {
                property_id,
                area_id,
            } => {
                for registration in callbacks.values() {
                    if registration.property_id == property_id {
                        registration.callback.on_error_event(property_id, area_id);
                    }
                }
            }
        }
    }
}

/// In-process stand-in for the vehicle property service.
pub struct InMemoryPropertyStore {
    values: RwLock<HashMap<(i32, i32), f32>>,
    denied_areas: RwLock<HashSet<i32>>,
    transport_failure: RwLock<Option<String>>,
    shared: Arc<Shared>,
    next_id: AtomicU64,
    set_calls: AtomicU64,
    dispatcher: DispatchQueue<StoreEvent>,
}

impl InMemoryPropertyStore {
    /// Create an empty store with its dispatch thread.
    pub fn new() -> Result<Self> {
        let shared = Arc::new(Shared::default());
        let delivery = shared.clone();
        let dispatcher = DispatchQueue::spawn("property-dispatch", move |event| {
            delivery.deliver(event);
        })?;

        Ok(Self {
            values: RwLock::new(HashMap::new()),
            denied_areas: RwLock::new(HashSet::new()),
            transport_failure: RwLock::new(None),
            shared,
            next_id: AtomicU64::new(1),
            set_calls: AtomicU64::new(0),
            dispatcher,
        })
    }

    /// A store exposing the HVAC target temperature on both zones.
    pub fn with_hvac_zones(initial: f32) -> Result<Self> {
        let store = Self::new()?;
        for zone in [Zone::Right, Zone::Left] {
            store.add_property(HVAC_TEMPERATURE_SET, zone.area_id(), initial);
        }
        Ok(store)
    }

    /// Declare a property/area pair with its initial value.
    pub fn add_property(&self, property_id: i32, area_id: i32, initial: f32) {
        self.values.write().insert((property_id, area_id), initial);
    }

    /// Reject reads and writes on `area_id` with `PermissionDenied`.
    pub fn deny_access(&self, area_id: i32) {
        self.denied_areas.write().insert(area_id);
    }

    pub fn allow_access(&self, area_id: i32) {
        self.denied_areas.write().remove(&area_id);
    }

    /// Fail every read and write with `Transport` until cleared with `None`.
    pub fn set_transport_failure(&self, reason: Option<String>) {
        *self.transport_failure.write() = reason;
    }

    /// Value change originating from the vehicle itself, bypassing permissions.
    pub fn inject_hardware_change(&self, property_id: i32, area_id: i32, value: f32) {
        self.values.write().insert((property_id, area_id), value);
        debug!(
            "[Store] Hardware change 0x{:08X}@0x{:X} = {}",
            property_id, area_id, value
        );
        self.dispatcher
            .send(StoreEvent::Change(PropertyValue::new(property_id, area_id, value)));
    }

    /// Error condition signalled by the vehicle for a property.
    pub fn inject_error_event(&self, property_id: i32, area_id: i32) {
        self.dispatcher.send(StoreEvent::Error {
            property_id,
            area_id,
        });
    }

    /// Current raw value, ignoring permissions and failures.
    pub fn peek(&self, property_id: i32, area_id: i32) -> Option<f32> {
        self.values.read().get(&(property_id, area_id)).copied()
    }

    /// Number of `set_float` calls made, successful or not.
    pub fn set_calls(&self) -> u64 {
        self.set_calls.load(Ordering::SeqCst)
    }

    pub fn callback_count(&self) -> usize {
        self.shared.callbacks.read().len()
    }

    /// Wait until every queued event has been delivered.
    pub fn flush(&self) -> Result<()> {
        self.dispatcher.barrier()
    }

    fn check_access(&self, property_id: i32, area_id: i32) -> std::result::Result<(), PropertyError> {
        if let Some(reason) = self.transport_failure.read().as_ref() {
            return Err(PropertyError::Transport(reason.clone()));
        }
        if self.denied_areas.read().contains(&area_id) {
            return Err(PropertyError::PermissionDenied {
                property_id,
                area_id,
            });
        }
        if !self.values.read().contains_key(&(property_id, area_id)) {
            return Err(PropertyError::InvalidIdentifier {
                property_id,
                area_id,
            });
        }
        Ok(())
    }
}

impl PropertyStore for InMemoryPropertyStore {
    fn get_float(&self, property_id: i32, area_id: i32) -> std::result::Result<f32, PropertyError> {
        self.check_access(property_id, area_id)?;
        self.values
            .read()
            .get(&(property_id, area_id))
            .copied()
            .ok_or(PropertyError::InvalidIdentifier {
                property_id,
                area_id,
            })
    }

    fn set_float(
        &self,
        property_id: i32,
        area_id: i32,
        value: f32,
    ) -> std::result::Result<(), PropertyError> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.check_access(property_id, area_id)?;

        let old = self.values.write().insert((property_id, area_id), value);
        // On-change semantics: rewriting the same value stays silent
        if old != Some(value) {
            self.dispatcher
                .send(StoreEvent::Change(PropertyValue::new(property_id, area_id, value)));
        }
        Ok(())
    }

    fn register_callback(
        &self,
        property_id: i32,
        callback: Arc<dyn PropertyEventCallback>,
    ) -> std::result::Result<CallbackId, PropertyError> {
        if let Some(reason) = self.transport_failure.read().as_ref() {
            return Err(PropertyError::Transport(reason.clone()));
        }
        let known = self
            .values
            .read()
            .keys()
            .any(|(property, _)| *property == property_id);
        if !known {
            return Err(PropertyError::InvalidIdentifier {
                property_id,
                area_id: 0,
            });
        }

        let id = CallbackId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.shared.callbacks.write().insert(
            id,
            Registration {
                property_id,
                callback,
            },
        );
        debug!("[Store] Registered callback {:?} for 0x{:08X}", id, property_id);
        Ok(id)
    }

    fn unregister_callback(&self, id: CallbackId) -> bool {
        let removed = self.shared.callbacks.write().remove(&id).is_some();
        if removed {
            debug!("[Store] Unregistered callback {:?}", id);
        }
        removed
    }
}

/// [`PropertyService`] handing out a shared [`InMemoryPropertyStore`].
pub struct InMemoryPropertyService {
    store: Option<Arc<InMemoryPropertyStore>>,
}

impl InMemoryPropertyService {
    pub fn new(store: Arc<InMemoryPropertyStore>) -> Self {
        Self { store: Some(store) }
    }

    /// A service whose `connect` always fails.
    pub fn unavailable() -> Self {
        Self { store: None }
    }
}

impl PropertyService for InMemoryPropertyService {
    fn connect(&self) -> Result<Arc<dyn PropertyStore>> {
        match &self.store {
            Some(store) => {
                info!("[Store] Connected to simulated property service");
                Ok(store.clone())
            }
            None => Err(HvacError::Connect(
                "property service is not available".to_string(),
            )),
        }
    }
}
