//! Temperature view of the vehicle property store.

use super::{CallbackId, PropertyEventCallback, PropertyService, PropertyStore};
use crate::error::{HvacError, PropertyError, Result};
use crate::temperature::{HVAC_TEMPERATURE_SET, SENTINEL, Zone, ZoneSet};
use log::{debug, error, info};
use parking_lot::Mutex;
use std::sync::Arc;

/// Reads and writes the HVAC target temperature and owns the single
/// change subscription for it.
pub struct TemperatureAdapter {
    store: Arc<dyn PropertyStore>,
    subscription: Mutex<Option<CallbackId>>,
}

impl TemperatureAdapter {
    /// Connect to the property service. Failure here is fatal for the screen.
    pub fn connect(service: &dyn PropertyService) -> Result<Self> {
        let store = service.connect()?;
        info!("[Store] Property service connected");
        Ok(Self::new(store))
    }

    pub fn new(store: Arc<dyn PropertyStore>) -> Self {
        Self {
            store,
            subscription: Mutex::new(None),
        }
    }

    pub fn read_temperature(&self, zone: Zone) -> std::result::Result<f32, PropertyError> {
        let value = self.store.get_float(HVAC_TEMPERATURE_SET, zone.area_id())?;
        debug!("[Store] Temperature retrieved for {}: {}", zone, value);
        Ok(value)
    }

    /// Read `zone`, logging any failure and returning [`SENTINEL`] instead.
    pub fn read_or_sentinel(&self, zone: Zone) -> f32 {
        match self.read_temperature(zone) {
            Ok(value) => value,
            Err(e) => {
                error!("[Store] Error retrieving temperature: {}", e);
                SENTINEL
            }
        }
    }

    pub fn write_temperature(&self, zone: Zone, value: f32) -> std::result::Result<(), PropertyError> {
        self.store
            .set_float(HVAC_TEMPERATURE_SET, zone.area_id(), value)?;
        debug!("[Store] Temperature for {} set to: {}", zone, value);
        Ok(())
    }

    /// Write `value` to every zone in `zones`.
    ///
    /// Each failed write is logged and dropped, the remaining zones are still
    /// written. Returns the number of zones written successfully.
    pub fn write_zones(&self, zones: &ZoneSet, value: f32) -> usize {
        let mut written = 0;
        for zone in zones.iter() {
            match self.write_temperature(zone, value) {
                Ok(()) => written += 1,
                Err(e) => error!("[Store] Error setting temperature for {}: {}", zone, e),
            }
        }
        written
    }

    /// Register the one change listener for the temperature property.
    pub fn subscribe(&self, callback: Arc<dyn PropertyEventCallback>) -> Result<()> {
        let mut subscription = self.subscription.lock();
        if subscription.is_some() {
            return Err(HvacError::AlreadySubscribed);
        }
        let id = self.store.register_callback(HVAC_TEMPERATURE_SET, callback)?;
        *subscription = Some(id);
        debug!("[Store] Temperature listener registered");
        Ok(())
    }

    /// Drop the change listener. Returns false if none was registered.
    pub fn unsubscribe(&self) -> bool {
        match self.subscription.lock().take() {
            Some(id) => {
                self.store.unregister_callback(id);
                debug!("[Store] Temperature listener unregistered");
                true
            }
            None => false,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.lock().is_some()
    }
}

impl Drop for TemperatureAdapter {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
