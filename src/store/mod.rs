//! Vehicle property store access.
//!
//! The host property service is reached through [`PropertyService`] and
//! [`PropertyStore`]. [`TemperatureAdapter`] narrows it down to the one
//! property this crate manages, and [`InMemoryPropertyStore`] is a simulated
//! vehicle used by the binary and the tests.

pub mod adapter;
pub mod memory;

pub use adapter::TemperatureAdapter;
pub use memory::{InMemoryPropertyService, InMemoryPropertyStore};

use crate::error::{PropertyError, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// A float property value as delivered by change events.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyValue {
    pub property_id: i32,
    pub area_id: i32,
    pub value: f32,
    pub timestamp: DateTime<Utc>,
}

impl PropertyValue {
    pub fn new(property_id: i32, area_id: i32, value: f32) -> Self {
        Self {
            property_id,
            area_id,
            value,
            timestamp: Utc::now(),
        }
    }
}

/// Receives change and error events for a registered property.
///
/// Invoked on the store's dispatch thread, never on the thread that caused
/// the change. Implementations must not register or unregister callbacks
/// from inside these methods.
pub trait PropertyEventCallback: Send + Sync {
    fn on_change_event(&self, event: &PropertyValue);

    fn on_error_event(&self, property_id: i32, area_id: i32);
}

/// Handle returned by [`PropertyStore::register_callback`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CallbackId(pub u64);

/// Float-valued vehicle properties keyed by property id and area id.
pub trait PropertyStore: Send + Sync {
    fn get_float(&self, property_id: i32, area_id: i32) -> std::result::Result<f32, PropertyError>;

    fn set_float(
        &self,
        property_id: i32,
        area_id: i32,
        value: f32,
    ) -> std::result::Result<(), PropertyError>;

    /// Register for change and error events on every area of `property_id`.
    fn register_callback(
        &self,
        property_id: i32,
        callback: Arc<dyn PropertyEventCallback>,
    ) -> std::result::Result<CallbackId, PropertyError>;

    /// Remove a registration. Once this returns the callback is never invoked again.
    fn unregister_callback(&self, id: CallbackId) -> bool;
}

/// Connects to the host property service.
pub trait PropertyService: Send + Sync {
    fn connect(&self) -> Result<Arc<dyn PropertyStore>>;
}
