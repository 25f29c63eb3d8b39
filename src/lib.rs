//! HVAC temperature bridge library.
//!
//! Keeps the HVAC target temperature consistent between the vehicle property
//! store, an on-screen picker and external broadcast messages.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod messaging;
pub mod screen;
pub mod simulation;
pub mod store;
pub mod temperature;
pub mod ui;

pub use error::{HvacError, PropertyError, Result};
pub use screen::TemperatureScreen;
