//! External messaging for the temperature screen.
//!
//! Commands and notifications travel as [`Intent`]s over a [`BroadcastBus`].
//! [`TemperatureBridge`] answers GET/SET commands and republishes store
//! changes; [`mqtt`] carries the same intents to and from an MQTT broker.

pub mod bridge;
pub mod bus;
pub mod intent;
pub mod mqtt;

pub use bridge::TemperatureBridge;
pub use bus::{BroadcastBus, BroadcastReceiver, LocalBus, ReceiverId};
pub use intent::{Actions, EXTRA_TEMPERATURE_VALUE, Extra, Intent, IntentFilter};
