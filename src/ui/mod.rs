//! UI side of the temperature screen.
//!
//! The picker and label are plain thread-safe state. All mutations go
//! through the [`UiExecutor`], the one thread that owns the controls.

pub mod binding;
pub mod executor;
pub mod picker;

pub use binding::{InitialValue, TemperatureBinding};
pub use executor::UiExecutor;
pub use picker::{EchoLabel, NumberPicker};
