//! Bounded integer picker and its echo label.
//!
//! Thread-safe control state that the UI thread mutates and any thread may
//! read. The picker tells programmatic assignments (`set_value`) apart from
//! user edits (`user_edit`): only the latter fire the value-changed listener.

use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};

/// Called with `(old, new)` after a user edit changed the value.
pub type ValueChangedListener = Arc<dyn Fn(i32, i32) + Send + Sync>;

/// Numeric picker with inclusive bounds.
///
/// The version is incremented each time the displayed value changes,
/// whichever path changed it.
pub struct NumberPicker {
    min: AtomicI32,
    max: AtomicI32,
    value: AtomicI32,
    version: AtomicU32,
    listener: RwLock<Option<ValueChangedListener>>,
}

impl NumberPicker {
    /// Create a picker with bounds `[0, 0]` and value 0.
    pub fn new() -> Self {
        Self {
            min: AtomicI32::new(0),
            max: AtomicI32::new(0),
            value: AtomicI32::new(0),
            version: AtomicU32::new(0),
            listener: RwLock::new(None),
        }
    }

    pub fn min_value(&self) -> i32 {
        self.min.load(Ordering::SeqCst)
    }

    pub fn max_value(&self) -> i32 {
        self.max.load(Ordering::SeqCst)
    }

    pub fn value(&self) -> i32 {
        self.value.load(Ordering::SeqCst)
    }

    pub fn version(&self) -> u32 {
        self.version.load(Ordering::SeqCst)
    }

    /// Whether `value` lies within the current bounds.
    pub fn contains(&self, value: i32) -> bool {
        (self.min_value()..=self.max_value()).contains(&value)
    }

    /// Set both bounds, swapping them if given in reverse. The current
    /// value is clamped into the new range without notifying the listener.
    pub fn set_bounds(&self, min: i32, max: i32) {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        self.min.store(min, Ordering::SeqCst);
        self.max.store(max, Ordering::SeqCst);
        self.set_value(self.value());
    }

    /// Programmatic assignment. Clamps into bounds, never notifies.
    ///
    /// Returns the value actually displayed.
    pub fn set_value(&self, value: i32) -> i32 {
        let clamped = self.clamp(value);
        let old = self.value.swap(clamped, Ordering::SeqCst);
        if old != clamped {
            self.version.fetch_add(1, Ordering::SeqCst);
        }
        clamped
    }

    /// A user edit. Clamps into bounds and notifies the listener if the
    /// value changed.
    pub fn user_edit(&self, value: i32) -> i32 {
        let clamped = self.clamp(value);
        let old = self.value.swap(clamped, Ordering::SeqCst);
        if old != clamped {
            self.version.fetch_add(1, Ordering::SeqCst);
            // Clone out so the listener runs without the lock held
            let listener = self.listener.read().clone();
            if let Some(listener) = listener {
                listener(old, clamped);
            }
        }
        clamped
    }

    pub fn set_on_value_changed_listener(&self, listener: ValueChangedListener) {
        *self.listener.write() = Some(listener);
    }

    pub fn clear_listener(&self) {
        *self.listener.write() = None;
    }

    pub fn has_listener(&self) -> bool {
        self.listener.read().is_some()
    }

    fn clamp(&self, value: i32) -> i32 {
        // Not `i32::clamp`: a concurrent `set_bounds` may briefly leave min > max
        value.max(self.min_value()).min(self.max_value())
    }
}

impl Default for NumberPicker {
    fn default() -> Self {
        Self::new()
    }
}

/// Text label echoing the last chosen value.
#[derive(Default)]
pub struct EchoLabel {
    text: RwLock<String>,
}

impl EchoLabel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.text.read().clone()
    }

    pub fn set_text(&self, text: impl Into<String>) {
        *self.text.write() = text.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn picker_16_32() -> NumberPicker {
        let picker = NumberPicker::new();
        picker.set_bounds(16, 32);
        picker
    }

    #[test]
    fn test_bounds_clamp_value() {
        let picker = picker_16_32();
        assert_eq!(picker.value(), 16);
        assert_eq!(picker.min_value(), 16);
        assert_eq!(picker.max_value(), 32);

        assert_eq!(picker.set_value(40), 32);
        assert_eq!(picker.set_value(-1), 16);

        picker.set_bounds(30, 20);
        assert_eq!((picker.min_value(), picker.max_value()), (20, 30));
        assert_eq!(picker.value(), 20);
    }

    #[test]
    fn test_set_value_does_not_notify() {
        let picker = picker_16_32();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = calls.clone();
        picker.set_on_value_changed_listener(Arc::new(move |old: i32, new: i32| {
            calls_clone.lock().push((old, new));
        }));

        picker.set_value(20);
        assert_eq!(picker.value(), 20);
        assert!(calls.lock().is_empty());

        picker.user_edit(24);
        picker.user_edit(24);
        assert_eq!(*calls.lock(), vec![(20, 24)]);
    }

    #[test]
    fn test_version_tracks_changes() {
        let picker = picker_16_32();
        let start = picker.version();

        picker.set_value(20);
        assert_eq!(picker.version(), start + 1);

        // Same value doesn't increment
        picker.set_value(20);
        assert_eq!(picker.version(), start + 1);

        picker.user_edit(21);
        assert_eq!(picker.version(), start + 2);
    }

    #[test]
    fn test_clear_listener() {
        let picker = picker_16_32();
        let calls = Arc::new(Mutex::new(0));
        let calls_clone = calls.clone();
        picker.set_on_value_changed_listener(Arc::new(move |_: i32, _: i32| *calls_clone.lock() += 1));
        assert!(picker.has_listener());

        picker.clear_listener();
        picker.user_edit(25);
        assert_eq!(*calls.lock(), 0);
        assert_eq!(picker.value(), 25);
    }

    #[test]
    fn test_echo_label() {
        let label = EchoLabel::new();
        assert_eq!(label.text(), "");
        label.set_text("21");
        assert_eq!(label.text(), "21");
    }
}
