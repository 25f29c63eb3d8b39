//! Broadcast messages: an action name plus typed extras.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Namespace prefixed to every action name unless configured otherwise.
pub const DEFAULT_NAMESPACE: &str = "com.example.privilegedsampleapp";

pub const ACTION_GET_TEMPERATURE: &str = "ACTION_GET_TEMPERATURE";
pub const ACTION_SET_TEMPERATURE: &str = "ACTION_SET_TEMPERATURE";
pub const RESULT_TEMPERATURE: &str = "RESULT_TEMPERATURE";
pub const TEMPERATURE_VALUE: &str = "TEMPERATURE_VALUE";

/// Extra key carrying the temperature on every message.
pub const EXTRA_TEMPERATURE_VALUE: &str = "TEMPERATURE_VALUE";

/// A typed extra value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Extra {
    Bool(bool),
    Int(i64),
    /// Kept at `f32` so serialized temperatures print as written
    Float(f32),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    action: String,
    extras: BTreeMap<String, Extra>,
}

impl Intent {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            extras: BTreeMap::new(),
        }
    }

    pub fn with_extras(action: impl Into<String>, extras: BTreeMap<String, Extra>) -> Self {
        Self {
            action: action.into(),
            extras,
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn extras(&self) -> &BTreeMap<String, Extra> {
        &self.extras
    }

    pub fn put_extra(&mut self, key: impl Into<String>, value: Extra) {
        self.extras.insert(key.into(), value);
    }

    pub fn with_float_extra(mut self, key: impl Into<String>, value: f32) -> Self {
        self.put_extra(key, Extra::Float(value));
        self
    }

    /// Numeric extra as `f32`, or `default` when absent or not a number.
    pub fn get_float_extra(&self, key: &str, default: f32) -> f32 {
        match self.extras.get(key) {
            Some(Extra::Float(value)) => *value,
            Some(Extra::Int(value)) => *value as f32,
            _ => default,
        }
    }
}

/// Fully qualified action names for one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actions {
    namespace: String,
    pub get_temperature: String,
    pub set_temperature: String,
    pub result_temperature: String,
    pub temperature_value: String,
}

impl Actions {
    pub fn new(namespace: &str) -> Self {
        let qualify = |name: &str| format!("{}.{}", namespace, name);
        Self {
            namespace: namespace.to_string(),
            get_temperature: qualify(ACTION_GET_TEMPERATURE),
            set_temperature: qualify(ACTION_SET_TEMPERATURE),
            result_temperature: qualify(RESULT_TEMPERATURE),
            temperature_value: qualify(TEMPERATURE_VALUE),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Qualify a bare action name with this namespace.
    pub fn qualify(&self, name: &str) -> String {
        format!("{}.{}", self.namespace, name)
    }

    /// Strip this namespace from a qualified action name.
    pub fn short_name<'a>(&self, action: &'a str) -> Option<&'a str> {
        action
            .strip_prefix(self.namespace.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
    }
}

impl Default for Actions {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

/// Set of actions a receiver is interested in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntentFilter {
    actions: Vec<String>,
}

impl IntentFilter {
    pub fn new<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut filter = Self::default();
        for action in actions {
            filter.add_action(action);
        }
        filter
    }

    pub fn add_action(&mut self, action: impl Into<String>) {
        let action = action.into();
        if !self.actions.contains(&action) {
            self.actions.push(action);
        }
    }

    pub fn matches(&self, intent: &Intent) -> bool {
        self.actions.iter().any(|action| action == intent.action())
    }
}
