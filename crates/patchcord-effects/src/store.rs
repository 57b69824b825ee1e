//! Named configuration values held by an effect.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::EffectError;

/// An effect's configuration, keyed by setting name.
///
/// The set of names is fixed when the store is built from the typed settings
/// an effect was constructed with: only fields that were actually supplied
/// become entries. [`update()`](Self::update) can change an existing entry
/// but never introduces a new name.
///
/// The store is independent of the live graph. Writing to it does not touch
/// any node.
///
/// ```rust
/// use patchcord_effects::{FilterSettings, ParameterStore};
/// use serde_json::json;
///
/// let settings = FilterSettings { freq: Some(800.0), ..Default::default() };
/// let mut store = ParameterStore::from_settings(&settings);
///
/// assert!(store.update("freq", json!(1200.0)).is_ok());
/// assert!(store.update("resonance", json!(2.0)).is_err());
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterStore {
    values: Map<String, Value>,
}

impl ParameterStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a serializable settings struct.
    ///
    /// `null` fields are left out. Anything that does not serialize to an
    /// object yields an empty store.
    pub fn from_settings<T: Serialize>(settings: &T) -> Self {
        let values = match serde_json::to_value(settings) {
            Ok(Value::Object(map)) => map.into_iter().filter(|(_, v)| !v.is_null()).collect(),
            _ => Map::new(),
        };
        Self { values }
    }

    /// Returns the value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns the value under `name` as a number.
    pub fn get_f32(&self, name: &str) -> Option<f32> {
        self.values.get(name).and_then(Value::as_f64).map(|v| v as f32)
    }

    /// Returns the value under `name` as a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    /// Returns `true` if `name` is part of this configuration.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Replaces the value of an existing setting.
    ///
    /// Unknown names leave the store unchanged and fail with
    /// [`EffectError::UnknownSetting`].
    pub fn update(&mut self, name: &str, value: Value) -> Result<(), EffectError> {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => {
                tracing::info!(setting = name, "setting was not found");
                Err(EffectError::UnknownSetting(name.to_owned()))
            }
        }
    }

    /// Swaps in a whole new configuration.
    pub fn replace(&mut self, other: ParameterStore) {
        self.values = other.values;
    }

    /// Mirrors a live change into the store if the name is configured.
    pub(crate) fn record(&mut self, name: &str, value: impl Into<Value>) {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value.into();
        }
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of settings.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no settings were supplied.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
