//! Host-facing configuration surface.
//!
//! Parameters are declared once with their bounds, then read by the core and
//! written either by the core itself (`set`, applied immediately) or by the
//! host (`request`, queued and applied at the start of the next tick). Queued
//! changes replace the callback-style "value changed" handlers a host UI would
//! normally fire, so every mutation happens inside the frame that consumes it.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error("Unknown parameter '{0}'")]
    Unknown(String),
    #[error("Parameter '{name}' expects a {expected} value")]
    TypeMismatch { name: String, expected: &'static str },
    #[error("'{value}' is not a valid choice for '{name}'")]
    InvalidChoice { name: String, value: String },
}

/// Value carried by a parameter or a change request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Float(f32),
    Choice(String),
}

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Float(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v as f32)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Choice(v.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamSpec {
    Float { default: f32, min: f32, max: f32 },
    Bool { default: bool },
    /// An empty string is always accepted and means "none".
    Choice { default: String, choices: Vec<String> },
}

/// A change that was applied to the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamChange {
    pub name: String,
    pub value: ParamValue,
}

#[derive(Debug, Clone)]
struct ParamSlot {
    spec: ParamSpec,
    value: ParamValue,
}

#[derive(Debug, Default)]
pub struct ParamRegistry {
    slots: BTreeMap<String, ParamSlot>,
    saved: BTreeMap<String, ParamValue>,
    pending: VecDeque<ParamChange>,
}

impl ParamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that restores `saved` values as parameters get registered.
    pub fn with_saved(saved: BTreeMap<String, ParamValue>) -> Self {
        Self {
            saved,
            ..Self::default()
        }
    }

    pub fn register_float(&mut self, name: &str, default: f32, min: f32, max: f32) {
        self.register(name, ParamSpec::Float { default, min, max });
    }

    pub fn register_bool(&mut self, name: &str, default: bool) {
        self.register(name, ParamSpec::Bool { default });
    }

    pub fn register_choice(&mut self, name: &str, choices: &[&str], default: &str) {
        self.register(
            name,
            ParamSpec::Choice {
                default: default.to_string(),
                choices: choices.iter().map(|c| c.to_string()).collect(),
            },
        );
    }

    /// Replace the allowed values of a choice parameter. A current value that is
    /// no longer allowed falls back to "none".
    pub fn set_choices(&mut self, name: &str, choices: Vec<String>) -> Result<(), ParamError> {
        let slot = self.slots.get_mut(name).ok_or_else(|| ParamError::Unknown(name.to_string()))?;
        match &mut slot.spec {
            ParamSpec::Choice { choices: current, .. } => {
                *current = choices;
                if let ParamValue::Choice(value) = &slot.value {
                    if !value.is_empty() && !current.contains(value) {
                        slot.value = ParamValue::Choice(String::new());
                    }
                }
                Ok(())
            }
            _ => Err(ParamError::TypeMismatch {
                name: name.to_string(),
                expected: "choice",
            }),
        }
    }

    // Registering twice keeps the current value.
    fn register(&mut self, name: &str, spec: ParamSpec) {
        if self.slots.contains_key(name) {
            return;
        }
        let default = match &spec {
            ParamSpec::Float { default, .. } => ParamValue::Float(*default),
            ParamSpec::Bool { default } => ParamValue::Bool(*default),
            ParamSpec::Choice { default, .. } => ParamValue::Choice(default.clone()),
        };
        let mut slot = ParamSlot { spec, value: default };
        if let Some(saved) = self.saved.get(name) {
            match coerce(name, &slot.spec, saved.clone()) {
                Ok(value) => slot.value = value,
                Err(e) => tracing::warn!("Ignoring saved value for '{}': {}", name, e),
            }
        }
        self.slots.insert(name.to_string(), slot);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn spec(&self, name: &str) -> Option<&ParamSpec> {
        self.slots.get(name).map(|s| &s.spec)
    }

    pub fn value(&self, name: &str) -> Option<&ParamValue> {
        self.slots.get(name).map(|s| &s.value)
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        match self.value(name)? {
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.value(name)? {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn choice(&self, name: &str) -> Option<&str> {
        match self.value(name)? {
            ParamValue::Choice(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Apply a value immediately. Floats are clamped to their declared bounds.
    /// Returns the value actually stored.
    pub fn set(
        &mut self,
        name: &str,
        value: impl Into<ParamValue>,
    ) -> Result<ParamValue, ParamError> {
        let slot = self.slots.get_mut(name).ok_or_else(|| ParamError::Unknown(name.to_string()))?;
        let value = coerce(name, &slot.spec, value.into())?;
        slot.value = value.clone();
        Ok(value)
    }

    /// Queue a change from the host. It is applied by the next [`ParamRegistry::drain_changes`].
    pub fn request(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.pending.push_back(ParamChange {
            name: name.to_string(),
            value: value.into(),
        });
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Apply every queued change in order and return the ones that took effect,
    /// with their stored (clamped) values. Rejected changes are logged and dropped.
    pub fn drain_changes(&mut self) -> Vec<ParamChange> {
        let mut applied = Vec::with_capacity(self.pending.len());
        while let Some(change) = self.pending.pop_front() {
            match self.set(&change.name, change.value) {
                Ok(value) => applied.push(ParamChange {
                    name: change.name,
                    value,
                }),
                Err(e) => tracing::warn!("Rejected configuration change: {}", e),
            }
        }
        applied
    }

    /// Snapshot of every current value, suitable for saving.
    pub fn snapshot(&self) -> BTreeMap<String, ParamValue> {
        self.slots
            .iter()
            .map(|(name, slot)| (name.clone(), slot.value.clone()))
            .collect()
    }
}

fn coerce(name: &str, spec: &ParamSpec, value: ParamValue) -> Result<ParamValue, ParamError> {
    match (spec, value) {
        (ParamSpec::Float { min, max, .. }, ParamValue::Float(v)) => {
            Ok(ParamValue::Float(v.clamp(*min, *max)))
        }
        (ParamSpec::Bool { .. }, ParamValue::Bool(v)) => Ok(ParamValue::Bool(v)),
        (ParamSpec::Choice { choices, .. }, ParamValue::Choice(v)) => {
            if v.is_empty() || choices.contains(&v) {
                Ok(ParamValue::Choice(v))
            } else {
                Err(ParamError::InvalidChoice {
                    name: name.to_string(),
                    value: v,
                })
            }
        }
        (spec, _) => Err(ParamError::TypeMismatch {
            name: name.to_string(),
            expected: match spec {
                ParamSpec::Float { .. } => "float",
                ParamSpec::Bool { .. } => "bool",
                ParamSpec::Choice { .. } => "choice",
            },
        }),
    }
}
