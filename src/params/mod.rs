//! Host-automatable parameters
//!
//! Values are stored as `f32` bits inside `AtomicU32`s so the audio thread can
//! read them without locking while control threads write them.

pub mod state;

pub use state::{PersistedParameter, PersistedState, STATE_TAG};

use crate::error::StateError;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};

/// Units for parameter values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParameterUnit {
    Generic,
    Decibels,
}

impl ParameterUnit {
    /// Suffix shown after a value in the UI
    pub fn suffix(&self) -> &'static str {
        match self {
            ParameterUnit::Generic => "",
            ParameterUnit::Decibels => " dB",
        }
    }
}

/// Static description of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub unit: ParameterUnit,
}

impl ParameterInfo {
    /// Clamp a plain value into range
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    /// Map a plain value to 0..1
    pub fn normalize(&self, value: f32) -> f32 {
        ((self.clamp(value) - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }

    /// Map a 0..1 value back to the plain range
    pub fn denormalize(&self, normalized: f32) -> f32 {
        self.clamp(self.min + normalized.clamp(0.0, 1.0) * (self.max - self.min))
    }
}

/// Identifiers for the effect's parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    /// Dry/wet blend, 0 = dry, 1 = wet
    Mix,
    /// Wet path gain in dB
    Gain,
}

impl ParamId {
    pub const ALL: [ParamId; 2] = [ParamId::Mix, ParamId::Gain];

    pub fn index(self) -> usize {
        match self {
            ParamId::Mix => 0,
            ParamId::Gain => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.info().id
    }

    pub fn info(self) -> &'static ParameterInfo {
        &PARAMETERS[self.index()]
    }

    /// Look up a parameter by its string id (exact match)
    pub fn from_id(id: &str) -> Option<ParamId> {
        ParamId::ALL.into_iter().find(|param| param.as_str() == id)
    }
}

/// Descriptors in declaration order, indexed by `ParamId::index`
pub static PARAMETERS: [ParameterInfo; 2] = [
    ParameterInfo {
        id: "mix",
        name: "Mix",
        min: 0.0,
        max: 1.0,
        default: 1.0,
        unit: ParameterUnit::Generic,
    },
    ParameterInfo {
        id: "gain",
        name: "Gain",
        min: -24.0,
        max: 24.0,
        default: 0.0,
        unit: ParameterUnit::Decibels,
    },
];

/// Lock-free parameter storage shared between control and audio threads
pub struct ParameterStore {
    values: [AtomicU32; 2],
}

impl ParameterStore {
    /// Create a store with every parameter at its default
    pub fn new() -> Self {
        Self {
            values: [
                AtomicU32::new(PARAMETERS[0].default.to_bits()),
                AtomicU32::new(PARAMETERS[1].default.to_bits()),
            ],
        }
    }

    /// Parameter descriptors in declaration order
    pub fn infos(&self) -> &'static [ParameterInfo] {
        &PARAMETERS
    }

    /// Read a parameter (real-time safe)
    #[inline]
    pub fn value(&self, id: ParamId) -> f32 {
        f32::from_bits(self.values[id.index()].load(Ordering::Relaxed))
    }

    /// Write a parameter, clamped to its range. Non-finite values are ignored.
    pub fn set_value(&self, id: ParamId, value: f32) -> bool {
        if !value.is_finite() {
            return false;
        }
        let clamped = id.info().clamp(value);
        self.values[id.index()].store(clamped.to_bits(), Ordering::Relaxed);
        true
    }

    /// Read a parameter by string id
    pub fn get(&self, id: &str) -> Option<f32> {
        ParamId::from_id(id).map(|param| self.value(param))
    }

    /// Write a parameter by string id. Returns false for unknown ids or non-finite values.
    pub fn set(&self, id: &str, value: f32) -> bool {
        match ParamId::from_id(id) {
            Some(param) => self.set_value(param, value),
            None => false,
        }
    }

    pub fn get_normalized(&self, id: ParamId) -> f32 {
        id.info().normalize(self.value(id))
    }

    pub fn set_normalized(&self, id: ParamId, normalized: f32) -> bool {
        if !normalized.is_finite() {
            return false;
        }
        self.set_value(id, id.info().denormalize(normalized))
    }

    /// Current dry/wet mix
    #[inline]
    pub fn mix(&self) -> f32 {
        self.value(ParamId::Mix)
    }

    /// Current wet gain in dB
    #[inline]
    pub fn gain_db(&self) -> f32 {
        self.value(ParamId::Gain)
    }

    /// Snapshot every parameter into a persistable document
    pub fn serialize(&self) -> PersistedState {
        PersistedState::new(
            ParamId::ALL
                .iter()
                .map(|&param| PersistedParameter {
                    id: param.as_str().to_string(),
                    value: self.value(param),
                })
                .collect(),
        )
    }

    /// Restore parameters from a persisted document
    ///
    /// Documents with a foreign tag or an unsupported version are rejected and
    /// nothing changes. Ids are matched exactly; unknown ids are ignored and
    /// parameters missing from the document go back to their default.
    pub fn restore(&self, state: &PersistedState) -> Result<(), StateError> {
        state.validate()?;

        let mut restored = ParamId::ALL.map(|param| param.info().default);
        for entry in &state.parameters {
            if let Some(param) = ParamId::from_id(&entry.id) {
                if entry.value.is_finite() {
                    restored[param.index()] = entry.value;
                }
            }
        }

        for param in ParamId::ALL {
            self.set_value(param, restored[param.index()]);
        }
        Ok(())
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterStore")
            .field("mix", &self.mix())
            .field("gain", &self.gain_db())
            .finish()
    }
}
