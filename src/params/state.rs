use crate::error::StateError;
use serde::{Deserialize, Serialize};

/// Tag identifying documents produced by this effect
pub const STATE_TAG: &str = "IRLoaderParameters";

/// Current document version
pub const STATE_VERSION: u32 = 1;

/// A single persisted parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedParameter {
    pub id: String,
    pub value: f32,
}

/// Serializable snapshot of the parameter set
///
/// Parameters are kept as an ordered list so the document preserves
/// declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistedState {
    /// Document tag, must equal `STATE_TAG`
    pub tag: String,

    #[serde(default = "default_version")]
    pub version: u32,

    pub parameters: Vec<PersistedParameter>,
}

fn default_version() -> u32 {
    STATE_VERSION
}

impl PersistedState {
    /// Create a tagged document holding the given values
    pub fn new(parameters: Vec<PersistedParameter>) -> Self {
        Self {
            tag: STATE_TAG.to_string(),
            version: STATE_VERSION,
            parameters,
        }
    }

    /// Check that this document was produced by this effect
    pub fn validate(&self) -> Result<(), StateError> {
        if self.tag != STATE_TAG {
            return Err(StateError::MalformedState(format!(
                "unexpected tag '{}'",
                self.tag
            )));
        }
        if self.version == 0 || self.version > STATE_VERSION {
            return Err(StateError::MalformedState(format!(
                "unsupported version {}",
                self.version
            )));
        }
        Ok(())
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Encode as the opaque blob handed to the host
    pub fn to_bytes(&self) -> Vec<u8> {
        // A struct of strings and finite floats always serializes
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Decode a host blob, rejecting anything that is not a tagged document
    pub fn from_bytes(data: &[u8]) -> Result<Self, StateError> {
        let state: PersistedState = serde_json::from_slice(data)
            .map_err(|e| StateError::MalformedState(e.to_string()))?;
        state.validate()?;
        Ok(state)
    }
}
