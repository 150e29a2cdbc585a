use crate::audio::BusLayout;
use crate::dsp::ConvolutionOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Construction-time settings for a processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// How loaded impulse responses are conditioned
    pub convolution: ConvolutionOptions,
    /// Initial bus layout
    pub layout: BusLayout,
    /// Capacity of the control-to-audio command queue
    pub command_capacity: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            convolution: ConvolutionOptions::default(),
            layout: BusLayout::stereo(),
            command_capacity: 16,
        }
    }
}

impl ProcessorConfig {
    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Read a config file; fields left out keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;
        let config = Self::from_json(&json)
            .map_err(|e| format!("Failed to parse config {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        let json = self
            .to_json()
            .map_err(|e| format!("Failed to serialize config: {}", e))?;
        std::fs::write(path, json).map_err(|e| format!("Failed to write config: {}", e))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.command_capacity == 0 {
            return Err("command_capacity must be at least 1".to_string());
        }
        self.layout.validate().map_err(|e| e.to_string())
    }
}
