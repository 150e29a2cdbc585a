use crate::error::LayoutError;
use serde::{Deserialize, Serialize};

/// Channel configuration of a single bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelSet {
    Disabled,
    Mono,
    Stereo,
    /// Any other channel count (surround, ambisonics, ...)
    Discrete(usize),
}

impl ChannelSet {
    pub fn channel_count(&self) -> usize {
        match self {
            ChannelSet::Disabled => 0,
            ChannelSet::Mono => 1,
            ChannelSet::Stereo => 2,
            ChannelSet::Discrete(n) => *n,
        }
    }

    /// Channel set for a plain channel count
    pub fn from_count(channels: usize) -> Self {
        match channels {
            0 => ChannelSet::Disabled,
            1 => ChannelSet::Mono,
            2 => ChannelSet::Stereo,
            n => ChannelSet::Discrete(n),
        }
    }
}

/// Main input/output bus pair negotiated with the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusLayout {
    pub input: ChannelSet,
    pub output: ChannelSet,
}

impl BusLayout {
    pub fn new(input: ChannelSet, output: ChannelSet) -> Self {
        Self { input, output }
    }

    pub fn mono() -> Self {
        Self::new(ChannelSet::Mono, ChannelSet::Mono)
    }

    pub fn stereo() -> Self {
        Self::new(ChannelSet::Stereo, ChannelSet::Stereo)
    }

    /// Input and output must match and be either mono or stereo
    pub fn validate(&self) -> Result<(), LayoutError> {
        let supported_output = matches!(self.output, ChannelSet::Mono | ChannelSet::Stereo);
        if !supported_output || self.input != self.output {
            return Err(LayoutError::InvalidBusLayout {
                input: self.input,
                output: self.output,
            });
        }
        Ok(())
    }

    /// Channels that carry signal through the effect
    pub fn active_channels(&self) -> usize {
        self.input.channel_count().min(self.output.channel_count())
    }
}

impl Default for BusLayout {
    fn default() -> Self {
        Self::stereo()
    }
}

/// Processing configuration supplied by the host at prepare time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessingSpec {
    pub sample_rate: f64,
    pub max_block_size: usize,
    pub num_channels: usize,
}

impl ProcessingSpec {
    pub fn new(sample_rate: f64, max_block_size: usize, num_channels: usize) -> Self {
        Self {
            sample_rate,
            max_block_size,
            num_channels,
        }
    }

    /// A spec the engine can actually be prepared with
    pub fn is_valid(&self) -> bool {
        self.sample_rate.is_finite()
            && self.sample_rate > 0.0
            && self.max_block_size > 0
            && self.num_channels > 0
    }
}
