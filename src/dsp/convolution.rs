//! Convolution engine contract and the default partitioned FFT engine

use super::fft_convolver::FftConvolver;
use super::gain::linear_to_db;
use super::impulse::{self, ImpulseResponse};
use crate::audio::ProcessingSpec;
use crate::error::LoadError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How an impulse response is conditioned before it is used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvolutionOptions {
    /// Use a second IR channel for the right output when available
    pub stereo: bool,
    /// Strip leading and trailing silence
    pub trim: bool,
    /// Normalise the response energy
    pub normalise: bool,
    /// Maximum IR length in source samples, 0 for unlimited
    pub max_length: usize,
}

impl Default for ConvolutionOptions {
    fn default() -> Self {
        Self {
            stereo: true,
            trim: true,
            normalise: true,
            max_length: 0,
        }
    }
}

/// A block-based convolution processor
///
/// Engines are built and prepared on control threads, then moved to the
/// audio thread. Only `process`, `reset` and the queries run there.
pub trait ConvolutionEngine: Send {
    /// Allocate internal state for the given processing configuration
    fn prepare(&mut self, spec: &ProcessingSpec);

    /// Condition `ir` and build the partitioned representation
    fn load_impulse_response(
        &mut self,
        ir: ImpulseResponse,
        options: ConvolutionOptions,
    ) -> Result<(), LoadError>;

    /// Replace the block's samples with the convolved signal
    fn process(&mut self, block: &mut [&mut [f32]]);

    /// Clear processing history, keeping the impulse response
    fn reset(&mut self);

    /// Whether a block of this shape can be processed right now
    fn is_ready(&self, num_channels: usize, num_frames: usize) -> bool;

    /// Decoded impulse length scaled to the processing rate (0 when unloaded)
    ///
    /// Trimming and truncation do not shorten it; this is the tail the host
    /// should expect.
    fn impulse_length(&self) -> usize;

    fn name(&self) -> &str {
        "engine"
    }
}

/// Builds fresh engines for the controller
pub type EngineFactory = Arc<dyn Fn() -> Box<dyn ConvolutionEngine> + Send + Sync>;

/// The built-in engine factory
pub fn default_engine_factory() -> EngineFactory {
    Arc::new(|| Box::new(PartitionedConvolution::new()) as Box<dyn ConvolutionEngine>)
}

/// Zero-latency uniformly partitioned convolution, one convolver per output channel
pub struct PartitionedConvolution {
    spec: Option<ProcessingSpec>,
    /// Conditioned response at its own rate, kept so `prepare` can rebuild
    source: Option<ImpulseResponse>,
    /// Frame count of the response as decoded, before conditioning
    decoded_length: usize,
    options: ConvolutionOptions,
    convolvers: Vec<FftConvolver>,
    input_scratch: Vec<f32>,
    impulse_length: usize,
}

impl PartitionedConvolution {
    pub fn new() -> Self {
        Self {
            spec: None,
            source: None,
            decoded_length: 0,
            options: ConvolutionOptions::default(),
            convolvers: Vec::new(),
            input_scratch: Vec::new(),
            impulse_length: 0,
        }
    }

    /// IR channel feeding output channel `channel`
    fn ir_channel_for(&self, channel: usize, ir_channels: usize) -> usize {
        if self.options.stereo && ir_channels >= 2 {
            channel.min(1)
        } else {
            0
        }
    }

    /// Rebuild the per-channel convolvers for the current spec and source
    fn rebuild(&mut self) -> Result<(), LoadError> {
        self.convolvers.clear();
        self.impulse_length = 0;

        let (Some(spec), Some(source)) = (self.spec, self.source.as_ref()) else {
            return Ok(());
        };

        // Gain compensation only matters when the level is not normalised afterwards
        let mut ir = impulse::resample(source, spec.sample_rate, !self.options.normalise)
            .map_err(LoadError::EmptyOrCorrupt)?;
        if self.options.normalise {
            let factor = impulse::normalise(&mut ir);
            log::debug!("Normalised impulse response by {:.1} dB", linear_to_db(factor));
        }

        let ir_channels = ir.channel_count();
        let convolvers = (0..spec.num_channels)
            .map(|channel| {
                let index = self.ir_channel_for(channel, ir_channels);
                FftConvolver::new(&ir.channels[index], spec.max_block_size)
            })
            .collect();

        self.convolvers = convolvers;
        self.input_scratch = vec![0.0; spec.max_block_size];
        self.impulse_length = if (source.sample_rate - spec.sample_rate).abs() < f64::EPSILON {
            self.decoded_length
        } else {
            (self.decoded_length as f64 * spec.sample_rate / source.sample_rate).round() as usize
        };

        if let Some(first) = self.convolvers.first() {
            log::debug!(
                "Built {} convolver(s), {} partitions of {} samples",
                self.convolvers.len(),
                first.partition_count(),
                first.block_size()
            );
        }
        Ok(())
    }
}

impl Default for PartitionedConvolution {
    fn default() -> Self {
        Self::new()
    }
}

impl ConvolutionEngine for PartitionedConvolution {
    fn prepare(&mut self, spec: &ProcessingSpec) {
        if !spec.is_valid() {
            self.spec = None;
            self.convolvers.clear();
            self.impulse_length = 0;
            return;
        }
        self.spec = Some(*spec);
        self.input_scratch = vec![0.0; spec.max_block_size];
        if self.rebuild().is_err() {
            self.convolvers.clear();
            self.impulse_length = 0;
        }
    }

    fn load_impulse_response(
        &mut self,
        mut ir: ImpulseResponse,
        options: ConvolutionOptions,
    ) -> Result<(), LoadError> {
        if ir.is_empty() {
            return Err(LoadError::EmptyOrCorrupt(
                "impulse response has no samples".to_string(),
            ));
        }
        if ir.channels.iter().flatten().any(|s| !s.is_finite()) {
            return Err(LoadError::EmptyOrCorrupt(
                "impulse response contains non-finite samples".to_string(),
            ));
        }

        let decoded_length = ir.sample_count();
        if options.trim {
            impulse::trim_silence(&mut ir);
        }
        impulse::truncate(&mut ir, options.max_length);

        let previous = (self.source.take(), self.options, self.decoded_length);
        self.source = Some(ir);
        self.options = options;
        self.decoded_length = decoded_length;
        if let Err(e) = self.rebuild() {
            self.source = previous.0;
            self.options = previous.1;
            self.decoded_length = previous.2;
            // Restoring a response that built before cannot fail
            let _ = self.rebuild();
            return Err(e);
        }
        Ok(())
    }

    fn process(&mut self, block: &mut [&mut [f32]]) {
        let frames = block.first().map(|c| c.len()).unwrap_or(0);
        if !self.is_ready(block.len(), frames) {
            return;
        }

        for (channel, convolver) in block.iter_mut().zip(self.convolvers.iter_mut()) {
            let input = &mut self.input_scratch[..frames];
            input.copy_from_slice(channel);
            convolver.process(input, channel);
        }
    }

    fn reset(&mut self) {
        for convolver in self.convolvers.iter_mut() {
            convolver.reset();
        }
    }

    fn is_ready(&self, num_channels: usize, num_frames: usize) -> bool {
        match self.spec {
            Some(spec) => {
                !self.convolvers.is_empty()
                    && num_channels == self.convolvers.len()
                    && num_frames <= spec.max_block_size
            }
            None => false,
        }
    }

    fn impulse_length(&self) -> usize {
        self.impulse_length
    }

    fn name(&self) -> &str {
        "Partitioned FFT convolution"
    }
}
