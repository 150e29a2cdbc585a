use super::buffer::DryBuffer;
use super::bus::ProcessingSpec;
use crate::dsp::{apply_gain, db_to_linear, ConvolutionEngine};
use crate::params::ParameterStore;

/// Per-block orchestration: dry snapshot, convolution, wet gain, dry/wet blend
pub struct SignalPath {
    dry: DryBuffer,
}

impl SignalPath {
    pub fn new() -> Self {
        Self {
            dry: DryBuffer::default(),
        }
    }

    /// Size the dry buffer for `spec` (not real-time safe)
    pub fn prepare(&mut self, spec: &ProcessingSpec) {
        self.dry.resize(spec.num_channels, spec.max_block_size);
    }

    /// Release scratch memory
    pub fn release(&mut self) {
        self.dry = DryBuffer::default();
    }

    /// Process one block in place
    ///
    /// Returns false and leaves the block untouched when there is no engine,
    /// or the block does not fit what was prepared.
    pub fn process(
        &mut self,
        block: &mut [&mut [f32]],
        engine: Option<&mut (dyn ConvolutionEngine + 'static)>,
        params: &ParameterStore,
    ) -> bool {
        let Some(engine) = engine else {
            return false;
        };

        let frames = block.first().map(|c| c.len()).unwrap_or(0);
        if !engine.is_ready(block.len(), frames) || !self.dry.capture(block) {
            return false;
        }

        engine.process(block);

        let gain = db_to_linear(params.gain_db());
        apply_gain(block, gain);

        let mix = params.mix();
        for (ch, wet) in block.iter_mut().enumerate() {
            let dry = self.dry.channel(ch);
            if mix <= 0.0 {
                wet.copy_from_slice(dry);
            } else if mix < 1.0 {
                for (w, &d) in wet.iter_mut().zip(dry.iter()) {
                    *w = d * (1.0 - mix) + *w * mix;
                }
            }
        }
        true
    }
}

impl Default for SignalPath {
    fn default() -> Self {
        Self::new()
    }
}
