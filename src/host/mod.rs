//! Host-facing capability interface

pub mod editor;

pub use editor::{EditorBridge, ParameterBinding, NO_IMPULSE_TEXT};

use crate::audio::{BusLayout, IrLoaderProcessor, ProcessingSpec};
use crate::error::{LayoutError, StateError};

/// Display name reported to hosts
pub const PROCESSOR_NAME: &str = "IR Loader";

/// What a host needs from an audio effect
pub trait AudioProcessor: Send {
    /// Get the processor name
    fn name(&self) -> &str;

    fn accepts_midi(&self) -> bool {
        false
    }

    fn produces_midi(&self) -> bool {
        false
    }

    fn is_midi_effect(&self) -> bool {
        false
    }

    /// Whether a layout would be accepted, without changing anything
    fn check_layout(&self, layout: &BusLayout) -> Result<(), LayoutError> {
        layout.validate()
    }

    fn set_layout(&mut self, layout: BusLayout) -> Result<(), LayoutError>;

    /// Called before playback starts and whenever rate or block size change
    fn prepare(&mut self, spec: ProcessingSpec);

    fn release(&mut self);

    /// Process audio buffer in-place, one slice per channel
    fn process(&mut self, block: &mut [&mut [f32]]);

    /// Seconds of output after the input falls silent
    fn tail_length_seconds(&self) -> f64;

    /// Serialize state for the host session
    fn state(&self) -> Vec<u8>;

    /// Restore state from the host session
    fn set_state(&mut self, data: &[u8]) -> Result<(), StateError>;

    fn has_editor(&self) -> bool;

    fn create_editor(&self) -> Option<EditorBridge>;
}

impl AudioProcessor for IrLoaderProcessor {
    fn name(&self) -> &str {
        PROCESSOR_NAME
    }

    fn set_layout(&mut self, layout: BusLayout) -> Result<(), LayoutError> {
        IrLoaderProcessor::set_layout(self, layout)
    }

    fn prepare(&mut self, spec: ProcessingSpec) {
        IrLoaderProcessor::prepare(self, spec)
    }

    fn release(&mut self) {
        IrLoaderProcessor::release(self)
    }

    fn process(&mut self, block: &mut [&mut [f32]]) {
        IrLoaderProcessor::process(self, block)
    }

    fn tail_length_seconds(&self) -> f64 {
        IrLoaderProcessor::tail_length_seconds(self)
    }

    fn state(&self) -> Vec<u8> {
        IrLoaderProcessor::state(self)
    }

    fn set_state(&mut self, data: &[u8]) -> Result<(), StateError> {
        IrLoaderProcessor::set_state(self, data)
    }

    fn has_editor(&self) -> bool {
        true
    }

    fn create_editor(&self) -> Option<EditorBridge> {
        Some(EditorBridge::new(self.controller()))
    }
}
