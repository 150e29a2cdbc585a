use crate::dsp::ConvolutionEngine;

/// A fully built engine on its way to (or back from) the audio thread
pub struct PreparedEngine {
    pub engine: Box<dyn ConvolutionEngine>,
    /// Spec generation the engine was prepared for
    pub generation: u64,
    /// Load request this engine belongs to; higher is newer
    pub serial: u64,
    /// Display name of the impulse response (usually the file name)
    pub name: String,
}

impl std::fmt::Debug for PreparedEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedEngine")
            .field("engine", &self.engine.name())
            .field("generation", &self.generation)
            .field("serial", &self.serial)
            .field("name", &self.name)
            .finish()
    }
}

/// Commands sent from control threads to the audio thread
#[derive(Debug)]
pub enum Command {
    /// Swap in a new engine at the next block boundary
    InstallEngine(Box<PreparedEngine>),
}

/// Events sent from the audio thread back to control threads
#[derive(Debug)]
pub enum AudioEvent {
    /// An engine went live (serial, impulse length in samples)
    EngineInstalled(u64, usize),
    /// The engine that was replaced, to be dropped off the audio thread
    EngineRetired(Box<PreparedEngine>),
    /// An engine prepared for a stale spec, sent back for re-preparation
    EngineRejected(Box<PreparedEngine>),
}
