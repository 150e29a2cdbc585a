// IR Loader - impulse response convolution effect
//
// Convolves the input with a user-supplied impulse response, blends it with
// the dry signal and applies wet gain. Impulse responses are decoded and
// prepared on control threads; the audio thread receives finished engines over
// lock-free queues and never blocks or allocates.

pub mod audio;
pub mod command;
pub mod config;
pub mod dsp;
pub mod error;
pub mod host;
pub mod io;
pub mod params;

// Re-export commonly used types
pub use audio::{BusLayout, ChannelSet, IrLoaderProcessor, ProcessingSpec, ProcessorController};
pub use command::{AudioEvent, Command};
pub use config::ProcessorConfig;
pub use dsp::{ConvolutionEngine, ConvolutionOptions, ImpulseResponse, PartitionedConvolution};
pub use error::{LayoutError, LoadError, StateError};
pub use host::{AudioProcessor, EditorBridge, ParameterBinding};
pub use io::{AudioFile, ImpulseLoader};
pub use params::{ParamId, ParameterStore, PersistedState};
