pub mod convolution;
pub mod fft_convolver;
pub mod gain;
pub mod impulse;

pub use convolution::{
    default_engine_factory, ConvolutionEngine, ConvolutionOptions, EngineFactory,
    PartitionedConvolution,
};
pub use fft_convolver::FftConvolver;
pub use gain::{apply_gain, db_to_linear, linear_to_db};
pub use impulse::ImpulseResponse;
