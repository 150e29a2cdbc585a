pub mod buffer;
pub mod bus;
pub mod processor;
pub mod signal_path;

pub use buffer::DryBuffer;
pub use bus::{BusLayout, ChannelSet, ProcessingSpec};
pub use processor::{IrLoaderProcessor, ProcessorController};
pub use signal_path::SignalPath;
