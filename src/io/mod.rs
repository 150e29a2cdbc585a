pub mod audio_file;
pub mod export;
pub mod impulse_loader;

pub use audio_file::AudioFile;
pub use export::{write_wav, ExportSettings};
pub use impulse_loader::{is_supported_file, ImpulseLoader, SUPPORTED_EXTENSIONS};
