use super::audio_file::AudioFile;
use crate::dsp::ImpulseResponse;
use crate::error::LoadError;
use std::path::Path;

/// File extensions accepted as impulse responses (compared case-insensitively)
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["wav", "aif", "aiff"];

/// Whether `path` has an accepted impulse response extension
pub fn is_supported_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Reads impulse responses from disk
pub struct ImpulseLoader;

impl ImpulseLoader {
    /// Decode the whole file into memory
    ///
    /// The caller owns the returned response; the loader keeps nothing.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<ImpulseResponse, LoadError> {
        let path = path.as_ref();
        if !is_supported_file(path) {
            return Err(LoadError::UnsupportedFormat(format!(
                "{} is not a WAV or AIFF file",
                path.display()
            )));
        }

        let file = AudioFile::load(path)?;
        let ir = ImpulseResponse::new(file.channels, file.sample_rate as f64);
        if ir.is_empty() {
            return Err(LoadError::EmptyOrCorrupt(format!(
                "{} contains no audio frames",
                path.display()
            )));
        }

        log::debug!(
            "Decoded impulse response {}: {} channel(s), {} samples at {} Hz",
            path.display(),
            ir.channel_count(),
            ir.sample_count(),
            ir.sample_rate
        );
        Ok(ir)
    }
}
