use std::path::Path;

/// Settings for writing rendered audio
#[derive(Debug, Clone)]
pub struct ExportSettings {
    /// Sample rate for export
    pub sample_rate: u32,
    /// Bit depth: 16 or 24 for integer PCM, 32 for float
    pub bit_depth: u16,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            bit_depth: 32,
        }
    }
}

/// Write planar channels to a WAV file using hound
pub fn write_wav<P: AsRef<Path>>(
    channels: &[Vec<f32>],
    settings: &ExportSettings,
    output_path: P,
) -> Result<(), String> {
    if channels.is_empty() {
        return Err("Nothing to write: no channels".to_string());
    }
    let frames = channels.iter().map(|c| c.len()).min().unwrap_or(0);

    let sample_format = match settings.bit_depth {
        16 | 24 => hound::SampleFormat::Int,
        32 => hound::SampleFormat::Float,
        _ => return Err(format!("Unsupported bit depth: {}", settings.bit_depth)),
    };
    let spec = hound::WavSpec {
        channels: channels.len() as u16,
        sample_rate: settings.sample_rate,
        bits_per_sample: settings.bit_depth,
        sample_format,
    };

    let mut writer = hound::WavWriter::create(output_path, spec)
        .map_err(|e| format!("Failed to create WAV file: {}", e))?;

    for frame in 0..frames {
        for channel in channels {
            let sample = channel[frame];
            let result = match settings.bit_depth {
                16 => writer.write_sample((sample.clamp(-1.0, 1.0) * 32767.0) as i16),
                24 => writer.write_sample((sample.clamp(-1.0, 1.0) * 8388607.0) as i32),
                _ => writer.write_sample(sample),
            };
            result.map_err(|e| format!("Failed to write sample: {}", e))?;
        }
    }

    writer
        .finalize()
        .map_err(|e| format!("Failed to finalize WAV file: {}", e))?;

    Ok(())
}
