use crate::error::LoadError;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Fully decoded audio file with planar f32 channels
pub struct AudioFile {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl AudioFile {
    /// Load an audio file from disk and decode every channel into memory
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();

        // Open the media source
        let file = std::fs::File::open(path)
            .map_err(|e| LoadError::IoFailure(format!("Failed to open {}: {}", path.display(), e)))?;

        let length = file
            .metadata()
            .map_err(|e| LoadError::IoFailure(format!("Failed to stat {}: {}", path.display(), e)))?
            .len();
        if length == 0 {
            return Err(LoadError::EmptyOrCorrupt(format!("{} is empty", path.display())));
        }

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create a probe hint using the file extension
        let mut hint = Hint::new();
        if let Some(ext_str) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext_str);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| match e {
                Error::IoError(io) => LoadError::IoFailure(format!("Failed to read file: {}", io)),
                other => LoadError::UnsupportedFormat(format!("Failed to probe file: {}", other)),
            })?;

        let mut format = probed.format;

        // Find the default audio track
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| LoadError::EmptyOrCorrupt("No audio tracks found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let sample_rate = codec_params
            .sample_rate
            .filter(|&rate| rate > 0)
            .ok_or_else(|| LoadError::EmptyOrCorrupt("Sample rate not specified".to_string()))?;
        let mut num_channels = codec_params.channels.map(|c| c.count()).unwrap_or(0);

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| LoadError::UnsupportedFormat(format!("Failed to create decoder: {}", e)))?;

        let mut channels: Vec<Vec<f32>> = vec![Vec::new(); num_channels];
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(Error::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    // End of stream
                    break;
                }
                Err(Error::ResetRequired) => {
                    return Err(LoadError::EmptyOrCorrupt(
                        "Decoder reset required mid-stream".to_string(),
                    ));
                }
                Err(e) => {
                    return Err(LoadError::EmptyOrCorrupt(format!("Failed to read packet: {}", e)));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let frames = decoded.frames();
                    if frames == 0 {
                        continue;
                    }

                    if num_channels == 0 {
                        num_channels = spec.channels.count();
                        channels = vec![Vec::new(); num_channels];
                    }

                    let needs_alloc = sample_buf
                        .as_ref()
                        .map(|buf| buf.capacity() < decoded.capacity() * spec.channels.count())
                        .unwrap_or(true);
                    if needs_alloc {
                        sample_buf = Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
                    }

                    if let Some(ref mut buf) = sample_buf {
                        buf.copy_planar_ref(decoded);
                        let samples = buf.samples();
                        for (ch, channel) in channels.iter_mut().enumerate() {
                            let start = ch * frames;
                            if start + frames <= samples.len() {
                                channel.extend_from_slice(&samples[start..start + frames]);
                            }
                        }
                    }
                }
                Err(Error::DecodeError(e)) => {
                    log::warn!("Skipping undecodable packet in {}: {}", path.display(), e);
                    continue;
                }
                Err(e) => {
                    return Err(LoadError::EmptyOrCorrupt(format!("Decode failed: {}", e)));
                }
            }
        }

        let frames = channels.first().map(|c| c.len()).unwrap_or(0);
        if num_channels == 0 || frames == 0 {
            return Err(LoadError::EmptyOrCorrupt(format!(
                "{} contains no audio frames",
                path.display()
            )));
        }

        Ok(AudioFile {
            channels,
            sample_rate,
        })
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn frames(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Duration of the audio file in seconds
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}
