#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Unique path in the system temp directory
pub fn temp_path(name: &str) -> PathBuf {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("ir_loader_{}_{}_{}", std::process::id(), n, name))
}

/// Write planar channels as a 32-bit float WAV file
pub fn write_float_wav(name: &str, channels: &[Vec<f32>], sample_rate: u32) -> PathBuf {
    let path = temp_path(name);
    let spec = hound::WavSpec {
        channels: channels.len() as u16,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    let frames = channels.first().map(|c| c.len()).unwrap_or(0);
    for i in 0..frames {
        for channel in channels {
            writer.write_sample(channel[i]).unwrap();
        }
    }
    writer.finalize().unwrap();
    path
}

/// Encode an integer sample rate as an 80-bit IEEE extended float
pub fn extended_sample_rate(rate: u32) -> [u8; 10] {
    let mut bytes = [0u8; 10];
    if rate == 0 {
        return bytes;
    }
    let shift = 31 - rate.leading_zeros();
    let exponent = 16383 + shift as u16;
    let mantissa = (rate as u64) << (63 - shift);
    bytes[..2].copy_from_slice(&exponent.to_be_bytes());
    bytes[2..].copy_from_slice(&mantissa.to_be_bytes());
    bytes
}

/// Write planar channels as a 16-bit big-endian AIFF file
pub fn write_aiff(name: &str, channels: &[Vec<f32>], sample_rate: u32) -> PathBuf {
    let num_channels = channels.len();
    let frames = channels.first().map(|c| c.len()).unwrap_or(0);

    let mut sound = Vec::with_capacity(frames * num_channels * 2);
    for i in 0..frames {
        for channel in channels {
            let value = (channel[i].clamp(-1.0, 1.0) * 32767.0) as i16;
            sound.extend_from_slice(&value.to_be_bytes());
        }
    }

    let mut comm = Vec::new();
    comm.extend_from_slice(&(num_channels as i16).to_be_bytes());
    comm.extend_from_slice(&(frames as u32).to_be_bytes());
    comm.extend_from_slice(&16i16.to_be_bytes());
    comm.extend_from_slice(&extended_sample_rate(sample_rate));

    let ssnd_len = 8 + sound.len();
    let form_len = 4 + (8 + comm.len()) + (8 + ssnd_len);

    let mut data = Vec::with_capacity(8 + form_len);
    data.extend_from_slice(b"FORM");
    data.extend_from_slice(&(form_len as u32).to_be_bytes());
    data.extend_from_slice(b"AIFF");
    data.extend_from_slice(b"COMM");
    data.extend_from_slice(&(comm.len() as u32).to_be_bytes());
    data.extend_from_slice(&comm);
    data.extend_from_slice(b"SSND");
    data.extend_from_slice(&(ssnd_len as u32).to_be_bytes());
    data.extend_from_slice(&0u32.to_be_bytes());
    data.extend_from_slice(&0u32.to_be_bytes());
    data.extend_from_slice(&sound);

    let path = temp_path(name);
    std::fs::write(&path, data).unwrap();
    path
}

/// Write arbitrary bytes to a temp file
pub fn write_bytes(name: &str, bytes: &[u8]) -> PathBuf {
    let path = temp_path(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Direct-form convolution, truncated to the input length
pub fn direct_convolution(input: &[f32], ir: &[f32]) -> Vec<f32> {
    (0..input.len())
        .map(|n| {
            ir.iter()
                .take(n + 1)
                .enumerate()
                .map(|(k, &h)| h as f64 * input[n - k] as f64)
                .sum::<f64>() as f32
        })
        .collect()
}

