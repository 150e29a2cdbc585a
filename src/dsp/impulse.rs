use super::gain::db_to_linear;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Samples quieter than this on every channel count as silence when trimming
pub const TRIM_THRESHOLD_DB: f32 = -80.0;

/// Target RMS-like level used by energy normalisation
const NORMALISE_TARGET: f32 = 0.125;

/// Decoded impulse response, planar
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    /// One vector per channel, all the same length
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: f64,
}

impl ImpulseResponse {
    /// Build an impulse response, padding shorter channels with zeros
    pub fn new(mut channels: Vec<Vec<f32>>, sample_rate: f64) -> Self {
        let frames = channels.iter().map(|c| c.len()).max().unwrap_or(0);
        for channel in channels.iter_mut() {
            channel.resize(frames, 0.0);
        }
        Self {
            channels,
            sample_rate,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Frames per channel
    pub fn sample_count(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Duration in seconds at the response's own sample rate
    pub fn duration(&self) -> f64 {
        if self.sample_rate > 0.0 {
            self.sample_count() as f64 / self.sample_rate
        } else {
            0.0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() || self.sample_count() == 0
    }
}

/// Drop leading and trailing frames that are silent on every channel
///
/// A response that is entirely silent collapses to a single zero frame.
pub fn trim_silence(ir: &mut ImpulseResponse) {
    let threshold = db_to_linear(TRIM_THRESHOLD_DB);
    let frames = ir.sample_count();
    let audible = |frame: usize| ir.channels.iter().any(|c| c[frame].abs() >= threshold);

    let start = (0..frames).find(|&frame| audible(frame));
    let Some(start) = start else {
        for channel in ir.channels.iter_mut() {
            channel.clear();
            channel.push(0.0);
        }
        return;
    };
    let end = (start..frames).rev().find(|&frame| audible(frame)).unwrap_or(start) + 1;

    for channel in ir.channels.iter_mut() {
        channel.truncate(end);
        channel.drain(..start);
    }
}

/// Cut the response to at most `max_length` frames (0 = unlimited)
pub fn truncate(ir: &mut ImpulseResponse, max_length: usize) {
    if max_length == 0 {
        return;
    }
    for channel in ir.channels.iter_mut() {
        channel.truncate(max_length);
    }
}

/// Scale every channel so the loudest channel's energy maps to a fixed level
///
/// Returns the factor applied. A response with no energy is left untouched.
pub fn normalise(ir: &mut ImpulseResponse) -> f32 {
    let max_energy = ir
        .channels
        .iter()
        .map(|c| c.iter().map(|&s| s as f64 * s as f64).sum::<f64>())
        .fold(0.0f64, f64::max);

    if max_energy <= f64::EPSILON {
        return 1.0;
    }

    let factor = (NORMALISE_TARGET as f64 / max_energy.sqrt()) as f32;
    for channel in ir.channels.iter_mut() {
        for sample in channel.iter_mut() {
            *sample *= factor;
        }
    }
    factor
}

/// Convert the response to `target_rate` with a windowed sinc resampler
///
/// The resampler's group delay is removed so the onset stays in place, and
/// the output length follows the rate ratio. When `compensate_gain` is set
/// the level is scaled by `source / target` to keep the overall response
/// gain constant across rates.
pub fn resample(
    ir: &ImpulseResponse,
    target_rate: f64,
    compensate_gain: bool,
) -> Result<ImpulseResponse, String> {
    if ir.is_empty() || (ir.sample_rate - target_rate).abs() < f64::EPSILON {
        return Ok(ir.clone());
    }
    if !(ir.sample_rate > 0.0) || !(target_rate > 0.0) {
        return Err(format!(
            "Invalid sample rates: source {} target {}",
            ir.sample_rate, target_rate
        ));
    }

    let ratio = target_rate / ir.sample_rate;
    let frames = ir.sample_count();
    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, frames, ir.channel_count())
        .map_err(|e| format!("Failed to create resampler: {}", e))?;

    let mut output = resampler
        .process(&ir.channels, None)
        .map_err(|e| format!("Resampling failed: {}", e))?;

    let tail = resampler
        .process_partial::<Vec<f32>>(None, None)
        .map_err(|e| format!("Resampler flush failed: {}", e))?;
    for (channel, rest) in output.iter_mut().zip(tail.iter()) {
        channel.extend_from_slice(rest);
    }

    let delay = resampler.output_delay();
    let expected = ((frames as f64) * ratio).ceil().max(1.0) as usize;
    for channel in output.iter_mut() {
        if delay >= channel.len() {
            channel.clear();
        } else {
            channel.drain(..delay);
        }
        channel.resize(expected, 0.0);
    }

    if compensate_gain {
        let gain = (ir.sample_rate / target_rate) as f32;
        for channel in output.iter_mut() {
            for sample in channel.iter_mut() {
                *sample *= gain;
            }
        }
    }

    Ok(ImpulseResponse::new(output, target_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pads_ragged_channels() {
        let ir = ImpulseResponse::new(vec![vec![1.0, 0.5, 0.25], vec![1.0]], 48000.0);
        assert_eq!(ir.channel_count(), 2);
        assert_eq!(ir.sample_count(), 3);
        assert_eq!(ir.channels[1], vec![1.0, 0.0, 0.0]);
        assert!((ir.duration() - 3.0 / 48000.0).abs() < 1e-12);
    }

    #[test]
    fn test_trim_removes_leading_and_trailing_silence() {
        let mut ir = ImpulseResponse::new(
            vec![
                vec![0.0, 0.0, 0.5, 0.0, 0.25, 0.0, 0.0],
                vec![0.0, 0.0, 0.0, 0.1, 0.0, 1e-6, 0.0],
            ],
            44100.0,
        );
        trim_silence(&mut ir);
        assert_eq!(ir.channels[0], vec![0.5, 0.0, 0.25]);
        assert_eq!(ir.channels[1], vec![0.0, 0.1, 0.0]);
    }

    #[test]
    fn test_trim_all_silent_leaves_one_zero_frame() {
        let mut ir = ImpulseResponse::new(vec![vec![0.0; 64], vec![1e-7; 64]], 44100.0);
        trim_silence(&mut ir);
        assert_eq!(ir.sample_count(), 1);
        assert!(ir.channels.iter().all(|c| c == &vec![0.0]));
    }

    #[test]
    fn test_trim_threshold_is_absolute() {
        // 5e-5 is -86 dBFS but only -26 dB below this response's peak
        let mut quiet = ImpulseResponse::new(vec![vec![1e-3, 5e-4, 5e-5, 5e-5]], 44100.0);
        trim_silence(&mut quiet);
        assert_eq!(quiet.channels[0], vec![1e-3, 5e-4]);

        // 2e-4 is -74 dBFS, audible even next to a full-scale peak
        let mut loud = ImpulseResponse::new(vec![vec![1.0, 2e-4, 2e-4]], 44100.0);
        trim_silence(&mut loud);
        assert_eq!(loud.sample_count(), 3);
    }

    #[test]
    fn test_truncate() {
        let mut ir = ImpulseResponse::new(vec![vec![1.0; 10]], 44100.0);
        truncate(&mut ir, 0);
        assert_eq!(ir.sample_count(), 10);
        truncate(&mut ir, 4);
        assert_eq!(ir.sample_count(), 4);
    }

    #[test]
    fn test_normalise_scales_loudest_channel() {
        let mut ir = ImpulseResponse::new(vec![vec![1.0, 1.0, 1.0, 1.0], vec![0.5; 4]], 44100.0);
        let factor = normalise(&mut ir);
        assert!((factor - 0.0625).abs() < 1e-6);
        let energy: f32 = ir.channels[0].iter().map(|s| s * s).sum();
        assert!((energy.sqrt() - 0.125).abs() < 1e-6);
        assert!((ir.channels[1][0] - 0.5 * 0.0625).abs() < 1e-7);
    }

    #[test]
    fn test_normalise_silence_is_untouched() {
        let mut ir = ImpulseResponse::new(vec![vec![0.0; 8]], 44100.0);
        assert_eq!(normalise(&mut ir), 1.0);
        assert!(ir.channels[0].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let ir = ImpulseResponse::new(vec![vec![1.0, 0.5, 0.25]], 48000.0);
        let out = resample(&ir, 48000.0, true).unwrap();
        assert_eq!(out, ir);
    }

    #[test]
    fn test_resample_changes_length_and_keeps_onset() {
        let mut samples = vec![0.0; 480];
        samples[0] = 1.0;
        let ir = ImpulseResponse::new(vec![samples], 48000.0);

        let out = resample(&ir, 96000.0, false).unwrap();
        assert_eq!(out.sample_rate, 96000.0);
        assert_eq!(out.sample_count(), 960);

        let peak = out.channels[0]
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |best, (i, &s)| if s.abs() > best.1 { (i, s.abs()) } else { best });
        assert!(peak.0 <= 2, "onset moved to {}", peak.0);
    }

    #[test]
    fn test_resample_rejects_invalid_rate() {
        let ir = ImpulseResponse::new(vec![vec![1.0; 4]], 0.0);
        assert!(resample(&ir, 44100.0, false).is_err());
    }
}
