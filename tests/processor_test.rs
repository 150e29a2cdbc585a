mod common;

use common::{direct_convolution, write_aiff, write_bytes, write_float_wav};
use ir_loader::dsp::db_to_linear;
use ir_loader::{
    ConvolutionOptions, IrLoaderProcessor, LoadError, ProcessingSpec, ProcessorConfig,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

const SAMPLE_RATE: f64 = 44100.0;
const BLOCK: usize = 512;

fn plain_config() -> ProcessorConfig {
    ProcessorConfig {
        convolution: ConvolutionOptions {
            stereo: true,
            trim: true,
            normalise: false,
            max_length: 0,
        },
        ..Default::default()
    }
}

/// A two-channel, 100-sample decaying impulse response written to disk
fn stereo_ir() -> (PathBuf, Vec<Vec<f32>>) {
    let left: Vec<f32> = (0..100).map(|i| 0.9f32.powi(i) * 0.8).collect();
    let right: Vec<f32> = (0..100)
        .map(|i| (if i % 2 == 0 { 0.5 } else { -0.25 }) * 0.97f32.powi(i))
        .collect();
    let channels = vec![left, right];
    let path = write_float_wav("ir.wav", &channels, SAMPLE_RATE as u32);
    (path, channels)
}

fn process_block(processor: &mut IrLoaderProcessor, data: &mut [Vec<f32>]) {
    let mut block: Vec<&mut [f32]> = data.iter_mut().map(|c| c.as_mut_slice()).collect();
    processor.process(&mut block);
}

fn unit_impulse(channels: usize) -> Vec<Vec<f32>> {
    let mut data = vec![vec![0.0f32; BLOCK]; channels];
    for channel in data.iter_mut() {
        channel[0] = 1.0;
    }
    data
}

fn assert_close(actual: &[f32], expected: &[f32], tolerance: f32) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        assert!((a - e).abs() < tolerance, "sample {}: {} vs {}", i, a, e);
    }
}

#[test]
fn test_silence_then_impulse_response() {
    let mut processor = IrLoaderProcessor::new(plain_config());
    processor.prepare(ProcessingSpec::new(SAMPLE_RATE, BLOCK, 2));

    let mut silence = vec![vec![0.0f32; BLOCK]; 2];
    process_block(&mut processor, &mut silence);
    assert!(silence.iter().flatten().all(|&s| s == 0.0));
    assert!(!processor.is_impulse_loaded());
    assert_eq!(processor.tail_length_seconds(), 0.0);

    let (path, ir) = stereo_ir();
    processor.controller().load_impulse_response(&path).unwrap();

    let mut block = unit_impulse(2);
    process_block(&mut processor, &mut block);
    assert!(processor.is_impulse_loaded());

    for (output, expected) in block.iter().zip(ir.iter()) {
        let mut padded = expected.clone();
        padded.resize(BLOCK, 0.0);
        assert_close(output, &padded, 1e-5);
    }

    assert!((processor.tail_length_seconds() - 100.0 / SAMPLE_RATE).abs() < 1e-9);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_tail_counts_trailing_silence() {
    let mut processor = IrLoaderProcessor::new(ProcessorConfig::default());
    processor.prepare(ProcessingSpec::new(SAMPLE_RATE, BLOCK, 2));

    let mut decay: Vec<f32> = (0..50).map(|i| 0.9f32.powi(i)).collect();
    decay.resize(100, 0.0);
    let path = write_float_wav("tail.wav", &[decay.clone(), decay], SAMPLE_RATE as u32);
    processor.controller().load_impulse_response(&path).unwrap();
    process_block(&mut processor, &mut unit_impulse(2));

    assert!(processor.is_impulse_loaded());
    assert!((processor.tail_length_seconds() - 100.0 / SAMPLE_RATE).abs() < 1e-9);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_failed_load_keeps_previous_impulse() {
    let mut processor = IrLoaderProcessor::new(plain_config());
    processor.prepare(ProcessingSpec::new(SAMPLE_RATE, BLOCK, 2));
    let controller = processor.controller();

    let (path, ir) = stereo_ir();
    controller.load_impulse_response(&path).unwrap();
    process_block(&mut processor, &mut unit_impulse(2));
    let name = controller.current_impulse_name();

    let garbage = write_bytes("broken.wav", b"RIFF\x10\x00\x00\x00WAVEjunkjunk");
    let empty = write_bytes("empty.aiff", &[]);
    assert!(controller.load_impulse_response(&garbage).is_err());
    assert!(matches!(
        controller.load_impulse_response(&empty),
        Err(LoadError::EmptyOrCorrupt(_))
    ));
    assert!(matches!(
        controller.load_impulse_response("/no/such/file.mp3"),
        Err(LoadError::UnsupportedFormat(_))
    ));

    assert!(controller.is_impulse_loaded());
    assert_eq!(controller.current_impulse_name(), name);

    processor.reset();
    let mut block = unit_impulse(2);
    process_block(&mut processor, &mut block);
    assert_close(&block[0][..100], &ir[0], 1e-5);

    for file in [path, garbage, empty] {
        let _ = std::fs::remove_file(&file);
    }
}

#[test]
fn test_failed_first_load_stays_pass_through() {
    let mut processor = IrLoaderProcessor::new(plain_config());
    processor.prepare(ProcessingSpec::new(SAMPLE_RATE, BLOCK, 2));

    let result = processor.controller().load_impulse_response("/no/such/room.wav");
    assert!(matches!(result, Err(LoadError::IoFailure(_))));

    let mut block = unit_impulse(2);
    process_block(&mut processor, &mut block);
    assert_eq!(block, unit_impulse(2));
    assert!(!processor.is_impulse_loaded());
}

#[test]
fn test_mix_zero_is_dry_and_mix_one_is_gained_convolution() {
    let mut processor = IrLoaderProcessor::new(plain_config());
    processor.prepare(ProcessingSpec::new(SAMPLE_RATE, BLOCK, 2));
    let (path, ir) = stereo_ir();
    processor.controller().load_impulse_response(&path).unwrap();

    let mut rng = StdRng::seed_from_u64(42);
    let input: Vec<Vec<f32>> = (0..2)
        .map(|_| (0..BLOCK).map(|_| rng.gen_range(-0.5..0.5)).collect())
        .collect();

    processor.parameters().set("mix", 0.0);
    processor.parameters().set("gain", 12.0);
    let mut dry = input.clone();
    process_block(&mut processor, &mut dry);
    assert_eq!(dry, input);

    processor.reset();
    processor.parameters().set("mix", 1.0);
    processor.parameters().set("gain", -6.0);
    let gain = db_to_linear(-6.0);
    let mut wet = input.clone();
    process_block(&mut processor, &mut wet);

    for ch in 0..2 {
        let expected: Vec<f32> = direct_convolution(&input[ch], &ir[ch])
            .iter()
            .map(|s| s * gain)
            .collect();
        assert_close(&wet[ch], &expected, 1e-4);
    }

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_mono_aiff_impulse_on_mono_bus() {
    let mut processor = IrLoaderProcessor::new(plain_config());
    processor.set_layout(ir_loader::BusLayout::mono()).unwrap();
    processor.prepare(ProcessingSpec::new(SAMPLE_RATE, 256, 1));

    let path = write_aiff("cab.aiff", &[vec![0.5, 0.25, 0.125]], SAMPLE_RATE as u32);
    processor.controller().load_impulse_response(&path).unwrap();

    let mut block = vec![vec![0.0f32; 256]];
    block[0][0] = 1.0;
    process_block(&mut processor, &mut block);
    assert_close(&block[0][..4], &[0.5, 0.25, 0.125, 0.0], 1e-3);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_resampled_impulse_and_tail() {
    let mut processor = IrLoaderProcessor::new(plain_config());
    processor.prepare(ProcessingSpec::new(96000.0, BLOCK, 2));

    let path = write_float_wav("slow.wav", &[vec![0.5; 4800]], 48000);
    processor.controller().load_impulse_response(&path).unwrap();
    process_block(&mut processor, &mut unit_impulse(2));

    assert!((processor.tail_length_seconds() - 0.1).abs() < 1e-3);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_normalised_impulse_energy() {
    let config = ProcessorConfig {
        convolution: ConvolutionOptions::default(),
        ..Default::default()
    };
    let mut processor = IrLoaderProcessor::new(config);
    processor.prepare(ProcessingSpec::new(SAMPLE_RATE, BLOCK, 2));
    let (path, _) = stereo_ir();
    processor.controller().load_impulse_response(&path).unwrap();

    let mut block = unit_impulse(2);
    process_block(&mut processor, &mut block);
    let loudest = block
        .iter()
        .map(|c| c.iter().map(|s| s * s).sum::<f32>().sqrt())
        .fold(0.0f32, f32::max);
    assert!((loudest - 0.125).abs() < 1e-4, "energy {}", loudest);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_state_survives_processor_round_trip() {
    let processor = IrLoaderProcessor::new(ProcessorConfig::default());
    processor.parameters().set("mix", 0.6);
    processor.parameters().set("gain", 9.5);
    let blob = processor.state();

    let restored = IrLoaderProcessor::new(ProcessorConfig::default());
    restored.set_state(&blob).unwrap();
    assert_eq!(restored.parameters().mix(), 0.6);
    assert_eq!(restored.parameters().gain_db(), 9.5);

    let json = String::from_utf8(blob).unwrap();
    assert!(json.contains("IRLoaderParameters"));
    assert!(restored.set_state(b"[1, 2, 3]").is_err());
    assert_eq!(restored.parameters().mix(), 0.6);
}
