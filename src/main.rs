use clap::{Parser, Subcommand};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ir_loader::io::{write_wav, ExportSettings};
use ir_loader::{AudioFile, BusLayout, IrLoaderProcessor, ProcessingSpec, ProcessorConfig};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Largest block handed to the processor by the live player
const PLAYBACK_MAX_BLOCK: usize = 4096;

#[derive(Parser, Debug)]
#[command(name = "IR Loader")]
#[command(author, version, about = "Impulse response convolution demo host", long_about = None)]
struct Args {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Process an audio file offline and write a WAV file, including the tail
    Render {
        /// Audio to process (WAV or AIFF)
        #[arg(long)]
        input: PathBuf,
        /// Impulse response (WAV or AIFF)
        #[arg(long)]
        ir: PathBuf,
        /// Destination WAV file
        #[arg(long)]
        output: PathBuf,
        #[command(flatten)]
        effect: EffectArgs,
        /// Samples per processing block
        #[arg(long, default_value_t = 512)]
        block_size: usize,
        /// Output bit depth (16, 24 or 32 for float)
        #[arg(long, default_value_t = 32)]
        bit_depth: u16,
        /// Write the parameter state blob here after rendering
        #[arg(long)]
        save_state: Option<PathBuf>,
    },
    /// Play an audio file through the effect on the default output device
    Play {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        ir: PathBuf,
        #[command(flatten)]
        effect: EffectArgs,
    },
}

#[derive(clap::Args, Debug)]
struct EffectArgs {
    /// Dry/wet mix, 0 (dry) to 1 (wet)
    #[arg(long)]
    mix: Option<f32>,
    /// Wet gain in dB, -24 to 24
    #[arg(long, allow_hyphen_values = true)]
    gain: Option<f32>,
    /// Restore parameters from a saved state blob
    #[arg(long)]
    state: Option<PathBuf>,
    /// Processor configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match args.mode {
        Mode::Render {
            input,
            ir,
            output,
            effect,
            block_size,
            bit_depth,
            save_state,
        } => render(&input, &ir, &output, &effect, block_size, bit_depth, save_state.as_deref()),
        Mode::Play { input, ir, effect } => play(&input, &ir, &effect),
    }
}

/// Build a processor for `channels` input channels with the CLI settings applied
fn build_processor(
    effect: &EffectArgs,
    channels: usize,
) -> Result<IrLoaderProcessor, Box<dyn std::error::Error>> {
    let config = match &effect.config {
        Some(path) => ProcessorConfig::load(path)?,
        None => ProcessorConfig::default(),
    };

    let mut processor = IrLoaderProcessor::new(config);
    let layout = if channels == 1 {
        BusLayout::mono()
    } else {
        BusLayout::stereo()
    };
    processor.set_layout(layout)?;

    if let Some(path) = &effect.state {
        let blob = std::fs::read(path)?;
        // A rejected blob is logged and leaves the defaults in place
        let _ = processor.set_state(&blob);
    }
    let params = processor.parameters();
    if let Some(mix) = effect.mix {
        params.set("mix", mix);
    }
    if let Some(gain) = effect.gain {
        params.set("gain", gain);
    }
    log::info!("Parameters: {:?}", params);

    Ok(processor)
}

/// Input channels limited to what the effect accepts (mono or stereo)
fn effect_channels(file: &AudioFile) -> usize {
    if file.num_channels() > 2 {
        log::warn!(
            "Input has {} channels; only the first two are processed",
            file.num_channels()
        );
    }
    file.num_channels().min(2)
}

fn render(
    input: &Path,
    ir: &Path,
    output: &Path,
    effect: &EffectArgs,
    block_size: usize,
    bit_depth: u16,
    save_state: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = AudioFile::load(input)?;
    let channels = effect_channels(&source);
    log::info!(
        "Input {}: {} Hz, {} channel(s), {:.2}s",
        input.display(),
        source.sample_rate,
        source.num_channels(),
        source.duration()
    );

    let mut processor = build_processor(effect, channels)?;
    let block_size = block_size.max(1);
    processor.prepare(ProcessingSpec::new(
        source.sample_rate as f64,
        block_size,
        channels,
    ));

    let controller = processor.controller();
    controller.load_impulse_response(ir)?;

    let input_frames = source.frames();
    let mut rendered: Vec<Vec<f32>> = vec![Vec::with_capacity(input_frames); channels];
    let mut block_data = vec![vec![0.0f32; block_size]; channels];

    // Input first, then the tail once the engine is live and its length is known
    let mut position = 0;
    let mut total_frames = input_frames;
    let mut tail_added = false;
    while position < total_frames || !tail_added {
        if position >= total_frames {
            let tail = processor.tail_length_seconds();
            total_frames += (tail * source.sample_rate as f64).ceil() as usize;
            tail_added = true;
            log::info!("Rendering {:.3}s tail", tail);
            continue;
        }

        let frames = block_size.min(total_frames - position);
        for (ch, data) in block_data.iter_mut().enumerate() {
            data[..frames].fill(0.0);
            if position < input_frames {
                let available = frames.min(input_frames - position);
                data[..available]
                    .copy_from_slice(&source.channels[ch][position..position + available]);
            }
        }

        {
            let mut block: Vec<&mut [f32]> =
                block_data.iter_mut().map(|c| &mut c[..frames]).collect();
            processor.process(&mut block);
        }

        for (out, data) in rendered.iter_mut().zip(block_data.iter()) {
            out.extend_from_slice(&data[..frames]);
        }
        position += frames;
    }
    controller.poll();

    let settings = ExportSettings {
        sample_rate: source.sample_rate,
        bit_depth,
    };
    write_wav(&rendered, &settings, output)?;
    log::info!(
        "Wrote {} frames to {}",
        rendered.first().map(|c| c.len()).unwrap_or(0),
        output.display()
    );

    if let Some(path) = save_state {
        std::fs::write(path, processor.state())?;
        log::info!("Saved state to {}", path.display());
    }

    Ok(())
}

fn play(input: &Path, ir: &Path, effect: &EffectArgs) -> Result<(), Box<dyn std::error::Error>> {
    let source = AudioFile::load(input)?;
    let channels = effect_channels(&source);

    let mut processor = build_processor(effect, channels)?;
    processor.prepare(ProcessingSpec::new(
        source.sample_rate as f64,
        PLAYBACK_MAX_BLOCK,
        channels,
    ));
    let controller = processor.controller();
    controller.load_impulse_response(ir)?;

    // Initialize cpal
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or("No output device available")?;
    log::info!("Using audio device: {}", device.name()?);

    let sample_format = device.default_output_config()?.sample_format();
    let config = cpal::StreamConfig {
        channels: channels as u16,
        sample_rate: cpal::SampleRate(source.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let duration = source.duration();
    let player = Player::new(processor, source.channels, channels);
    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, player)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, player)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, player)?,
        other => return Err(format!("Unsupported sample format: {:?}", other).into()),
    };
    stream.play()?;

    let total = duration + controller.tail_length_seconds().max(1.0);
    log::info!("Playing {:.2}s (including tail)", total);
    let mut elapsed = 0.0;
    while elapsed < total {
        thread::sleep(Duration::from_millis(100));
        controller.poll();
        elapsed += 0.1;
    }

    Ok(())
}

/// Audio-thread state for live playback
struct Player {
    processor: IrLoaderProcessor,
    source: Vec<Vec<f32>>,
    position: usize,
    planar: Vec<Vec<f32>>,
}

impl Player {
    fn new(processor: IrLoaderProcessor, source: Vec<Vec<f32>>, channels: usize) -> Self {
        Self {
            processor,
            source,
            position: 0,
            planar: vec![vec![0.0; PLAYBACK_MAX_BLOCK]; channels],
        }
    }

    /// Fill an interleaved output buffer
    fn render(&mut self, output: &mut [f32]) {
        let channels = self.planar.len();
        let total_frames = output.len() / channels;

        let mut done = 0;
        while done < total_frames {
            let frames = PLAYBACK_MAX_BLOCK.min(total_frames - done);
            for (ch, data) in self.planar.iter_mut().enumerate() {
                let source = &self.source[ch];
                for (i, sample) in data[..frames].iter_mut().enumerate() {
                    *sample = source.get(self.position + i).copied().unwrap_or(0.0);
                }
            }

            // Fixed-size slice arrays keep the callback allocation-free
            match self.planar.as_mut_slice() {
                [mono] => self.processor.process(&mut [&mut mono[..frames]]),
                [left, right] => self
                    .processor
                    .process(&mut [&mut left[..frames], &mut right[..frames]]),
                _ => {}
            }

            for i in 0..frames {
                for ch in 0..channels {
                    output[(done + i) * channels + ch] = self.planar[ch][i];
                }
            }
            self.position += frames;
            done += frames;
        }
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut player: Player,
) -> Result<cpal::Stream, Box<dyn std::error::Error>>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>,
{
    let err_fn = |err| log::error!("Audio stream error: {}", err);

    // Preallocate the conversion buffer so the callback never allocates
    let mut conversion_buffer = vec![0.0f32; PLAYBACK_MAX_BLOCK * 2 * 4];

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            if conversion_buffer.len() < data.len() {
                data.fill(T::EQUILIBRIUM);
                return;
            }

            let buffer_slice = &mut conversion_buffer[..data.len()];
            player.render(buffer_slice);

            for (out, &sample) in data.iter_mut().zip(buffer_slice.iter()) {
                *out = cpal::Sample::from_sample(sample);
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
