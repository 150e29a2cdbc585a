use super::bus::{BusLayout, ProcessingSpec};
use super::signal_path::SignalPath;
use crate::command::{AudioEvent, Command, PreparedEngine};
use crate::config::ProcessorConfig;
use crate::dsp::{default_engine_factory, ConvolutionOptions, EngineFactory, ImpulseResponse};
use crate::error::{LayoutError, LoadError, StateError};
use crate::io::ImpulseLoader;
use crate::params::{ParameterStore, PersistedState};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// State visible to both the processor and its controllers
struct SharedStatus {
    /// Latest prepared spec and its generation. Never touched by `process`.
    published: Mutex<Option<(ProcessingSpec, u64)>>,
    sample_rate_bits: AtomicU64,
    impulse_loaded: AtomicBool,
    impulse_samples: AtomicUsize,
}

impl SharedStatus {
    fn new() -> Self {
        Self {
            published: Mutex::new(None),
            sample_rate_bits: AtomicU64::new(0.0f64.to_bits()),
            impulse_loaded: AtomicBool::new(false),
            impulse_samples: AtomicUsize::new(0),
        }
    }

    fn publish_spec(&self, spec: ProcessingSpec, generation: u64) {
        *self.published.lock() = Some((spec, generation));
        self.sample_rate_bits
            .store(spec.sample_rate.to_bits(), Ordering::Release);
    }

    fn publish_engine(&self, impulse_samples: usize) {
        self.impulse_samples.store(impulse_samples, Ordering::Release);
        self.impulse_loaded.store(true, Ordering::Release);
    }

    fn is_impulse_loaded(&self) -> bool {
        self.impulse_loaded.load(Ordering::Acquire)
    }

    fn tail_length_seconds(&self) -> f64 {
        if !self.is_impulse_loaded() {
            return 0.0;
        }
        let sample_rate = f64::from_bits(self.sample_rate_bits.load(Ordering::Acquire));
        if sample_rate > 0.0 {
            self.impulse_samples.load(Ordering::Acquire) as f64 / sample_rate
        } else {
            0.0
        }
    }
}

/// The audio-thread half of the effect
///
/// Owns the active engine and the signal path. Engines arrive from a
/// `ProcessorController` over a lock-free queue and are swapped in at the
/// start of a block.
pub struct IrLoaderProcessor {
    params: Arc<ParameterStore>,
    layout: BusLayout,
    spec: Option<ProcessingSpec>,
    generation: u64,
    signal_path: SignalPath,
    active: Option<Box<PreparedEngine>>,

    // Lock-free communication
    command_rx: rtrb::Consumer<Command>,
    event_tx: rtrb::Producer<AudioEvent>,

    /// Engine-carrying events that did not fit in the event queue
    overflow: Vec<AudioEvent>,

    shared: Arc<SharedStatus>,
    controller: ProcessorController,
}

impl IrLoaderProcessor {
    /// Create a processor using the built-in partitioned convolution engine
    pub fn new(config: ProcessorConfig) -> Self {
        Self::with_engine_factory(config, default_engine_factory())
    }

    /// Create a processor whose controller builds engines with `factory`
    pub fn with_engine_factory(config: ProcessorConfig, factory: EngineFactory) -> Self {
        let capacity = config.command_capacity.max(1);
        let (command_tx, command_rx) = rtrb::RingBuffer::<Command>::new(capacity);
        // Every install can produce an installed event plus a retired or rejected one
        let (event_tx, event_rx) = rtrb::RingBuffer::<AudioEvent>::new(capacity * 2 + 2);

        let params = Arc::new(ParameterStore::new());
        let shared = Arc::new(SharedStatus::new());

        let controller = ProcessorController {
            inner: Arc::new(Mutex::new(ControllerInner {
                command_tx,
                event_rx,
                pending: None,
                next_serial: 0,
                latest_serial: 0,
                current_name: None,
            })),
            shared: Arc::clone(&shared),
            params: Arc::clone(&params),
            factory,
            options: config.convolution,
        };

        let layout = match config.layout.validate() {
            Ok(()) => config.layout,
            Err(e) => {
                log::warn!("{}; falling back to stereo", e);
                BusLayout::stereo()
            }
        };

        Self {
            params,
            layout,
            spec: None,
            generation: 0,
            signal_path: SignalPath::new(),
            active: None,
            command_rx,
            event_tx,
            overflow: Vec::with_capacity(capacity + 2),
            shared,
            controller,
        }
    }

    /// A handle for control threads
    pub fn controller(&self) -> ProcessorController {
        self.controller.clone()
    }

    pub fn parameters(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    pub fn layout(&self) -> BusLayout {
        self.layout
    }

    /// Spec the processor is currently prepared with
    pub fn spec(&self) -> Option<ProcessingSpec> {
        self.spec
    }

    /// Accept a new bus layout. Rejected layouts leave the current one in place.
    ///
    /// A prepared processor whose channel count changes is prepared again
    /// with the new count.
    pub fn set_layout(&mut self, layout: BusLayout) -> Result<(), LayoutError> {
        if let Err(e) = layout.validate() {
            log::warn!("Rejecting bus layout: {}", e);
            return Err(e);
        }
        self.layout = layout;
        if let Some(spec) = self.spec {
            if spec.num_channels != layout.active_channels() {
                self.prepare(spec);
            }
        }
        Ok(())
    }

    /// Prepare for processing (never called concurrently with `process`)
    ///
    /// Bumps the spec generation, adopts any engine still waiting in the
    /// queue and re-prepares the active engine for `spec`. The channel count
    /// always follows the bus layout. An invalid spec leaves the processor
    /// unprepared, so blocks pass through.
    pub fn prepare(&mut self, mut spec: ProcessingSpec) {
        if !spec.is_valid() {
            log::warn!("Ignoring invalid processing spec {:?}", spec);
            self.spec = None;
            return;
        }

        let channels = self.layout.active_channels();
        if spec.num_channels != channels {
            log::warn!(
                "Spec asks for {} channel(s) but the layout has {}; using the layout",
                spec.num_channels,
                channels
            );
            spec.num_channels = channels;
        }

        self.generation += 1;
        self.spec = Some(spec);
        self.signal_path.prepare(&spec);
        self.shared.publish_spec(spec, self.generation);

        // Engines waiting in the queue or the pending slot were built for an older spec
        let mut newest: Option<Box<PreparedEngine>> = None;
        while let Ok(Command::InstallEngine(prepared)) = self.command_rx.pop() {
            newest = Some(newer_engine(newest, prepared));
        }
        if let Some(pending) = self.controller.inner.lock().pending.take() {
            newest = Some(newer_engine(newest, pending));
        }

        if let Some(candidate) = newest {
            let is_newer = self
                .active
                .as_ref()
                .map(|active| active.serial <= candidate.serial)
                .unwrap_or(true);
            if is_newer {
                self.active = Some(candidate);
            }
        }

        if let Some(active) = self.active.as_mut() {
            active.engine.prepare(&spec);
            active.engine.reset();
            active.generation = self.generation;
            self.shared.publish_engine(active.engine.impulse_length());
        }

        log::info!(
            "Prepared for {} Hz, {} samples per block, {} channel(s)",
            spec.sample_rate,
            spec.max_block_size,
            spec.num_channels
        );
    }

    /// Stop processing and free scratch memory. The loaded impulse is kept.
    pub fn release(&mut self) {
        self.spec = None;
        self.signal_path.release();
        if let Some(active) = self.active.as_mut() {
            active.engine.reset();
        }
    }

    /// Clear the convolution history
    pub fn reset(&mut self) {
        if let Some(active) = self.active.as_mut() {
            active.engine.reset();
        }
    }

    /// Process one block in place - called from the audio thread
    pub fn process(&mut self, block: &mut [&mut [f32]]) {
        self.flush_overflow();
        while let Ok(command) = self.command_rx.pop() {
            self.handle_command(command);
        }

        let active_channels = self.layout.active_channels().min(block.len());
        for channel in block[active_channels..].iter_mut() {
            channel.fill(0.0);
        }

        if self.spec.is_none() {
            return;
        }

        let engine = self.active.as_mut().map(|prepared| prepared.engine.as_mut());
        self.signal_path
            .process(&mut block[..active_channels], engine, &self.params);
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::InstallEngine(prepared) => {
                if prepared.generation != self.generation {
                    self.send_back(AudioEvent::EngineRejected(prepared));
                    return;
                }

                let superseded = self
                    .active
                    .as_ref()
                    .map(|active| active.serial > prepared.serial)
                    .unwrap_or(false);
                if superseded {
                    self.send_back(AudioEvent::EngineRetired(prepared));
                    return;
                }

                let serial = prepared.serial;
                let samples = prepared.engine.impulse_length();
                if let Some(old) = self.active.replace(prepared) {
                    self.send_back(AudioEvent::EngineRetired(old));
                }
                self.shared.publish_engine(samples);
                let _ = self.event_tx.push(AudioEvent::EngineInstalled(serial, samples));
            }
        }
    }

    /// Hand an engine back to the control side without freeing it here
    fn send_back(&mut self, event: AudioEvent) {
        if let Err(rtrb::PushError::Full(event)) = self.event_tx.push(event) {
            if self.overflow.len() < self.overflow.capacity() {
                self.overflow.push(event);
            }
        }
    }

    fn flush_overflow(&mut self) {
        while let Some(event) = self.overflow.pop() {
            if let Err(rtrb::PushError::Full(event)) = self.event_tx.push(event) {
                self.overflow.push(event);
                break;
            }
        }
    }

    /// Effect tail in seconds (0 when no impulse is loaded)
    pub fn tail_length_seconds(&self) -> f64 {
        self.shared.tail_length_seconds()
    }

    pub fn is_impulse_loaded(&self) -> bool {
        self.shared.is_impulse_loaded()
    }

    /// Parameter values as an opaque blob for the host
    pub fn state(&self) -> Vec<u8> {
        self.params.serialize().to_bytes()
    }

    /// Restore a blob produced by `state`. Anything else leaves parameters unchanged.
    pub fn set_state(&self, data: &[u8]) -> Result<(), StateError> {
        let result =
            PersistedState::from_bytes(data).and_then(|state| self.params.restore(&state));
        if let Err(e) = &result {
            log::warn!("Ignoring saved state: {}", e);
        }
        result
    }
}

fn newer_engine(
    current: Option<Box<PreparedEngine>>,
    candidate: Box<PreparedEngine>,
) -> Box<PreparedEngine> {
    match current {
        Some(current) if current.serial > candidate.serial => current,
        _ => candidate,
    }
}

struct ControllerInner {
    command_tx: rtrb::Producer<Command>,
    event_rx: rtrb::Consumer<AudioEvent>,
    /// Engine waiting for room in the command queue
    pending: Option<Box<PreparedEngine>>,
    next_serial: u64,
    /// Serial of the newest engine successfully submitted
    latest_serial: u64,
    current_name: Option<String>,
}

impl ControllerInner {
    fn submit(&mut self, prepared: Box<PreparedEngine>) {
        self.latest_serial = self.latest_serial.max(prepared.serial);
        self.retry_pending();

        if let Some(pending) = self.pending.take() {
            self.pending = Some(newer_engine(Some(pending), prepared));
            return;
        }

        if let Err(rtrb::PushError::Full(Command::InstallEngine(prepared))) =
            self.command_tx.push(Command::InstallEngine(prepared))
        {
            log::debug!("Command queue full, holding '{}' until the next poll", prepared.name);
            self.pending = Some(prepared);
        }
    }

    fn retry_pending(&mut self) {
        if let Some(prepared) = self.pending.take() {
            if let Err(rtrb::PushError::Full(Command::InstallEngine(prepared))) =
                self.command_tx.push(Command::InstallEngine(prepared))
            {
                self.pending = Some(prepared);
            }
        }
    }
}

/// Control-thread handle: loads impulse responses and reads status
///
/// Cheap to clone. Decoding and engine preparation run on the calling
/// thread; only the finished engine crosses to the audio thread.
#[derive(Clone)]
pub struct ProcessorController {
    inner: Arc<Mutex<ControllerInner>>,
    shared: Arc<SharedStatus>,
    params: Arc<ParameterStore>,
    factory: EngineFactory,
    options: ConvolutionOptions,
}

impl ProcessorController {
    /// Load an impulse response file and queue it for the audio thread
    ///
    /// On failure the active impulse stays in place.
    pub fn load_impulse_response<P: AsRef<Path>>(&self, path: P) -> Result<(), LoadError> {
        let path = path.as_ref();
        let ir = ImpulseLoader::load(path).map_err(|e| {
            log::warn!("Failed to load impulse response {}: {}", path.display(), e);
            e
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.install_impulse(ir, name)
    }

    /// Build an engine for an already decoded impulse response and queue it
    pub fn install_impulse(
        &self,
        ir: ImpulseResponse,
        name: impl Into<String>,
    ) -> Result<(), LoadError> {
        let name = name.into();
        let serial = {
            let mut inner = self.inner.lock();
            inner.next_serial += 1;
            inner.next_serial
        };

        let (channels, frames, duration) = (ir.channel_count(), ir.sample_count(), ir.duration());
        let published = *self.shared.published.lock();

        let mut engine = (self.factory)();
        let generation = match published {
            Some((spec, generation)) => {
                engine.prepare(&spec);
                generation
            }
            None => 0,
        };
        if let Err(e) = engine.load_impulse_response(ir, self.options) {
            log::warn!("Failed to prepare impulse response '{}': {}", name, e);
            return Err(e);
        }

        log::info!(
            "Loaded impulse response '{}': {} channel(s), {} samples, {:.3}s ({})",
            name,
            channels,
            frames,
            duration,
            engine.name()
        );

        {
            let mut inner = self.inner.lock();
            if serial >= inner.latest_serial {
                inner.current_name = Some(name.clone());
            }
            inner.submit(Box::new(PreparedEngine {
                engine,
                generation,
                serial,
                name,
            }));
        }
        self.poll();
        Ok(())
    }

    /// Collect events from the audio thread
    ///
    /// Drops retired engines, re-prepares engines rejected for a stale spec
    /// (unless a newer load superseded them) and retries a held engine.
    pub fn poll(&self) {
        let mut inner = self.inner.lock();
        while let Ok(event) = inner.event_rx.pop() {
            match event {
                AudioEvent::EngineInstalled(serial, samples) => {
                    log::debug!("Engine {} installed ({} samples)", serial, samples);
                }
                AudioEvent::EngineRetired(prepared) => {
                    log::debug!("Releasing engine for '{}'", prepared.name);
                }
                AudioEvent::EngineRejected(mut prepared) => {
                    if prepared.serial < inner.latest_serial {
                        log::debug!("Dropping superseded engine for '{}'", prepared.name);
                        continue;
                    }
                    let published = *self.shared.published.lock();
                    if let Some((spec, generation)) = published {
                        log::info!(
                            "Re-preparing '{}' for {} Hz, {} samples per block",
                            prepared.name,
                            spec.sample_rate,
                            spec.max_block_size
                        );
                        prepared.engine.prepare(&spec);
                        prepared.generation = generation;
                        inner.submit(prepared);
                    }
                }
            }
        }
        inner.retry_pending();
    }

    pub fn parameters(&self) -> Arc<ParameterStore> {
        Arc::clone(&self.params)
    }

    /// Name of the last impulse response that loaded successfully
    pub fn current_impulse_name(&self) -> Option<String> {
        self.inner.lock().current_name.clone()
    }

    pub fn is_impulse_loaded(&self) -> bool {
        self.shared.is_impulse_loaded()
    }

    pub fn tail_length_seconds(&self) -> f64 {
        self.shared.tail_length_seconds()
    }

    pub fn options(&self) -> ConvolutionOptions {
        self.options
    }

    /// Options used for subsequent loads
    pub fn set_options(&mut self, options: ConvolutionOptions) {
        self.options = options;
    }
}
