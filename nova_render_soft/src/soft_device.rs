/// Software device - resource arenas, the device thread and the GraphicsDevice implementation
///
/// Submissions are sent over an `mpsc` channel to a dedicated device thread
/// which executes them in order and signals the device `Timeline`. An
/// optional execution delay makes the device artificially slow so that
/// frame-in-flight throttling is observable. If the device thread dies, the
/// timeline is marked lost and every pending wait returns `DeviceLost`.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use slotmap::SlotMap;
use nova_render::nova::{Result, RendererConfig, SurfaceSource};
use nova_render::nova::render::{
    AttachmentDesc, AttachmentHandle, BackendKind, BufferHandle, ClearValue, CommandList,
    CompletionMarker, GraphicsDevice, PassDescriptor, PassExecutor, QueryPoolHandle, Swapchain,
    Timeline,
};
use nova_render::{engine_bail, engine_debug, engine_err, engine_error, engine_info};
use crate::raster::rasterize;
use crate::soft_command::DeviceCommand;
use crate::soft_image::SoftImage;
use crate::soft_swapchain::SoftSwapchain;
use crate::soft_validation::ValidationLog;

const SOURCE: &str = "nova::soft::Device";

// ============================================================================
// Configuration
// ============================================================================

/// Software device configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SoftDeviceConfig {
    /// Time the device thread spends on every submission before executing it
    pub execution_delay: Duration,
    /// Largest timestamp query pool the device accepts
    pub max_timestamp_queries: u32,
    /// Nanoseconds per timestamp tick
    pub timestamp_period_ns: f64,
    /// Record misuse in the validation log
    pub enable_validation: bool,
    /// Images per swapchain
    pub swapchain_images: u32,
}

impl Default for SoftDeviceConfig {
    fn default() -> Self {
        Self {
            execution_delay: Duration::ZERO,
            max_timestamp_queries: 4096,
            timestamp_period_ns: 1.0,
            enable_validation: true,
            swapchain_images: 2,
        }
    }
}

impl SoftDeviceConfig {
    /// Device settings derived from a renderer configuration
    pub fn from_renderer_config(config: &RendererConfig) -> Self {
        Self {
            enable_validation: config.enable_validation,
            ..Self::default()
        }
    }

    pub fn with_execution_delay(mut self, delay: Duration) -> Self {
        self.execution_delay = delay;
        self
    }

    pub fn with_max_timestamp_queries(mut self, max: u32) -> Self {
        self.max_timestamp_queries = max;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_timestamp_queries == 0 {
            engine_bail!(ConfigurationError, SOURCE, "max_timestamp_queries must be non-zero");
        }
        if !(self.timestamp_period_ns.is_finite() && self.timestamp_period_ns > 0.0) {
            engine_bail!(
                ConfigurationError,
                SOURCE,
                "timestamp period must be positive, got {}",
                self.timestamp_period_ns
            );
        }
        if self.swapchain_images == 0 {
            engine_bail!(ConfigurationError, SOURCE, "swapchain needs at least one image");
        }
        Ok(())
    }
}

// ============================================================================
// Shared device state
// ============================================================================

/// Lock that survives a panicked holder (the device thread reports its own death)
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared by the device, its command lists, executors and swapchains
pub struct DeviceShared {
    images: Mutex<SlotMap<AttachmentHandle, SoftImage>>,
    buffers: Mutex<SlotMap<BufferHandle, Vec<u8>>>,
    pools: Mutex<SlotMap<QueryPoolHandle, Vec<Option<u64>>>>,
    timeline: Timeline,
    validation: Arc<ValidationLog>,
    epoch: Instant,
    config: SoftDeviceConfig,
}

impl DeviceShared {
    fn new(config: SoftDeviceConfig) -> Self {
        Self {
            images: Mutex::new(SlotMap::with_key()),
            buffers: Mutex::new(SlotMap::with_key()),
            pools: Mutex::new(SlotMap::with_key()),
            timeline: Timeline::new(),
            validation: Arc::new(ValidationLog::new(config.enable_validation)),
            epoch: Instant::now(),
            config,
        }
    }

    pub(crate) fn images(&self) -> MutexGuard<'_, SlotMap<AttachmentHandle, SoftImage>> {
        lock(&self.images)
    }

    pub(crate) fn attachment_desc(&self, handle: AttachmentHandle) -> Option<AttachmentDesc> {
        self.images().get(handle).map(|image| *image.desc())
    }

    pub(crate) fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub(crate) fn config(&self) -> &SoftDeviceConfig {
        &self.config
    }

    fn now_ticks(&self) -> u64 {
        (self.epoch.elapsed().as_nanos() as f64 / self.config.timestamp_period_ns) as u64
    }

    fn execute(&self, commands: &[DeviceCommand]) {
        for command in commands {
            self.execute_one(command);
        }
    }

    fn execute_one(&self, command: &DeviceCommand) {
        let validation = &self.validation;
        match command {
            DeviceCommand::Clear { target, value } => match self.images().get_mut(*target) {
                Some(image) => match value {
                    ClearValue::Color(color) => image.fill(*color),
                    ClearValue::DepthStencil { depth, stencil } => {
                        image.fill([*depth, *stencil as f32, 0.0, 0.0])
                    }
                },
                None => validation.error("clear of a destroyed attachment"),
            },
            DeviceCommand::Discard { target } => {
                if let Some(image) = self.images().get_mut(*target) {
                    image.poison();
                }
            }
            DeviceCommand::Draw(draw) => {
                let mut images = self.images();
                rasterize(&mut images, draw, validation);
            }
            DeviceCommand::Copy { src, dst } => {
                let mut images = self.images();
                let source = match images.get(*src) {
                    Some(image) => image.clone(),
                    None => return validation.error("copy from a destroyed attachment"),
                };
                match images.get_mut(*dst) {
                    Some(target) => {
                        if source.desc().format != target.desc().format {
                            validation.warning("copy between attachments of different format");
                        }
                        if !target.copy_from(&source) {
                            validation.error("copy between attachments of different size");
                        }
                    }
                    None => validation.error("copy into a destroyed attachment"),
                }
            }
            DeviceCommand::Blit { src, dst } => {
                let mut images = self.images();
                let source = match images.get(*src) {
                    Some(image) => image.clone(),
                    None => return validation.error("blit from a destroyed attachment"),
                };
                match images.get_mut(*dst) {
                    Some(target) => target.blit_from(&source),
                    None => validation.error("blit into a destroyed presentable image"),
                }
            }
            DeviceCommand::UpdateBuffer { buffer, offset, data } => {
                let mut buffers = lock(&self.buffers);
                match buffers.get_mut(*buffer) {
                    Some(bytes) => {
                        let start = *offset as usize;
                        match start.checked_add(data.len()) {
                            Some(end) if end <= bytes.len() => bytes[start..end].copy_from_slice(data),
                            _ => validation.error("buffer write out of range"),
                        }
                    }
                    None => validation.error("write into a destroyed buffer"),
                }
            }
            DeviceCommand::WriteTimestamp { pool, index } => {
                let now = self.now_ticks();
                let mut pools = lock(&self.pools);
                match pools.get_mut(*pool).and_then(|queries| queries.get_mut(*index as usize)) {
                    Some(query) => *query = Some(now),
                    None => validation.error("timestamp written to a missing query"),
                }
            }
        }
    }
}

// ============================================================================
// Device thread
// ============================================================================

enum Job {
    Execute { marker: CompletionMarker, commands: Vec<DeviceCommand> },
    Fault(String),
    Shutdown,
}

fn run_device_thread(shared: Arc<DeviceShared>, jobs: Receiver<Job>) {
    engine_debug!(SOURCE, "device thread started");

    while let Ok(job) = jobs.recv() {
        match job {
            Job::Execute { marker, commands } => {
                if !shared.config.execution_delay.is_zero() {
                    thread::sleep(shared.config.execution_delay);
                }
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| shared.execute(&commands)));
                if outcome.is_err() {
                    engine_error!(SOURCE, "device thread panicked executing submission {}", marker.value());
                    shared.timeline.mark_lost("device thread panicked");
                    return;
                }
                shared.timeline.signal(marker);
            }
            Job::Fault(reason) => {
                engine_error!(SOURCE, "device lost: {}", reason);
                shared.timeline.mark_lost(&reason);
                return;
            }
            Job::Shutdown => break,
        }
    }

    engine_debug!(SOURCE, "device thread stopped");
}

// ============================================================================
// Execution model seam
// ============================================================================

/// What distinguishes one execution model from another
///
/// The device owns resources, the thread and the timeline; the backend
/// decides how command lists resolve state and how pass descriptors are
/// realized.
pub trait SoftBackend: Send + Sized + 'static {
    const KIND: BackendKind;

    fn new(shared: &Arc<DeviceShared>) -> Self;

    fn create_command_list(&mut self, shared: &Arc<DeviceShared>) -> Box<dyn CommandList>;

    fn create_pass_executor(
        &mut self,
        shared: &Arc<DeviceShared>,
        desc: &PassDescriptor,
    ) -> Result<Box<dyn PassExecutor>>;

    /// Extract the recorded commands of one of this backend's command lists
    fn take_submission(&mut self, cmd: &mut dyn CommandList) -> Result<Vec<DeviceCommand>>;

    /// Called once the submission was queued
    fn submitted(&mut self, cmd: &mut dyn CommandList, marker: CompletionMarker);
}

// ============================================================================
// SoftDevice
// ============================================================================

/// Software graphics device running one execution model
pub struct SoftDevice<B: SoftBackend> {
    shared: Arc<DeviceShared>,
    backend: B,
    jobs: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl<B: SoftBackend> SoftDevice<B> {
    /// Start the device thread
    pub fn new(config: SoftDeviceConfig) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(DeviceShared::new(config));
        let (sender, receiver) = mpsc::channel();
        let thread_shared = shared.clone();
        let worker = thread::Builder::new()
            .name(format!("nova-soft-{}", B::KIND.name()))
            .spawn(move || run_device_thread(thread_shared, receiver))
            .map_err(|e| engine_err!(InitializationFailed, SOURCE, "failed to spawn device thread: {}", e))?;

        let backend = B::new(&shared);
        engine_info!(SOURCE, "{} device created", B::KIND.name());

        Ok(Self {
            shared,
            backend,
            jobs: Some(sender),
            worker: Some(worker),
        })
    }

    /// Device configured from a renderer configuration
    pub fn from_renderer_config(config: &RendererConfig) -> Result<Self> {
        Self::new(SoftDeviceConfig::from_renderer_config(config))
    }

    pub fn config(&self) -> &SoftDeviceConfig {
        &self.shared.config
    }

    /// Validation log of this device (stays valid after the device is boxed)
    pub fn validation(&self) -> Arc<ValidationLog> {
        self.shared.validation.clone()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Stop the device thread as if the hardware had failed
    pub fn lose_device(&self, reason: &str) {
        let delivered = self
            .jobs
            .as_ref()
            .map(|jobs| jobs.send(Job::Fault(reason.to_string())).is_ok())
            .unwrap_or(false);
        if !delivered {
            self.shared.timeline.mark_lost(reason);
        }
    }

    fn send(&self, job: Job) -> Result<()> {
        let sent = match &self.jobs {
            Some(jobs) => jobs.send(job).is_ok(),
            None => false,
        };
        if !sent {
            self.shared.timeline.mark_lost("device thread is gone");
            engine_bail!(DeviceLost, SOURCE, "device thread is gone");
        }
        Ok(())
    }
}

impl<B: SoftBackend> GraphicsDevice for SoftDevice<B> {
    fn backend_kind(&self) -> BackendKind {
        B::KIND
    }

    fn create_attachment(&mut self, desc: &AttachmentDesc) -> Result<AttachmentHandle> {
        desc.validate()?;
        Ok(self.shared.images().insert(SoftImage::new(*desc)))
    }

    fn destroy_attachment(&mut self, handle: AttachmentHandle) -> Result<()> {
        match self.shared.images().remove(handle) {
            Some(_) => Ok(()),
            None => engine_bail!(InvalidResource, SOURCE, "destroy of an unknown attachment"),
        }
    }

    fn attachment_desc(&self, handle: AttachmentHandle) -> Option<AttachmentDesc> {
        self.shared.attachment_desc(handle)
    }

    fn live_attachment_count(&self) -> usize {
        self.shared.images().len()
    }

    fn read_attachment(&self, handle: AttachmentHandle) -> Result<Vec<[f32; 4]>> {
        match self.shared.images().get(handle) {
            Some(image) => Ok(image.texels().to_vec()),
            None => engine_bail!(InvalidResource, SOURCE, "read of an unknown attachment"),
        }
    }

    fn create_pass_executor(&mut self, desc: &PassDescriptor) -> Result<Box<dyn PassExecutor>> {
        desc.validate()?;

        for attachment in desc.attachments() {
            match self.shared.attachment_desc(attachment.handle) {
                Some(live) if live == attachment.desc => {}
                Some(live) => engine_bail!(
                    ConfigurationError,
                    SOURCE,
                    "pass '{}' describes an attachment as {:?} but it is {:?}",
                    desc.label,
                    attachment.desc,
                    live
                ),
                None => engine_bail!(
                    InvalidResource,
                    SOURCE,
                    "pass '{}' binds a destroyed attachment",
                    desc.label
                ),
            }
        }
        for input in &desc.sampled_inputs {
            if self.shared.attachment_desc(*input).is_none() {
                engine_bail!(InvalidResource, SOURCE, "pass '{}' samples a destroyed attachment", desc.label);
            }
        }

        self.backend.create_pass_executor(&self.shared, desc)
    }

    fn create_buffer(&mut self, size: u64) -> Result<BufferHandle> {
        if size == 0 {
            engine_bail!(ConfigurationError, SOURCE, "buffer size must be non-zero");
        }
        Ok(lock(&self.shared.buffers).insert(vec![0; size as usize]))
    }

    fn destroy_buffer(&mut self, handle: BufferHandle) -> Result<()> {
        match lock(&self.shared.buffers).remove(handle) {
            Some(_) => Ok(()),
            None => engine_bail!(InvalidResource, SOURCE, "destroy of an unknown buffer"),
        }
    }

    fn read_buffer(&self, handle: BufferHandle) -> Result<Vec<u8>> {
        match lock(&self.shared.buffers).get(handle) {
            Some(bytes) => Ok(bytes.clone()),
            None => engine_bail!(InvalidResource, SOURCE, "read of an unknown buffer"),
        }
    }

    fn create_query_pool(&mut self, capacity: u32) -> Result<QueryPoolHandle> {
        if capacity == 0 || capacity > self.shared.config.max_timestamp_queries {
            engine_bail!(
                ConfigurationError,
                SOURCE,
                "query pool capacity must be in 1..={}, got {}",
                self.shared.config.max_timestamp_queries,
                capacity
            );
        }
        Ok(lock(&self.shared.pools).insert(vec![None; capacity as usize]))
    }

    fn destroy_query_pool(&mut self, handle: QueryPoolHandle) -> Result<()> {
        match lock(&self.shared.pools).remove(handle) {
            Some(_) => Ok(()),
            None => engine_bail!(InvalidResource, SOURCE, "destroy of an unknown query pool"),
        }
    }

    fn reset_query_pool(&mut self, handle: QueryPoolHandle) -> Result<()> {
        match lock(&self.shared.pools).get_mut(handle) {
            Some(queries) => {
                queries.iter_mut().for_each(|query| *query = None);
                Ok(())
            }
            None => engine_bail!(InvalidResource, SOURCE, "reset of an unknown query pool"),
        }
    }

    fn read_timestamps(&self, pool: QueryPoolHandle, first: u32, count: u32) -> Result<Vec<Option<u64>>> {
        let pools = lock(&self.shared.pools);
        let queries = match pools.get(pool) {
            Some(queries) => queries,
            None => engine_bail!(InvalidResource, SOURCE, "read of an unknown query pool"),
        };
        let start = first as usize;
        let end = start + count as usize;
        if end > queries.len() {
            engine_bail!(
                InvalidResource,
                SOURCE,
                "queries {}..{} out of a pool of {}",
                start,
                end,
                queries.len()
            );
        }
        Ok(queries[start..end].to_vec())
    }

    fn timestamp_period_ns(&self) -> f64 {
        self.shared.config.timestamp_period_ns
    }

    fn max_timestamp_queries(&self) -> u32 {
        self.shared.config.max_timestamp_queries
    }

    fn create_command_list(&mut self) -> Result<Box<dyn CommandList>> {
        Ok(self.backend.create_command_list(&self.shared))
    }

    fn submit(&mut self, cmd: &mut dyn CommandList) -> Result<CompletionMarker> {
        let commands = self.backend.take_submission(cmd)?;
        let marker = self.shared.timeline.next_marker()?;
        self.send(Job::Execute { marker, commands })?;
        self.backend.submitted(cmd, marker);
        Ok(marker)
    }

    fn is_complete(&self, marker: CompletionMarker) -> Result<bool> {
        self.shared.timeline.is_complete(marker)
    }

    fn wait_for(&self, marker: CompletionMarker) -> Result<()> {
        self.shared.timeline.wait_for(marker)
    }

    fn wait_idle(&self) -> Result<()> {
        self.shared.timeline.wait_idle()
    }

    fn create_swapchain(&mut self, surface: Arc<dyn SurfaceSource>) -> Result<Box<dyn Swapchain>> {
        Ok(Box::new(SoftSwapchain::new(self.shared.clone(), surface)?))
    }
}

impl<B: SoftBackend> Drop for SoftDevice<B> {
    fn drop(&mut self) {
        // Queued work still runs: Shutdown is processed after it
        if let Some(jobs) = self.jobs.take() {
            let _ = jobs.send(Job::Shutdown);
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                engine_error!(SOURCE, "device thread terminated abnormally");
            }
        }
    }
}

#[cfg(test)]
#[path = "soft_device_tests.rs"]
mod tests;
