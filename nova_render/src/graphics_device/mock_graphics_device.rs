/// Mock graphics device for unit tests (no device thread, no pixels)
///
/// Commands are recorded as strings. Submissions either complete immediately
/// (`MockGraphicsDevice::new`) or stay pending until the test completes them
/// through a `MockController` (`MockGraphicsDevice::manual`), which makes the
/// device timeline fully controllable.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard};
use slotmap::SlotMap;
use crate::error::Result;
use crate::graphics_device::{
    AttachmentDesc, AttachmentHandle, BackendKind, BufferHandle, CommandList, CompletionMarker,
    GraphicsDevice, PassDescriptor, PassExecutor, PipelineStateDescriptor, QueryPoolHandle,
    QuadDraw, SurfaceImage, Swapchain, TextureFormat, Timeline,
};
use crate::surface::SurfaceSource;

/// Nanoseconds the mock clock advances per executed timestamp
pub const MOCK_TICK_NS: u64 = 1_000_000;

// ============================================================================
// Shared state
// ============================================================================

#[derive(Debug, Clone)]
enum MockCommand {
    Event(String),
    Timestamp { pool: QueryPoolHandle, index: u32 },
    UpdateBuffer { buffer: BufferHandle, offset: u64, data: Vec<u8> },
}

#[derive(Default)]
struct MockState {
    recorded: Vec<String>,
    executed: Vec<String>,
    attachments: SlotMap<AttachmentHandle, AttachmentDesc>,
    buffers: SlotMap<BufferHandle, Vec<u8>>,
    pools: SlotMap<QueryPoolHandle, Vec<Option<u64>>>,
    pending: Vec<(CompletionMarker, Vec<MockCommand>)>,
    clock: u64,
    auto_complete: bool,
    executor_attachment_delta: usize,
    fail_begin: Vec<String>,
}

struct MockShared {
    state: Mutex<MockState>,
    timeline: Timeline,
}

impl MockShared {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn execute_up_to(&self, marker: CompletionMarker) {
        let mut state = self.state();
        let (ready, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut state.pending)
            .into_iter()
            .partition(|(m, _)| *m <= marker);
        state.pending = pending;

        for (submission, commands) in ready {
            for command in commands {
                match command {
                    MockCommand::Event(event) => state.executed.push(event),
                    MockCommand::Timestamp { pool, index } => {
                        state.clock += MOCK_TICK_NS;
                        let clock = state.clock;
                        if let Some(slot) = state.pools.get_mut(pool).and_then(|p| p.get_mut(index as usize)) {
                            *slot = Some(clock);
                        }
                    }
                    MockCommand::UpdateBuffer { buffer, offset, data } => {
                        if let Some(bytes) = state.buffers.get_mut(buffer) {
                            let start = offset as usize;
                            bytes[start..start + data.len()].copy_from_slice(&data);
                        }
                    }
                }
            }
            self.timeline.signal(submission);
        }
    }
}

/// Test-side handle driving a mock device after it was boxed
#[derive(Clone)]
pub struct MockController {
    shared: Arc<MockShared>,
}

impl MockController {
    /// Execute and signal every submission up to `marker`
    pub fn complete_up_to(&self, marker: CompletionMarker) {
        self.shared.execute_up_to(marker);
    }

    /// Execute and signal every pending submission
    pub fn complete_all(&self) {
        let last = self.shared.timeline.last_issued();
        self.shared.execute_up_to(last);
    }

    /// Events in recording order (across all command lists)
    pub fn recorded(&self) -> Vec<String> {
        self.shared.state().recorded.clone()
    }

    /// Events in execution order
    pub fn executed(&self) -> Vec<String> {
        self.shared.state().executed.clone()
    }

    pub fn clear_logs(&self) {
        let mut state = self.shared.state();
        state.recorded.clear();
        state.executed.clear();
    }

    /// Number of submissions not executed yet
    pub fn pending_count(&self) -> usize {
        self.shared.state().pending.len()
    }

    pub fn live_attachments(&self) -> usize {
        self.shared.state().attachments.len()
    }

    /// Make every executor report `delta` extra attachments
    pub fn set_executor_attachment_delta(&self, delta: usize) {
        self.shared.state().executor_attachment_delta = delta;
    }

    /// Make the executor of pass `label` fail in begin
    pub fn fail_begin_of(&self, label: &str) {
        self.shared.state().fail_begin.push(label.to_string());
    }

    pub fn mark_lost(&self) {
        self.shared.timeline.mark_lost("mock device lost");
    }
}

// ============================================================================
// Mock device
// ============================================================================

pub struct MockGraphicsDevice {
    shared: Arc<MockShared>,
    kind: BackendKind,
}

impl MockGraphicsDevice {
    /// Device whose submissions complete immediately
    pub fn new() -> Self {
        Self::with_auto_complete(true)
    }

    /// Device whose submissions wait for `MockController::complete_*`
    pub fn manual() -> Self {
        Self::with_auto_complete(false)
    }

    fn with_auto_complete(auto_complete: bool) -> Self {
        let state = MockState { auto_complete, ..MockState::default() };
        Self {
            shared: Arc::new(MockShared { state: Mutex::new(state), timeline: Timeline::new() }),
            kind: BackendKind::StateMachine,
        }
    }

    pub fn with_kind(mut self, kind: BackendKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn controller(&self) -> MockController {
        MockController { shared: self.shared.clone() }
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn backend_kind(&self) -> BackendKind {
        self.kind
    }

    fn create_attachment(&mut self, desc: &AttachmentDesc) -> Result<AttachmentHandle> {
        desc.validate()?;
        Ok(self.shared.state().attachments.insert(*desc))
    }

    fn destroy_attachment(&mut self, handle: AttachmentHandle) -> Result<()> {
        match self.shared.state().attachments.remove(handle) {
            Some(_) => Ok(()),
            None => crate::engine_bail!(InvalidResource, "nova::Mock", "unknown attachment"),
        }
    }

    fn attachment_desc(&self, handle: AttachmentHandle) -> Option<AttachmentDesc> {
        self.shared.state().attachments.get(handle).copied()
    }

    fn live_attachment_count(&self) -> usize {
        self.shared.state().attachments.len()
    }

    fn read_attachment(&self, handle: AttachmentHandle) -> Result<Vec<[f32; 4]>> {
        match self.shared.state().attachments.get(handle) {
            Some(desc) => Ok(vec![[0.0; 4]; desc.texel_count()]),
            None => crate::engine_bail!(InvalidResource, "nova::Mock", "unknown attachment"),
        }
    }

    fn create_pass_executor(&mut self, desc: &PassDescriptor) -> Result<Box<dyn PassExecutor>> {
        let state = self.shared.state();
        Ok(Box::new(MockPassExecutor {
            label: desc.label.clone(),
            attachment_count: desc.attachment_count() + state.executor_attachment_delta,
            fail_begin: state.fail_begin.contains(&desc.label),
        }))
    }

    fn create_buffer(&mut self, size: u64) -> Result<BufferHandle> {
        Ok(self.shared.state().buffers.insert(vec![0; size as usize]))
    }

    fn destroy_buffer(&mut self, handle: BufferHandle) -> Result<()> {
        self.shared.state().buffers.remove(handle);
        Ok(())
    }

    fn read_buffer(&self, handle: BufferHandle) -> Result<Vec<u8>> {
        match self.shared.state().buffers.get(handle) {
            Some(bytes) => Ok(bytes.clone()),
            None => crate::engine_bail!(InvalidResource, "nova::Mock", "unknown buffer"),
        }
    }

    fn create_query_pool(&mut self, capacity: u32) -> Result<QueryPoolHandle> {
        Ok(self.shared.state().pools.insert(vec![None; capacity as usize]))
    }

    fn destroy_query_pool(&mut self, handle: QueryPoolHandle) -> Result<()> {
        self.shared.state().pools.remove(handle);
        Ok(())
    }

    fn reset_query_pool(&mut self, handle: QueryPoolHandle) -> Result<()> {
        if let Some(pool) = self.shared.state().pools.get_mut(handle) {
            pool.iter_mut().for_each(|query| *query = None);
        }
        Ok(())
    }

    fn read_timestamps(&self, pool: QueryPoolHandle, first: u32, count: u32) -> Result<Vec<Option<u64>>> {
        let state = self.shared.state();
        match state.pools.get(pool) {
            Some(queries) => Ok((first..first + count)
                .map(|i| queries.get(i as usize).copied().flatten())
                .collect()),
            None => crate::engine_bail!(InvalidResource, "nova::Mock", "unknown query pool"),
        }
    }

    fn timestamp_period_ns(&self) -> f64 {
        1.0
    }

    fn max_timestamp_queries(&self) -> u32 {
        1024
    }

    fn create_command_list(&mut self) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(MockCommandList {
            shared: self.shared.clone(),
            commands: Vec::new(),
            recording: false,
            in_pass: false,
        }))
    }

    fn submit(&mut self, cmd: &mut dyn CommandList) -> Result<CompletionMarker> {
        let list = match cmd.as_any_mut().downcast_mut::<MockCommandList>() {
            Some(list) => list,
            None => crate::engine_bail!(BackendError, "nova::Mock", "foreign command list"),
        };
        if list.recording {
            crate::engine_bail!(LogicError, "nova::Mock", "submit while recording");
        }

        let marker = self.shared.timeline.next_marker()?;
        let commands = std::mem::take(&mut list.commands);
        let auto_complete = {
            let mut state = self.shared.state();
            state.pending.push((marker, commands));
            state.auto_complete
        };
        if auto_complete {
            self.shared.execute_up_to(marker);
        }
        Ok(marker)
    }

    fn is_complete(&self, marker: CompletionMarker) -> Result<bool> {
        self.shared.timeline.is_complete(marker)
    }

    fn wait_for(&self, marker: CompletionMarker) -> Result<()> {
        // Nothing executes on its own in manual mode: waiting completes the work
        if !self.shared.timeline.is_complete(marker)? {
            self.shared.execute_up_to(marker);
        }
        self.shared.timeline.wait_for(marker)
    }

    fn wait_idle(&self) -> Result<()> {
        self.wait_for(self.shared.timeline.last_issued())
    }

    fn create_swapchain(&mut self, surface: Arc<dyn SurfaceSource>) -> Result<Box<dyn Swapchain>> {
        let mut swapchain = MockSwapchain {
            shared: self.shared.clone(),
            surface,
            images: Vec::new(),
            extent: (0, 0),
            next: 0,
            presented: 0,
        };
        let (width, height) = swapchain.surface.drawable_size();
        swapchain.recreate(width, height)?;
        Ok(Box::new(swapchain))
    }
}

// ============================================================================
// Mock command list
// ============================================================================

pub struct MockCommandList {
    shared: Arc<MockShared>,
    commands: Vec<MockCommand>,
    recording: bool,
    in_pass: bool,
}

impl MockCommandList {
    fn record(&mut self, event: String) -> Result<()> {
        if !self.recording {
            crate::engine_bail!(LogicError, "nova::Mock", "'{}' recorded outside begin/end", event);
        }
        self.shared.state().recorded.push(event.clone());
        self.commands.push(MockCommand::Event(event));
        Ok(())
    }
}

impl CommandList for MockCommandList {
    fn begin(&mut self) -> Result<()> {
        if self.recording {
            crate::engine_bail!(LogicError, "nova::Mock", "command list already recording");
        }
        self.commands.clear();
        self.recording = true;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if !self.recording {
            crate::engine_bail!(LogicError, "nova::Mock", "command list not recording");
        }
        self.recording = false;
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.recording
    }

    fn discard(&mut self) {
        self.commands.clear();
        self.recording = false;
        self.in_pass = false;
    }

    fn draw_quad(&mut self, quad: &QuadDraw) -> Result<()> {
        if !self.in_pass {
            crate::engine_bail!(LogicError, "nova::Mock", "draw outside a pass");
        }
        self.record(format!("draw:{:.2}", quad.depth))
    }

    fn copy_attachment(&mut self, _src: AttachmentHandle, _dst: AttachmentHandle) -> Result<()> {
        self.record("copy".to_string())
    }

    fn blit_to_surface(&mut self, _src: AttachmentHandle, image: &SurfaceImage) -> Result<()> {
        self.record(format!("blit:{}", image.index))
    }

    fn update_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        self.record(format!("update:{}", offset))?;
        self.commands.push(MockCommand::UpdateBuffer { buffer, offset, data: data.to_vec() });
        Ok(())
    }

    fn write_timestamp(&mut self, pool: QueryPoolHandle, index: u32) -> Result<()> {
        self.record(format!("timestamp:{}", index))?;
        self.commands.push(MockCommand::Timestamp { pool, index });
        Ok(())
    }

    fn command_count(&self) -> usize {
        self.commands.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Mock pass executor
// ============================================================================

pub struct MockPassExecutor {
    label: String,
    attachment_count: usize,
    fail_begin: bool,
}

fn mock_list<'a>(cmd: &'a mut dyn CommandList) -> Result<&'a mut MockCommandList> {
    match cmd.as_any_mut().downcast_mut::<MockCommandList>() {
        Some(list) => Ok(list),
        None => crate::engine_bail!(BackendError, "nova::Mock", "foreign command list"),
    }
}

impl PassExecutor for MockPassExecutor {
    fn label(&self) -> &str {
        &self.label
    }

    fn attachment_count(&self) -> usize {
        self.attachment_count
    }

    fn begin(&mut self, cmd: &mut dyn CommandList) -> Result<()> {
        if self.fail_begin {
            crate::engine_bail!(BackendError, "nova::Mock", "begin of '{}' failed", self.label);
        }
        let list = mock_list(cmd)?;
        list.record(format!("begin:{}", self.label))?;
        list.in_pass = true;
        Ok(())
    }

    fn apply_state(&mut self, cmd: &mut dyn CommandList, state: &PipelineStateDescriptor) -> Result<()> {
        mock_list(cmd)?.record(format!("state:{}:{:?}", self.label, state.blend))
    }

    fn end(&mut self, cmd: &mut dyn CommandList) -> Result<()> {
        let list = mock_list(cmd)?;
        list.in_pass = false;
        list.record(format!("end:{}", self.label))
    }
}

// ============================================================================
// Mock swapchain
// ============================================================================

pub struct MockSwapchain {
    shared: Arc<MockShared>,
    surface: Arc<dyn SurfaceSource>,
    images: Vec<AttachmentHandle>,
    extent: (u32, u32),
    next: u32,
    presented: u64,
}

impl Swapchain for MockSwapchain {
    fn acquire_next_image(&mut self) -> Result<SurfaceImage> {
        if self.surface.drawable_size() != self.extent {
            crate::engine_bail!(TransientSurfaceError, "nova::Mock", "surface changed size");
        }
        let index = self.next;
        self.next = (self.next + 1) % self.images.len() as u32;
        Ok(SurfaceImage {
            index,
            attachment: self.images[index as usize],
            width: self.extent.0,
            height: self.extent.1,
        })
    }

    fn present(&mut self, _image: &SurfaceImage, _ready: CompletionMarker) -> Result<()> {
        if self.surface.drawable_size() != self.extent {
            crate::engine_bail!(TransientSurfaceError, "nova::Mock", "surface changed size");
        }
        self.presented += 1;
        Ok(())
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        let mut state = self.shared.state();
        for image in self.images.drain(..) {
            state.attachments.remove(image);
        }
        for _ in 0..2 {
            let desc = AttachmentDesc::new(TextureFormat::Bgra8Unorm, width, height);
            desc.validate()?;
            self.images.push(state.attachments.insert(desc));
        }
        self.extent = (width, height);
        self.next = 0;
        Ok(())
    }

    fn extent(&self) -> (u32, u32) {
        self.extent
    }

    fn format(&self) -> TextureFormat {
        TextureFormat::Bgra8Unorm
    }

    fn image_count(&self) -> u32 {
        self.images.len() as u32
    }

    fn presented_count(&self) -> u64 {
        self.presented
    }
}

impl Drop for MockSwapchain {
    fn drop(&mut self) {
        if let Ok(mut state) = self.shared.state.lock() {
            for image in self.images.drain(..) {
                state.attachments.remove(image);
            }
        }
    }
}

// ============================================================================
// Mock surface
// ============================================================================

/// Surface whose size tests change at will
pub struct MockSurface {
    size: Mutex<(u32, u32)>,
}

impl MockSurface {
    pub fn new(width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self { size: Mutex::new((width, height)) })
    }

    pub fn resize(&self, width: u32, height: u32) {
        *self.size.lock().unwrap() = (width, height);
    }
}

impl SurfaceSource for MockSurface {
    fn drawable_size(&self) -> (u32, u32) {
        *self.size.lock().unwrap()
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
