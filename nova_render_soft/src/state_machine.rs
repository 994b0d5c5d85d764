/// State-machine execution model
///
/// The device owns one ambient context: bound draw/read targets plus the
/// current fixed-function state. Draws read whatever is bound when they are
/// recorded. Every operation that changes ambient state on behalf of a pass
/// or a transfer captures what it touches in a `ScopedCapture` and restores it
/// when the guard drops, so nothing leaks from one pass into the next.

use std::any::Any;
use std::sync::{Arc, Mutex};
use bitflags::bitflags;
use nova_render::nova::Result;
use nova_render::nova::render::{
    AttachmentHandle, AttachmentRef, BackendKind, BlendMode, BufferHandle, ColorWriteMask,
    CommandList, CompletionMarker, DepthState, LoadOp, PassDescriptor, PassExecutor,
    PipelineStateDescriptor, PrimitiveTopology, QuadDraw, QueryPoolHandle, RasterizationState,
    Rect2D, StoreOp, SurfaceImage,
};
use nova_render::{engine_bail, engine_err, engine_trace};
use crate::soft_command::{CommandRecorder, DeviceCommand, ResolvedDraw};
use crate::soft_device::{lock, DeviceShared, SoftBackend, SoftDevice};

const SOURCE: &str = "nova::soft::StateMachine";

// ============================================================================
// Ambient state
// ============================================================================

bitflags! {
    /// Groups of ambient state a capture covers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StateMask: u32 {
        /// Draw, depth and read target bindings
        const TARGETS = 1 << 0;
        const DEPTH = 1 << 1;
        const RASTER = 1 << 2;
        const BLEND = 1 << 3;
        const COLOR_MASK = 1 << 4;
        const SCISSOR = 1 << 5;
        const ALL = Self::TARGETS.bits()
            | Self::DEPTH.bits()
            | Self::RASTER.bits()
            | Self::BLEND.bits()
            | Self::COLOR_MASK.bits()
            | Self::SCISSOR.bits();
    }
}

/// Everything a draw picks up implicitly
#[derive(Debug, Clone, PartialEq)]
pub struct AmbientState {
    pub draw_targets: Vec<AttachmentHandle>,
    pub depth_target: Option<AttachmentHandle>,
    pub read_target: Option<AttachmentHandle>,
    pub depth: DepthState,
    pub rasterization: RasterizationState,
    pub topology: PrimitiveTopology,
    pub blend: BlendMode,
    pub color_write_mask: ColorWriteMask,
    pub scissor: Option<Rect2D>,
}

impl Default for AmbientState {
    fn default() -> Self {
        Self {
            draw_targets: Vec::new(),
            depth_target: None,
            read_target: None,
            depth: DepthState::DISABLED,
            rasterization: RasterizationState::default(),
            topology: PrimitiveTopology::TriangleList,
            blend: BlendMode::Opaque,
            color_write_mask: ColorWriteMask::ALL,
            scissor: None,
        }
    }
}

impl AmbientState {
    /// Fixed-function state a draw recorded now would use
    pub fn pipeline_state(&self) -> PipelineStateDescriptor {
        PipelineStateDescriptor {
            depth: self.depth,
            rasterization: self.rasterization,
            blend: self.blend,
            color_write_mask: self.color_write_mask,
            topology: self.topology,
            scissor: self.scissor,
        }
    }

    pub fn apply_pipeline_state(&mut self, state: &PipelineStateDescriptor) {
        self.depth = state.depth;
        self.rasterization = state.rasterization;
        self.topology = state.topology;
        self.blend = state.blend;
        self.color_write_mask = state.color_write_mask;
        self.scissor = state.scissor;
    }

    pub fn snapshot(&self, mask: StateMask) -> StateSnapshot {
        StateSnapshot { mask, saved: self.clone() }
    }

    /// Put back the groups `snapshot` covers, leaving the rest untouched
    pub fn restore(&mut self, snapshot: &StateSnapshot) {
        let saved = &snapshot.saved;
        if snapshot.mask.contains(StateMask::TARGETS) {
            self.draw_targets = saved.draw_targets.clone();
            self.depth_target = saved.depth_target;
            self.read_target = saved.read_target;
        }
        if snapshot.mask.contains(StateMask::DEPTH) {
            self.depth = saved.depth;
        }
        if snapshot.mask.contains(StateMask::RASTER) {
            self.rasterization = saved.rasterization;
            self.topology = saved.topology;
        }
        if snapshot.mask.contains(StateMask::BLEND) {
            self.blend = saved.blend;
        }
        if snapshot.mask.contains(StateMask::COLOR_MASK) {
            self.color_write_mask = saved.color_write_mask;
        }
        if snapshot.mask.contains(StateMask::SCISSOR) {
            self.scissor = saved.scissor;
        }
    }
}

/// Saved copy of some groups of ambient state
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    mask: StateMask,
    saved: AmbientState,
}

impl StateSnapshot {
    pub fn mask(&self) -> StateMask {
        self.mask
    }
}

/// Handle on a device's ambient context
#[derive(Clone, Default)]
pub struct AmbientContext {
    state: Arc<Mutex<AmbientState>>,
}

impl AmbientContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the whole current state
    pub fn current(&self) -> AmbientState {
        lock(&self.state).clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut AmbientState) -> R) -> R {
        f(&mut *lock(&self.state))
    }
}

/// Restores the captured groups of ambient state when dropped
pub struct ScopedCapture {
    context: AmbientContext,
    snapshot: Option<StateSnapshot>,
}

impl ScopedCapture {
    pub fn capture(context: &AmbientContext, mask: StateMask) -> Self {
        let snapshot = context.with(|state| state.snapshot(mask));
        Self {
            context: context.clone(),
            snapshot: Some(snapshot),
        }
    }

    pub fn mask(&self) -> StateMask {
        self.snapshot.as_ref().map(StateSnapshot::mask).unwrap_or(StateMask::empty())
    }

    /// Restore now instead of at drop
    pub fn restore(mut self) {
        self.restore_in_place();
    }

    fn restore_in_place(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.context.with(|state| state.restore(&snapshot));
        }
    }
}

impl Drop for ScopedCapture {
    fn drop(&mut self) {
        self.restore_in_place();
    }
}

// ============================================================================
// Command list
// ============================================================================

/// Command list resolving draws against the ambient context
pub struct StateMachineCommandList {
    context: AmbientContext,
    recorder: CommandRecorder,
    in_pass: bool,
}

fn state_machine_list(cmd: &mut dyn CommandList) -> Result<&mut StateMachineCommandList> {
    match cmd.as_any_mut().downcast_mut::<StateMachineCommandList>() {
        Some(list) => Ok(list),
        None => engine_bail!(BackendError, SOURCE, "command list belongs to another backend"),
    }
}

impl StateMachineCommandList {
    fn new(context: AmbientContext) -> Self {
        Self {
            context,
            recorder: CommandRecorder::new(),
            in_pass: false,
        }
    }

    /// Recorded device commands (for inspection)
    pub fn commands(&self) -> &[DeviceCommand] {
        self.recorder.commands()
    }

    /// Run a transfer with its own read/draw bindings, restored afterwards
    fn transfer(&mut self, src: AttachmentHandle, dst: AttachmentHandle, command: DeviceCommand) -> Result<()> {
        let _capture = ScopedCapture::capture(&self.context, StateMask::TARGETS);
        self.context.with(|state| {
            state.read_target = Some(src);
            state.draw_targets = vec![dst];
            state.depth_target = None;
        });
        self.recorder.push(SOURCE, command)
    }
}

impl CommandList for StateMachineCommandList {
    fn begin(&mut self) -> Result<()> {
        self.recorder.begin(SOURCE)
    }

    fn end(&mut self) -> Result<()> {
        if self.in_pass {
            engine_bail!(LogicError, SOURCE, "command list ended inside a pass");
        }
        self.recorder.end(SOURCE)
    }

    fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    fn discard(&mut self) {
        self.recorder.discard();
        self.in_pass = false;
    }

    fn draw_quad(&mut self, quad: &QuadDraw) -> Result<()> {
        if !self.in_pass {
            engine_bail!(LogicError, SOURCE, "draw outside a pass");
        }
        let draw = self.context.with(|state| ResolvedDraw {
            quad: *quad,
            state: state.pipeline_state(),
            colors: state.draw_targets.clone(),
            depth: state.depth_target,
        });
        self.recorder.push(SOURCE, DeviceCommand::Draw(draw))
    }

    fn copy_attachment(&mut self, src: AttachmentHandle, dst: AttachmentHandle) -> Result<()> {
        self.transfer(src, dst, DeviceCommand::Copy { src, dst })
    }

    fn blit_to_surface(&mut self, src: AttachmentHandle, image: &SurfaceImage) -> Result<()> {
        self.transfer(src, image.attachment, DeviceCommand::Blit { src, dst: image.attachment })
    }

    fn update_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        self.recorder.push(SOURCE, DeviceCommand::UpdateBuffer { buffer, offset, data: data.to_vec() })
    }

    fn write_timestamp(&mut self, pool: QueryPoolHandle, index: u32) -> Result<()> {
        self.recorder.push(SOURCE, DeviceCommand::WriteTimestamp { pool, index })
    }

    fn command_count(&self) -> usize {
        self.recorder.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ============================================================================
// Pass executor
// ============================================================================

/// Pass realized as "capture, bind, clear ... discard, restore"
pub struct StateMachinePassExecutor {
    label: String,
    colors: Vec<AttachmentRef>,
    depth_stencil: Option<AttachmentRef>,
    state: PipelineStateDescriptor,
    context: AmbientContext,
    capture: Option<ScopedCapture>,
}

impl StateMachinePassExecutor {
    fn attachments(&self) -> impl Iterator<Item = &AttachmentRef> {
        self.colors.iter().chain(self.depth_stencil.iter())
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }
}

impl PassExecutor for StateMachinePassExecutor {
    fn label(&self) -> &str {
        &self.label
    }

    fn attachment_count(&self) -> usize {
        self.colors.len() + usize::from(self.depth_stencil.is_some())
    }

    fn begin(&mut self, cmd: &mut dyn CommandList) -> Result<()> {
        if self.capture.is_some() {
            engine_bail!(LogicError, SOURCE, "pass '{}' already holds the context", self.label);
        }
        let list = state_machine_list(cmd)?;
        if !list.recorder.is_recording() {
            engine_bail!(LogicError, SOURCE, "pass '{}' begun outside begin/end", self.label);
        }
        if list.in_pass {
            engine_bail!(LogicError, SOURCE, "pass '{}' begun inside another pass", self.label);
        }

        // Dropped on any early return below, which restores the context
        let capture = ScopedCapture::capture(&self.context, StateMask::ALL);
        self.context.with(|state| {
            state.draw_targets = self.colors.iter().map(|attachment| attachment.handle).collect();
            state.depth_target = self.depth_stencil.map(|attachment| attachment.handle);
            state.apply_pipeline_state(&self.state);
        });

        for attachment in self.attachments() {
            match attachment.load_op {
                LoadOp::Clear => list.recorder.push(
                    SOURCE,
                    DeviceCommand::Clear { target: attachment.handle, value: attachment.clear_value },
                )?,
                LoadOp::DontCare => list.recorder.push(SOURCE, DeviceCommand::Discard { target: attachment.handle })?,
                LoadOp::Load => {}
            }
        }

        list.in_pass = true;
        self.capture = Some(capture);
        engine_trace!(SOURCE, "pass '{}' bound", self.label);
        Ok(())
    }

    fn apply_state(&mut self, cmd: &mut dyn CommandList, state: &PipelineStateDescriptor) -> Result<()> {
        if self.capture.is_none() {
            engine_bail!(LogicError, SOURCE, "state change on idle pass '{}'", self.label);
        }
        let list = state_machine_list(cmd)?;
        if !list.in_pass {
            engine_bail!(LogicError, SOURCE, "state change outside pass '{}'", self.label);
        }
        self.context.with(|ambient| ambient.apply_pipeline_state(state));
        Ok(())
    }

    fn end(&mut self, cmd: &mut dyn CommandList) -> Result<()> {
        let capture = self
            .capture
            .take()
            .ok_or_else(|| engine_err!(LogicError, SOURCE, "end of pass '{}' that never began", self.label))?;
        let list = state_machine_list(cmd)?;

        let mut result = Ok(());
        for attachment in self.colors.iter().chain(self.depth_stencil.iter()) {
            if attachment.store_op == StoreOp::DontCare {
                if let Err(e) = list.recorder.push(SOURCE, DeviceCommand::Discard { target: attachment.handle }) {
                    result = Err(e);
                    break;
                }
            }
        }

        list.in_pass = false;
        capture.restore();
        engine_trace!(SOURCE, "pass '{}' unbound", self.label);
        result
    }
}

// ============================================================================
// Backend
// ============================================================================

/// Ambient-state execution model
pub struct StateMachineBackend {
    context: AmbientContext,
}

impl StateMachineBackend {
    pub fn context(&self) -> &AmbientContext {
        &self.context
    }
}

impl SoftBackend for StateMachineBackend {
    const KIND: BackendKind = BackendKind::StateMachine;

    fn new(_shared: &Arc<DeviceShared>) -> Self {
        Self { context: AmbientContext::new() }
    }

    fn create_command_list(&mut self, _shared: &Arc<DeviceShared>) -> Box<dyn CommandList> {
        Box::new(StateMachineCommandList::new(self.context.clone()))
    }

    fn create_pass_executor(
        &mut self,
        _shared: &Arc<DeviceShared>,
        desc: &PassDescriptor,
    ) -> Result<Box<dyn PassExecutor>> {
        let state = desc
            .pipeline_state
            .ok_or_else(|| engine_err!(ConfigurationError, SOURCE, "pass '{}' has no pipeline state", desc.label))?;

        Ok(Box::new(StateMachinePassExecutor {
            label: desc.label.clone(),
            colors: desc.color_attachments.clone(),
            depth_stencil: desc.depth_stencil_attachment,
            state,
            context: self.context.clone(),
            capture: None,
        }))
    }

    fn take_submission(&mut self, cmd: &mut dyn CommandList) -> Result<Vec<DeviceCommand>> {
        state_machine_list(cmd)?.recorder.take(SOURCE)
    }

    fn submitted(&mut self, _cmd: &mut dyn CommandList, _marker: CompletionMarker) {}
}

/// Software device with the state-machine execution model
pub type StateMachineDevice = SoftDevice<StateMachineBackend>;

impl SoftDevice<StateMachineBackend> {
    /// Ambient context of the device (stays valid after the device is boxed)
    pub fn context(&self) -> AmbientContext {
        self.backend().context().clone()
    }
}

#[cfg(test)]
#[path = "state_machine_tests.rs"]
mod tests;
