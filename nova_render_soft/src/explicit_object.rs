/// Explicit-object execution model
///
/// Nothing is ambient: a pass is realized up front as a render pass object
/// (load/store policy), a framebuffer object (bound targets) and a pipeline
/// state object fetched from a device-wide cache. Draws use whatever objects
/// the command list's open pass carries. CPU/GPU synchronization is the
/// caller's job: re-recording a command list whose last submission has not
/// completed is refused.

use std::any::Any;
use std::sync::{Arc, Mutex};
use rustc_hash::FxHashMap;
use nova_render::nova::Result;
use nova_render::nova::render::{
    AttachmentHandle, BackendKind, BufferHandle, ClearValue, CommandList, CompletionMarker,
    LoadOp, PassDescriptor, PassExecutor, PipelineStateDescriptor, QuadDraw, QueryPoolHandle,
    StoreOp, SurfaceImage,
};
use nova_render::{engine_bail, engine_debug, engine_err};
use crate::soft_command::{CommandRecorder, DeviceCommand, ResolvedDraw};
use crate::soft_device::{lock, DeviceShared, SoftBackend, SoftDevice};

const SOURCE: &str = "nova::soft::ExplicitObject";

// ============================================================================
// State objects
// ============================================================================

/// Immutable fixed-function state
#[derive(Debug, PartialEq, Eq)]
pub struct PipelineStateObject {
    id: u64,
    state: PipelineStateDescriptor,
}

impl PipelineStateObject {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> &PipelineStateDescriptor {
        &self.state
    }
}

/// Pipeline objects deduplicated by descriptor
#[derive(Default)]
pub struct PipelineCache {
    objects: FxHashMap<PipelineStateDescriptor, Arc<PipelineStateObject>>,
    next_id: u64,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Object for `state`, built on first request
    pub fn get_or_create(&mut self, state: &PipelineStateDescriptor) -> Arc<PipelineStateObject> {
        if let Some(object) = self.objects.get(state) {
            return object.clone();
        }

        self.next_id += 1;
        let object = Arc::new(PipelineStateObject { id: self.next_id, state: *state });
        self.objects.insert(*state, object.clone());
        engine_debug!(SOURCE, "pipeline object {} created", self.next_id);
        object
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Load/store policy of one attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachmentOps {
    pub handle: AttachmentHandle,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear_value: ClearValue,
}

/// Load/store policy of a whole pass
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassObject {
    pub label: String,
    pub attachments: Vec<AttachmentOps>,
}

/// Targets bound by a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramebufferObject {
    pub colors: Vec<AttachmentHandle>,
    pub depth: Option<AttachmentHandle>,
    pub extent: (u32, u32),
}

// ============================================================================
// Command list
// ============================================================================

struct OpenPass {
    label: String,
    framebuffer: Arc<FramebufferObject>,
    pipeline: Arc<PipelineStateObject>,
}

/// Command list carrying its open pass explicitly
pub struct ExplicitCommandList {
    shared: Arc<DeviceShared>,
    recorder: CommandRecorder,
    open_pass: Option<OpenPass>,
    in_flight: Option<CompletionMarker>,
}

fn explicit_list(cmd: &mut dyn CommandList) -> Result<&mut ExplicitCommandList> {
    match cmd.as_any_mut().downcast_mut::<ExplicitCommandList>() {
        Some(list) => Ok(list),
        None => engine_bail!(BackendError, SOURCE, "command list belongs to another backend"),
    }
}

impl ExplicitCommandList {
    /// Marker of the last submission of this list
    pub fn in_flight(&self) -> Option<CompletionMarker> {
        self.in_flight
    }

    /// Pipeline object the open pass currently draws with
    pub fn current_pipeline(&self) -> Option<Arc<PipelineStateObject>> {
        self.open_pass.as_ref().map(|pass| pass.pipeline.clone())
    }

    pub fn commands(&self) -> &[DeviceCommand] {
        self.recorder.commands()
    }

    fn transfer(&mut self, command: DeviceCommand) -> Result<()> {
        if let Some(pass) = &self.open_pass {
            engine_bail!(
                LogicError,
                SOURCE,
                "{} recorded inside render pass '{}'",
                command.name(),
                pass.label
            );
        }
        self.recorder.push(SOURCE, command)
    }
}

impl CommandList for ExplicitCommandList {
    fn begin(&mut self) -> Result<()> {
        if let Some(marker) = self.in_flight {
            if !self.shared.timeline().is_complete(marker)? {
                engine_bail!(
                    LogicError,
                    SOURCE,
                    "command list re-recorded while submission {} is still executing",
                    marker.value()
                );
            }
        }
        self.recorder.begin(SOURCE)?;
        self.in_flight = None;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if let Some(pass) = &self.open_pass {
            engine_bail!(LogicError, SOURCE, "command list ended inside render pass '{}'", pass.label);
        }
        self.recorder.end(SOURCE)
    }

    fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    fn discard(&mut self) {
        self.recorder.discard();
        self.open_pass = None;
    }

    fn draw_quad(&mut self, quad: &QuadDraw) -> Result<()> {
        let draw = match &self.open_pass {
            Some(pass) => ResolvedDraw {
                quad: *quad,
                state: pass.pipeline.state,
                colors: pass.framebuffer.colors.clone(),
                depth: pass.framebuffer.depth,
            },
            None => engine_bail!(LogicError, SOURCE, "draw outside a render pass"),
        };
        self.recorder.push(SOURCE, DeviceCommand::Draw(draw))
    }

    fn copy_attachment(&mut self, src: AttachmentHandle, dst: AttachmentHandle) -> Result<()> {
        self.transfer(DeviceCommand::Copy { src, dst })
    }

    fn blit_to_surface(&mut self, src: AttachmentHandle, image: &SurfaceImage) -> Result<()> {
        self.transfer(DeviceCommand::Blit { src, dst: image.attachment })
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

/// Pass realized as render pass + framebuffer + pipeline objects
pub struct ExplicitPassExecutor {
    render_pass: Arc<RenderPassObject>,
    framebuffer: Arc<FramebufferObject>,
    pipeline: Arc<PipelineStateObject>,
    cache: Arc<Mutex<PipelineCache>>,
}

impl ExplicitPassExecutor {
    pub fn render_pass(&self) -> &RenderPassObject {
        &self.render_pass
    }

    pub fn framebuffer(&self) -> &FramebufferObject {
        &self.framebuffer
    }

    /// Pipeline object declared by the pass (what every begin starts from)
    pub fn pipeline(&self) -> &PipelineStateObject {
        &self.pipeline
    }
}

impl PassExecutor for ExplicitPassExecutor {
    fn label(&self) -> &str {
        &self.render_pass.label
    }

    fn attachment_count(&self) -> usize {
        self.framebuffer.colors.len() + usize::from(self.framebuffer.depth.is_some())
    }

    fn begin(&mut self, cmd: &mut dyn CommandList) -> Result<()> {
        let list = explicit_list(cmd)?;
        if !list.recorder.is_recording() {
            engine_bail!(LogicError, SOURCE, "render pass '{}' begun outside begin/end", self.render_pass.label);
        }
        if let Some(open) = &list.open_pass {
            engine_bail!(
                LogicError,
                SOURCE,
                "render pass '{}' begun inside render pass '{}'",
                self.render_pass.label,
                open.label
            );
        }

        for ops in &self.render_pass.attachments {
            match ops.load_op {
                LoadOp::Clear => list
                    .recorder
                    .push(SOURCE, DeviceCommand::Clear { target: ops.handle, value: ops.clear_value })?,
                LoadOp::DontCare => list.recorder.push(SOURCE, DeviceCommand::Discard { target: ops.handle })?,
                LoadOp::Load => {}
            }
        }

        list.open_pass = Some(OpenPass {
            label: self.render_pass.label.clone(),
            framebuffer: self.framebuffer.clone(),
            pipeline: self.pipeline.clone(),
        });
        Ok(())
    }

    fn apply_state(&mut self, cmd: &mut dyn CommandList, state: &PipelineStateDescriptor) -> Result<()> {
        let list = explicit_list(cmd)?;
        let pipeline = lock(&self.cache).get_or_create(state);
        match list.open_pass.as_mut() {
            Some(open) => {
                open.pipeline = pipeline;
                Ok(())
            }
            None => engine_bail!(LogicError, SOURCE, "state change outside render pass '{}'", self.render_pass.label),
        }
    }

    fn end(&mut self, cmd: &mut dyn CommandList) -> Result<()> {
        let list = explicit_list(cmd)?;
        if list.open_pass.take().is_none() {
            engine_bail!(LogicError, SOURCE, "end of render pass '{}' that is not open", self.render_pass.label);
        }

        for ops in &self.render_pass.attachments {
            if ops.store_op == StoreOp::DontCare {
                list.recorder.push(SOURCE, DeviceCommand::Discard { target: ops.handle })?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Backend
// ============================================================================

/// Explicit-object execution model
pub struct ExplicitObjectBackend {
    cache: Arc<Mutex<PipelineCache>>,
}

impl ExplicitObjectBackend {
    /// Number of distinct pipeline objects built so far
    pub fn pipeline_count(&self) -> usize {
        lock(&self.cache).len()
    }
}

impl SoftBackend for ExplicitObjectBackend {
    const KIND: BackendKind = BackendKind::ExplicitObject;

    fn new(_shared: &Arc<DeviceShared>) -> Self {
        Self { cache: Arc::new(Mutex::new(PipelineCache::new())) }
    }

    fn create_command_list(&mut self, shared: &Arc<DeviceShared>) -> Box<dyn CommandList> {
        Box::new(ExplicitCommandList {
            shared: shared.clone(),
            recorder: CommandRecorder::new(),
            open_pass: None,
            in_flight: None,
        })
    }

    fn create_pass_executor(
        &mut self,
        _shared: &Arc<DeviceShared>,
        desc: &PassDescriptor,
    ) -> Result<Box<dyn PassExecutor>> {
        let state = desc
            .pipeline_state
            .ok_or_else(|| engine_err!(ConfigurationError, SOURCE, "pass '{}' has no pipeline state", desc.label))?;
        let extent = desc
            .extent()
            .ok_or_else(|| engine_err!(ConfigurationError, SOURCE, "pass '{}' binds no attachment", desc.label))?;

        let render_pass = RenderPassObject {
            label: desc.label.clone(),
            attachments: desc
                .attachments()
                .map(|attachment| AttachmentOps {
                    handle: attachment.handle,
                    load_op: attachment.load_op,
                    store_op: attachment.store_op,
                    clear_value: attachment.clear_value,
                })
                .collect(),
        };
        let framebuffer = FramebufferObject {
            colors: desc.color_attachments.iter().map(|attachment| attachment.handle).collect(),
            depth: desc.depth_stencil_attachment.map(|attachment| attachment.handle),
            extent,
        };
        let pipeline = lock(&self.cache).get_or_create(&state);

        Ok(Box::new(ExplicitPassExecutor {
            render_pass: Arc::new(render_pass),
            framebuffer: Arc::new(framebuffer),
            pipeline,
            cache: self.cache.clone(),
        }))
    }

    fn take_submission(&mut self, cmd: &mut dyn CommandList) -> Result<Vec<DeviceCommand>> {
        explicit_list(cmd)?.recorder.take(SOURCE)
    }

    fn submitted(&mut self, cmd: &mut dyn CommandList, marker: CompletionMarker) {
        if let Ok(list) = explicit_list(cmd) {
            list.in_flight = Some(marker);
        }
    }
}

/// Software device with the explicit-object execution model
pub type ExplicitObjectDevice = SoftDevice<ExplicitObjectBackend>;

impl SoftDevice<ExplicitObjectBackend> {
    /// Number of distinct pipeline objects built so far
    pub fn pipeline_count(&self) -> usize {
        self.backend().pipeline_count()
    }
}

#[cfg(test)]
#[path = "explicit_object_tests.rs"]
mod tests;
