/// Frame graph - the fixed deferred pipeline and its attachment sets
///
/// ```text
///   Geometry -> CopyDepth -> Lighting -> Gizmo -> Particle -> Present
///   (albedo,     (geometry    (lighting    (overlays, depth tested
///    normal,      depth into   color,       against the copied
///    depth)       lighting     depth)       scene depth)
///                 depth)
/// ```
///
/// The graph owns two attachment sets: the geometry target (G-buffer) and
/// the lighting target, which the Gizmo and Particle passes render into as
/// well. Both are rebuilt wholesale on resize, together with every pass
/// bound to them.

use rustc_hash::{FxHashMap, FxHashSet};
use crate::config::RendererConfig;
use crate::error::Result;
use crate::graphics_device::{
    AttachmentHandle, AttachmentRef, ClearValue, CommandList, GraphicsDevice, LoadOp,
    PassDescriptor, PipelineStateDescriptor, StoreOp, SurfaceImage,
};
use crate::profiling::GpuTimer;
use super::attachment_set::{AttachmentSet, AttachmentSetDesc, AttachmentSpec};
use super::pass_action::{
    DrawListAction, FrameInputs, FullscreenAction, OverlayAction, OverlayStream, PassAction,
    PassContext,
};
use super::render_pass::RenderPass;

/// Timer region wrapping a whole frame
pub const FRAME_REGION: &str = "frame";

/// Clear value of the normal G-buffer target
const NORMAL_CLEAR: [f32; 4] = [0.0, 0.0, 0.0, 0.0];

// ============================================================================
// Pass identity
// ============================================================================

/// Node of the frame graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PassId {
    Geometry,
    CopyDepth,
    Lighting,
    Gizmo,
    Particle,
    Present,
}

impl PassId {
    /// Execution order
    pub const ORDER: [PassId; 6] = [
        PassId::Geometry,
        PassId::CopyDepth,
        PassId::Lighting,
        PassId::Gizmo,
        PassId::Particle,
        PassId::Present,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PassId::Geometry => "geometry",
            PassId::CopyDepth => "copy_depth",
            PassId::Lighting => "lighting",
            PassId::Gizmo => "gizmo",
            PassId::Particle => "particle",
            PassId::Present => "present",
        }
    }

    /// Whether the node is a RenderPass (CopyDepth and Present are transfers)
    pub fn is_render_pass(&self) -> bool {
        !matches!(self, PassId::CopyDepth | PassId::Present)
    }

    /// Pipeline state used when the config does not override it
    pub fn default_state(&self) -> Option<PipelineStateDescriptor> {
        match self {
            PassId::Geometry => Some(PipelineStateDescriptor::opaque()),
            PassId::Lighting => Some(PipelineStateDescriptor::fullscreen()),
            PassId::Gizmo => Some(PipelineStateDescriptor::overlay_depth_tested()),
            PassId::Particle => Some(PipelineStateDescriptor::additive_particles()),
            PassId::CopyDepth | PassId::Present => None,
        }
    }
}

// ============================================================================
// Dependency validation
// ============================================================================

/// Declared reads and writes of one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIo {
    pub pass: PassId,
    /// Sampled inputs, `Load` attachments, transfer sources
    pub reads: Vec<AttachmentHandle>,
    /// Attachments whose content is stored when the node ends
    pub writes: Vec<AttachmentHandle>,
    /// Attachments left undefined when the node ends (`DontCare` store)
    pub discards: Vec<AttachmentHandle>,
}

impl NodeIo {
    fn from_descriptor(pass: PassId, desc: &PassDescriptor) -> Self {
        let mut reads = desc.loaded_attachments();
        reads.extend(desc.sampled_inputs.iter().copied());
        let discards = desc
            .attachments()
            .filter(|a| a.store_op == StoreOp::DontCare)
            .map(|a| a.handle)
            .collect();
        Self { pass, reads, writes: desc.stored_attachments(), discards }
    }
}

/// Check that every read is produced by an earlier node that stores it
///
/// # Errors
///
/// `ConfigurationError` naming the first node with an unsatisfied read.
pub fn validate_dependencies(nodes: &[NodeIo]) -> Result<()> {
    let mut defined: FxHashSet<AttachmentHandle> = FxHashSet::default();

    for node in nodes {
        for read in &node.reads {
            if !defined.contains(read) {
                crate::engine_bail!(
                    ConfigurationError,
                    "nova::FrameGraph",
                    "pass '{}' reads an attachment no earlier pass stores",
                    node.pass.label()
                );
            }
        }
        for discarded in &node.discards {
            defined.remove(discarded);
        }
        defined.extend(node.writes.iter().copied());
    }

    Ok(())
}

// ============================================================================
// FrameGraph
// ============================================================================

pub struct FrameGraph {
    geometry_desc: AttachmentSetDesc,
    lighting_desc: AttachmentSetDesc,
    geometry_target: Option<AttachmentSet>,
    lighting_target: Option<AttachmentSet>,
    passes: Vec<(PassId, RenderPass)>,
    states: FxHashMap<PassId, PipelineStateDescriptor>,
    actions: FxHashMap<PassId, Box<dyn PassAction>>,
    clear_color: [f32; 4],
    extent: (u32, u32),
    sets_created: u64,
    sets_destroyed: u64,
}

impl FrameGraph {
    /// Build both attachment sets and every pass at `width` x `height`
    pub fn new(
        device: &mut dyn GraphicsDevice,
        config: &RendererConfig,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let geometry_desc = AttachmentSetDesc::new("geometry")
            .with_color(AttachmentSpec::new(config.albedo_format))
            .with_color(AttachmentSpec::new(config.normal_format))
            .with_depth_stencil(AttachmentSpec::new(config.depth_format));
        let lighting_desc = AttachmentSetDesc::new("lighting")
            .with_color(AttachmentSpec::new(config.lighting_format))
            .with_depth_stencil(AttachmentSpec::new(config.depth_format));

        let mut states = FxHashMap::default();
        for pass in PassId::ORDER {
            let state = config.pass_state(pass).copied().or_else(|| pass.default_state());
            if let Some(state) = state {
                states.insert(pass, state);
            }
        }

        let mut actions: FxHashMap<PassId, Box<dyn PassAction>> = FxHashMap::default();
        actions.insert(PassId::Geometry, Box::new(DrawListAction));
        actions.insert(PassId::Lighting, Box::new(FullscreenAction::default()));
        actions.insert(PassId::Gizmo, Box::new(OverlayAction::new(OverlayStream::Gizmos)));
        actions.insert(PassId::Particle, Box::new(OverlayAction::new(OverlayStream::Particles)));

        let mut graph = Self {
            geometry_desc,
            lighting_desc,
            geometry_target: None,
            lighting_target: None,
            passes: Vec::new(),
            states,
            actions,
            clear_color: config.clear_color,
            extent: (width, height),
            sets_created: 0,
            sets_destroyed: 0,
        };

        if let Err(e) = graph.build(device, width, height) {
            let _ = graph.destroy(device);
            return Err(e);
        }

        crate::engine_info!("nova::FrameGraph", "Frame graph created at {}x{}", width, height);
        Ok(graph)
    }

    // ===== ACCESSORS =====

    pub fn extent(&self) -> (u32, u32) {
        self.extent
    }

    /// Attachment sets created since construction
    pub fn sets_created(&self) -> u64 {
        self.sets_created
    }

    /// Attachment sets destroyed since construction
    pub fn sets_destroyed(&self) -> u64 {
        self.sets_destroyed
    }

    pub fn geometry_target(&self) -> Option<&AttachmentSet> {
        self.geometry_target.as_ref()
    }

    pub fn lighting_target(&self) -> Option<&AttachmentSet> {
        self.lighting_target.as_ref()
    }

    pub fn pass(&self, id: PassId) -> Option<&RenderPass> {
        self.passes.iter().find(|(pass, _)| *pass == id).map(|(_, pass)| pass)
    }

    pub fn pass_mut(&mut self, id: PassId) -> Option<&mut RenderPass> {
        self.passes.iter_mut().find(|(pass, _)| *pass == id).map(|(_, pass)| pass)
    }

    /// Replace the action recorded by a render pass
    pub fn set_action(&mut self, id: PassId, action: Box<dyn PassAction>) -> Result<()> {
        if !id.is_render_pass() {
            crate::engine_bail!(
                ConfigurationError,
                "nova::FrameGraph",
                "'{}' is a transfer node and takes no action",
                id.label()
            );
        }
        self.actions.insert(id, action);
        Ok(())
    }

    /// Declared reads/writes of every node, in execution order
    pub fn node_io(&self) -> Result<Vec<NodeIo>> {
        let geometry_depth = self.depth_of(&self.geometry_target, "geometry")?;
        let lighting_depth = self.depth_of(&self.lighting_target, "lighting")?;
        let lighting_color = self.lighting_color()?;

        let mut nodes = Vec::with_capacity(PassId::ORDER.len());
        for id in PassId::ORDER {
            let node = match id {
                PassId::CopyDepth => NodeIo {
                    pass: id,
                    reads: vec![geometry_depth],
                    writes: vec![lighting_depth],
                    discards: Vec::new(),
                },
                PassId::Present => NodeIo {
                    pass: id,
                    reads: vec![lighting_color],
                    writes: Vec::new(),
                    discards: Vec::new(),
                },
                _ => match self.pass(id) {
                    Some(pass) => NodeIo::from_descriptor(id, pass.descriptor()),
                    None => crate::engine_bail!(
                        InvalidResource,
                        "nova::FrameGraph",
                        "pass '{}' is not built",
                        id.label()
                    ),
                },
            };
            nodes.push(node);
        }
        Ok(nodes)
    }

    /// Check that every pass is bound to live attachments of the current size
    pub fn verify_extents(&self, device: &dyn GraphicsDevice) -> Result<()> {
        for (id, pass) in &self.passes {
            for attachment in pass.descriptor().attachments() {
                let live = device.attachment_desc(attachment.handle);
                let matches = live.is_some_and(|desc| desc.extent() == self.extent)
                    && attachment.desc.extent() == self.extent;
                if !matches {
                    crate::engine_bail!(
                        ConfigurationError,
                        "nova::FrameGraph",
                        "pass '{}' is bound to an attachment that does not match {}x{}",
                        id.label(),
                        self.extent.0,
                        self.extent.1
                    );
                }
            }
        }
        Ok(())
    }

    // ===== EXECUTION =====

    /// Record the whole frame into `cmd`
    ///
    /// Each node is wrapped in a timer region named after it, the frame in
    /// `FRAME_REGION`. A failing action still ends its pass before the error
    /// is returned.
    pub fn execute(
        &mut self,
        cmd: &mut dyn CommandList,
        timer: &mut GpuTimer,
        inputs: &FrameInputs,
        image: &SurfaceImage,
    ) -> Result<()> {
        timer.begin(cmd, FRAME_REGION)?;

        for (position, id) in PassId::ORDER.iter().enumerate() {
            self.check_predecessors_idle(position)?;

            timer.begin(cmd, id.label())?;
            let result = self.run_node(cmd, *id, inputs, image);
            let timed = timer.end(cmd, id.label());
            result?;
            timed?;
        }

        timer.end(cmd, FRAME_REGION)
    }

    fn check_predecessors_idle(&self, position: usize) -> Result<()> {
        for earlier in &PassId::ORDER[..position] {
            if self.pass(*earlier).is_some_and(|pass| pass.is_active()) {
                crate::engine_bail!(
                    LogicError,
                    "nova::FrameGraph",
                    "pass '{}' is still active when '{}' starts",
                    earlier.label(),
                    PassId::ORDER[position].label()
                );
            }
        }
        Ok(())
    }

    fn run_node(
        &mut self,
        cmd: &mut dyn CommandList,
        id: PassId,
        inputs: &FrameInputs,
        image: &SurfaceImage,
    ) -> Result<()> {
        match id {
            PassId::CopyDepth => {
                let src = self.depth_of(&self.geometry_target, "geometry")?;
                let dst = self.depth_of(&self.lighting_target, "lighting")?;
                cmd.copy_attachment(src, dst)
            }
            PassId::Present => {
                let src = self.lighting_color()?;
                cmd.blit_to_surface(src, image)
            }
            _ => {
                let pass = match self.passes.iter_mut().find(|(pass, _)| *pass == id) {
                    Some((_, pass)) => pass,
                    None => crate::engine_bail!(
                        InvalidResource,
                        "nova::FrameGraph",
                        "pass '{}' is not built",
                        id.label()
                    ),
                };

                pass.begin(cmd)?;

                let result = match self.actions.get_mut(&id) {
                    Some(action) => {
                        let ctx = PassContext {
                            label: id.label(),
                            sampled_inputs: &pass.descriptor().sampled_inputs,
                            frame: inputs,
                        };
                        action.execute(cmd, &ctx)
                    }
                    None => Ok(()),
                };

                let ended = pass.end(cmd);
                result?;
                ended
            }
        }
    }

    // ===== RESIZE / TEARDOWN =====

    /// Rebuild both attachment sets and every pass at the new size
    ///
    /// Waits for the device to go idle, then destroys each set before
    /// creating its replacement (geometry target, then lighting target).
    pub fn resize(&mut self, device: &mut dyn GraphicsDevice, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            crate::engine_bail!(
                ConfigurationError,
                "nova::FrameGraph",
                "cannot resize to {}x{}",
                width,
                height
            );
        }

        device.wait_idle()?;
        self.passes.clear();
        self.release_sets(device)?;
        self.build(device, width, height)?;

        crate::engine_info!("nova::FrameGraph", "Resized to {}x{}", width, height);
        Ok(())
    }

    /// Release every pass and attachment set
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        self.passes.clear();
        self.release_sets(device)
    }

    fn release_sets(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        let mut result = Ok(());
        for set in [self.geometry_target.take(), self.lighting_target.take()].into_iter().flatten() {
            let label = set.label().to_string();
            match set.destroy(device) {
                Ok(()) => self.sets_destroyed += 1,
                Err(e) => {
                    crate::engine_warn!("nova::FrameGraph", "Failed to destroy set '{}': {}", label, e);
                    result = Err(e);
                }
            }
        }
        result
    }

    fn build(&mut self, device: &mut dyn GraphicsDevice, width: u32, height: u32) -> Result<()> {
        self.geometry_target = Some(AttachmentSet::create(device, &self.geometry_desc, width, height)?);
        self.sets_created += 1;
        self.lighting_target = Some(AttachmentSet::create(device, &self.lighting_desc, width, height)?);
        self.sets_created += 1;
        self.extent = (width, height);

        let descriptors = self.build_descriptors()?;
        let mut passes = Vec::with_capacity(descriptors.len());
        for (id, descriptor) in descriptors {
            passes.push((id, RenderPass::new(device, descriptor)?));
        }
        self.passes = passes;

        validate_dependencies(&self.node_io()?)?;
        self.verify_extents(&*device)
    }

    fn build_descriptors(&self) -> Result<Vec<(PassId, PassDescriptor)>> {
        let geometry = match &self.geometry_target {
            Some(set) => set,
            None => crate::engine_bail!(InvalidResource, "nova::FrameGraph", "geometry target missing"),
        };
        let lighting = match &self.lighting_target {
            Some(set) => set,
            None => crate::engine_bail!(InvalidResource, "nova::FrameGraph", "lighting target missing"),
        };

        let (albedo, normal, geometry_depth) = match (geometry.color(0), geometry.color(1), geometry.depth_stencil()) {
            (Some(albedo), Some(normal), Some(depth)) => (*albedo, *normal, *depth),
            _ => crate::engine_bail!(ConfigurationError, "nova::FrameGraph", "geometry target is incomplete"),
        };
        let (color, depth) = match (lighting.color(0), lighting.depth_stencil()) {
            (Some(color), Some(depth)) => (*color, *depth),
            _ => crate::engine_bail!(ConfigurationError, "nova::FrameGraph", "lighting target is incomplete"),
        };

        let depth_clear = ClearValue::DepthStencil { depth: 1.0, stencil: 0 };
        let mut descriptors = Vec::with_capacity(4);

        let mut geometry_pass = PassDescriptor::new(PassId::Geometry.label())
            .with_color(AttachmentRef::new(albedo.handle, albedo.desc).cleared(ClearValue::Color(self.clear_color)))
            .with_color(AttachmentRef::new(normal.handle, normal.desc).cleared(ClearValue::Color(NORMAL_CLEAR)))
            .with_depth_stencil(AttachmentRef::new(geometry_depth.handle, geometry_depth.desc).cleared(depth_clear));
        if let Some(state) = self.states.get(&PassId::Geometry) {
            geometry_pass = geometry_pass.with_pipeline_state(*state);
        }
        descriptors.push((PassId::Geometry, geometry_pass));

        let mut lighting_pass = PassDescriptor::new(PassId::Lighting.label())
            .with_color(AttachmentRef::new(color.handle, color.desc).cleared(ClearValue::Color(self.clear_color)))
            .with_depth_stencil(AttachmentRef::new(depth.handle, depth.desc))
            .with_sampled_input(albedo.handle)
            // Dependency only: the built-in resolve samples albedo
            .with_sampled_input(normal.handle);
        if let Some(state) = self.states.get(&PassId::Lighting) {
            lighting_pass = lighting_pass.with_pipeline_state(*state);
        }
        descriptors.push((PassId::Lighting, lighting_pass));

        let mut gizmo_pass = PassDescriptor::new(PassId::Gizmo.label())
            .with_color(AttachmentRef::new(color.handle, color.desc))
            .with_depth_stencil(AttachmentRef::new(depth.handle, depth.desc));
        if let Some(state) = self.states.get(&PassId::Gizmo) {
            gizmo_pass = gizmo_pass.with_pipeline_state(*state);
        }
        descriptors.push((PassId::Gizmo, gizmo_pass));

        let mut particle_pass = PassDescriptor::new(PassId::Particle.label())
            .with_color(AttachmentRef::new(color.handle, color.desc))
            .with_depth_stencil(
                AttachmentRef::new(depth.handle, depth.desc)
                    .with_load_op(LoadOp::Load)
                    .with_store_op(StoreOp::DontCare),
            );
        if let Some(state) = self.states.get(&PassId::Particle) {
            particle_pass = particle_pass.with_pipeline_state(*state);
        }
        descriptors.push((PassId::Particle, particle_pass));

        Ok(descriptors)
    }

    fn depth_of(&self, set: &Option<AttachmentSet>, name: &str) -> Result<AttachmentHandle> {
        match set.as_ref().and_then(|set| set.depth_stencil()) {
            Some(depth) => Ok(depth.handle),
            None => crate::engine_bail!(InvalidResource, "nova::FrameGraph", "{} depth missing", name),
        }
    }

    fn lighting_color(&self) -> Result<AttachmentHandle> {
        match self.lighting_target.as_ref().and_then(|set| set.color(0)) {
            Some(color) => Ok(color.handle),
            None => crate::engine_bail!(InvalidResource, "nova::FrameGraph", "lighting color missing"),
        }
    }
}

#[cfg(test)]
#[path = "frame_graph_tests.rs"]
mod tests;
