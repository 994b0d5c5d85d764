/// Pass descriptors and the backend realization of a pass
///
/// A `PassDescriptor` is backend-agnostic: attachments with their load/store
/// policy, the fixed-function state and the prior-pass outputs the pass
/// samples. A `PassExecutor` is what a backend builds from it.

use crate::error::Result;
use crate::graphics_device::{
    AttachmentDesc, AttachmentHandle, AttachmentRole, CommandList, PipelineStateDescriptor,
};

/// What happens to an attachment's content when a pass begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadOp {
    /// Preserve existing content
    Load,
    /// Overwrite with the declared clear value
    Clear,
    /// Content becomes undefined
    DontCare,
}

/// What happens to an attachment's content when a pass ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    /// Keep the rendered content
    Store,
    /// Content becomes undefined
    DontCare,
}

/// Clear value of an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

impl ClearValue {
    /// Conventional clear value for a role (transparent black, far depth)
    pub fn default_for(role: AttachmentRole) -> Self {
        match role {
            AttachmentRole::Color => ClearValue::Color([0.0, 0.0, 0.0, 0.0]),
            AttachmentRole::Depth | AttachmentRole::Stencil => {
                ClearValue::DepthStencil { depth: 1.0, stencil: 0 }
            }
        }
    }
}

/// One attachment bound by a pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachmentRef {
    pub handle: AttachmentHandle,
    pub desc: AttachmentDesc,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub clear_value: ClearValue,
}

impl AttachmentRef {
    /// Load + Store reference with the role's default clear value
    pub fn new(handle: AttachmentHandle, desc: AttachmentDesc) -> Self {
        Self {
            handle,
            desc,
            load_op: LoadOp::Load,
            store_op: StoreOp::Store,
            clear_value: ClearValue::default_for(desc.role),
        }
    }

    /// Clear on load with `value`
    pub fn cleared(mut self, value: ClearValue) -> Self {
        self.load_op = LoadOp::Clear;
        self.clear_value = value;
        self
    }

    pub fn with_load_op(mut self, load_op: LoadOp) -> Self {
        self.load_op = load_op;
        self
    }

    pub fn with_store_op(mut self, store_op: StoreOp) -> Self {
        self.store_op = store_op;
        self
    }
}

/// Backend-agnostic description of one pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub struct PassDescriptor {
    pub label: String,
    pub color_attachments: Vec<AttachmentRef>,
    pub depth_stencil_attachment: Option<AttachmentRef>,
    pub pipeline_state: Option<PipelineStateDescriptor>,
    /// Prior-pass outputs sampled by this pass
    pub sampled_inputs: Vec<AttachmentHandle>,
    /// Every pixel of every attachment is written (permits DontCare loads)
    pub full_coverage: bool,
}

impl PassDescriptor {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            color_attachments: Vec::new(),
            depth_stencil_attachment: None,
            pipeline_state: None,
            sampled_inputs: Vec::new(),
            full_coverage: false,
        }
    }

    pub fn with_color(mut self, attachment: AttachmentRef) -> Self {
        self.color_attachments.push(attachment);
        self
    }

    pub fn with_depth_stencil(mut self, attachment: AttachmentRef) -> Self {
        self.depth_stencil_attachment = Some(attachment);
        self
    }

    pub fn with_pipeline_state(mut self, state: PipelineStateDescriptor) -> Self {
        self.pipeline_state = Some(state);
        self
    }

    pub fn with_sampled_input(mut self, handle: AttachmentHandle) -> Self {
        self.sampled_inputs.push(handle);
        self
    }

    pub fn with_full_coverage(mut self, full_coverage: bool) -> Self {
        self.full_coverage = full_coverage;
        self
    }

    /// Color attachments followed by the depth/stencil attachment
    pub fn attachments(&self) -> impl Iterator<Item = &AttachmentRef> {
        self.color_attachments.iter().chain(self.depth_stencil_attachment.iter())
    }

    /// Number of bound attachments
    pub fn attachment_count(&self) -> usize {
        self.color_attachments.len() + usize::from(self.depth_stencil_attachment.is_some())
    }

    /// Shared extent of the bound attachments
    pub fn extent(&self) -> Option<(u32, u32)> {
        self.attachments().next().map(|attachment| attachment.desc.extent())
    }

    /// Handles of attachments this pass reads before writing (Load)
    pub fn loaded_attachments(&self) -> Vec<AttachmentHandle> {
        self.attachments()
            .filter(|attachment| attachment.load_op == LoadOp::Load)
            .map(|attachment| attachment.handle)
            .collect()
    }

    /// Handles of attachments whose result survives the pass (Store)
    pub fn stored_attachments(&self) -> Vec<AttachmentHandle> {
        self.attachments()
            .filter(|attachment| attachment.store_op == StoreOp::Store)
            .map(|attachment| attachment.handle)
            .collect()
    }

    /// Reject descriptors no backend can realize
    pub fn validate(&self) -> Result<()> {
        let source = "nova::PassDescriptor";

        if self.pipeline_state.is_none() {
            crate::engine_bail!(ConfigurationError, source, "pass '{}' has no pipeline state", self.label);
        }

        let extent = match self.extent() {
            Some(extent) => extent,
            None => crate::engine_bail!(ConfigurationError, source, "pass '{}' binds no attachment", self.label),
        };

        for attachment in self.attachments() {
            if attachment.desc.extent() != extent {
                crate::engine_bail!(
                    ConfigurationError,
                    source,
                    "pass '{}' mixes attachment sizes {:?} and {:?}",
                    self.label,
                    extent,
                    attachment.desc.extent()
                );
            }
        }

        for attachment in &self.color_attachments {
            if attachment.desc.role != AttachmentRole::Color {
                crate::engine_bail!(
                    ConfigurationError,
                    source,
                    "pass '{}' binds a {:?} attachment as color",
                    self.label,
                    attachment.desc.role
                );
            }
        }

        if let Some(depth) = &self.depth_stencil_attachment {
            if depth.desc.role == AttachmentRole::Color {
                crate::engine_bail!(
                    ConfigurationError,
                    source,
                    "pass '{}' binds a color attachment as depth/stencil",
                    self.label
                );
            }
        }

        for attachment in self.attachments() {
            let clear_matches = matches!(
                (attachment.desc.role, attachment.clear_value),
                (AttachmentRole::Color, ClearValue::Color(_))
                    | (AttachmentRole::Depth, ClearValue::DepthStencil { .. })
                    | (AttachmentRole::Stencil, ClearValue::DepthStencil { .. })
            );
            if attachment.load_op == LoadOp::Clear && !clear_matches {
                crate::engine_bail!(
                    ConfigurationError,
                    source,
                    "pass '{}' clears a {:?} attachment with {:?}",
                    self.label,
                    attachment.desc.role,
                    attachment.clear_value
                );
            }

            if attachment.load_op == LoadOp::DontCare && !self.full_coverage {
                crate::engine_bail!(
                    ConfigurationError,
                    source,
                    "pass '{}' discards an attachment on load without declaring full coverage",
                    self.label
                );
            }
        }

        for input in &self.sampled_inputs {
            if self.attachments().any(|attachment| attachment.handle == *input) {
                crate::engine_bail!(
                    ConfigurationError,
                    source,
                    "pass '{}' samples one of its own attachments",
                    self.label
                );
            }
        }

        Ok(())
    }
}

/// Backend realization of a PassDescriptor
///
/// `begin`/`end` record into the command list the pass was recorded with.
/// Executors may assume the owning RenderPass enforces the Idle/Active
/// contract, but must leave no ambient state behind when `begin` fails.
pub trait PassExecutor: Send {
    /// Pass label
    fn label(&self) -> &str;

    /// Number of attachments the backend object actually binds
    fn attachment_count(&self) -> usize;

    /// Bind targets, apply load ops and the pipeline state
    fn begin(&mut self, cmd: &mut dyn CommandList) -> Result<()>;

    /// Replace the pipeline state of the running pass
    fn apply_state(&mut self, cmd: &mut dyn CommandList, state: &PipelineStateDescriptor) -> Result<()>;

    /// Apply store ops and unbind
    fn end(&mut self, cmd: &mut dyn CommandList) -> Result<()>;
}

#[cfg(test)]
#[path = "render_pass_tests.rs"]
mod tests;
