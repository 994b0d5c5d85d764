/// Render pass: one pipeline stage with a Begin/End transaction
///
/// ```text
///   Idle --begin()--> Active --end()--> Idle
/// ```
///
/// The pass owns its descriptor and the backend realization of it. State
/// transitions are checked here, so every backend gets the same contract:
/// begin while Active, end while Idle and update_render_state while Idle are
/// `LogicError`s and never restart or silently skip anything.

use crate::error::Result;
use crate::graphics_device::{
    CommandList, GraphicsDevice, PassDescriptor, PassExecutor, PipelineStateDescriptor,
};

/// Transaction state of a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    Idle,
    Active,
}

pub struct RenderPass {
    descriptor: PassDescriptor,
    executor: Box<dyn PassExecutor>,
    state: PassState,
    current_state: PipelineStateDescriptor,
}

impl RenderPass {
    /// Validate `descriptor` and realize it on `device`
    ///
    /// # Errors
    ///
    /// `ConfigurationError` if the descriptor is invalid or the backend binds
    /// a different number of attachments than declared.
    pub fn new(device: &mut dyn GraphicsDevice, descriptor: PassDescriptor) -> Result<Self> {
        descriptor.validate()?;

        let current_state = match descriptor.pipeline_state {
            Some(state) => state,
            None => crate::engine_bail!(
                ConfigurationError,
                "nova::RenderPass",
                "pass '{}' has no pipeline state",
                descriptor.label
            ),
        };

        let executor = device.create_pass_executor(&descriptor)?;
        if executor.attachment_count() != descriptor.attachment_count() {
            crate::engine_bail!(
                ConfigurationError,
                "nova::RenderPass",
                "pass '{}' declares {} attachments but the backend binds {}",
                descriptor.label,
                descriptor.attachment_count(),
                executor.attachment_count()
            );
        }

        Ok(Self {
            descriptor,
            executor,
            state: PassState::Idle,
            current_state,
        })
    }

    pub fn label(&self) -> &str {
        &self.descriptor.label
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == PassState::Active
    }

    pub fn descriptor(&self) -> &PassDescriptor {
        &self.descriptor
    }

    /// Size of the bound attachments
    pub fn extent(&self) -> (u32, u32) {
        self.descriptor.extent().unwrap_or((0, 0))
    }

    /// Pipeline state currently applied (or applied on next begin)
    pub fn pipeline_state(&self) -> &PipelineStateDescriptor {
        &self.current_state
    }

    /// Bind targets, apply load ops and pipeline state; Idle -> Active
    pub fn begin(&mut self, cmd: &mut dyn CommandList) -> Result<()> {
        if self.state == PassState::Active {
            crate::engine_bail!(LogicError, "nova::RenderPass", "begin() on active pass '{}'", self.label());
        }

        // The pass always starts from its declared state
        self.current_state = self.descriptor.pipeline_state.unwrap_or(self.current_state);
        self.executor.begin(cmd)?;
        self.state = PassState::Active;
        crate::engine_trace!("nova::RenderPass", "begin '{}'", self.label());
        Ok(())
    }

    /// Apply store ops and unbind; Active -> Idle
    pub fn end(&mut self, cmd: &mut dyn CommandList) -> Result<()> {
        if self.state == PassState::Idle {
            crate::engine_bail!(LogicError, "nova::RenderPass", "end() on idle pass '{}'", self.label());
        }

        // The pass is Idle afterwards even if the backend reported a failure
        self.state = PassState::Idle;
        self.executor.end(cmd)?;
        crate::engine_trace!("nova::RenderPass", "end '{}'", self.label());
        Ok(())
    }

    /// Swap in a new pipeline state while Active
    pub fn update_render_state(
        &mut self,
        cmd: &mut dyn CommandList,
        state: PipelineStateDescriptor,
    ) -> Result<()> {
        if self.state == PassState::Idle {
            crate::engine_bail!(
                LogicError,
                "nova::RenderPass",
                "update_render_state() on idle pass '{}'",
                self.label()
            );
        }

        self.executor.apply_state(cmd, &state)?;
        self.current_state = state;
        Ok(())
    }
}

#[cfg(test)]
#[path = "render_pass_tests.rs"]
mod tests;
