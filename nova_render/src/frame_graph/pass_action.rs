/// Pass action trait and implementations.
///
/// Defines what a render pass records between its begin() and end().

use crate::error::Result;
use crate::graphics_device::{AttachmentHandle, CommandList, FragmentColor, QuadDraw};

/// Per-frame draw streams produced from the scene collaborators
#[derive(Debug, Clone, Default)]
pub struct FrameInputs {
    /// Scene draws, sorted front-to-back
    pub geometry: Vec<QuadDraw>,
    /// Editor overlay quads
    pub gizmos: Vec<QuadDraw>,
    /// Particle quads
    pub particles: Vec<QuadDraw>,
}

/// What an action can see of the running pass
pub struct PassContext<'a> {
    pub label: &'a str,
    /// Prior-pass outputs the pass declared as sampled (current handles)
    pub sampled_inputs: &'a [AttachmentHandle],
    pub frame: &'a FrameInputs,
}

/// Action executed by a render pass
pub trait PassAction: Send + Sync {
    /// Record draw commands into the command list
    fn execute(&mut self, cmd: &mut dyn CommandList, ctx: &PassContext<'_>) -> Result<()>;
}

/// Which overlay stream an OverlayAction draws
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayStream {
    Gizmos,
    Particles,
}

/// Draws the sorted scene draw list (geometry pass)
#[derive(Debug, Default)]
pub struct DrawListAction;

impl PassAction for DrawListAction {
    fn execute(&mut self, cmd: &mut dyn CommandList, ctx: &PassContext<'_>) -> Result<()> {
        for draw in &ctx.frame.geometry {
            cmd.draw_quad(draw)?;
        }
        Ok(())
    }
}

/// Full-screen resolve sampling the first sampled input (lighting pass)
///
/// The quad is drawn at `depth` and depth tested against the scene depth
/// resident in the target. Further sampled inputs (the lighting pass's normal
/// buffer) are read-after-write dependencies only: they are validated and kept
/// alive but never sampled.
#[derive(Debug)]
pub struct FullscreenAction {
    depth: f32,
    tint: [f32; 4],
}

impl FullscreenAction {
    pub fn new(depth: f32, tint: [f32; 4]) -> Self {
        Self { depth, tint }
    }
}

impl Default for FullscreenAction {
    fn default() -> Self {
        Self::new(0.0, [1.0, 1.0, 1.0, 1.0])
    }
}

impl PassAction for FullscreenAction {
    fn execute(&mut self, cmd: &mut dyn CommandList, ctx: &PassContext<'_>) -> Result<()> {
        let source = match ctx.sampled_inputs.first() {
            Some(source) => *source,
            None => crate::engine_bail!(
                ConfigurationError,
                "nova::FullscreenAction",
                "pass '{}' samples nothing",
                ctx.label
            ),
        };

        cmd.draw_quad(&QuadDraw::fullscreen(
            self.depth,
            FragmentColor::Sample { source, tint: self.tint },
        ))
    }
}

/// Draws one overlay stream (gizmo and particle passes)
#[derive(Debug)]
pub struct OverlayAction {
    stream: OverlayStream,
}

impl OverlayAction {
    pub fn new(stream: OverlayStream) -> Self {
        Self { stream }
    }
}

impl PassAction for OverlayAction {
    fn execute(&mut self, cmd: &mut dyn CommandList, ctx: &PassContext<'_>) -> Result<()> {
        let draws = match self.stream {
            OverlayStream::Gizmos => &ctx.frame.gizmos,
            OverlayStream::Particles => &ctx.frame.particles,
        };
        for draw in draws {
            cmd.draw_quad(draw)?;
        }
        Ok(())
    }
}

/// Custom pass action (closure-based)
///
/// Executes a user-provided closure for full control over
/// draw command recording.
pub struct CustomAction {
    callback: Box<dyn FnMut(&mut dyn CommandList, &PassContext<'_>) -> Result<()> + Send + Sync>,
}

impl CustomAction {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnMut(&mut dyn CommandList, &PassContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        Self { callback: Box::new(callback) }
    }
}

impl PassAction for CustomAction {
    fn execute(&mut self, cmd: &mut dyn CommandList, ctx: &PassContext<'_>) -> Result<()> {
        (self.callback)(cmd, ctx)
    }
}

#[cfg(test)]
#[path = "pass_action_tests.rs"]
mod tests;
