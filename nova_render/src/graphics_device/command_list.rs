/// CommandList trait - ordered recording of device work for one frame

use std::any::Any;
use glam::Vec2;
use crate::error::Result;
use crate::graphics_device::{
    AttachmentHandle, BufferHandle, FrontFace, QueryPoolHandle, SurfaceImage,
};

/// Color produced by a quad's fragments
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FragmentColor {
    /// Flat color
    Constant([f32; 4]),
    /// Sample `source` across the quad (uv 0..1) and multiply by `tint`
    Sample { source: AttachmentHandle, tint: [f32; 4] },
}

/// Screen-space quad: the primitive every pass draws
///
/// Corners are in normalized device coordinates (x right, y up, -1..1),
/// depth in 0..1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadDraw {
    pub min: Vec2,
    pub max: Vec2,
    pub depth: f32,
    pub color: FragmentColor,
    /// Written to color attachments after the first (None = same as `color`)
    pub secondary: Option<[f32; 4]>,
    pub winding: FrontFace,
}

impl QuadDraw {
    /// Counter-clockwise quad with a flat color
    pub fn new(min: Vec2, max: Vec2, depth: f32, color: [f32; 4]) -> Self {
        Self {
            min,
            max,
            depth,
            color: FragmentColor::Constant(color),
            secondary: None,
            winding: FrontFace::CounterClockwise,
        }
    }

    /// Quad covering the whole target
    pub fn fullscreen(depth: f32, color: FragmentColor) -> Self {
        Self {
            min: Vec2::new(-1.0, -1.0),
            max: Vec2::new(1.0, 1.0),
            depth,
            color,
            secondary: None,
            winding: FrontFace::CounterClockwise,
        }
    }

    pub fn with_secondary(mut self, secondary: [f32; 4]) -> Self {
        self.secondary = Some(secondary);
        self
    }

    pub fn with_winding(mut self, winding: FrontFace) -> Self {
        self.winding = winding;
        self
    }
}

/// Command list for recording device work
///
/// Recording happens between `begin()` and `end()`. Draws are only valid
/// inside a pass (between a PassExecutor's begin and end). Transfers
/// (copy, blit) and timestamp writes may be recorded anywhere while
/// recording, subject to the backend's own rules.
pub trait CommandList: Send {
    /// Start recording (clears previously recorded work)
    fn begin(&mut self) -> Result<()>;

    /// Finish recording
    fn end(&mut self) -> Result<()>;

    /// Whether `begin` was called without a matching `end`
    fn is_recording(&self) -> bool;

    /// Drop everything recorded since `begin` and stop recording
    fn discard(&mut self);

    /// Draw a quad with the currently applied pipeline state
    fn draw_quad(&mut self, quad: &QuadDraw) -> Result<()>;

    /// Full-target copy between two attachments of identical size and role
    fn copy_attachment(&mut self, src: AttachmentHandle, dst: AttachmentHandle) -> Result<()>;

    /// Copy a color attachment into a presentable image
    fn blit_to_surface(&mut self, src: AttachmentHandle, image: &SurfaceImage) -> Result<()>;

    /// Write bytes into a buffer, ordered with the rest of the stream
    fn update_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()>;

    /// Write the device clock into query `index` of `pool` when execution reaches this point
    fn write_timestamp(&mut self, pool: QueryPoolHandle, index: u32) -> Result<()>;

    /// Number of commands recorded since `begin`
    fn command_count(&self) -> usize;

    /// Downcast support for backends
    fn as_any(&self) -> &dyn Any;

    /// Downcast support for backends
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
