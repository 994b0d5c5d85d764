/// Swapchain trait - presentable images for the final blit

use crate::error::Result;
use crate::graphics_device::{AttachmentHandle, CompletionMarker, TextureFormat};

/// Presentable image acquired for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceImage {
    /// Index in the swapchain
    pub index: u32,
    /// Attachment backing the image
    pub attachment: AttachmentHandle,
    pub width: u32,
    pub height: u32,
}

/// Swapchain for presenting rendered images to a surface
pub trait Swapchain: Send {
    /// Acquire the next presentable image
    ///
    /// Returns `TransientSurfaceError` when the surface no longer matches
    /// the swapchain (resize raced the acquire).
    fn acquire_next_image(&mut self) -> Result<SurfaceImage>;

    /// Queue `image` for presentation once `ready` has signaled
    ///
    /// May return `TransientSurfaceError` if the surface went stale meanwhile;
    /// the image is then not shown and the swapchain needs recreating.
    fn present(&mut self, image: &SurfaceImage, ready: CompletionMarker) -> Result<()>;

    /// Rebuild every image at the new size
    fn recreate(&mut self, width: u32, height: u32) -> Result<()>;

    /// (width, height) of the images
    fn extent(&self) -> (u32, u32);

    /// Format of the images
    fn format(&self) -> TextureFormat;

    /// Number of images
    fn image_count(&self) -> u32;

    /// Number of successful presents
    fn presented_count(&self) -> u64;
}
