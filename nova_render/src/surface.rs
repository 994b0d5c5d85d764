/// Drawable surface collaborator
///
/// The renderer never owns a window. It only asks the surface for its current
/// drawable size; the backend's swapchain provides the images.

/// Source of the current drawable dimensions
pub trait SurfaceSource: Send + Sync {
    /// Current drawable size in pixels (0 in either axis = minimized)
    fn drawable_size(&self) -> (u32, u32);
}

#[cfg(feature = "winit")]
impl SurfaceSource for winit::window::Window {
    fn drawable_size(&self) -> (u32, u32) {
        let size = self.inner_size();
        (size.width, size.height)
    }
}
