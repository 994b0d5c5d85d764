/// Graphics device module - the backend interface every execution model implements

// Module declarations
pub mod graphics_device;
pub mod texture;
pub mod pipeline;
pub mod render_pass;
pub mod command_list;
pub mod swapchain;
pub mod sync;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use texture::*;
pub use pipeline::*;
pub use render_pass::*;
pub use command_list::*;
pub use swapchain::*;
pub use sync::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
