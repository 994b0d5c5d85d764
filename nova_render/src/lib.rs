/*!
# Nova Render

Frame graph and synchronization layer of a deferred renderer.

A frame is rendered through a fixed pipeline of passes
(Geometry → CopyDepth → Lighting → Gizmo → Particle → Present) on top of any
backend implementing the `GraphicsDevice` interface. Backends are registered
at runtime through the `Engine` plugin registry; `nova_render_soft` provides
an ambient state-machine backend and an explicit-object backend.

## Architecture

- **GraphicsDevice / PassExecutor / CommandList / Swapchain**: backend interface
- **AttachmentSet**: group of render targets sharing one size
- **RenderPass**: Idle/Active transaction over one pipeline stage
- **FrameGraph**: fixed pass order, declared dependencies, resize
- **FrameSlotAllocator**: frame-in-flight rotation and CPU/GPU sync
- **GpuTimer**: label-keyed asynchronous GPU durations
- **FrameRenderer**: per-frame orchestration and stale-surface recovery
*/

// Internal modules
mod error;
mod engine;
mod config;
mod surface;
mod frame_renderer;
pub mod log;
pub mod graphics_device;
pub mod frame_graph;
pub mod frame;
pub mod profiling;
pub mod camera;
pub mod scene;

// Main nova namespace module
pub mod nova {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton (logger + backend registry)
    pub use crate::engine::{BackendFactory, Engine};

    // Configuration
    pub use crate::config::{RendererConfig, MAX_FRAMES_IN_FLIGHT, MIN_TIMESTAMP_QUERIES};

    // Collaborators and orchestration
    pub use crate::surface::SurfaceSource;
    pub use crate::frame_renderer::{FrameObserver, FrameRenderer, FrameReport, FrameStatus};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger, format_entry};
    }

    // Backend interface
    pub mod render {
        pub use crate::graphics_device::*;
    }

    pub mod frame_graph {
        pub use crate::frame_graph::*;
    }

    pub mod frame {
        pub use crate::frame::*;
    }

    pub mod profiling {
        pub use crate::profiling::*;
    }

    pub mod camera {
        pub use crate::camera::*;
    }

    pub mod scene {
        pub use crate::scene::*;
    }
}

// Re-export math library at crate root
pub use glam;
