//! Renderer configuration

use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::frame_graph::PassId;
use crate::graphics_device::{AttachmentRole, BackendKind, PipelineStateDescriptor, TextureFormat};

/// Upper bound on frames in flight
pub const MAX_FRAMES_IN_FLIGHT: usize = 8;

/// Smallest useful query capacity (one start and one end timestamp)
pub const MIN_TIMESTAMP_QUERIES: u32 = 2;

/// Configuration for a FrameRenderer and the device it runs on
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Application name, used in logs
    pub app_name: String,

    /// Execution model of the device (checked by `FrameRenderer::create`)
    pub backend: BackendKind,

    /// Number of frame slots rotated by the FrameSlotAllocator (1..=8)
    pub frames_in_flight: usize,

    /// Timestamp queries available per frame slot (at least 2)
    pub max_timestamp_queries: u32,

    /// Record GPU timing regions
    pub gpu_timing: bool,

    /// Enable backend validation
    pub enable_validation: bool,

    /// G-buffer albedo format
    pub albedo_format: TextureFormat,

    /// G-buffer normal format
    pub normal_format: TextureFormat,

    /// Lighting target color format
    pub lighting_format: TextureFormat,

    /// Depth format shared by the geometry and lighting targets
    pub depth_format: TextureFormat,

    /// Clear color of the albedo and lighting targets
    pub clear_color: [f32; 4],

    /// Pipeline state replacing a pass's built-in state
    pub pass_states: FxHashMap<PassId, PipelineStateDescriptor>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            app_name: "Nova Application".to_string(),
            backend: BackendKind::StateMachine,
            frames_in_flight: 2,
            max_timestamp_queries: 64,
            gpu_timing: true,
            enable_validation: cfg!(debug_assertions),
            albedo_format: TextureFormat::Rgba8Unorm,
            normal_format: TextureFormat::Rgba16Float,
            lighting_format: TextureFormat::Rgba16Float,
            depth_format: TextureFormat::Depth32Float,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            pass_states: FxHashMap::default(),
        }
    }
}

impl RendererConfig {
    /// Replace the built-in pipeline state of `pass`
    pub fn with_pass_state(mut self, pass: PassId, state: PipelineStateDescriptor) -> Self {
        self.pass_states.insert(pass, state);
        self
    }

    /// Override registered for `pass`, if any
    pub fn pass_state(&self, pass: PassId) -> Option<&PipelineStateDescriptor> {
        self.pass_states.get(&pass)
    }

    /// Check every field, reporting the first problem as a `ConfigurationError`
    pub fn validate(&self) -> Result<()> {
        if self.frames_in_flight == 0 || self.frames_in_flight > MAX_FRAMES_IN_FLIGHT {
            crate::engine_bail!(
                ConfigurationError,
                "nova::RendererConfig",
                "frames_in_flight must be in 1..={}, got {}",
                MAX_FRAMES_IN_FLIGHT,
                self.frames_in_flight
            );
        }

        if self.max_timestamp_queries < MIN_TIMESTAMP_QUERIES {
            crate::engine_bail!(
                ConfigurationError,
                "nova::RendererConfig",
                "max_timestamp_queries must be at least {}, got {}",
                MIN_TIMESTAMP_QUERIES,
                self.max_timestamp_queries
            );
        }

        let color_formats = [
            ("albedo_format", self.albedo_format),
            ("normal_format", self.normal_format),
            ("lighting_format", self.lighting_format),
        ];
        for (field, format) in color_formats {
            if !format.supports_role(AttachmentRole::Color) {
                crate::engine_bail!(
                    ConfigurationError,
                    "nova::RendererConfig",
                    "{} must be a color format, got {:?}",
                    field,
                    format
                );
            }
        }

        if !self.depth_format.supports_role(AttachmentRole::Depth) {
            crate::engine_bail!(
                ConfigurationError,
                "nova::RendererConfig",
                "depth_format must carry depth, got {:?}",
                self.depth_format
            );
        }

        for pass in self.pass_states.keys() {
            if !pass.is_render_pass() {
                crate::engine_bail!(
                    ConfigurationError,
                    "nova::RendererConfig",
                    "pass '{}' has no pipeline state to override",
                    pass.label()
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
