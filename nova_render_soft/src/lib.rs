/*!
# Nova Render - Software Backends

Two execution models behind the `nova_render` backend traits, sharing one
software device:

- `state_machine`: ambient mutable context state; every pass captures what it
  touches and restores it on end.
- `explicit_object`: self-contained pipeline/render-pass/framebuffer objects;
  the caller synchronizes the CPU with the device.

Work runs asynchronously on a dedicated device thread, so frames in flight,
completion markers and timestamp queries behave as they would on a GPU.
*/

// Device core
mod soft_command;
mod soft_image;
mod soft_validation;
mod raster;
mod soft_device;
mod soft_swapchain;

// Execution models
mod state_machine;
mod explicit_object;

use nova_render::nova::{Engine, Result};
use nova_render::nova::render::{BackendKind, GraphicsDevice};

pub use soft_command::{DeviceCommand, ResolvedDraw};
pub use soft_image::{is_poisoned, SoftImage, POISON};
pub use soft_validation::{ValidationLog, ValidationSeverity, ValidationStats};
pub use raster::Footprint;
pub use soft_device::{DeviceShared, SoftBackend, SoftDevice, SoftDeviceConfig};
pub use soft_swapchain::{SoftSurface, SoftSwapchain};
pub use state_machine::{
    AmbientContext, AmbientState, ScopedCapture, StateMachineBackend, StateMachineCommandList,
    StateMachineDevice, StateMachinePassExecutor, StateMask, StateSnapshot,
};
pub use explicit_object::{
    AttachmentOps, ExplicitCommandList, ExplicitObjectBackend, ExplicitObjectDevice,
    ExplicitPassExecutor, FramebufferObject, PipelineCache, PipelineStateObject, RenderPassObject,
};

/// Register both software backends with the engine's backend registry
///
/// Registers `"state_machine"` and `"explicit_object"`. Backends already
/// registered are left in place, so calling this more than once is harmless.
///
/// # Example
///
/// ```no_run
/// use nova_render::nova::{Engine, RendererConfig};
///
/// nova_render_soft::register()?;
/// let device = Engine::create_device("explicit_object", &RendererConfig::default())?;
/// # Ok::<(), nova_render::nova::Error>(())
/// ```
pub fn register() -> Result<()> {
    let state_machine = BackendKind::StateMachine.name();
    if !Engine::has_backend(state_machine) {
        Engine::register_backend(state_machine, |config| {
            Ok(Box::new(StateMachineDevice::from_renderer_config(config)?) as Box<dyn GraphicsDevice>)
        })?;
    }

    let explicit_object = BackendKind::ExplicitObject.name();
    if !Engine::has_backend(explicit_object) {
        Engine::register_backend(explicit_object, |config| {
            Ok(Box::new(ExplicitObjectDevice::from_renderer_config(config)?) as Box<dyn GraphicsDevice>)
        })?;
    }

    Ok(())
}
