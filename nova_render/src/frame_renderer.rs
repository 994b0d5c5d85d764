/// Frame renderer - per-frame orchestration
///
/// Wires the frame graph, the frame slots and the GPU timer to the caller's
/// collaborators (scene, resources, camera, surface, observers):
///
/// ```text
///   rebuild if pending
///   acquire slot (blocks on frame f - N)  ->  harvest + reset slot timers
///   record: params upload, acquire image, frame graph
///   submit  ->  present  ->  report to observers
/// ```
///
/// A stale surface (acquire or present) never reaches the caller as an
/// error: the frame is skipped, surface-bound resources are rebuilt and the
/// next frame renders at the new size.

use std::sync::Arc;
use std::time::Instant;
use crate::camera::CameraSource;
use crate::config::RendererConfig;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::frame::{FrameParams, FrameSlotAllocator};
use crate::frame_graph::{
    build_draw_list, project_overlays, FrameGraph, FrameInputs, PassAction, PassId,
};
use crate::graphics_device::{BufferHandle, CommandList, GraphicsDevice, SurfaceImage, Swapchain};
use crate::profiling::GpuTimer;
use crate::scene::{ResourceStore, SceneSource};
use crate::surface::SurfaceSource;

/// Outcome of one `render_frame` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// Submitted and handed to the surface
    Presented,
    /// Nothing presented (stale or minimized surface); rendering continues
    Skipped,
}

/// What observers learn about a finished frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub frame_index: u64,
    pub slot: usize,
    /// CPU wall-clock time spent in `render_frame`
    pub cpu_ms: f64,
    /// Latest resolved GPU durations, sorted by label
    pub gpu_timings: Vec<(String, f64)>,
    pub extent: (u32, u32),
    pub presented: bool,
}

/// Read-only sink for frame reports
pub trait FrameObserver: Send {
    fn on_frame(&mut self, report: &FrameReport);
}

pub struct FrameRenderer {
    device: Box<dyn GraphicsDevice>,
    surface: Arc<dyn SurfaceSource>,
    swapchain: Option<Box<dyn Swapchain>>,
    graph: FrameGraph,
    slots: FrameSlotAllocator,
    timer: GpuTimer,
    observers: Vec<Box<dyn FrameObserver>>,
    config: RendererConfig,
    frame_index: u64,
    rebuild_pending: bool,
    released: bool,
}

impl FrameRenderer {
    /// Create a renderer on a device from the backend registry
    ///
    /// The device built under `backend` must run the execution model named by
    /// `config.backend`.
    pub fn create(
        backend: &str,
        surface: Arc<dyn SurfaceSource>,
        config: RendererConfig,
    ) -> Result<Self> {
        let device = Engine::create_device(backend, &config)?;
        if device.backend_kind() != config.backend {
            crate::engine_bail!(
                ConfigurationError,
                "nova::FrameRenderer",
                "backend '{}' builds a {:?} device but the config asks for {:?}",
                backend,
                device.backend_kind(),
                config.backend
            );
        }
        Self::new(device, surface, config)
    }

    /// Create a renderer presenting to `surface`
    pub fn new(
        mut device: Box<dyn GraphicsDevice>,
        surface: Arc<dyn SurfaceSource>,
        config: RendererConfig,
    ) -> Result<Self> {
        config.validate()?;

        let swapchain = device.create_swapchain(surface.clone())?;
        let (width, height) = swapchain.extent();

        let mut graph = FrameGraph::new(device.as_mut(), &config, width, height)?;

        let mut slots = match FrameSlotAllocator::new(device.as_mut(), config.frames_in_flight) {
            Ok(slots) => slots,
            Err(e) => {
                let _ = graph.destroy(device.as_mut());
                return Err(e);
            }
        };

        let timer = match GpuTimer::new(
            device.as_mut(),
            config.frames_in_flight,
            config.max_timestamp_queries,
            config.gpu_timing,
        ) {
            Ok(timer) => timer,
            Err(e) => {
                let _ = slots.destroy(device.as_mut());
                let _ = graph.destroy(device.as_mut());
                return Err(e);
            }
        };

        crate::engine_info!(
            "nova::FrameRenderer",
            "Renderer '{}' ready on {} backend ({}x{}, {} frames in flight)",
            config.app_name,
            device.backend_kind().name(),
            width,
            height,
            config.frames_in_flight
        );

        Ok(Self {
            device,
            surface,
            swapchain: Some(swapchain),
            graph,
            slots,
            timer,
            observers: Vec::new(),
            config,
            frame_index: 0,
            rebuild_pending: false,
            released: false,
        })
    }

    // ===== ACCESSORS =====

    /// Index of the next frame to render
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn extent(&self) -> (u32, u32) {
        self.graph.extent()
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }

    pub fn graph(&self) -> &FrameGraph {
        &self.graph
    }

    pub fn slots(&self) -> &FrameSlotAllocator {
        &self.slots
    }

    pub fn timer(&self) -> &GpuTimer {
        &self.timer
    }

    pub fn swapchain(&self) -> Option<&dyn Swapchain> {
        self.swapchain.as_deref()
    }

    pub fn is_rebuild_pending(&self) -> bool {
        self.rebuild_pending
    }

    // ===== CONFIGURATION =====

    pub fn add_observer(&mut self, observer: Box<dyn FrameObserver>) {
        self.observers.push(observer);
    }

    /// Replace what a render pass records
    pub fn set_pass_action(&mut self, pass: PassId, action: Box<dyn PassAction>) -> Result<()> {
        self.graph.set_action(pass, action)
    }

    // ===== GPU TIMINGS =====

    /// Last resolved duration of `label` (never blocks)
    pub fn gpu_elapsed_ms(&mut self, label: &str) -> f64 {
        self.timer.elapsed_ms(self.device.as_ref(), label)
    }

    pub fn gpu_timing_available(&mut self, label: &str) -> bool {
        self.timer.is_available(self.device.as_ref(), label)
    }

    pub fn reset_gpu_timings(&mut self) {
        self.timer.reset();
    }

    // ===== FRAME =====

    /// Render and present one frame
    ///
    /// # Errors
    ///
    /// Every error reaching the caller is fatal for the render loop: stale
    /// surfaces are handled here and reported as `FrameStatus::Skipped`.
    pub fn render_frame(
        &mut self,
        scene: &dyn SceneSource,
        resources: &dyn ResourceStore,
        camera: &mut dyn CameraSource,
    ) -> Result<FrameStatus> {
        if self.released {
            crate::engine_bail!(LogicError, "nova::FrameRenderer", "render_frame() after shutdown");
        }

        let started = Instant::now();

        if self.rebuild_pending && !self.rebuild(camera)? {
            return Ok(FrameStatus::Skipped);
        }

        let frame_index = self.frame_index;
        let slot_index = self.slots.slot_for(frame_index);
        let last_marker = self.slots.slot(slot_index).and_then(|slot| slot.last_marker());

        self.slots.acquire(self.device.as_ref(), frame_index)?;
        self.timer.begin_slot(self.device.as_mut(), slot_index, last_marker)?;

        let inputs = Self::collect_inputs(scene, resources, &*camera);
        let params = FrameParams::new(
            camera.view_matrix(),
            camera.projection_matrix(),
            self.graph.extent(),
            frame_index,
            slot_index,
        );
        let params_buffer = match self.slots.params_buffer() {
            Some(buffer) => buffer,
            None => crate::engine_bail!(InvalidResource, "nova::FrameRenderer", "parameter buffer released"),
        };
        let swapchain = match self.swapchain.as_mut() {
            Some(swapchain) => swapchain,
            None => crate::engine_bail!(InvalidResource, "nova::FrameRenderer", "swapchain released"),
        };
        let slot = match self.slots.slot_mut(slot_index) {
            Some(slot) => slot,
            None => crate::engine_bail!(InvalidResource, "nova::FrameRenderer", "slot {} missing", slot_index),
        };
        let params_offset = slot.params_offset();
        let cmd = slot.command_list();

        cmd.begin()?;
        let recorded = record_frame(
            cmd,
            &mut self.graph,
            &mut self.timer,
            swapchain.as_mut(),
            &inputs,
            params_buffer,
            params_offset,
            &params,
        );

        let image = match recorded {
            Ok(Some(image)) => image,
            Ok(None) => {
                cmd.discard();
                crate::engine_debug!(
                    "nova::FrameRenderer",
                    "Frame {} skipped: surface is stale",
                    frame_index
                );
                self.rebuild(camera)?;
                self.notify(frame_index, slot_index, started, false);
                return Ok(FrameStatus::Skipped);
            }
            Err(e) => {
                cmd.discard();
                return Err(e);
            }
        };

        let marker = self.device.submit(cmd)?;
        self.slots.mark_submitted(slot_index, marker)?;
        self.frame_index += 1;

        let presented = match swapchain.present(&image, marker) {
            Ok(()) => true,
            Err(Error::TransientSurfaceError(_)) => {
                self.rebuild_pending = true;
                false
            }
            Err(e) => return Err(e),
        };

        self.notify(frame_index, slot_index, started, presented);
        Ok(if presented { FrameStatus::Presented } else { FrameStatus::Skipped })
    }

    /// Rebuild surface-bound resources for the surface's current size
    pub fn handle_resize(&mut self, camera: &mut dyn CameraSource) -> Result<()> {
        self.rebuild(camera).map(|_| ())
    }

    /// Rebuild on the next frame
    pub fn request_rebuild(&mut self) {
        self.rebuild_pending = true;
    }

    /// Drain in-flight work and release every device resource
    pub fn shutdown(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        self.slots.drain(self.device.as_ref())?;
        self.device.wait_idle()?;
        self.timer.destroy(self.device.as_mut())?;
        self.graph.destroy(self.device.as_mut())?;
        self.slots.destroy(self.device.as_mut())?;
        self.swapchain = None;

        crate::engine_info!(
            "nova::FrameRenderer",
            "Renderer shut down after {} frames",
            self.frame_index
        );
        Ok(())
    }

    // ===== INTERNAL =====

    fn collect_inputs(
        scene: &dyn SceneSource,
        resources: &dyn ResourceStore,
        camera: &dyn CameraSource,
    ) -> FrameInputs {
        let view_proj = camera.view_projection_matrix();

        let mut items = Vec::new();
        scene.collect_visible(&mut items);
        let mut gizmos = Vec::new();
        scene.collect_gizmos(&mut gizmos);
        let mut particles = Vec::new();
        scene.collect_particles(&mut particles);

        FrameInputs {
            geometry: build_draw_list(&items, resources, &view_proj),
            gizmos: project_overlays(&gizmos, &view_proj),
            particles: project_overlays(&particles, &view_proj),
        }
    }

    /// Returns false when the surface has no area (rebuild stays pending)
    fn rebuild(&mut self, camera: &mut dyn CameraSource) -> Result<bool> {
        let (width, height) = self.surface.drawable_size();
        if width == 0 || height == 0 {
            self.rebuild_pending = true;
            return Ok(false);
        }

        self.device.wait_idle()?;
        if let Some(swapchain) = self.swapchain.as_mut() {
            swapchain.recreate(width, height)?;
        }
        if self.graph.extent() != (width, height) {
            self.graph.resize(self.device.as_mut(), width, height)?;
        }
        camera.set_aspect_ratio(width as f32 / height as f32);
        self.rebuild_pending = false;

        crate::engine_debug!("nova::FrameRenderer", "Surface resources rebuilt at {}x{}", width, height);
        Ok(true)
    }

    fn notify(&mut self, frame_index: u64, slot: usize, started: Instant, presented: bool) {
        if self.observers.is_empty() {
            return;
        }
        self.timer.poll(self.device.as_ref()).ok();
        let report = FrameReport {
            frame_index,
            slot,
            cpu_ms: started.elapsed().as_secs_f64() * 1000.0,
            gpu_timings: self.timer.timings(),
            extent: self.graph.extent(),
            presented,
        };
        for observer in &mut self.observers {
            observer.on_frame(&report);
        }
    }
}

impl Drop for FrameRenderer {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            crate::engine_warn!("nova::FrameRenderer", "Shutdown on drop failed: {}", e);
        }
    }
}

/// Record one frame; `None` when the surface image is stale
#[allow(clippy::too_many_arguments)]
fn record_frame(
    cmd: &mut dyn CommandList,
    graph: &mut FrameGraph,
    timer: &mut GpuTimer,
    swapchain: &mut dyn Swapchain,
    inputs: &FrameInputs,
    params_buffer: BufferHandle,
    params_offset: u64,
    params: &FrameParams,
) -> Result<Option<SurfaceImage>> {
    cmd.update_buffer(params_buffer, params_offset, params.as_bytes())?;

    let image = match swapchain.acquire_next_image() {
        Ok(image) => image,
        Err(Error::TransientSurfaceError(_)) => return Ok(None),
        Err(e) => return Err(e),
    };

    graph.execute(cmd, timer, inputs, &image)?;
    cmd.end()?;
    Ok(Some(image))
}

#[cfg(test)]
#[path = "frame_renderer_tests.rs"]
mod tests;
