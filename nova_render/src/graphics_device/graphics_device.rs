/// GraphicsDevice trait - the backend factory and submission interface
///
/// Every execution model (ambient state machine, explicit objects) implements
/// this trait. The frame graph, the slot allocator and the GPU timer only ever
/// talk to a `dyn GraphicsDevice`.

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    AttachmentDesc, CommandList, CompletionMarker, PassDescriptor, PassExecutor, Swapchain,
};
use crate::surface::SurfaceSource;

slotmap::new_key_type! {
    /// Arena handle of an attachment owned by a device
    pub struct AttachmentHandle;

    /// Arena handle of a device buffer
    pub struct BufferHandle;

    /// Arena handle of a timestamp query pool
    pub struct QueryPoolHandle;
}

/// Execution model of a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Ambient, mutable global state; passes capture and restore what they touch
    StateMachine,
    /// Self-contained state objects; CPU/GPU sync is the caller's job
    ExplicitObject,
}

impl BackendKind {
    /// Registry name of the backend
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::StateMachine => "state_machine",
            BackendKind::ExplicitObject => "explicit_object",
        }
    }
}

/// Graphics device: resource factory, submission queue and timeline
pub trait GraphicsDevice: Send {
    // ===== IDENTITY =====

    /// Execution model
    fn backend_kind(&self) -> BackendKind;

    // ===== ATTACHMENTS =====

    /// Allocate an attachment. Its content is undefined until cleared or written.
    fn create_attachment(&mut self, desc: &AttachmentDesc) -> Result<AttachmentHandle>;

    /// Release an attachment
    fn destroy_attachment(&mut self, handle: AttachmentHandle) -> Result<()>;

    /// Descriptor of a live attachment
    fn attachment_desc(&self, handle: AttachmentHandle) -> Option<AttachmentDesc>;

    /// Number of live attachments (leak detection)
    fn live_attachment_count(&self) -> usize;

    /// Read back every texel of an attachment, row-major
    ///
    /// Only meaningful once the work writing it has completed.
    fn read_attachment(&self, handle: AttachmentHandle) -> Result<Vec<[f32; 4]>>;

    // ===== PASSES =====

    /// Realize a pass descriptor for this backend
    fn create_pass_executor(&mut self, desc: &PassDescriptor) -> Result<Box<dyn PassExecutor>>;

    // ===== BUFFERS =====

    /// Allocate a zero-initialized buffer
    fn create_buffer(&mut self, size: u64) -> Result<BufferHandle>;

    /// Release a buffer
    fn destroy_buffer(&mut self, handle: BufferHandle) -> Result<()>;

    /// Read back a buffer's content
    fn read_buffer(&self, handle: BufferHandle) -> Result<Vec<u8>>;

    // ===== TIMESTAMP QUERIES =====

    /// Allocate a pool of `capacity` timestamp queries
    fn create_query_pool(&mut self, capacity: u32) -> Result<QueryPoolHandle>;

    /// Release a query pool
    fn destroy_query_pool(&mut self, handle: QueryPoolHandle) -> Result<()>;

    /// Mark every query of the pool unavailable (host-side reset)
    fn reset_query_pool(&mut self, handle: QueryPoolHandle) -> Result<()>;

    /// Read `count` queries starting at `first` without blocking
    ///
    /// `None` = result not available yet.
    fn read_timestamps(&self, pool: QueryPoolHandle, first: u32, count: u32) -> Result<Vec<Option<u64>>>;

    /// Nanoseconds per timestamp tick
    fn timestamp_period_ns(&self) -> f64;

    /// Largest pool the device can allocate
    fn max_timestamp_queries(&self) -> u32;

    // ===== SUBMISSION =====

    /// Create a command list
    fn create_command_list(&mut self) -> Result<Box<dyn CommandList>>;

    /// Submit a finished command list; returns the marker signaled once it has executed
    fn submit(&mut self, cmd: &mut dyn CommandList) -> Result<CompletionMarker>;

    /// Whether `marker` has signaled (never blocks)
    fn is_complete(&self, marker: CompletionMarker) -> Result<bool>;

    /// Block until `marker` has signaled
    fn wait_for(&self, marker: CompletionMarker) -> Result<()>;

    /// Block until every submission has executed
    fn wait_idle(&self) -> Result<()>;

    // ===== PRESENTATION =====

    /// Create a swapchain sized to the surface's current drawable size
    fn create_swapchain(&mut self, surface: Arc<dyn SurfaceSource>) -> Result<Box<dyn Swapchain>>;
}
