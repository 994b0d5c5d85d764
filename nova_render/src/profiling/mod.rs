/// Profiling module - asynchronous GPU duration measurement

pub mod gpu_timer;

pub use gpu_timer::{GpuTimer, TimedRegion};
