/// Frame module - frame-in-flight slots and per-frame parameters

pub mod frame_params;
pub mod frame_slot;

pub use frame_params::{FrameParams, PARAMS_ALIGNMENT};
pub use frame_slot::{FrameSlot, FrameSlotAllocator};
