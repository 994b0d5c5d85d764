/// Frame slots - N-way rotation of per-frame resources
///
/// Frame `f` records into slot `f mod N`. Before a slot is handed out again
/// the CPU waits for the completion marker of the frame that last used it,
/// so frame `f` never touches resources frame `f - N` is still reading.

use crate::error::Result;
use crate::graphics_device::{BufferHandle, CommandList, CompletionMarker, GraphicsDevice};
use crate::frame::FrameParams;

/// Per-frame resources of one slot
pub struct FrameSlot {
    index: usize,
    command_list: Box<dyn CommandList>,
    params_offset: u64,
    last_marker: Option<CompletionMarker>,
    frame_index: Option<u64>,
}

impl FrameSlot {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn command_list(&mut self) -> &mut dyn CommandList {
        self.command_list.as_mut()
    }

    /// Byte offset of this slot's region in the parameter buffer
    pub fn params_offset(&self) -> u64 {
        self.params_offset
    }

    /// Marker of the last submission made from this slot
    pub fn last_marker(&self) -> Option<CompletionMarker> {
        self.last_marker
    }

    /// Frame currently (or last) occupying the slot
    pub fn frame_index(&self) -> Option<u64> {
        self.frame_index
    }
}

pub struct FrameSlotAllocator {
    slots: Vec<FrameSlot>,
    params_buffer: Option<BufferHandle>,
    blocked_acquires: u64,
}

impl FrameSlotAllocator {
    /// Create `count` slots and the shared parameter buffer
    pub fn new(device: &mut dyn GraphicsDevice, count: usize) -> Result<Self> {
        if count == 0 {
            crate::engine_bail!(ConfigurationError, "nova::FrameSlotAllocator", "at least one frame slot is required");
        }

        let region = FrameParams::region_size();
        let params_buffer = device.create_buffer(region * count as u64)?;

        let mut slots = Vec::with_capacity(count);
        for index in 0..count {
            let command_list = match device.create_command_list() {
                Ok(list) => list,
                Err(e) => {
                    let _ = device.destroy_buffer(params_buffer);
                    return Err(e);
                }
            };
            slots.push(FrameSlot {
                index,
                command_list,
                params_offset: region * index as u64,
                last_marker: None,
                frame_index: None,
            });
        }

        crate::engine_debug!("nova::FrameSlotAllocator", "Created {} frame slots", count);

        Ok(Self {
            slots,
            params_buffer: Some(params_buffer),
            blocked_acquires: 0,
        })
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot_for(&self, frame_index: u64) -> usize {
        (frame_index % self.slots.len() as u64) as usize
    }

    /// Hand out the slot for `frame_index`, blocking until its previous
    /// occupant's work has executed
    pub fn acquire(&mut self, device: &dyn GraphicsDevice, frame_index: u64) -> Result<&mut FrameSlot> {
        let index = self.slot_for(frame_index);
        let slot = &mut self.slots[index];

        if let Some(marker) = slot.last_marker {
            if !device.is_complete(marker)? {
                self.blocked_acquires += 1;
                crate::engine_trace!(
                    "nova::FrameSlotAllocator",
                    "Frame {} waits for marker {} on slot {}",
                    frame_index,
                    marker.value(),
                    index
                );
                device.wait_for(marker)?;
            }
        }

        slot.frame_index = Some(frame_index);
        Ok(slot)
    }

    /// Record the marker of the submission just made from `slot`
    pub fn mark_submitted(&mut self, slot: usize, marker: CompletionMarker) -> Result<()> {
        match self.slots.get_mut(slot) {
            Some(slot) => {
                slot.last_marker = Some(marker);
                Ok(())
            }
            None => crate::engine_bail!(InvalidResource, "nova::FrameSlotAllocator", "slot {} out of range", slot),
        }
    }

    /// Wait for every outstanding submission
    pub fn drain(&self, device: &dyn GraphicsDevice) -> Result<()> {
        for slot in &self.slots {
            if let Some(marker) = slot.last_marker {
                device.wait_for(marker)?;
            }
        }
        Ok(())
    }

    pub fn slot(&self, index: usize) -> Option<&FrameSlot> {
        self.slots.get(index)
    }

    pub fn slot_mut(&mut self, index: usize) -> Option<&mut FrameSlot> {
        self.slots.get_mut(index)
    }

    pub fn params_buffer(&self) -> Option<BufferHandle> {
        self.params_buffer
    }

    /// Acquires that had to wait for the device
    pub fn blocked_acquires(&self) -> u64 {
        self.blocked_acquires
    }

    /// Drain, then release the parameter buffer
    pub fn destroy(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        self.drain(&*device)?;
        if let Some(buffer) = self.params_buffer.take() {
            device.destroy_buffer(buffer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "frame_slot_tests.rs"]
mod tests;
