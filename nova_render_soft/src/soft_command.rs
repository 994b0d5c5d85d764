/// Device-level commands
///
/// Both execution models lower their recording into the same command stream:
/// by the time a draw reaches the device thread its targets and fixed-function
/// state are fully resolved, whether they came from ambient context state or
/// from a pipeline object.

use nova_render::nova::Result;
use nova_render::nova::render::{
    AttachmentHandle, BufferHandle, ClearValue, PipelineStateDescriptor, QuadDraw, QueryPoolHandle,
};

/// A quad with everything needed to rasterize it
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDraw {
    pub quad: QuadDraw,
    pub state: PipelineStateDescriptor,
    pub colors: Vec<AttachmentHandle>,
    pub depth: Option<AttachmentHandle>,
}

/// One unit of device work
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    Clear { target: AttachmentHandle, value: ClearValue },
    /// Content becomes undefined
    Discard { target: AttachmentHandle },
    Draw(ResolvedDraw),
    Copy { src: AttachmentHandle, dst: AttachmentHandle },
    Blit { src: AttachmentHandle, dst: AttachmentHandle },
    UpdateBuffer { buffer: BufferHandle, offset: u64, data: Vec<u8> },
    WriteTimestamp { pool: QueryPoolHandle, index: u32 },
}

impl DeviceCommand {
    /// Short name used in validation messages
    pub fn name(&self) -> &'static str {
        match self {
            DeviceCommand::Clear { .. } => "clear",
            DeviceCommand::Discard { .. } => "discard",
            DeviceCommand::Draw(_) => "draw",
            DeviceCommand::Copy { .. } => "copy",
            DeviceCommand::Blit { .. } => "blit",
            DeviceCommand::UpdateBuffer { .. } => "update_buffer",
            DeviceCommand::WriteTimestamp { .. } => "write_timestamp",
        }
    }
}

/// Recording state shared by both command list flavors
#[derive(Debug, Default)]
pub struct CommandRecorder {
    commands: Vec<DeviceCommand>,
    recording: bool,
}

impl CommandRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, source: &str) -> Result<()> {
        if self.recording {
            nova_render::engine_bail!(LogicError, source, "command list already recording");
        }
        self.commands.clear();
        self.recording = true;
        Ok(())
    }

    pub fn end(&mut self, source: &str) -> Result<()> {
        if !self.recording {
            nova_render::engine_bail!(LogicError, source, "command list not recording");
        }
        self.recording = false;
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn discard(&mut self) {
        self.commands.clear();
        self.recording = false;
    }

    /// Append a command; only valid between begin and end
    pub fn push(&mut self, source: &str, command: DeviceCommand) -> Result<()> {
        if !self.recording {
            nova_render::engine_bail!(LogicError, source, "'{}' recorded outside begin/end", command.name());
        }
        self.commands.push(command);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Hand the finished recording over for submission
    pub fn take(&mut self, source: &str) -> Result<Vec<DeviceCommand>> {
        if self.recording {
            nova_render::engine_bail!(LogicError, source, "submit while recording");
        }
        Ok(std::mem::take(&mut self.commands))
    }
}

#[cfg(test)]
#[path = "soft_command_tests.rs"]
mod tests;
