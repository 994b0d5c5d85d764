/// A group of render targets sharing one size
///
/// Sets are immutable: a resize destroys the set and creates a new one.
/// `destroy` must be called explicitly with the owning device; a set dropped
/// while still holding attachments logs a leak warning.

use crate::error::Result;
use crate::graphics_device::{
    AttachmentDesc, AttachmentHandle, AttachmentRole, GraphicsDevice, TextureFormat,
};

/// How to build one member of a set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentSpec {
    pub format: TextureFormat,
    pub samples: u32,
    /// Explicit size; `None` = the set's size
    pub extent: Option<(u32, u32)>,
}

impl AttachmentSpec {
    pub fn new(format: TextureFormat) -> Self {
        Self { format, samples: 1, extent: None }
    }

    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_extent(mut self, width: u32, height: u32) -> Self {
        self.extent = Some((width, height));
        self
    }
}

/// Layout of a set: ordered colors + optional depth/stencil
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentSetDesc {
    pub label: String,
    pub colors: Vec<AttachmentSpec>,
    pub depth_stencil: Option<AttachmentSpec>,
}

impl AttachmentSetDesc {
    pub fn new(label: &str) -> Self {
        Self { label: label.to_string(), colors: Vec::new(), depth_stencil: None }
    }

    pub fn with_color(mut self, spec: AttachmentSpec) -> Self {
        self.colors.push(spec);
        self
    }

    pub fn with_depth_stencil(mut self, spec: AttachmentSpec) -> Self {
        self.depth_stencil = Some(spec);
        self
    }
}

/// Live member of a set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    pub handle: AttachmentHandle,
    pub desc: AttachmentDesc,
}

/// Owned group of attachments with matching size
#[derive(Debug)]
pub struct AttachmentSet {
    label: String,
    width: u32,
    height: u32,
    colors: Vec<Attachment>,
    depth_stencil: Option<Attachment>,
}

impl AttachmentSet {
    /// Allocate every member of `desc` at `width` x `height`
    ///
    /// Everything is validated before the first allocation; if the device
    /// fails part-way, members already created are released again.
    pub fn create(
        device: &mut dyn GraphicsDevice,
        desc: &AttachmentSetDesc,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let source = "nova::AttachmentSet";

        if width == 0 || height == 0 {
            crate::engine_bail!(
                ConfigurationError,
                source,
                "set '{}' cannot be created at {}x{}",
                desc.label,
                width,
                height
            );
        }

        if desc.colors.is_empty() && desc.depth_stencil.is_none() {
            crate::engine_bail!(ConfigurationError, source, "set '{}' has no attachment", desc.label);
        }

        let mut color_descs = Vec::with_capacity(desc.colors.len());
        for spec in &desc.colors {
            color_descs.push(Self::resolve(desc, spec, AttachmentRole::Color, width, height)?);
        }

        let depth_desc = match &desc.depth_stencil {
            Some(spec) => {
                let role = if spec.format.has_depth() { AttachmentRole::Depth } else { AttachmentRole::Stencil };
                Some(Self::resolve(desc, spec, role, width, height)?)
            }
            None => None,
        };

        let mut set = Self {
            label: desc.label.clone(),
            width,
            height,
            colors: Vec::with_capacity(color_descs.len()),
            depth_stencil: None,
        };

        for attachment_desc in color_descs {
            match device.create_attachment(&attachment_desc) {
                Ok(handle) => set.colors.push(Attachment { handle, desc: attachment_desc }),
                Err(err) => {
                    let _ = set.destroy(device);
                    return Err(err);
                }
            }
        }

        if let Some(attachment_desc) = depth_desc {
            match device.create_attachment(&attachment_desc) {
                Ok(handle) => set.depth_stencil = Some(Attachment { handle, desc: attachment_desc }),
                Err(err) => {
                    let _ = set.destroy(device);
                    return Err(err);
                }
            }
        }

        crate::engine_debug!(
            source,
            "set '{}' created at {}x{} ({} attachments)",
            set.label,
            width,
            height,
            set.attachment_count()
        );

        Ok(set)
    }

    fn resolve(
        desc: &AttachmentSetDesc,
        spec: &AttachmentSpec,
        role: AttachmentRole,
        width: u32,
        height: u32,
    ) -> Result<AttachmentDesc> {
        let (member_width, member_height) = spec.extent.unwrap_or((width, height));
        if (member_width, member_height) != (width, height) {
            crate::engine_bail!(
                ConfigurationError,
                "nova::AttachmentSet",
                "set '{}' is {}x{} but a {:?} member is {}x{}",
                desc.label,
                width,
                height,
                spec.format,
                member_width,
                member_height
            );
        }

        if !spec.format.supports_role(role) {
            crate::engine_bail!(
                ConfigurationError,
                "nova::AttachmentSet",
                "set '{}': format {:?} cannot be a {:?} attachment",
                desc.label,
                spec.format,
                role
            );
        }

        let attachment_desc = AttachmentDesc {
            format: spec.format,
            role,
            width,
            height,
            samples: spec.samples,
        };
        attachment_desc.validate()?;
        Ok(attachment_desc)
    }

    /// Release every member
    pub fn destroy(mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        let mut first_error = None;
        let members: Vec<Attachment> = self.colors.drain(..).chain(self.depth_stencil.take()).collect();
        for attachment in members {
            if let Err(err) = device.destroy_attachment(attachment.handle) {
                first_error.get_or_insert(err);
            }
        }

        crate::engine_debug!("nova::AttachmentSet", "set '{}' destroyed", self.label);

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn colors(&self) -> &[Attachment] {
        &self.colors
    }

    pub fn color(&self, index: usize) -> Option<&Attachment> {
        self.colors.get(index)
    }

    pub fn depth_stencil(&self) -> Option<&Attachment> {
        self.depth_stencil.as_ref()
    }

    pub fn attachment_count(&self) -> usize {
        self.colors.len() + usize::from(self.depth_stencil.is_some())
    }

    /// Handles of every member (colors first)
    pub fn handles(&self) -> Vec<AttachmentHandle> {
        self.colors
            .iter()
            .chain(self.depth_stencil.iter())
            .map(|attachment| attachment.handle)
            .collect()
    }
}

impl Drop for AttachmentSet {
    fn drop(&mut self) {
        if self.attachment_count() > 0 {
            crate::engine_warn!(
                "nova::AttachmentSet",
                "set '{}' dropped without destroy(): {} attachments leaked",
                self.label,
                self.attachment_count()
            );
        }
    }
}

#[cfg(test)]
#[path = "attachment_set_tests.rs"]
mod tests;
