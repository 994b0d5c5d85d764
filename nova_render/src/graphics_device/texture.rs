/// Attachment formats, roles and descriptors

use crate::error::Result;

/// Pixel format of an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit RGBA, normalized
    Rgba8Unorm,
    /// 8-bit BGRA, normalized (typical presentable format)
    Bgra8Unorm,
    /// 16-bit float RGBA
    Rgba16Float,
    /// 32-bit float RGBA
    Rgba32Float,
    /// 32-bit float depth
    Depth32Float,
    /// 24-bit depth + 8-bit stencil
    Depth24Stencil8,
    /// 8-bit stencil only
    Stencil8,
}

impl TextureFormat {
    /// Whether the format stores color
    pub fn is_color(&self) -> bool {
        matches!(
            self,
            TextureFormat::Rgba8Unorm
                | TextureFormat::Bgra8Unorm
                | TextureFormat::Rgba16Float
                | TextureFormat::Rgba32Float
        )
    }

    /// Whether the format has a depth aspect
    pub fn has_depth(&self) -> bool {
        matches!(self, TextureFormat::Depth32Float | TextureFormat::Depth24Stencil8)
    }

    /// Whether the format has a stencil aspect
    pub fn has_stencil(&self) -> bool {
        matches!(self, TextureFormat::Depth24Stencil8 | TextureFormat::Stencil8)
    }

    /// Size of one texel in bytes
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm | TextureFormat::Bgra8Unorm => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::Rgba32Float => 16,
            TextureFormat::Depth32Float | TextureFormat::Depth24Stencil8 => 4,
            TextureFormat::Stencil8 => 1,
        }
    }

    /// Whether an attachment of this format can play `role`
    pub fn supports_role(&self, role: AttachmentRole) -> bool {
        match role {
            AttachmentRole::Color => self.is_color(),
            AttachmentRole::Depth => self.has_depth(),
            AttachmentRole::Stencil => self.has_stencil(),
        }
    }

    /// Natural role of the format (depth wins over stencil for combined formats)
    pub fn default_role(&self) -> AttachmentRole {
        if self.is_color() {
            AttachmentRole::Color
        } else if self.has_depth() {
            AttachmentRole::Depth
        } else {
            AttachmentRole::Stencil
        }
    }
}

/// What an attachment is bound as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentRole {
    Color,
    Depth,
    Stencil,
}

/// Full description of one attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentDesc {
    pub format: TextureFormat,
    pub role: AttachmentRole,
    pub width: u32,
    pub height: u32,
    /// Sample count (1 = no multisampling)
    pub samples: u32,
}

impl AttachmentDesc {
    /// Single-sampled attachment with the format's natural role
    pub fn new(format: TextureFormat, width: u32, height: u32) -> Self {
        Self {
            format,
            role: format.default_role(),
            width,
            height,
            samples: 1,
        }
    }

    /// (width, height)
    pub fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of texels
    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Reject zero extents, invalid sample counts and role/format mismatches
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            crate::engine_bail!(
                ConfigurationError,
                "nova::Attachment",
                "attachment extent must be non-zero, got {}x{}",
                self.width,
                self.height
            );
        }

        if self.samples == 0 || !self.samples.is_power_of_two() || self.samples > 64 {
            crate::engine_bail!(
                ConfigurationError,
                "nova::Attachment",
                "invalid sample count {}",
                self.samples
            );
        }

        if !self.format.supports_role(self.role) {
            crate::engine_bail!(
                ConfigurationError,
                "nova::Attachment",
                "format {:?} cannot be used as a {:?} attachment",
                self.format,
                self.role
            );
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
