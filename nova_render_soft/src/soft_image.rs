/// Software image storage
///
/// Every attachment of the software device is a grid of `[f32; 4]` texels.
/// Depth lives in channel 0, stencil in channel 1. Content that is undefined
/// (fresh allocation, DontCare load or store) is poisoned with NaN so that any
/// read of it is observable: depth tests fail and blends propagate NaN.

use nova_render::nova::render::AttachmentDesc;

/// Value of an undefined texel
pub const POISON: [f32; 4] = [f32::NAN; 4];

/// Texel grid backing one attachment
#[derive(Debug, Clone)]
pub struct SoftImage {
    desc: AttachmentDesc,
    texels: Vec<[f32; 4]>,
}

impl SoftImage {
    /// Allocate an image with undefined content
    pub fn new(desc: AttachmentDesc) -> Self {
        Self {
            desc,
            texels: vec![POISON; desc.texel_count()],
        }
    }

    pub fn desc(&self) -> &AttachmentDesc {
        &self.desc
    }

    pub fn width(&self) -> u32 {
        self.desc.width
    }

    pub fn height(&self) -> u32 {
        self.desc.height
    }

    pub fn texels(&self) -> &[[f32; 4]] {
        &self.texels
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x < self.desc.width && y < self.desc.height {
            Some(y as usize * self.desc.width as usize + x as usize)
        } else {
            None
        }
    }

    /// Texel at (x, y); out of bounds reads are undefined
    pub fn get(&self, x: u32, y: u32) -> [f32; 4] {
        self.index(x, y).map(|i| self.texels[i]).unwrap_or(POISON)
    }

    /// Write one texel (out of bounds writes are dropped)
    pub fn set(&mut self, x: u32, y: u32, value: [f32; 4]) {
        if let Some(i) = self.index(x, y) {
            self.texels[i] = value;
        }
    }

    pub fn fill(&mut self, value: [f32; 4]) {
        self.texels.iter_mut().for_each(|texel| *texel = value);
    }

    /// Make the whole content undefined
    pub fn poison(&mut self) {
        self.fill(POISON);
    }

    /// Nearest-texel sample at normalized coordinates (0..1, origin top-left)
    pub fn sample(&self, u: f32, v: f32) -> [f32; 4] {
        if !u.is_finite() || !v.is_finite() {
            return POISON;
        }
        let x = (u * self.desc.width as f32).floor().clamp(0.0, (self.desc.width - 1) as f32);
        let y = (v * self.desc.height as f32).floor().clamp(0.0, (self.desc.height - 1) as f32);
        self.get(x as u32, y as u32)
    }

    /// Overwrite with `other`'s texels (extents must match)
    pub fn copy_from(&mut self, other: &SoftImage) -> bool {
        if other.desc.extent() != self.desc.extent() {
            return false;
        }
        self.texels.copy_from_slice(&other.texels);
        true
    }

    /// Nearest-filtered scale of `other` into this image
    pub fn blit_from(&mut self, other: &SoftImage) {
        let (width, height) = self.desc.extent();
        for y in 0..height {
            for x in 0..width {
                let u = (x as f32 + 0.5) / width as f32;
                let v = (y as f32 + 0.5) / height as f32;
                let texel = other.sample(u, v);
                self.set(x, y, texel);
            }
        }
    }
}

/// Whether a texel holds undefined data
pub fn is_poisoned(texel: &[f32; 4]) -> bool {
    texel.iter().any(|channel| channel.is_nan())
}

#[cfg(test)]
#[path = "soft_image_tests.rs"]
mod tests;
