/// Software swapchain and a resizable surface
///
/// Presentable images are ordinary device attachments. The swapchain reports
/// `TransientSurfaceError` whenever the surface's drawable size no longer
/// matches its images, on acquire as well as on present.

use std::sync::{Arc, Mutex};
use nova_render::nova::{Result, SurfaceSource};
use nova_render::nova::render::{
    AttachmentDesc, AttachmentHandle, CompletionMarker, SurfaceImage, Swapchain, TextureFormat,
};
use nova_render::{engine_bail, engine_debug};
use crate::soft_device::{lock, DeviceShared};
use crate::soft_image::SoftImage;

const SOURCE: &str = "nova::soft::Swapchain";

/// Swapchain of the software device
pub struct SoftSwapchain {
    shared: Arc<DeviceShared>,
    surface: Arc<dyn SurfaceSource>,
    images: Vec<AttachmentHandle>,
    extent: (u32, u32),
    next: u32,
    presented: u64,
    last_present: Option<(u32, CompletionMarker)>,
}

impl SoftSwapchain {
    /// Swapchain sized to the surface's current drawable size
    pub(crate) fn new(shared: Arc<DeviceShared>, surface: Arc<dyn SurfaceSource>) -> Result<Self> {
        let mut swapchain = Self {
            shared,
            surface,
            images: Vec::new(),
            extent: (0, 0),
            next: 0,
            presented: 0,
            last_present: None,
        };
        let (width, height) = swapchain.surface.drawable_size();
        swapchain.recreate(width, height)?;
        Ok(swapchain)
    }

    /// Image index and completion marker of the last successful present
    pub fn last_present(&self) -> Option<(u32, CompletionMarker)> {
        self.last_present
    }

    fn release_images(&mut self) {
        let mut images = self.shared.images();
        for image in self.images.drain(..) {
            images.remove(image);
        }
    }

    fn is_stale(&self) -> bool {
        self.surface.drawable_size() != self.extent
    }
}

impl Swapchain for SoftSwapchain {
    fn acquire_next_image(&mut self) -> Result<SurfaceImage> {
        if self.is_stale() {
            engine_bail!(
                TransientSurfaceError,
                SOURCE,
                "swapchain out of date during acquire ({:?} vs surface {:?})",
                self.extent,
                self.surface.drawable_size()
            );
        }

        let index = self.next;
        self.next = (self.next + 1) % self.images.len() as u32;
        Ok(SurfaceImage {
            index,
            attachment: self.images[index as usize],
            width: self.extent.0,
            height: self.extent.1,
        })
    }

    fn present(&mut self, image: &SurfaceImage, ready: CompletionMarker) -> Result<()> {
        if self.is_stale() {
            engine_bail!(TransientSurfaceError, SOURCE, "swapchain out of date during present");
        }
        if self.images.get(image.index as usize) != Some(&image.attachment) {
            engine_bail!(InvalidResource, SOURCE, "presenting an image this swapchain does not own");
        }

        self.presented += 1;
        self.last_present = Some((image.index, ready));
        Ok(())
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        let desc = AttachmentDesc::new(TextureFormat::Bgra8Unorm, width, height);
        desc.validate()?;

        self.release_images();
        {
            let mut images = self.shared.images();
            for _ in 0..self.shared.config().swapchain_images {
                self.images.push(images.insert(SoftImage::new(desc)));
            }
        }

        self.extent = (width, height);
        self.next = 0;
        self.last_present = None;
        engine_debug!(SOURCE, "swapchain recreated at {}x{}", width, height);
        Ok(())
    }

    fn extent(&self) -> (u32, u32) {
        self.extent
    }

    fn format(&self) -> TextureFormat {
        TextureFormat::Bgra8Unorm
    }

    fn image_count(&self) -> u32 {
        self.images.len() as u32
    }

    fn presented_count(&self) -> u64 {
        self.presented
    }
}

impl Drop for SoftSwapchain {
    fn drop(&mut self) {
        self.release_images();
    }
}

// ============================================================================
// Surface
// ============================================================================

/// Surface whose drawable size the application sets explicitly
///
/// Stands in for a window: `resize` plays the part of the window system
/// changing the drawable size behind the renderer's back.
pub struct SoftSurface {
    size: Mutex<(u32, u32)>,
}

impl SoftSurface {
    pub fn new(width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self { size: Mutex::new((width, height)) })
    }

    pub fn resize(&self, width: u32, height: u32) {
        *lock(&self.size) = (width, height);
    }
}

impl SurfaceSource for SoftSurface {
    fn drawable_size(&self) -> (u32, u32) {
        *lock(&self.size)
    }
}
