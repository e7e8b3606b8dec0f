use std::path::Path;

use anyhow::{Context, Result};
use image::{DynamicImage, RgbaImage};

use super::expand::expand;
use super::{PixelFormat, RGBA_BYTES};
use crate::error::ViewerError;

/// Outcome of an accepted frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceUpdate {
    /// The RGBA buffer was reallocated for new dimensions
    pub reallocated: bool,
}

/// The displayable RGBA buffer, mutated in place on every accepted frame.
///
/// Dimensions always match the last accepted frame. The buffer is only
/// reallocated when those dimensions change.
#[derive(Debug, Default)]
pub struct PixelSurface {
    width: u32,
    height: u32,
    format: Option<PixelFormat>,
    rgba: Vec<u8>,
    reallocations: u64,
}

impl PixelSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `payload` against the declared frame and expand it.
    pub fn accept(
        &mut self,
        format: PixelFormat,
        width: u32,
        height: u32,
        payload: &[u8],
    ) -> Result<SurfaceUpdate, ViewerError> {
        let expected = format.payload_len(width, height).unwrap_or(usize::MAX);
        if payload.len() != expected {
            return Err(ViewerError::FrameSizeMismatch {
                expected,
                actual: payload.len(),
            });
        }

        let reallocated = !self.has_frame() || (width, height) != (self.width, self.height);
        if reallocated {
            self.rgba = vec![0u8; width as usize * height as usize * RGBA_BYTES];
            self.width = width;
            self.height = height;
            self.reallocations += 1;
        }

        expand(format, width, height, payload, &mut self.rgba)?;
        self.format = Some(format);
        Ok(SurfaceUpdate { reallocated })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel format of the last accepted frame
    pub fn format(&self) -> Option<PixelFormat> {
        self.format
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn reallocations(&self) -> u64 {
        self.reallocations
    }

    pub fn has_frame(&self) -> bool {
        self.format.is_some()
    }

    /// Copy the buffer into a standalone bitmap for drawing
    pub fn to_image(&self) -> Option<DynamicImage> {
        if !self.has_frame() {
            return None;
        }
        RgbaImage::from_raw(self.width, self.height, self.rgba.clone()).map(DynamicImage::ImageRgba8)
    }

    /// Save the current frame; the encoder is picked from the extension.
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        let image = self
            .to_image()
            .ok_or_else(|| anyhow::anyhow!("No frame received yet"))?;
        // Alpha is always opaque, and JPEG has no alpha channel
        image
            .to_rgb8()
            .save(path)
            .with_context(|| format!("Failed to save snapshot to {}", path.display()))?;
        Ok(())
    }
}
