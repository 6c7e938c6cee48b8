//! Pixel buffer handed between pipeline stages

use image::RgbaImage;

use crate::vision::orientation::OrientationTag;

/// A decoded image together with the orientation its source was tagged with
///
/// Pixels are stored as RGBA8 in the order they were encoded, so a buffer
/// tagged anything other than [`OrientationTag::Up`] is not yet upright.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    /// Raw RGBA pixel data
    image: RgbaImage,
    /// How the pixel data relates to the intended display orientation
    orientation: OrientationTag,
}

impl PixelBuffer {
    /// Create a new buffer from RGBA pixels and an orientation tag
    pub fn new(image: RgbaImage, orientation: OrientationTag) -> Self {
        Self { image, orientation }
    }

    /// Create a buffer that is already upright
    pub fn upright(image: RgbaImage) -> Self {
        Self::new(image, OrientationTag::Up)
    }

    /// Width of the stored raster in pixels
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height of the stored raster in pixels
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Get buffer dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn orientation(&self) -> OrientationTag {
        self.orientation
    }

    /// Whether the buffer is in canonical upright orientation
    pub fn is_upright(&self) -> bool {
        self.orientation == OrientationTag::Up
    }

    /// Borrow the underlying raster
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Consume the buffer, returning the raster
    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}
