//! Region-of-interest cropping
//!
//! The text strip is assumed to sit in a fixed band of the upright frame,
//! described as fractions of the image size. The fractions are policy and
//! live in [`CropRatios`] so they can be tuned from configuration.

use image::imageops;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::PipelineError;
use crate::capture::frame::PixelBuffer;

/// Crop rectangle expressed as fractions of the upright image size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropRatios {
    /// Left edge as a fraction of width
    pub left: f64,
    /// Top edge as a fraction of height
    pub top: f64,
    /// Width as a fraction of width
    pub width: f64,
    /// Height as a fraction of height
    pub height: f64,
}

impl Default for CropRatios {
    fn default() -> Self {
        Self {
            left: 0.025,
            top: 0.40,
            width: 0.95,
            height: 0.15,
        }
    }
}

impl CropRatios {
    /// Check that the ratios describe a non-empty rectangle inside the frame
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("left", self.left),
            ("top", self.top),
            ("width", self.width),
            ("height", self.height),
        ];
        for (name, value) in fields {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(format!("crop {} must be within [0, 1], got {}", name, value));
            }
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err("crop width and height must be positive".to_string());
        }
        if self.left + self.width > 1.0 || self.top + self.height > 1.0 {
            return Err("crop rectangle extends past the image".to_string());
        }
        Ok(())
    }

    /// Fractional crop region for an upright image of the given size
    pub fn region_for(&self, image_width: u32, image_height: u32) -> CropRegion {
        let w = f64::from(image_width);
        let h = f64::from(image_height);
        CropRegion {
            x: self.left * w,
            y: self.top * h,
            width: self.width * w,
            height: self.height * h,
        }
    }
}

/// Rectangle in pixel units, possibly fractional
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRegion {
    /// Smallest rectangle with integer edges enclosing this one
    pub fn integral(&self) -> CropRegion {
        let x0 = self.x.floor();
        let y0 = self.y.floor();
        let x1 = (self.x + self.width).ceil();
        let y1 = (self.y + self.height).ceil();
        CropRegion {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Round outward and clamp to an image of the given size
    ///
    /// Non-finite edges collapse to an empty rectangle.
    pub fn to_pixel_rect(&self, image_width: u32, image_height: u32) -> PixelRect {
        let r = self.integral();
        let w = f64::from(image_width);
        let h = f64::from(image_height);

        // max/min instead of clamp: NaN falls back to the other operand
        let x0 = r.x.max(0.0).min(w);
        let y0 = r.y.max(0.0).min(h);
        let x1 = (r.x + r.width).max(x0).min(w);
        let y1 = (r.y + r.height).max(y0).min(h);

        PixelRect {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        }
    }
}

/// Integer rectangle within an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Crop the configured text strip out of an upright buffer
pub fn crop(buffer: &PixelBuffer, ratios: &CropRatios) -> Result<PixelBuffer, PipelineError> {
    if !buffer.is_upright() {
        return Err(PipelineError::Crop(format!(
            "buffer must be upright, found {:?}",
            buffer.orientation()
        )));
    }

    let (width, height) = buffer.dimensions();
    let region = ratios.region_for(width, height);
    if !region.is_finite() {
        return Err(PipelineError::Crop(format!(
            "crop ratios {:?} do not describe a finite region",
            ratios
        )));
    }
    let integral = region.integral();
    let rect = region.to_pixel_rect(width, height);

    if f64::from(rect.width) != integral.width || f64::from(rect.height) != integral.height {
        warn!(
            "Crop region {:?} clamped to {:?} for {}x{} image",
            integral, rect, width, height
        );
    }

    if rect.is_empty() {
        return Err(PipelineError::Crop(format!(
            "crop region {:?} is empty for {}x{} image",
            rect, width, height
        )));
    }

    debug!("Cropping {:?} from {}x{} image", rect, width, height);

    let cropped = imageops::crop_imm(buffer.image(), rect.x, rect.y, rect.width, rect.height).to_image();
    Ok(PixelBuffer::upright(cropped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::orientation::OrientationTag;
    use image::{Rgba, RgbaImage};

    fn upright(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::upright(RgbaImage::new(width, height))
    }

    #[test]
    fn test_default_ratios() {
        let ratios = CropRatios::default();
        assert!((ratios.left - 0.025).abs() < f64::EPSILON);
        assert!((ratios.top - 0.40).abs() < f64::EPSILON);
        assert!((ratios.width - 0.95).abs() < f64::EPSILON);
        assert!((ratios.height - 0.15).abs() < f64::EPSILON);
        assert!(ratios.validate().is_ok());
    }

    #[test]
    fn test_integral_expands_outward() {
        let region = CropRegion {
            x: 2.5,
            y: 3.2,
            width: 4.0,
            height: 1.1,
        };
        let r = region.integral();
        assert_eq!((r.x, r.y), (2.0, 3.0));
        // 2.5 + 4.0 = 6.5 -> 7, 3.2 + 1.1 = 4.3 -> 5
        assert_eq!((r.width, r.height), (5.0, 2.0));
    }

    #[test]
    fn test_integral_keeps_whole_rectangles() {
        let region = CropRegion {
            x: 10.0,
            y: 20.0,
            width: 30.0,
            height: 40.0,
        };
        assert_eq!(region.integral(), region);
    }

    #[test]
    fn test_crop_matches_formula() {
        let buffer = upright(1000, 2000);
        let cropped = crop(&buffer, &CropRatios::default()).unwrap();
        let (w, h) = cropped.dimensions();
        // 0.95 * 1000 and 0.15 * 2000, up to outward rounding
        assert!((950..=952).contains(&w), "width {}", w);
        assert!((300..=302).contains(&h), "height {}", h);
        assert!(cropped.is_upright());
    }

    #[test]
    fn test_crop_takes_pixels_from_region() {
        let mut image = RgbaImage::new(200, 100);
        let marker = Rgba([9, 8, 7, 255]);
        // Top-left of the strip: x = 5, y = 40
        image.put_pixel(5, 40, marker);
        let cropped = crop(&PixelBuffer::upright(image), &CropRatios::default()).unwrap();
        assert_eq!(*cropped.image().get_pixel(0, 0), marker);
    }

    #[test]
    fn test_rect_within_bounds_for_many_sizes() {
        let ratios = CropRatios::default();
        for (w, h) in [(1, 1), (3, 7), (17, 5), (640, 480), (1001, 1999), (4032, 3024)] {
            let region = ratios.region_for(w, h);
            let rect = region.to_pixel_rect(w, h);
            assert!(rect.x + rect.width <= w, "{}x{}: {:?}", w, h, rect);
            assert!(rect.y + rect.height <= h, "{}x{}: {:?}", w, h, rect);
            assert!(f64::from(rect.x) <= region.x);
            assert!(f64::from(rect.y) <= region.y);
            // Default ratios stay inside the frame, so the far edges are never pulled in
            assert!(
                f64::from(rect.x + rect.width) >= region.x + region.width,
                "{}x{}: {:?} narrower than {:?}",
                w,
                h,
                rect,
                region
            );
            assert!(
                f64::from(rect.y + rect.height) >= region.y + region.height,
                "{}x{}: {:?} shorter than {:?}",
                w,
                h,
                rect,
                region
            );
        }
    }

    #[test]
    fn test_nan_ratio_is_crop_error() {
        let ratios = CropRatios {
            left: f64::NAN,
            ..CropRatios::default()
        };
        let result = crop(&upright(100, 100), &ratios);
        assert!(matches!(result, Err(PipelineError::Crop(_))));
    }

    #[test]
    fn test_non_finite_region_gives_empty_rect() {
        let region = CropRegion {
            x: f64::NAN,
            y: 0.0,
            width: f64::INFINITY,
            height: 10.0,
        };
        assert!(region.to_pixel_rect(100, 100).is_empty());
    }

    #[test]
    fn test_clamps_oversized_ratios() {
        let ratios = CropRatios {
            left: 0.5,
            top: 0.5,
            width: 0.9,
            height: 0.9,
        };
        let rect = ratios.region_for(100, 100).to_pixel_rect(100, 100);
        assert_eq!(rect, PixelRect { x: 50, y: 50, width: 50, height: 50 });
        assert!(ratios.validate().is_err());
    }

    #[test]
    fn test_empty_region_is_error() {
        let ratios = CropRatios {
            left: 1.0,
            top: 0.0,
            width: 0.5,
            height: 0.5,
        };
        let result = crop(&upright(10, 10), &ratios);
        assert!(matches!(result, Err(PipelineError::Crop(_))));
    }

    #[test]
    fn test_rejects_non_upright_buffer() {
        let buffer = PixelBuffer::new(RgbaImage::new(10, 10), OrientationTag::Right);
        assert!(matches!(crop(&buffer, &CropRatios::default()), Err(PipelineError::Crop(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut ratios = CropRatios::default();
        ratios.width = f64::NAN;
        assert!(ratios.validate().is_err());

        let mut ratios = CropRatios::default();
        ratios.height = 0.0;
        assert!(ratios.validate().is_err());

        let mut ratios = CropRatios::default();
        ratios.left = -0.1;
        assert!(ratios.validate().is_err());
    }
}
