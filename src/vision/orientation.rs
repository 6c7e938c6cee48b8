//! Orientation normalization
//!
//! Cameras store sensor data in whatever orientation the sensor was mounted
//! and record how the picture should be displayed in a tag (EXIF
//! orientation). Everything downstream of decoding assumes pixel row 0 is the
//! visual top and column 0 the visual left, so the raster has to be rewritten
//! into that frame before any geometry is applied to it.
//!
//! Each tag decodes into a number of counter-clockwise quarter turns plus an
//! optional horizontal mirror applied before the rotation. The normalizer
//! composes those into one [`AffineTransform`] and renders the source through
//! it in a single pass.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::PipelineError;
use crate::capture::frame::PixelBuffer;

/// How stored pixel data relates to the intended display orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrientationTag {
    /// Stored upright (EXIF 1)
    #[default]
    Up,
    /// Mirrored left-to-right (EXIF 2)
    UpMirrored,
    /// Upside down (EXIF 3)
    Down,
    /// Upside down and mirrored, i.e. flipped top-to-bottom (EXIF 4)
    DownMirrored,
    /// Must be turned 90° counter-clockwise for display (EXIF 8)
    Left,
    /// Mirrored, then turned 90° counter-clockwise (EXIF 5)
    LeftMirrored,
    /// Must be turned 90° clockwise for display (EXIF 6)
    Right,
    /// Mirrored, then turned 90° clockwise (EXIF 7)
    RightMirrored,
}

impl OrientationTag {
    /// Every canonical tag
    pub const ALL: [OrientationTag; 8] = [
        OrientationTag::Up,
        OrientationTag::UpMirrored,
        OrientationTag::Down,
        OrientationTag::DownMirrored,
        OrientationTag::Left,
        OrientationTag::LeftMirrored,
        OrientationTag::Right,
        OrientationTag::RightMirrored,
    ];

    /// Map a raw EXIF orientation value
    ///
    /// Values outside 1..=8 are treated as upright.
    pub fn from_exif(value: u16) -> Self {
        match value {
            1 => OrientationTag::Up,
            2 => OrientationTag::UpMirrored,
            3 => OrientationTag::Down,
            4 => OrientationTag::DownMirrored,
            5 => OrientationTag::LeftMirrored,
            6 => OrientationTag::Right,
            7 => OrientationTag::RightMirrored,
            8 => OrientationTag::Left,
            other => {
                warn!("Unknown EXIF orientation {}, treating image as upright", other);
                OrientationTag::Up
            }
        }
    }

    /// The EXIF orientation value for this tag
    pub fn to_exif(self) -> u16 {
        match self {
            OrientationTag::Up => 1,
            OrientationTag::UpMirrored => 2,
            OrientationTag::Down => 3,
            OrientationTag::DownMirrored => 4,
            OrientationTag::LeftMirrored => 5,
            OrientationTag::Right => 6,
            OrientationTag::RightMirrored => 7,
            OrientationTag::Left => 8,
        }
    }

    /// Counter-clockwise quarter turns needed to bring the (mirrored) raster upright
    pub fn quarter_turns(self) -> u8 {
        match self {
            OrientationTag::Up | OrientationTag::UpMirrored => 0,
            OrientationTag::Left | OrientationTag::LeftMirrored => 1,
            OrientationTag::Down | OrientationTag::DownMirrored => 2,
            OrientationTag::Right | OrientationTag::RightMirrored => 3,
        }
    }

    /// Whether a horizontal mirror precedes the rotation
    pub fn is_mirrored(self) -> bool {
        matches!(
            self,
            OrientationTag::UpMirrored
                | OrientationTag::DownMirrored
                | OrientationTag::LeftMirrored
                | OrientationTag::RightMirrored
        )
    }

    /// Whether normalizing exchanges width and height
    pub fn swaps_axes(self) -> bool {
        self.quarter_turns() % 2 == 1
    }

    /// Dimensions of the upright image for a raster of the given size
    pub fn upright_dimensions(self, width: u32, height: u32) -> (u32, u32) {
        if self.swaps_axes() {
            (height, width)
        } else {
            (width, height)
        }
    }
}

impl From<image::metadata::Orientation> for OrientationTag {
    fn from(orientation: image::metadata::Orientation) -> Self {
        use image::metadata::Orientation;

        match orientation {
            Orientation::NoTransforms => OrientationTag::Up,
            Orientation::FlipHorizontal => OrientationTag::UpMirrored,
            Orientation::Rotate180 => OrientationTag::Down,
            Orientation::FlipVertical => OrientationTag::DownMirrored,
            Orientation::Rotate90FlipH => OrientationTag::LeftMirrored,
            Orientation::Rotate90 => OrientationTag::Right,
            Orientation::Rotate270FlipH => OrientationTag::RightMirrored,
            Orientation::Rotate270 => OrientationTag::Left,
        }
    }
}

/// Integer affine transform on image coordinates (y axis pointing down)
///
/// Maps `(x, y)` to `(a*x + c*y + tx, b*x + d*y + ty)`. Only quarter-turn
/// rotations, axis scales and translations are ever composed, so every
/// coefficient stays integral and pixel mapping is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AffineTransform {
    pub a: i64,
    pub b: i64,
    pub c: i64,
    pub d: i64,
    pub tx: i64,
    pub ty: i64,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    pub const fn identity() -> Self {
        Self {
            a: 1,
            b: 0,
            c: 0,
            d: 1,
            tx: 0,
            ty: 0,
        }
    }

    pub const fn translation(tx: i64, ty: i64) -> Self {
        Self {
            tx,
            ty,
            ..Self::identity()
        }
    }

    pub const fn scale(sx: i64, sy: i64) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::identity()
        }
    }

    /// Counter-clockwise rotation by `turns` quarter turns about the origin
    pub const fn quarter_turn(turns: u8) -> Self {
        // With y pointing down, a visual counter-clockwise turn sends (1, 0) to (0, -1)
        let (a, b, c, d) = match turns % 4 {
            0 => (1, 0, 0, 1),
            1 => (0, -1, 1, 0),
            2 => (-1, 0, 0, -1),
            _ => (0, 1, -1, 0),
        };
        Self {
            a,
            b,
            c,
            d,
            tx: 0,
            ty: 0,
        }
    }

    /// Apply `self` first, then `next`
    pub fn then(self, next: AffineTransform) -> Self {
        Self {
            a: next.a * self.a + next.c * self.b,
            b: next.b * self.a + next.d * self.b,
            c: next.a * self.c + next.c * self.d,
            d: next.b * self.c + next.d * self.d,
            tx: next.a * self.tx + next.c * self.ty + next.tx,
            ty: next.b * self.tx + next.d * self.ty + next.ty,
        }
    }

    /// Map a point in continuous pixel-edge coordinates
    pub fn apply(&self, x: i64, y: i64) -> (i64, i64) {
        (
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }

    /// Map the pixel whose top-left corner is `(x, y)` to the destination pixel
    ///
    /// The pixel centre is mapped in doubled coordinates so it stays integral.
    pub fn map_pixel(&self, x: u32, y: u32) -> (i64, i64) {
        let cx = 2 * i64::from(x) + 1;
        let cy = 2 * i64::from(y) + 1;
        let mx = self.a * cx + self.c * cy + 2 * self.tx;
        let my = self.b * cx + self.d * cy + 2 * self.ty;
        ((mx - 1).div_euclid(2), (my - 1).div_euclid(2))
    }

    /// Translate so the image of the `width` x `height` rectangle starts at the origin
    fn recentred(self, width: u32, height: u32) -> Self {
        let (w, h) = (i64::from(width), i64::from(height));
        let corners = [
            self.apply(0, 0),
            self.apply(w, 0),
            self.apply(0, h),
            self.apply(w, h),
        ];
        let min_x = corners.iter().map(|p| p.0).min().unwrap_or(0);
        let min_y = corners.iter().map(|p| p.1).min().unwrap_or(0);
        self.then(Self::translation(-min_x, -min_y))
    }
}

/// Compose the transform taking a `width` x `height` raster tagged `tag` to upright
pub fn upright_transform(tag: OrientationTag, width: u32, height: u32) -> AffineTransform {
    let mut transform = AffineTransform::identity();

    if tag.is_mirrored() {
        transform = transform
            .then(AffineTransform::scale(-1, 1))
            .then(AffineTransform::translation(i64::from(width), 0));
    }

    transform
        .then(AffineTransform::quarter_turn(tag.quarter_turns()))
        .recentred(width, height)
}

/// Produce an upright copy of `buffer`
///
/// The input is never modified. An already upright buffer is returned as a
/// pixel-identical copy.
pub fn normalize(buffer: &PixelBuffer) -> Result<PixelBuffer, PipelineError> {
    let tag = buffer.orientation();
    if tag == OrientationTag::Up {
        return Ok(buffer.clone());
    }

    let (width, height) = buffer.dimensions();
    let (dst_width, dst_height) = tag.upright_dimensions(width, height);
    let transform = upright_transform(tag, width, height);

    debug!(
        "Normalizing {}x{} raster tagged {:?} into {}x{} canvas ({:?})",
        width, height, tag, dst_width, dst_height, transform
    );

    let mut canvas = allocate_canvas(dst_width, dst_height)?;
    render(buffer.image(), &mut canvas, &transform)?;

    Ok(PixelBuffer::upright(canvas))
}

/// Allocate a transparent RGBA canvas
fn allocate_canvas(width: u32, height: u32) -> Result<RgbaImage, PipelineError> {
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| {
            PipelineError::Orientation(format!("canvas {}x{} is too large", width, height))
        })?;

    RgbaImage::from_raw(width, height, vec![0u8; len]).ok_or_else(|| {
        PipelineError::Orientation(format!("could not allocate {}x{} canvas", width, height))
    })
}

/// Copy every source pixel, alpha included, to its transformed position
fn render(
    source: &RgbaImage,
    canvas: &mut RgbaImage,
    transform: &AffineTransform,
) -> Result<(), PipelineError> {
    let (dst_w, dst_h) = (i64::from(canvas.width()), i64::from(canvas.height()));

    for (x, y, pixel) in source.enumerate_pixels() {
        let (dx, dy) = transform.map_pixel(x, y);
        if dx < 0 || dy < 0 || dx >= dst_w || dy >= dst_h {
            return Err(PipelineError::Orientation(format!(
                "pixel ({}, {}) maps outside the {}x{} canvas",
                x, y, dst_w, dst_h
            )));
        }
        canvas.put_pixel(dx as u32, dy as u32, *pixel);
    }

    Ok(())
}
