//! Image loading
//!
//! Resolves the caller's image path, reads the bytes and decodes them into a
//! [`PixelBuffer`] tagged with the container's orientation.

pub mod frame;

use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::vision::error::PipelineError;
use crate::vision::orientation::OrientationTag;
use frame::PixelBuffer;

const FILE_SCHEME: &str = "file://";

/// Turn a caller-supplied image path into a filesystem path
///
/// A leading `file://` is stripped. Empty paths are rejected.
pub fn normalize_image_path(image_path: &str) -> Result<PathBuf, PipelineError> {
    let path = image_path.strip_prefix(FILE_SCHEME).unwrap_or(image_path);
    if path.trim().is_empty() {
        return Err(PipelineError::InvalidInput(
            "an image path is required".to_string(),
        ));
    }
    Ok(PathBuf::from(path))
}

/// Read and decode the image at `path`
pub async fn load_image(path: &Path) -> Result<PixelBuffer, PipelineError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| PipelineError::Decode(format!("{}: {}", path.display(), e)))?;

    debug!("Read {} bytes from {:?}", bytes.len(), path);
    decode_image(&bytes)
}

/// Decode encoded image bytes, keeping the orientation tag they carry
pub fn decode_image(bytes: &[u8]) -> Result<PixelBuffer, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::Decode("image data is empty".to_string()));
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| PipelineError::Decode(e.to_string()))?;
    let format = reader.format();

    let mut decoder = reader
        .into_decoder()
        .map_err(|e| PipelineError::Decode(e.to_string()))?;

    let orientation = match decoder.orientation() {
        Ok(orientation) => OrientationTag::from(orientation),
        Err(e) => {
            warn!("Could not read orientation metadata ({}), assuming upright", e);
            OrientationTag::Up
        }
    };

    let image = DynamicImage::from_decoder(decoder)
        .map_err(|e| PipelineError::Decode(e.to_string()))?;

    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::Decode(format!(
            "image has no pixels ({}x{})",
            image.width(),
            image.height()
        )));
    }

    debug!(
        "Decoded {:?} image {}x{} tagged {:?}",
        format,
        image.width(),
        image.height(),
        orientation
    );

    Ok(PixelBuffer::new(image.to_rgba8(), orientation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Write;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, Rgba([12, 34, 56, 255]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_strips_file_scheme() {
        let path = normalize_image_path("file:///tmp/card.jpg").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/card.jpg"));
    }

    #[test]
    fn test_plain_path_unchanged() {
        let path = normalize_image_path("/var/mobile/photo.heic").unwrap();
        assert_eq!(path, PathBuf::from("/var/mobile/photo.heic"));
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(matches!(normalize_image_path(""), Err(PipelineError::InvalidInput(_))));
        assert!(matches!(
            normalize_image_path("file://"),
            Err(PipelineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_decode_png() {
        let buffer = decode_image(&png_bytes(4, 3)).unwrap();
        assert_eq!(buffer.dimensions(), (4, 3));
        assert_eq!(buffer.orientation(), OrientationTag::Up);
        assert_eq!(*buffer.image().get_pixel(3, 2), Rgba([12, 34, 56, 255]));
    }

    #[test]
    fn test_decode_empty() {
        assert!(matches!(decode_image(&[]), Err(PipelineError::Decode(_))));
    }

    #[test]
    fn test_decode_garbage() {
        let result = decode_image(&[0x00, 0x01, 0x02, 0x03, 0x04, 0x05]);
        assert!(matches!(result, Err(PipelineError::Decode(_))));
    }

    #[test]
    fn test_decode_truncated_png() {
        let bytes = png_bytes(16, 16);
        let result = decode_image(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(PipelineError::Decode(_))));
    }

    #[tokio::test]
    async fn test_load_image_from_file() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(&png_bytes(5, 7)).unwrap();

        let buffer = load_image(file.path()).await.unwrap();
        assert_eq!(buffer.dimensions(), (5, 7));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = load_image(Path::new("/nonexistent/path/card.png")).await;
        assert!(matches!(result, Err(PipelineError::Decode(_))));
    }
}
