//! Loading uploaded image bytes into bitmaps.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};

use crate::{error::ExtractError, prelude::*};

/// Image types we accept as uploads.
const SUPPORTED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg"];

/// An uploaded image, decoded into an in-memory bitmap. Immutable once
/// loaded; preprocessing always derives a new bitmap.
#[derive(Debug, Clone)]
pub struct RawImage {
    image: DynamicImage,
    mime_type: String,
}

impl RawImage {
    /// Decode uploaded bytes into a [`RawImage`].
    ///
    /// We sniff the content type first so that a text file renamed to
    /// `scan.png` is rejected as [`ExtractError::UnsupportedFormat`] before
    /// any extraction is attempted, not during it.
    pub fn from_bytes(data: &[u8]) -> Result<RawImage, ExtractError> {
        let mime_type = match infer::get(data) {
            Some(kind) if SUPPORTED_IMAGE_TYPES.contains(&kind.mime_type()) => {
                kind.mime_type().to_owned()
            }
            Some(kind) => {
                return Err(ExtractError::UnsupportedFormat(format!(
                    "{} is not one of {}",
                    kind.mime_type(),
                    SUPPORTED_IMAGE_TYPES.join(", "),
                )));
            }
            None => {
                return Err(ExtractError::UnsupportedFormat(
                    "could not determine content type".to_owned(),
                ));
            }
        };
        let image = image::load_from_memory(data)
            .map_err(|err| ExtractError::UnsupportedFormat(err.to_string()))?;
        debug!(
            mime_type = %mime_type,
            width = image.width(),
            height = image.height(),
            "Decoded uploaded image"
        );
        Ok(RawImage { image, mime_type })
    }

    /// The decoded bitmap.
    pub fn bitmap(&self) -> &DynamicImage {
        &self.image
    }

    /// The sniffed content type of the original upload.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

/// Encode a bitmap as PNG, for engine handoff and previews.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .context("cannot encode image as PNG")?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use image::RgbImage;

    use super::*;

    #[test]
    fn test_png_round_trip() {
        let bitmap = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            4,
            3,
            image::Rgb([10, 20, 30]),
        ));
        let png = encode_png(&bitmap).unwrap();
        let raw = RawImage::from_bytes(&png).unwrap();
        assert_eq!(raw.mime_type(), "image/png");
        assert_eq!(raw.bitmap().width(), 4);
        assert_eq!(raw.bitmap().height(), 3);
    }

    #[test]
    fn test_non_image_bytes_are_rejected() {
        let err = RawImage::from_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_unsupported_image_type_is_rejected() {
        // A minimal GIF header. Recognizable, but not PNG/JPEG.
        let err = RawImage::from_bytes(b"GIF89a\x01\x00\x01\x00\x00\x00\x00")
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(_)));
    }
}
