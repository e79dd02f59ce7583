//! Image preprocessing ahead of recognition.
//!
//! Noisy scans OCR badly. The two knobs we offer are the classic ones:
//! grayscale conversion and fixed-cutoff binarization. Both are pure
//! transforms over the decoded bitmap; the original upload is never touched.

use clap::{ArgAction, Args};
use image::DynamicImage;
use serde::Deserialize;

/// User-selected preprocessing options. Supplied fresh for every pipeline
/// run; never persisted.
#[derive(Args, Clone, Debug, Deserialize)]
#[serde(default, rename_all = "snake_case", deny_unknown_fields)]
pub struct PreprocessConfig {
    /// Convert the image to grayscale before recognition. On by default;
    /// pass `--no-grayscale` to keep the original colors.
    #[clap(
        long = "no-grayscale",
        action = ArgAction::SetFalse,
        default_value_t = true
    )]
    pub grayscale: bool,

    /// Binarize the image: every pixel becomes pure black or pure white,
    /// split at the threshold value.
    #[clap(long)]
    pub threshold: bool,

    /// Cutoff for `--threshold`, in `0..=255`. Pixels strictly brighter than
    /// this become white.
    #[clap(long, default_value = "128")]
    pub threshold_value: u8,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        PreprocessConfig {
            grayscale: true,
            threshold: false,
            threshold_value: 128,
        }
    }
}

impl PreprocessConfig {
    /// Should the shells preview the processed image instead of the
    /// original? Only when at least one transform is active.
    pub fn wants_preview(&self) -> bool {
        self.grayscale || self.threshold
    }
}

/// Apply the configured transforms, returning a new bitmap.
///
/// Thresholding always converts to grayscale first, even when the grayscale
/// flag is off, so the binarization step sees a single-channel input. With
/// neither flag set, the output is pixel-identical to the input.
pub fn process(image: &DynamicImage, config: &PreprocessConfig) -> DynamicImage {
    if config.threshold {
        let mut gray = image.to_luma8();
        for pixel in gray.pixels_mut() {
            pixel.0[0] = if pixel.0[0] > config.threshold_value {
                u8::MAX
            } else {
                u8::MIN
            };
        }
        DynamicImage::ImageLuma8(gray)
    } else if config.grayscale {
        DynamicImage::ImageLuma8(image.to_luma8())
    } else {
        image.clone()
    }
}

#[cfg(test)]
mod tests {
    use image::RgbImage;

    use super::*;

    /// A small image with a mix of dark and bright pixels.
    fn sample_image() -> DynamicImage {
        let mut rgb = RgbImage::new(4, 2);
        for (x, _y, pixel) in rgb.enumerate_pixels_mut() {
            let value = (x * 70) as u8;
            *pixel = image::Rgb([value, value / 2, value.saturating_add(40)]);
        }
        DynamicImage::ImageRgb8(rgb)
    }

    #[test]
    fn test_no_transforms_is_identity() {
        let input = sample_image();
        let config = PreprocessConfig {
            grayscale: false,
            threshold: false,
            threshold_value: 128,
        };
        let output = process(&input, &config);
        assert_eq!(output.color(), input.color());
        assert_eq!(output.as_bytes(), input.as_bytes());
    }

    #[test]
    fn test_grayscale_produces_single_channel() {
        let config = PreprocessConfig {
            grayscale: true,
            threshold: false,
            threshold_value: 128,
        };
        let output = process(&sample_image(), &config);
        assert!(output.as_luma8().is_some());
    }

    #[test]
    fn test_threshold_output_is_pure_black_and_white() {
        // The grayscale flag must not matter: thresholding converts first.
        for grayscale in [false, true] {
            let config = PreprocessConfig {
                grayscale,
                threshold: true,
                threshold_value: 100,
            };
            let output = process(&sample_image(), &config);
            let gray = output.as_luma8().expect("thresholded image is luma");
            assert!(gray.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        }
    }

    #[test]
    fn test_threshold_cutoff_is_strict() {
        let flat = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
            2,
            2,
            image::Luma([128]),
        ));
        let mut config = PreprocessConfig {
            grayscale: false,
            threshold: true,
            threshold_value: 128,
        };
        // 128 is not strictly greater than 128, so everything goes black.
        let output = process(&flat, &config);
        assert!(output.as_luma8().unwrap().pixels().all(|p| p.0[0] == 0));

        config.threshold_value = 127;
        let output = process(&flat, &config);
        assert!(output.as_luma8().unwrap().pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn test_defaults_match_the_ui_surface() {
        let config = PreprocessConfig::default();
        assert!(config.grayscale);
        assert!(!config.threshold);
        assert_eq!(config.threshold_value, 128);
        assert!(config.wants_preview());
    }
}
