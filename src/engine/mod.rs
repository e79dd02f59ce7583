//! OCR engine interface.
//!
//! Recognition is delegated entirely to an external engine behind this
//! capability trait, so the orchestration pipeline never knows which backend
//! it is talking to.

use std::sync::Arc;

use image::DynamicImage;

use crate::{error::ExtractError, prelude::*};

pub mod tesseract;

/// One recognized unit of text, usually a word.
#[derive(Clone, Debug, PartialEq)]
pub struct OcrToken {
    /// The recognized text.
    pub text: String,

    /// Engine-reported confidence in `0..=100`, or `-1` when the engine has
    /// no confidence to report (layout rows, whitespace).
    pub confidence: i32,
}

/// The text half of an engine invocation.
#[derive(Clone, Debug)]
pub struct Recognition {
    /// The full recognized text, in reading order.
    pub full_text: String,

    /// Per-token results backing the confidence score.
    pub tokens: Vec<OcrToken>,
}

/// A swappable OCR backend.
///
/// Both operations must be called with the identical processed bitmap within
/// one pipeline run, so the recognized text, the confidence score, and the
/// searchable PDF all describe the same image.
#[async_trait::async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognize text in the image, with per-token confidences.
    async fn recognize_with_confidence(
        &self,
        image: &DynamicImage,
    ) -> Result<Recognition, ExtractError>;

    /// Render the image to a searchable PDF embedding the recognized text.
    async fn render_to_pdf(&self, image: &DynamicImage) -> Result<Vec<u8>, ExtractError>;
}

/// Get the OCR engine with the specified name.
pub fn engine_for_name(name: &str) -> Result<Arc<dyn OcrEngine>> {
    match name {
        "tesseract" => Ok(Arc::new(tesseract::TesseractEngine::from_env())),
        _ => Err(anyhow::anyhow!("unknown OCR engine: {name}")),
    }
}
