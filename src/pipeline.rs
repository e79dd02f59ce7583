//! The extraction pipeline: preprocess, recognize, aggregate, render.

use serde::Serialize;

use crate::{
    confidence::{self, Band},
    engine::OcrEngine,
    error::ExtractError,
    imageio::RawImage,
    prelude::*,
    preprocess::{self, PreprocessConfig},
    session::ExtractionSession,
};

/// Summary of a successful extraction, for display.
#[derive(Clone, Debug, Serialize)]
pub struct ExtractionReport {
    /// Average confidence over all scored tokens, `0.0..=100.0`.
    pub average_confidence: f64,

    /// Qualitative band for `average_confidence`.
    pub band: Band,

    /// How many scored tokens backed the confidence value.
    pub token_count: usize,
}

/// Run one full extraction and commit the result into `session`.
///
/// This is a single synchronous unit of work: preprocess, recognize,
/// aggregate, render to PDF, then one atomic session update. Both engine
/// calls receive the identical processed bitmap, so the text, the score, and
/// the PDF are mutually consistent. On any failure the session is left
/// untouched.
#[instrument(level = "debug", skip_all)]
pub async fn run(
    session: &mut ExtractionSession,
    image: &RawImage,
    config: &PreprocessConfig,
    engine: &dyn OcrEngine,
) -> Result<ExtractionReport, ExtractError> {
    let processed = preprocess::process(image.bitmap(), config);

    let recognition = engine.recognize_with_confidence(&processed).await?;
    let average_confidence = confidence::average(&recognition.tokens);
    let token_count = recognition
        .tokens
        .iter()
        .filter(|token| token.confidence >= 0)
        .count();
    let pdf_bytes = engine.render_to_pdf(&processed).await?;

    session.record_extraction(recognition.full_text, average_confidence, pdf_bytes);
    info!(
        average_confidence = average_confidence,
        token_count = token_count,
        "Extraction complete"
    );
    Ok(ExtractionReport {
        average_confidence,
        band: Band::of(average_confidence),
        token_count,
    })
}
