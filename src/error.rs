//! Error kinds surfaced to users.
//!
//! Everything that can go wrong between "bytes uploaded" and "text extracted"
//! collapses into one of three kinds, so shells can decide how to present a
//! failure without string-matching on messages.

/// A user-visible extraction failure.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The OCR engine binary is not installed or could not be started.
    #[error("OCR engine `{0}` is not installed or could not be found")]
    EngineNotFound(String),

    /// The uploaded bytes are not a decodable PNG or JPEG image.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Anything else that failed during preprocessing, recognition, or PDF
    /// rendering. Carries the underlying cause description.
    #[error("extraction failed: {0:#}")]
    Pipeline(#[from] anyhow::Error),
}

impl ExtractError {
    /// The HTTP status a web shell should answer with.
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            ExtractError::EngineNotFound(_) => StatusCode::SERVICE_UNAVAILABLE,
            ExtractError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ExtractError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
