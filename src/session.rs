//! Session state: reconciling extracted text with user edits.
//!
//! One [`ExtractionSession`] lives for the duration of one interactive
//! session (one CLI run, one HTTP session key). It owns the current text,
//! the confidence of the last successful extraction, and that extraction's
//! PDF rendering. The text may be overwritten by user edits afterwards; the
//! confidence and the PDF deliberately are not, so they always describe the
//! last thing the engine actually saw.

use serde::Serialize;

/// Where the session currently stands.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No extraction has happened yet.
    Empty,
    /// The text is exactly what the last successful extraction produced.
    Ready,
    /// The user has edited the text since the last successful extraction.
    Edited,
}

/// Mutable state carried across one interactive session.
#[derive(Debug)]
pub struct ExtractionSession {
    state: SessionState,
    extracted_text: String,
    average_confidence: Option<f64>,
    pdf_bytes: Option<Vec<u8>>,
}

impl Default for ExtractionSession {
    fn default() -> Self {
        ExtractionSession {
            state: SessionState::Empty,
            extracted_text: String::new(),
            average_confidence: None,
            pdf_bytes: None,
        }
    }
}

impl ExtractionSession {
    /// A fresh, empty session.
    pub fn new() -> ExtractionSession {
        ExtractionSession::default()
    }

    /// Record a successful extraction.
    ///
    /// All three fields are replaced as one unit. Callers must only call
    /// this once the whole pipeline has succeeded; a failed run leaves the
    /// session exactly as it was.
    pub fn record_extraction(
        &mut self,
        text: String,
        average_confidence: f64,
        pdf_bytes: Vec<u8>,
    ) {
        self.extracted_text = text;
        self.average_confidence = Some(average_confidence);
        self.pdf_bytes = Some(pdf_bytes);
        self.state = SessionState::Ready;
    }

    /// Reconcile an externally edited text value with the stored one.
    ///
    /// Only a mismatch counts as an edit. The confidence and the PDF are
    /// left untouched, so after an edit they describe the pre-edit text.
    /// That staleness is deliberate: there is no way to re-score or
    /// re-render text the engine never saw.
    pub fn reconcile_edit(&mut self, edited_text: &str) {
        if edited_text != self.extracted_text {
            self.extracted_text = edited_text.to_owned();
            self.state = SessionState::Edited;
        }
    }

    /// The current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The current text, including any user edits.
    pub fn extracted_text(&self) -> &str {
        &self.extracted_text
    }

    /// The average confidence of the last successful extraction, if any.
    pub fn average_confidence(&self) -> Option<f64> {
        self.average_confidence
    }

    /// The PDF from the last successful extraction, if any.
    pub fn pdf_bytes(&self) -> Option<&[u8]> {
        self.pdf_bytes.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_empty() {
        let session = ExtractionSession::new();
        assert_eq!(session.state(), SessionState::Empty);
        assert_eq!(session.extracted_text(), "");
        assert_eq!(session.average_confidence(), None);
        assert!(session.pdf_bytes().is_none());
    }

    #[test]
    fn test_extraction_replaces_everything_at_once() {
        let mut session = ExtractionSession::new();
        session.record_extraction("HELLO".to_owned(), 80.0, b"pdf-1".to_vec());
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.extracted_text(), "HELLO");
        assert_eq!(session.average_confidence(), Some(80.0));
        assert_eq!(session.pdf_bytes(), Some(&b"pdf-1"[..]));

        // A later run replaces all three fields again.
        session.reconcile_edit("HELLO WORLD");
        session.record_extraction("BYE".to_owned(), 42.0, b"pdf-2".to_vec());
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.extracted_text(), "BYE");
        assert_eq!(session.average_confidence(), Some(42.0));
        assert_eq!(session.pdf_bytes(), Some(&b"pdf-2"[..]));
    }

    #[test]
    fn test_edits_leave_confidence_and_pdf_stale() {
        let mut session = ExtractionSession::new();
        session.record_extraction("HELLO".to_owned(), 80.0, b"pdf-hello".to_vec());

        session.reconcile_edit("HELLO WORLD");
        assert_eq!(session.state(), SessionState::Edited);
        assert_eq!(session.extracted_text(), "HELLO WORLD");
        // Still describing the "HELLO" extraction, by design.
        assert_eq!(session.average_confidence(), Some(80.0));
        assert_eq!(session.pdf_bytes(), Some(&b"pdf-hello"[..]));
    }

    #[test]
    fn test_matching_edit_is_not_an_edit() {
        let mut session = ExtractionSession::new();
        session.record_extraction("HELLO".to_owned(), 80.0, vec![]);
        session.reconcile_edit("HELLO");
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn test_edit_before_any_extraction() {
        let mut session = ExtractionSession::new();
        session.reconcile_edit("typed by hand");
        assert_eq!(session.state(), SessionState::Edited);
        assert_eq!(session.extracted_text(), "typed by hand");
        assert_eq!(session.average_confidence(), None);
        assert!(session.pdf_bytes().is_none());
    }
}
