//! Reducing per-token confidences into a single display score.

use std::fmt;

use serde::Serialize;

use crate::engine::OcrToken;

/// Average the confidences of recognized tokens, in `0.0..=100.0`.
///
/// Tokens reporting `-1` carry no confidence (whitespace, layout rows) and
/// are excluded. If nothing remains, the score is `0.0`.
pub fn average(tokens: &[OcrToken]) -> f64 {
    let scored = tokens
        .iter()
        .filter(|token| token.confidence >= 0)
        .map(|token| f64::from(token.confidence))
        .collect::<Vec<_>>();
    if scored.is_empty() {
        0.0
    } else {
        scored.iter().sum::<f64>() / scored.len() as f64
    }
}

/// Qualitative confidence band, for display only. Never stored; always
/// recomputed from the score.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    High,
    Medium,
    Low,
}

impl Band {
    /// Classify a score. Both cut points are strict: exactly 80 is still
    /// medium, exactly 50 is still low.
    pub fn of(score: f64) -> Band {
        if score > 80.0 {
            Band::High
        } else if score > 50.0 {
            Band::Medium
        } else {
            Band::Low
        }
    }

    /// The color a UI should render this band in.
    pub fn color(self) -> &'static str {
        match self {
            Band::High => "green",
            Band::Medium => "orange",
            Band::Low => "red",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Band::High => write!(f, "high"),
            Band::Medium => write!(f, "medium"),
            Band::Low => write!(f, "low"),
        }
    }
}
