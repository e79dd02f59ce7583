//! OCR engine wrapping the `tesseract` CLI tool.

use std::{fs, io};

use image::DynamicImage;
use tempfile::TempDir;
use tokio::process::Command;

use crate::{
    error::ExtractError,
    imageio::encode_png,
    prelude::*,
    process_util::check_for_command_failure,
};

use super::{OcrEngine, OcrToken, Recognition};

/// Environment variable overriding the `tesseract` binary, for nonstandard
/// installs.
const TESSERACT_CMD_VAR: &str = "TESSERACT_CMD";

/// OCR engine invoking the `tesseract` CLI.
pub struct TesseractEngine {
    /// The binary to invoke.
    command: String,
}

impl TesseractEngine {
    /// Create an engine, honoring the `TESSERACT_CMD` override.
    pub fn from_env() -> TesseractEngine {
        let command = std::env::var(TESSERACT_CMD_VAR)
            .unwrap_or_else(|_| "tesseract".to_owned());
        TesseractEngine { command }
    }

    /// Write `image` to a temporary directory as PNG and run `tesseract`
    /// over it with the given output configs (`txt`, `tsv`, `pdf`, ...).
    ///
    /// Returns the temporary directory holding the `output.*` files. The
    /// caller keeps it alive until the outputs have been read.
    async fn invoke(
        &self,
        image: &DynamicImage,
        configs: &[&str],
    ) -> Result<TempDir, ExtractError> {
        let tmpdir = TempDir::with_prefix("textlift")
            .context("cannot create temporary directory")?;
        let input_path = tmpdir.path().join("input.png");
        let png = encode_png(image)?;
        fs::write(&input_path, png).context("cannot write tesseract input file")?;

        let result = Command::new(&self.command)
            .arg(&input_path)
            .arg(tmpdir.path().join("output"))
            .args(configs)
            .output()
            .await;
        let output = match result {
            Ok(output) => output,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(ExtractError::EngineNotFound(self.command.clone()));
            }
            Err(err) => {
                return Err(anyhow::Error::new(err)
                    .context(format!("cannot run {}", self.command))
                    .into());
            }
        };
        check_for_command_failure(&self.command, &output)?;
        Ok(tmpdir)
    }
}

#[async_trait::async_trait]
impl OcrEngine for TesseractEngine {
    #[instrument(level = "debug", skip_all)]
    async fn recognize_with_confidence(
        &self,
        image: &DynamicImage,
    ) -> Result<Recognition, ExtractError> {
        // One invocation produces both outputs, so the text and the token
        // confidences always describe the same recognition pass.
        let tmpdir = self.invoke(image, &["txt", "tsv"]).await?;
        let full_text = fs::read_to_string(tmpdir.path().join("output.txt"))
            .context("cannot read tesseract text output")?;
        let tsv = fs::read_to_string(tmpdir.path().join("output.tsv"))
            .context("cannot read tesseract tsv output")?;
        let tokens = parse_tsv(&tsv)?;
        debug!(
            token_count = tokens.len(),
            text_len = full_text.len(),
            "Recognized text"
        );
        Ok(Recognition { full_text, tokens })
    }

    #[instrument(level = "debug", skip_all)]
    async fn render_to_pdf(
        &self,
        image: &DynamicImage,
    ) -> Result<Vec<u8>, ExtractError> {
        let tmpdir = self.invoke(image, &["pdf"]).await?;
        let pdf_bytes = fs::read(tmpdir.path().join("output.pdf"))
            .context("cannot read tesseract pdf output")?;
        Ok(pdf_bytes)
    }
}

/// Parse tesseract's TSV output into tokens.
///
/// The format has a header row and twelve columns; we only care about `conf`
/// (column 11) and `text` (column 12). Structural rows (page, block, line)
/// report a confidence of `-1` and are kept as-is so the aggregation layer
/// can filter them uniformly.
fn parse_tsv(tsv: &str) -> Result<Vec<OcrToken>> {
    let mut tokens = vec![];
    for (idx, line) in tsv.lines().enumerate().skip(1) {
        if line.is_empty() {
            continue;
        }
        let columns = line.split('\t').collect::<Vec<_>>();
        if columns.len() < 12 {
            return Err(anyhow::anyhow!(
                "malformed tesseract tsv row {}: {:?}",
                idx + 1,
                line,
            ));
        }
        // Newer tesseract releases report fractional confidences.
        let confidence = columns[10]
            .parse::<f64>()
            .with_context(|| {
                format!("bad confidence in tesseract tsv row {}", idx + 1)
            })? as i32;
        tokens.push(OcrToken {
            text: columns[11].to_owned(),
            confidence,
        });
    }
    Ok(tokens)
}
