//! The `extract` subcommand: one-shot extraction to files.

use clap::Args;

use crate::{
    engine::engine_for_name,
    imageio::{self, RawImage},
    pipeline,
    prelude::*,
    preprocess::{self, PreprocessConfig},
    session::ExtractionSession,
};

/// Options for the `extract` subcommand.
#[derive(Args, Debug)]
pub struct ExtractOpts {
    /// The image to extract text from (PNG or JPEG).
    pub image: PathBuf,

    #[clap(flatten)]
    pub preprocess: PreprocessConfig,

    /// The OCR engine to use.
    #[clap(long, default_value = "tesseract")]
    pub engine: String,

    /// Where to write the extracted text.
    #[clap(long, default_value = "extracted_text.txt")]
    pub text_output: PathBuf,

    /// Where to write the searchable PDF.
    #[clap(long, default_value = "extracted_document.pdf")]
    pub pdf_output: PathBuf,

    /// Also write the image the engine actually saw (the preprocessed
    /// image, or the original when no preprocessing is active).
    #[clap(long)]
    pub save_preview: Option<PathBuf>,
}

/// The `extract` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_extract(opts: &ExtractOpts) -> Result<()> {
    let data = tokio::fs::read(&opts.image)
        .await
        .with_context(|| format!("cannot read {:?}", opts.image))?;
    let image = RawImage::from_bytes(&data)?;
    let engine = engine_for_name(&opts.engine)?;

    let mut session = ExtractionSession::new();
    let report =
        pipeline::run(&mut session, &image, &opts.preprocess, engine.as_ref()).await?;

    if let Some(preview_path) = &opts.save_preview {
        let bitmap = if opts.preprocess.wants_preview() {
            preprocess::process(image.bitmap(), &opts.preprocess)
        } else {
            image.bitmap().clone()
        };
        tokio::fs::write(preview_path, imageio::encode_png(&bitmap)?)
            .await
            .with_context(|| format!("cannot write {:?}", preview_path))?;
        info!(path = ?preview_path, "Wrote preview image");
    }

    tokio::fs::write(&opts.text_output, session.extracted_text())
        .await
        .with_context(|| format!("cannot write {:?}", opts.text_output))?;
    let pdf_bytes = session
        .pdf_bytes()
        .context("extraction succeeded but produced no PDF")?;
    tokio::fs::write(&opts.pdf_output, pdf_bytes)
        .await
        .with_context(|| format!("cannot write {:?}", opts.pdf_output))?;
    info!(
        text = ?opts.text_output,
        pdf = ?opts.pdf_output,
        "Wrote extraction outputs"
    );

    println!(
        "Confidence: {:.2}% ({})",
        report.average_confidence, report.band,
    );
    Ok(())
}
