//! CLI test cases.
//!
//! Anything that actually runs recognition needs a local `tesseract`
//! install, so those cases are `#[ignore]`d by default and run explicitly on
//! machines that have it.

use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;

/// Create a new `Command` with our binary.
fn cmd() -> Command {
    Command::cargo_bin("textlift").unwrap()
}

#[test]
fn test_help() {
    cmd().arg("--help").assert().success();
}

#[test]
fn test_version() {
    cmd().arg("--version").assert().success();
}

#[test]
fn test_extract_missing_file_fails() {
    cmd()
        .arg("extract")
        .arg("no-such-image.png")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no-such-image.png"));
}

#[test]
fn test_extract_rejects_non_image_input() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("not-an-image.png");
    std::fs::write(&path, "just some text pretending to be a PNG").unwrap();

    cmd()
        .arg("extract")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported image format"));
}

#[test]
fn test_extract_rejects_unknown_engine() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.png");
    std::fs::write(&path, white_png()).unwrap();

    cmd()
        .arg("extract")
        .arg(&path)
        .arg("--engine")
        .arg("sorcery")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown OCR engine"));
}

#[test]
fn test_missing_engine_binary_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.png");
    std::fs::write(&path, white_png()).unwrap();

    cmd()
        .env("TESSERACT_CMD", "tesseract-does-not-exist")
        .arg("extract")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not installed"));
}

#[test]
#[ignore = "Needs tesseract installed"]
fn test_extract_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.png");
    let text_output = dir.path().join("extracted_text.txt");
    let pdf_output = dir.path().join("extracted_document.pdf");
    std::fs::write(&input, white_png()).unwrap();

    cmd()
        .arg("extract")
        .arg(&input)
        .arg("--threshold")
        .arg("--text-output")
        .arg(&text_output)
        .arg("--pdf-output")
        .arg(&pdf_output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Confidence:"));

    assert!(text_output.exists());
    let pdf = std::fs::read(&pdf_output).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}

/// A small blank PNG, encoded on the fly.
fn white_png() -> Vec<u8> {
    use std::io::Cursor;
    let image = image::DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
        64,
        64,
        image::Luma([255]),
    ));
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, image::ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}
