//! Tesseract adapter for the `Ocr` seam.
//!
//! Runs the configured command as `<cmd> stdin stdout -l <lang> [tsv]`,
//! feeding the image on stdin. Plain output is the recognized text; `tsv`
//! output is one row per layout element, of which level 5 rows are words.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use serde::Deserialize;
use tabsplit_receipt::{Ocr, OcrError, Word};

/// Tesseract's word level in TSV output.
const WORD_LEVEL: i32 = 5;

pub struct TesseractOcr {
    command: String,
    language: String,
}

impl TesseractOcr {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
        }
    }

    fn locate(&self) -> Result<PathBuf, OcrError> {
        which::which(&self.command).map_err(|_| {
            OcrError::Unavailable(format!("{} not found on PATH", self.command))
        })
    }

    fn run(&self, image: &[u8], extra: &[&str]) -> Result<String, OcrError> {
        let program = self.locate()?;
        log::debug!("running {} ({} bytes, lang {})", program.display(), image.len(), self.language);

        let mut child = Command::new(&program)
            .args(["stdin", "stdout", "-l", &self.language])
            .args(extra)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| OcrError::Failed(format!("failed to run {}: {}", self.command, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(image)
                .map_err(|e| OcrError::Failed(format!("failed to send image: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| OcrError::Failed(format!("failed to read {} output: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Failed(format!(
                "{} failed (exit {}): {}",
                self.command,
                output.status.code().unwrap_or(-1),
                stderr.trim(),
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Ocr for TesseractOcr {
    fn name(&self) -> &str {
        &self.command
    }

    fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        self.run(image, &[])
    }

    fn recognize_words(&self, image: &[u8]) -> Result<Vec<Word>, OcrError> {
        let tsv = self.run(image, &["tsv"])?;
        parse_tsv(&tsv)
    }
}

#[derive(Debug, Deserialize)]
struct TsvRow {
    level: i32,
    left: i32,
    top: i32,
    width: i32,
    height: i32,
    conf: f32,
    text: Option<String>,
}

/// Words from Tesseract TSV. Non-word rows, empty text and rows with a
/// negative confidence (layout blocks) are dropped.
pub(crate) fn parse_tsv(tsv: &str) -> Result<Vec<Word>, OcrError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .quoting(false)
        .flexible(true)
        .from_reader(tsv.as_bytes());

    let mut words = Vec::new();
    for row in reader.deserialize::<TsvRow>() {
        let row = row.map_err(|e| OcrError::Failed(format!("bad TSV from OCR: {}", e)))?;
        if row.level != WORD_LEVEL || row.conf < 0.0 {
            continue;
        }
        let Some(text) = row.text.filter(|t| !t.trim().is_empty()) else {
            continue;
        };
        words.push(Word::new(text, row.left, row.top, row.width, row.height));
    }
    Ok(words)
}
