//! OCR seam.
//!
//! Recognition itself is external; implementations wrap whatever engine is
//! available. A failing engine never reaches the parser: callers get empty
//! text plus the failure so they can tell the user nothing was extracted.

use std::fmt;

use crate::table::Word;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrError {
    /// Engine not installed or not reachable.
    Unavailable(String),
    /// Engine ran and failed.
    Failed(String),
    /// Engine cannot produce this kind of output.
    Unsupported(String),
    /// No image bytes were supplied.
    EmptyImage,
}

impl fmt::Display for OcrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "OCR engine unavailable: {msg}"),
            Self::Failed(msg) => write!(f, "OCR failed: {msg}"),
            Self::Unsupported(msg) => write!(f, "OCR output not supported: {msg}"),
            Self::EmptyImage => write!(f, "no image data"),
        }
    }
}

impl std::error::Error for OcrError {}

/// `text ← OCR(image)`.
pub trait Ocr {
    fn name(&self) -> &str;

    fn recognize(&self, image: &[u8]) -> Result<String, OcrError>;

    /// Word boxes for the table strategy. Engines without layout output keep
    /// the default.
    fn recognize_words(&self, _image: &[u8]) -> Result<Vec<Word>, OcrError> {
        Err(OcrError::Unsupported(format!("{} does not report word boxes", self.name())))
    }
}

/// Result of an OCR attempt that never fails outright.
#[derive(Debug, Clone, Default)]
pub struct OcrOutput<T> {
    pub value: T,
    pub failure: Option<OcrError>,
}

impl<T> OcrOutput<T> {
    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

pub type OcrText = OcrOutput<String>;
pub type OcrWords = OcrOutput<Vec<Word>>;

/// Run OCR, substituting empty text on failure.
pub fn extract_text(ocr: &dyn Ocr, image: &[u8]) -> OcrText {
    guarded(ocr, image, |o, img| o.recognize(img))
}

/// Run word-level OCR, substituting no words on failure.
pub fn extract_words(ocr: &dyn Ocr, image: &[u8]) -> OcrWords {
    guarded(ocr, image, |o, img| o.recognize_words(img))
}

fn guarded<T: Default>(
    ocr: &dyn Ocr,
    image: &[u8],
    run: impl FnOnce(&dyn Ocr, &[u8]) -> Result<T, OcrError>,
) -> OcrOutput<T> {
    let result = if image.is_empty() {
        Err(OcrError::EmptyImage)
    } else {
        run(ocr, image)
    };
    match result {
        Ok(value) => OcrOutput { value, failure: None },
        Err(err) => {
            log::warn!("{}: {err}; continuing with no text", ocr.name());
            OcrOutput {
                value: T::default(),
                failure: Some(err),
            }
        }
    }
}
