pub mod config;
pub mod detect;
pub mod dispatch;
pub mod error;
pub mod extraction;
pub mod model;
pub mod ocr;
pub mod pdf;

pub use config::ExtractionConfig;
pub use detect::TypeDetector;
pub use dispatch::Extractor;
pub use error::UnitextError;
pub use model::{ExtractedUnit, ExtractionResult, FileType, Location};

use ocr::OcrEngine;
use pdf::PdfBackend;

/// One-shot entry point: extract a single file with default settings.
///
/// Long-lived callers should build an [`Extractor`] once and reuse it.
pub fn extract(
    bytes: &[u8],
    filename: &str,
    ocr: Box<dyn OcrEngine>,
    pdf: Box<dyn PdfBackend>,
) -> Result<ExtractionResult, UnitextError> {
    Extractor::new(ExtractionConfig::default(), ocr, pdf).extract(bytes, filename)
}
