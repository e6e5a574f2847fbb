use crate::error::UnitextError;
use crate::extraction::ExtractStrategy;
use crate::model::{ExtractedUnit, Location};
use crate::ocr::{read_image, OcrEngine};

/// Whole-image OCR for standalone PNG/JPEG uploads.
pub struct ImageExtraction<'a> {
    ocr: &'a dyn OcrEngine,
}

impl<'a> ImageExtraction<'a> {
    pub fn new(ocr: &'a dyn OcrEngine) -> Self {
        ImageExtraction { ocr }
    }
}

impl ExtractStrategy for ImageExtraction<'_> {
    fn extract(&self, bytes: &[u8], _filename: &str) -> Result<Vec<ExtractedUnit>, UnitextError> {
        let text = read_image(self.ocr, bytes)?;
        Ok(ExtractedUnit::new(&text, "ocr_engine", Location::pixel_box(1))
            .into_iter()
            .collect())
    }
}
