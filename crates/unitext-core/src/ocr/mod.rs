pub mod preprocess;
pub mod tesseract;

use image::GrayImage;

use crate::error::UnitextError;

pub use preprocess::preprocess;
pub use tesseract::TesseractOcr;

/// Trait for optical character recognition backends.
pub trait OcrEngine: Send + Sync {
    /// Recognize the text in a preprocessed image. May return an empty string.
    fn recognize(&self, image: &GrayImage) -> Result<String, UnitextError>;

    /// Name of this OCR backend (for diagnostics).
    fn engine_name(&self) -> &str;
}

/// Preprocess raw image bytes and OCR them, returning trimmed text.
pub fn read_image(engine: &dyn OcrEngine, image_bytes: &[u8]) -> Result<String, UnitextError> {
    let binarized = preprocess(image_bytes)?;
    let text = engine.recognize(&binarized)?;
    Ok(text.trim().to_string())
}

/// Stand-in engine used when no OCR binary could be resolved at startup.
///
/// Every call fails with the startup error, so extractions that need OCR
/// report it while the rest keep working.
pub struct UnavailableOcr {
    reason: String,
}

impl UnavailableOcr {
    pub fn new(reason: impl Into<String>) -> Self {
        UnavailableOcr {
            reason: reason.into(),
        }
    }
}

impl OcrEngine for UnavailableOcr {
    fn recognize(&self, _image: &GrayImage) -> Result<String, UnitextError> {
        Err(UnitextError::OcrEngineNotFound(self.reason.clone()))
    }

    fn engine_name(&self) -> &str {
        "unavailable"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Luma};
    use std::io::Cursor;

    struct Echo;

    impl OcrEngine for Echo {
        fn recognize(&self, image: &GrayImage) -> Result<String, UnitextError> {
            Ok(format!("  {}x{}\n\n", image.width(), image.height()))
        }

        fn engine_name(&self) -> &str {
            "echo"
        }
    }

    fn gray_png(w: u32, h: u32) -> Vec<u8> {
        let img = GrayImage::from_pixel(w, h, Luma([200]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn read_image_trims_engine_output() {
        assert_eq!(read_image(&Echo, &gray_png(7, 3)).unwrap(), "7x3");
    }

    #[test]
    fn unavailable_engine_reports_reason() {
        let engine = UnavailableOcr::new("tesseract: not on PATH");
        let err = read_image(&engine, &gray_png(2, 2)).unwrap_err();
        assert!(err.to_string().contains("not on PATH"));
    }
}
