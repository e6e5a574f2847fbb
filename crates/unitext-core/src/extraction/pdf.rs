use tracing::{debug, warn};

use crate::config::PdfConfig;
use crate::error::UnitextError;
use crate::extraction::ExtractStrategy;
use crate::model::{ExtractedUnit, Location};
use crate::ocr::{read_image, OcrEngine};
use crate::pdf::{PdfBackend, PdfDocument};

/// Per-page native text with OCR fallback.
///
/// A page whose text layer holds at least `native_text_min_chars` characters
/// (after trimming) is emitted as-is, followed by OCR of its embedded images.
/// Any other page is rendered whole and OCR'd.
pub struct PdfExtraction<'a> {
    backend: &'a dyn PdfBackend,
    ocr: &'a dyn OcrEngine,
    settings: &'a PdfConfig,
}

impl<'a> PdfExtraction<'a> {
    pub fn new(backend: &'a dyn PdfBackend, ocr: &'a dyn OcrEngine, settings: &'a PdfConfig) -> Self {
        PdfExtraction {
            backend,
            ocr,
            settings,
        }
    }

    fn is_native_text(&self, text: &str) -> bool {
        text.trim().chars().count() >= self.settings.native_text_min_chars
    }

    fn native_page(
        &self,
        doc: &dyn PdfDocument,
        page: usize,
        text: &str,
        out: &mut Vec<ExtractedUnit>,
    ) {
        out.extend(ExtractedUnit::new(text, format!("page_{page}"), Location::page(page)));

        if !self.settings.embedded_image_ocr {
            return;
        }

        let images = match doc.page_images(page) {
            Ok(images) => images,
            Err(e) => {
                warn!("page {}: could not list embedded images: {}", page, e);
                return;
            }
        };

        let min = self.settings.min_image_size;
        for (i, bbox) in images.iter().enumerate() {
            let index = i + 1;
            if bbox.width() < min || bbox.height() < min {
                debug!(
                    "page {} image {}: {:.0}x{:.0} below {} pt, skipped",
                    page,
                    index,
                    bbox.width(),
                    bbox.height(),
                    min
                );
                continue;
            }

            let recognized = doc
                .render_region(page, bbox, self.settings.render_dpi)
                .and_then(|png| read_image(self.ocr, &png));
            match recognized {
                Ok(text) => out.extend(ExtractedUnit::from_image(
                    &text,
                    format!("page_{page}_img_{index}"),
                    Location::PixelBox {
                        number: page,
                        coordinates: Some(bbox.coordinates()),
                    },
                )),
                Err(e) => warn!("page {} image {}: OCR failed: {}", page, index, e),
            }
        }
    }

    fn scanned_page(
        &self,
        doc: &dyn PdfDocument,
        page: usize,
        out: &mut Vec<ExtractedUnit>,
    ) -> Result<(), UnitextError> {
        let png = doc.render_page(page, self.settings.render_dpi)?;
        let text = read_image(self.ocr, &png)?;
        match ExtractedUnit::new(&text, format!("page_{page}_full_ocr"), Location::page(page)) {
            Some(unit) => out.push(unit),
            None => debug!("page {}: OCR found no text", page),
        }
        Ok(())
    }
}

impl ExtractStrategy for PdfExtraction<'_> {
    fn extract(&self, bytes: &[u8], filename: &str) -> Result<Vec<ExtractedUnit>, UnitextError> {
        let doc = self.backend.open(bytes)?;
        let page_count = doc.page_count();
        debug!(
            "{}: {} page(s) via {}",
            filename,
            page_count,
            self.backend.backend_name()
        );

        let mut units = Vec::new();
        for page in 1..=page_count {
            let text = doc.page_text(page)?;
            if self.is_native_text(&text) {
                self.native_page(&*doc, page, &text, &mut units);
            } else {
                debug!("{} page {}: no usable text layer, running OCR", filename, page);
                self.scanned_page(&*doc, page, &mut units)?;
            }
        }
        Ok(units)
    }
}
