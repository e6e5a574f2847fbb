use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info};

use crate::config::ExtractionConfig;
use crate::detect::TypeDetector;
use crate::error::UnitextError;
use crate::extraction::{
    ExtractStrategy, HtmlExtraction, ImageExtraction, PdfExtraction, Strategy, TableExtraction,
    WordExtraction,
};
use crate::model::{ExtractedUnit, ExtractionResult};
use crate::ocr::OcrEngine;
use crate::pdf::PdfBackend;

/// Detects each upload's type and runs the matching extraction strategy.
///
/// Holds the engine handles resolved at startup; strategies borrow them per
/// call, so one `Extractor` can serve any number of files or threads.
pub struct Extractor {
    config: ExtractionConfig,
    detector: TypeDetector,
    ocr: Box<dyn OcrEngine>,
    pdf: Box<dyn PdfBackend>,
}

impl Extractor {
    pub fn new(config: ExtractionConfig, ocr: Box<dyn OcrEngine>, pdf: Box<dyn PdfBackend>) -> Self {
        Self::with_detector(config, TypeDetector::new(), ocr, pdf)
    }

    pub fn with_detector(
        config: ExtractionConfig,
        detector: TypeDetector,
        ocr: Box<dyn OcrEngine>,
        pdf: Box<dyn PdfBackend>,
    ) -> Self {
        Extractor {
            config,
            detector,
            ocr,
            pdf,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn detector(&self) -> &TypeDetector {
        &self.detector
    }

    /// Extract one file.
    ///
    /// Fails with `UnsupportedType` when the type cannot be resolved and with
    /// `Extraction` (wrapping the cause) when the strategy fails.
    pub fn extract(&self, bytes: &[u8], filename: &str) -> Result<ExtractionResult, UnitextError> {
        let started = Instant::now();

        let detection = self
            .detector
            .detect(bytes, filename)
            .ok_or_else(|| UnitextError::UnsupportedType {
                filename: filename.to_string(),
            })?;
        let strategy = detection.file_type.strategy();
        debug!(
            "{}: {} via {:?}, strategy {:?}",
            filename, detection.file_type, detection.method, strategy
        );

        let content = self
            .run(strategy, bytes, filename)
            .map_err(|e| UnitextError::Extraction {
                filename: filename.to_string(),
                source: Box::new(e),
            })?;

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        info!("{}: {} unit(s) in {:.2} ms", filename, content.len(), elapsed_ms);

        Ok(ExtractionResult {
            filename: filename.to_string(),
            file_type: detection.file_type,
            processing_time_ms: (elapsed_ms * 100.0).round() / 100.0,
            content,
        })
    }

    fn run(
        &self,
        strategy: Strategy,
        bytes: &[u8],
        filename: &str,
    ) -> Result<Vec<ExtractedUnit>, UnitextError> {
        let ocr = self.ocr.as_ref();
        match strategy {
            Strategy::Pdf => {
                PdfExtraction::new(self.pdf.as_ref(), ocr, &self.config.pdf).extract(bytes, filename)
            }
            Strategy::Word => WordExtraction::new(ocr).extract(bytes, filename),
            Strategy::Table(mode) => TableExtraction::new(mode).extract(bytes, filename),
            Strategy::Image => ImageExtraction::new(ocr).extract(bytes, filename),
            Strategy::Html => HtmlExtraction.extract(bytes, filename),
        }
    }

    /// Extract several in-memory files, in order.
    ///
    /// More than `batch.max_files` inputs fail the whole call before any file
    /// is looked at. Otherwise each file gets its own result, so one bad file
    /// does not hide the others.
    pub fn extract_batch(
        &self,
        files: &[(Vec<u8>, String)],
    ) -> Result<Vec<Result<ExtractionResult, UnitextError>>, UnitextError> {
        self.check_batch_size(files.len())?;
        Ok(files
            .iter()
            .map(|(bytes, filename)| self.extract(bytes, filename))
            .collect())
    }

    /// Like [`Extractor::extract_batch`], reading each file from disk first.
    ///
    /// A file that cannot be read is reported as `UnreadableInput`.
    pub fn extract_paths(
        &self,
        paths: &[PathBuf],
    ) -> Result<Vec<Result<ExtractionResult, UnitextError>>, UnitextError> {
        self.check_batch_size(paths.len())?;
        Ok(paths
            .iter()
            .map(|path| {
                let filename = display_name(path);
                let bytes = std::fs::read(path).map_err(|e| UnitextError::UnreadableInput {
                    filename: filename.clone(),
                    reason: e.to_string(),
                })?;
                self.extract(&bytes, &filename)
            })
            .collect())
    }

    fn check_batch_size(&self, count: usize) -> Result<(), UnitextError> {
        let max = self.config.batch.max_files;
        if count > max {
            return Err(UnitextError::TooManyFiles { count, max });
        }
        Ok(())
    }
}

/// The name an on-disk file is reported under: its final path component.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
