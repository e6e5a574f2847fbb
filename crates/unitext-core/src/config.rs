use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::UnitextError;

/// Batch ceiling applied when no config overrides it.
pub const DEFAULT_MAX_FILES: usize = 5;

/// Tunables for the extraction core. Every field has a default, so an empty
/// JSON object is a valid config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub pdf: PdfConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfConfig {
    /// Minimum trimmed length for a page's text layer to count as native text.
    #[serde(default = "default_native_text_min_chars")]
    pub native_text_min_chars: usize,

    /// Embedded images narrower or shorter than this (layout points) are skipped.
    #[serde(default = "default_min_image_size")]
    pub min_image_size: f32,

    /// Resolution used when rendering pages or image regions for OCR.
    #[serde(default = "default_render_dpi")]
    pub render_dpi: u32,

    /// OCR embedded images on native-text pages.
    #[serde(default = "default_true")]
    pub embedded_image_ocr: bool,

    /// Directory holding pdftotext/pdftohtml/pdftoppm. Uses PATH when unset.
    #[serde(default)]
    pub poppler_dir: Option<PathBuf>,
}

impl Default for PdfConfig {
    fn default() -> Self {
        PdfConfig {
            native_text_min_chars: default_native_text_min_chars(),
            min_image_size: default_min_image_size(),
            render_dpi: default_render_dpi(),
            embedded_image_ocr: true,
            poppler_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Explicit tesseract binary. Searched on PATH when unset.
    #[serde(default)]
    pub tesseract_path: Option<PathBuf>,

    /// Passed to tesseract as `--tessdata-dir`.
    #[serde(default)]
    pub tessdata_dir: Option<PathBuf>,

    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        OcrConfig {
            tesseract_path: None,
            tessdata_dir: None,
            language: default_language(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            max_files: DEFAULT_MAX_FILES,
        }
    }
}

fn default_native_text_min_chars() -> usize {
    10
}

fn default_min_image_size() -> f32 {
    50.0
}

fn default_render_dpi() -> u32 {
    300
}

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_max_files() -> usize {
    DEFAULT_MAX_FILES
}

/// Load a config from a JSON file.
pub fn load_config(path: &Path) -> Result<ExtractionConfig, UnitextError> {
    let content = std::fs::read_to_string(path).map_err(|e| UnitextError::ConfigLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let config: ExtractionConfig =
        serde_json::from_str(&content).map_err(|e| UnitextError::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    validate_config(&config)?;
    Ok(config)
}

/// Parse a config from a JSON string (no file path context).
pub fn parse_config_str(json: &str) -> Result<ExtractionConfig, UnitextError> {
    let config: ExtractionConfig = serde_json::from_str(json)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &ExtractionConfig) -> Result<(), UnitextError> {
    if config.pdf.render_dpi == 0 {
        return Err(UnitextError::ConfigInvalid(
            "pdf.render_dpi must be greater than 0".into(),
        ));
    }

    if !config.pdf.min_image_size.is_finite() || config.pdf.min_image_size < 0.0 {
        return Err(UnitextError::ConfigInvalid(format!(
            "pdf.min_image_size must be a non-negative number, got {}",
            config.pdf.min_image_size
        )));
    }

    if config.batch.max_files == 0 {
        return Err(UnitextError::ConfigInvalid(
            "batch.max_files must be at least 1".into(),
        ));
    }

    if config.ocr.language.trim().is_empty() {
        return Err(UnitextError::ConfigInvalid(
            "ocr.language must not be empty".into(),
        ));
    }

    Ok(())
}
