use std::path::PathBuf;

use crate::model::FileType;

#[derive(Debug, thiserror::Error)]
pub enum UnitextError {
    #[error("unreadable file '{filename}': {reason}")]
    UnreadableInput { filename: String, reason: String },

    #[error("Unsupported format for '{filename}'. Supported types: {}", FileType::supported_list())]
    UnsupportedType { filename: String },

    #[error("Maximum {max} files allowed per request, got {count}")]
    TooManyFiles { count: usize, max: usize },

    #[error("Extraction failed for {filename}: {source}")]
    Extraction {
        filename: String,
        #[source]
        source: Box<UnitextError>,
    },

    #[error("failed to parse document: {0}")]
    Parse(String),

    #[error("failed to decode image: {0}")]
    ImageDecode(String),

    #[error("tesseract not found ({0}). Install tesseract-ocr or set ocr.tesseract_path in the config")]
    OcrEngineNotFound(String),

    #[error("tesseract failed with exit code {code}: {stderr}")]
    OcrFailed { code: i32, stderr: String },

    #[error("{tool} not found. Install poppler: brew install poppler (macOS) or apt install poppler-utils (Linux)")]
    PopplerNotFound { tool: String },

    #[error("{tool} failed with exit code {code}: {stderr}")]
    PopplerFailed {
        tool: String,
        code: i32,
        stderr: String,
    },

    #[error("failed to load config from {path}: {reason}")]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("invalid config: {0}")]
    ConfigInvalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl UnitextError {
    /// The upload this error belongs to, for per-file errors.
    pub fn filename(&self) -> Option<&str> {
        match self {
            UnitextError::UnreadableInput { filename, .. }
            | UnitextError::UnsupportedType { filename }
            | UnitextError::Extraction { filename, .. } => Some(filename),
            _ => None,
        }
    }

    /// True for errors caused by the uploaded file rather than the host.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            UnitextError::UnreadableInput { .. }
                | UnitextError::UnsupportedType { .. }
                | UnitextError::TooManyFiles { .. }
                | UnitextError::Extraction { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_message_lists_supported_types() {
        let err = UnitextError::UnsupportedType {
            filename: "virus.exe".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Unsupported format"));
        assert!(msg.contains("Supported types: pdf, docx, xlsx, csv, txt, png, jpg, html"));
        assert_eq!(err.filename(), Some("virus.exe"));
    }

    #[test]
    fn extraction_error_keeps_cause() {
        let err = UnitextError::Extraction {
            filename: "bad.pdf".into(),
            source: Box::new(UnitextError::Parse("Parser Error".into())),
        };
        assert_eq!(
            err.to_string(),
            "Extraction failed for bad.pdf: failed to parse document: Parser Error"
        );
        let cause = std::error::Error::source(&err).map(|e| e.to_string());
        assert_eq!(cause.as_deref(), Some("failed to parse document: Parser Error"));
    }
}
