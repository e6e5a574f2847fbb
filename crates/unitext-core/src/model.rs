use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::UnitextError;
use crate::extraction::{Strategy, TableMode};

/// Canonical file-type tag resolved by the type detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Docx,
    Xlsx,
    Csv,
    Txt,
    Png,
    Jpg,
    Html,
}

impl FileType {
    pub const ALL: [FileType; 8] = [
        FileType::Pdf,
        FileType::Docx,
        FileType::Xlsx,
        FileType::Csv,
        FileType::Txt,
        FileType::Png,
        FileType::Jpg,
        FileType::Html,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Docx => "docx",
            FileType::Xlsx => "xlsx",
            FileType::Csv => "csv",
            FileType::Txt => "txt",
            FileType::Png => "png",
            FileType::Jpg => "jpg",
            FileType::Html => "html",
        }
    }

    /// Comma-separated list of every supported tag, for user-facing messages.
    pub fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Map a sniffed MIME type to a supported tag.
    pub fn from_mime(mime: &str) -> Option<FileType> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        match essence.to_ascii_lowercase().as_str() {
            "application/pdf" => Some(FileType::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(FileType::Docx)
            }
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            | "application/vnd.ms-excel" => Some(FileType::Xlsx),
            "text/csv" => Some(FileType::Csv),
            "text/plain" => Some(FileType::Txt),
            "image/png" => Some(FileType::Png),
            "image/jpeg" => Some(FileType::Jpg),
            "text/html" => Some(FileType::Html),
            _ => None,
        }
    }

    /// Map a filename's extension (case-insensitive) to a supported tag.
    pub fn from_extension(filename: &str) -> Option<FileType> {
        let (_, ext) = filename.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(FileType::Pdf),
            "docx" => Some(FileType::Docx),
            "xlsx" => Some(FileType::Xlsx),
            "csv" => Some(FileType::Csv),
            "txt" => Some(FileType::Txt),
            "png" => Some(FileType::Png),
            "jpg" | "jpeg" => Some(FileType::Jpg),
            "html" | "htm" => Some(FileType::Html),
            _ => None,
        }
    }

    /// The extraction strategy that handles this type.
    pub fn strategy(&self) -> Strategy {
        match self {
            FileType::Pdf => Strategy::Pdf,
            FileType::Docx => Strategy::Word,
            FileType::Xlsx => Strategy::Table(TableMode::Workbook),
            FileType::Csv | FileType::Txt => Strategy::Table(TableMode::Csv),
            FileType::Png | FileType::Jpg => Strategy::Image,
            FileType::Html => Strategy::Html,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Where in the source document a unit came from.
///
/// The variant decides which positional fields exist, so a page location can
/// never carry a sheet name and a row location never carries coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Location {
    Page {
        number: usize,
    },
    Row {
        number: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sheet: Option<String>,
    },
    PixelBox {
        number: usize,
        /// `[x0, top, x1, bottom]` in the source's layout units.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        coordinates: Option<[i64; 4]>,
    },
}

impl Location {
    pub fn page(number: usize) -> Self {
        Location::Page { number }
    }

    pub fn row(number: usize) -> Self {
        Location::Row {
            number,
            sheet: None,
        }
    }

    pub fn sheet_row(number: usize, sheet: impl Into<String>) -> Self {
        Location::Row {
            number,
            sheet: Some(sheet.into()),
        }
    }

    pub fn pixel_box(number: usize) -> Self {
        Location::PixelBox {
            number,
            coordinates: None,
        }
    }

    pub fn number(&self) -> usize {
        match self {
            Location::Page { number }
            | Location::Row { number, .. }
            | Location::PixelBox { number, .. } => *number,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Location::Page { .. } => "page",
            Location::Row { .. } => "row",
            Location::PixelBox { .. } => "pixel_box",
        }
    }
}

/// The atomic unit of extracted text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedUnit {
    pub text: String,
    pub source: String,
    pub location: Location,
}

impl ExtractedUnit {
    /// Build a unit from raw text, trimming it. Returns `None` for blank text.
    pub fn new(text: &str, source: impl Into<String>, location: Location) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(ExtractedUnit {
            text: text.to_string(),
            source: source.into(),
            location,
        })
    }

    /// Build a unit for text recognized inside an embedded image.
    pub fn from_image(ocr_text: &str, source: impl Into<String>, location: Location) -> Option<Self> {
        let ocr_text = ocr_text.trim();
        if ocr_text.is_empty() {
            return None;
        }
        Some(ExtractedUnit {
            text: format!("[Image Extraction]: {ocr_text}"),
            source: source.into(),
            location,
        })
    }
}

/// Outcome of extracting one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub filename: String,
    pub file_type: FileType,
    /// Wall-clock time of the extraction call, rounded to 0.01 ms.
    pub processing_time_ms: f64,
    /// Units in document reading order.
    pub content: Vec<ExtractedUnit>,
}

impl ExtractionResult {
    /// All unit texts joined by blank lines.
    pub fn plain_text(&self) -> String {
        self.content
            .iter()
            .map(|u| u.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// One entry of a serialized batch: either a result or the file's error.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Extracted(ExtractionResult),
    Failed { filename: String, error: String },
}

impl BatchEntry {
    pub fn from_outcome(outcome: Result<ExtractionResult, UnitextError>) -> Self {
        match outcome {
            Ok(result) => BatchEntry::Extracted(result),
            Err(e) => BatchEntry::Failed {
                filename: e.filename().unwrap_or_default().to_string(),
                error: e.to_string(),
            },
        }
    }
}

/// Serializable view of a whole batch, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub results: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn new(outcomes: Vec<Result<ExtractionResult, UnitextError>>) -> Self {
        BatchReport {
            results: outcomes.into_iter().map(BatchEntry::from_outcome).collect(),
        }
    }

    pub fn failed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|e| matches!(e, BatchEntry::Failed { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_table_is_case_insensitive() {
        assert_eq!(FileType::from_extension("REPORT.DOCX"), Some(FileType::Docx));
        assert_eq!(FileType::from_extension("scan.JPEG"), Some(FileType::Jpg));
        assert_eq!(FileType::from_extension("index.htm"), Some(FileType::Html));
        assert_eq!(FileType::from_extension("notes.txt"), Some(FileType::Txt));
        assert_eq!(FileType::from_extension("virus.exe"), None);
        assert_eq!(FileType::from_extension("no_extension"), None);
    }

    #[test]
    fn csv_and_txt_share_table_strategy() {
        assert_eq!(FileType::Csv.strategy(), Strategy::Table(TableMode::Csv));
        assert_eq!(FileType::Txt.strategy(), Strategy::Table(TableMode::Csv));
        assert_eq!(FileType::Xlsx.strategy(), Strategy::Table(TableMode::Workbook));
        assert_eq!(FileType::Jpg.strategy(), Strategy::Image);
    }

    #[test]
    fn mime_parameters_are_ignored() {
        assert_eq!(FileType::from_mime("text/html; charset=utf-8"), Some(FileType::Html));
        assert_eq!(FileType::from_mime("application/octet-stream"), None);
    }

    #[test]
    fn location_serializes_only_meaningful_fields() {
        let json = serde_json::to_value(Location::page(3)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "page", "number": 3}));

        let json = serde_json::to_value(Location::sheet_row(2, "Sales")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "row", "number": 2, "sheet": "Sales"})
        );

        let json = serde_json::to_value(Location::pixel_box(1)).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "pixel_box", "number": 1}));
    }

    #[test]
    fn blank_units_are_rejected() {
        assert!(ExtractedUnit::new("   \n", "paragraph", Location::row(1)).is_none());
        let unit = ExtractedUnit::new("  hello ", "paragraph", Location::row(1)).unwrap();
        assert_eq!(unit.text, "hello");
    }

    #[test]
    fn image_units_are_prefixed() {
        let unit = ExtractedUnit::from_image(" Chart 1 \n", "page_1_img_1", Location::pixel_box(1))
            .unwrap();
        assert_eq!(unit.text, "[Image Extraction]: Chart 1");
        assert!(ExtractedUnit::from_image("  ", "x", Location::pixel_box(1)).is_none());
    }

    #[test]
    fn failed_batch_entries_carry_filename() {
        let report = BatchReport::new(vec![Err(UnitextError::UnsupportedType {
            filename: "virus.exe".into(),
        })]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["results"][0]["filename"], "virus.exe");
        assert_eq!(report.failed_count(), 1);
    }
}
