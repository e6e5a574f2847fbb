pub mod html;
pub mod image;
pub mod pdf;
pub mod table;
pub mod word;

use crate::error::UnitextError;
use crate::model::ExtractedUnit;

pub use self::html::HtmlExtraction;
pub use self::image::ImageExtraction;
pub use self::pdf::PdfExtraction;
pub use self::table::TableExtraction;
pub use self::word::WordExtraction;

/// Common contract of every per-format extractor.
pub trait ExtractStrategy {
    /// Produce the document's units in reading order.
    fn extract(&self, bytes: &[u8], filename: &str) -> Result<Vec<ExtractedUnit>, UnitextError>;
}

/// The extraction algorithm selected for a file type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Pdf,
    Word,
    Table(TableMode),
    Image,
    Html,
}

/// Input flavour for [`TableExtraction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableMode {
    /// Delimited text: one implicit sheet, no header row.
    Csv,
    /// Spreadsheet workbook: every sheet.
    Workbook,
}
