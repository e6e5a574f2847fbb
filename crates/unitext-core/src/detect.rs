use std::io::Cursor;

use calamine::Reader;
use tracing::{debug, warn};

use crate::error::UnitextError;
use crate::model::FileType;

pub const MIME_OCTET_STREAM: &str = "application/octet-stream";
pub const MIME_EMPTY: &str = "application/x-empty";
pub const MIME_ZIP: &str = "application/zip";
pub const MIME_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const MIME_PLAIN: &str = "text/plain";
pub const MIME_HTML: &str = "text/html";
pub const MIME_XLS: &str = "application/vnd.ms-excel";
pub const MIME_OLE: &str = "application/x-ole-storage";

/// How many leading bytes are inspected when classifying text.
const TEXT_SNIFF_LEN: usize = 8192;

/// Markup openers that mark a text file as HTML, matched anywhere in the sniff window.
const HTML_OPENERS: &[&str] = &[
    "<!doctype html",
    "<html",
    "<head",
    "<body",
    "<title",
    "<script",
    "<style",
];

/// Content inspection backend: bytes in, MIME-like string out.
pub trait ContentSniffer: Send + Sync {
    fn sniff(&self, bytes: &[u8]) -> Result<String, UnitextError>;

    /// Name of this sniffer (for diagnostics).
    fn sniffer_name(&self) -> &str;
}

/// Magic-number sniffer covering the formats the extractors understand.
pub struct MagicSniffer;

impl ContentSniffer for MagicSniffer {
    fn sniff(&self, bytes: &[u8]) -> Result<String, UnitextError> {
        Ok(sniff_magic(bytes).to_string())
    }

    fn sniffer_name(&self) -> &str {
        "magic"
    }
}

fn sniff_magic(bytes: &[u8]) -> &'static str {
    if bytes.is_empty() {
        return MIME_EMPTY;
    }

    if bytes.starts_with(b"%PDF") {
        return "application/pdf";
    }
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return "image/png";
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg";
    }
    if bytes.starts_with(b"GIF8") {
        return "image/gif";
    }
    if bytes.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || bytes.starts_with(&[0x4D, 0x4D, 0x00, 0x2A]) {
        return "image/tiff";
    }
    if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) || bytes.starts_with(&[0x50, 0x4B, 0x05, 0x06]) {
        return sniff_zip(bytes);
    }
    if bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]) {
        return sniff_ole(bytes);
    }

    match as_text(bytes) {
        Some(text) => sniff_text(text),
        None => MIME_OCTET_STREAM,
    }
}

/// Office Open XML documents are ZIP containers; tell them apart by part names.
fn sniff_zip(bytes: &[u8]) -> &'static str {
    let archive = match zip::ZipArchive::new(Cursor::new(bytes)) {
        Ok(a) => a,
        Err(e) => {
            debug!("ZIP signature but unreadable archive: {}", e);
            return MIME_ZIP;
        }
    };

    if archive.file_names().any(|n| n == "word/document.xml") {
        return MIME_DOCX;
    }
    if archive.file_names().any(|n| n == "xl/workbook.xml") {
        return MIME_XLSX;
    }
    MIME_ZIP
}

/// Compound documents host legacy Office formats; only workbooks are told apart.
fn sniff_ole(bytes: &[u8]) -> &'static str {
    match calamine::Xls::new(Cursor::new(bytes)) {
        Ok(_) => MIME_XLS,
        Err(e) => {
            debug!("OLE container is not a workbook: {}", e);
            MIME_OLE
        }
    }
}

/// Decode the sniffing window as UTF-8, tolerating a code point cut at the end.
fn as_text(bytes: &[u8]) -> Option<&str> {
    let window = &bytes[..bytes.len().min(TEXT_SNIFF_LEN)];
    if window.contains(&0) {
        return None;
    }
    match std::str::from_utf8(window) {
        Ok(s) => Some(s),
        Err(e) if e.error_len().is_none() && window.len() == TEXT_SNIFF_LEN => {
            std::str::from_utf8(&window[..e.valid_up_to()]).ok()
        }
        Err(_) => None,
    }
}

fn sniff_text(text: &str) -> &'static str {
    let lower = text.to_ascii_lowercase();
    if HTML_OPENERS.iter().any(|opener| lower.contains(opener)) {
        return MIME_HTML;
    }

    if looks_like_csv(text) {
        return "text/csv";
    }

    MIME_PLAIN
}

/// At least two lines, each with the same non-zero number of commas.
fn looks_like_csv(text: &str) -> bool {
    let counts: Vec<usize> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(5)
        .map(|l| l.matches(',').count())
        .collect();

    counts.len() >= 2 && counts[0] > 0 && counts.iter().all(|&c| c == counts[0])
}

/// How a type tag was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMethod {
    Content,
    Extension,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub file_type: FileType,
    pub method: DetectionMethod,
    /// What the sniffer reported, if it ran successfully.
    pub sniffed: Option<String>,
}

/// Resolves a file's type from its bytes, falling back to its extension.
pub struct TypeDetector {
    sniffer: Box<dyn ContentSniffer>,
}

impl TypeDetector {
    pub fn new() -> Self {
        Self::with_sniffer(Box::new(MagicSniffer))
    }

    pub fn with_sniffer(sniffer: Box<dyn ContentSniffer>) -> Self {
        TypeDetector { sniffer }
    }

    /// Resolve the type of an upload. `None` means unsupported; this never fails.
    pub fn detect(&self, bytes: &[u8], filename: &str) -> Option<Detection> {
        let sniffed = match self.sniffer.sniff(bytes) {
            Ok(mime) => Some(mime),
            Err(e) => {
                warn!(
                    "{} sniffer failed on '{}': {}",
                    self.sniffer.sniffer_name(),
                    filename,
                    e
                );
                None
            }
        };

        // Plain text is a weak verdict: markup the sniffer missed still routes by extension.
        if sniffed.as_deref() == Some(MIME_PLAIN)
            && FileType::from_extension(filename) == Some(FileType::Html)
        {
            debug!("{}: plain text with HTML extension, resolved html", filename);
            return Some(Detection {
                file_type: FileType::Html,
                method: DetectionMethod::Extension,
                sniffed,
            });
        }

        if let Some(file_type) = sniffed.as_deref().and_then(FileType::from_mime) {
            debug!("{}: sniffed {:?} -> {}", filename, sniffed, file_type);
            return Some(Detection {
                file_type,
                method: DetectionMethod::Content,
                sniffed,
            });
        }

        let file_type = FileType::from_extension(filename)?;
        debug!(
            "{}: sniffed {:?}, resolved {} from extension",
            filename, sniffed, file_type
        );
        Some(Detection {
            file_type,
            method: DetectionMethod::Extension,
            sniffed,
        })
    }
}

impl Default for TypeDetector {
    fn default() -> Self {
        Self::new()
    }
}
