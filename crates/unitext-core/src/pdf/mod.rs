pub mod poppler;

use crate::error::UnitextError;

pub use poppler::PopplerBackend;

/// Rectangle in PDF layout points, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BBox {
    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    /// `[x0, top, x1, bottom]` rounded to whole points.
    pub fn coordinates(&self) -> [i64; 4] {
        [
            self.x_min.round() as i64,
            self.y_min.round() as i64,
            self.x_max.round() as i64,
            self.y_max.round() as i64,
        ]
    }
}

/// Trait for PDF backends.
pub trait PdfBackend: Send + Sync {
    /// Open a document. Temporary resources live as long as the returned handle.
    fn open<'a>(&'a self, pdf_bytes: &[u8]) -> Result<Box<dyn PdfDocument + 'a>, UnitextError>;

    /// Name of this backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// An opened PDF. Pages are numbered from 1.
pub trait PdfDocument {
    fn page_count(&self) -> usize;

    /// The page's text layer, possibly empty.
    fn page_text(&self, page: usize) -> Result<String, UnitextError>;

    /// Placements of raster images on the page, in content order.
    fn page_images(&self, page: usize) -> Result<Vec<BBox>, UnitextError>;

    /// Render the whole page to PNG bytes.
    fn render_page(&self, page: usize, dpi: u32) -> Result<Vec<u8>, UnitextError>;

    /// Render only `bbox` of the page to PNG bytes.
    fn render_region(&self, page: usize, bbox: &BBox, dpi: u32) -> Result<Vec<u8>, UnitextError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_geometry() {
        let b = BBox {
            x_min: 72.4,
            y_min: 100.0,
            x_max: 272.6,
            y_max: 149.5,
        };
        assert!((b.width() - 200.2).abs() < 1e-3);
        assert!((b.height() - 49.5).abs() < 1e-3);
        assert_eq!(b.coordinates(), [72, 100, 273, 150]);
    }
}
