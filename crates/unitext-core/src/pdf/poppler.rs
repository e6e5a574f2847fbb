use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output};

use quick_xml::events::Event;
use quick_xml::Reader;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::UnitextError;
use crate::pdf::{BBox, PdfBackend, PdfDocument};

const PDFTOTEXT: &str = "pdftotext";
const PDFTOHTML: &str = "pdftohtml";
const PDFTOPPM: &str = "pdftoppm";

/// PDF backend driving poppler-utils.
///
/// `pdftotext` supplies the text layer, `pdftohtml -xml` the image placements
/// and `pdftoppm` the rasterization.
#[derive(Debug, Clone, Default)]
pub struct PopplerBackend {
    bin_dir: Option<PathBuf>,
}

impl PopplerBackend {
    pub fn new() -> Self {
        PopplerBackend { bin_dir: None }
    }

    /// Look the tools up in `dir` instead of PATH.
    pub fn with_bin_dir(dir: Option<PathBuf>) -> Self {
        PopplerBackend { bin_dir: dir }
    }

    /// Check which poppler tools can be started, as `(tool, available)` pairs.
    pub fn tool_status(&self) -> Vec<(&'static str, bool)> {
        [PDFTOTEXT, PDFTOHTML, PDFTOPPM]
            .into_iter()
            .map(|tool| {
                // poppler prints its version on stderr and some builds exit non-zero for -v.
                let ok = Command::new(self.tool_path(tool))
                    .arg("-v")
                    .output()
                    .map(|o| o.status.success() || !o.stderr.is_empty())
                    .unwrap_or(false);
                (tool, ok)
            })
            .collect()
    }

    pub fn is_available(&self) -> bool {
        self.tool_status().iter().all(|(_, ok)| *ok)
    }

    fn tool_path(&self, tool: &str) -> PathBuf {
        match &self.bin_dir {
            Some(dir) => dir.join(tool),
            None => PathBuf::from(tool),
        }
    }

    fn run(&self, tool: &str, cmd: &mut Command) -> Result<Output, UnitextError> {
        let output = cmd.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                UnitextError::PopplerNotFound {
                    tool: tool.to_string(),
                }
            } else {
                UnitextError::Io(e)
            }
        })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(UnitextError::PopplerFailed {
                tool: tool.to_string(),
                code,
                stderr,
            });
        }
        Ok(output)
    }
}

impl PdfBackend for PopplerBackend {
    fn open<'a>(&'a self, pdf_bytes: &[u8]) -> Result<Box<dyn PdfDocument + 'a>, UnitextError> {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile()?;
        file.write_all(pdf_bytes)?;
        file.flush()?;

        let output = self.run(
            PDFTOTEXT,
            Command::new(self.tool_path(PDFTOTEXT))
                .arg("-enc")
                .arg("UTF-8")
                .arg(file.path())
                .arg("-"),
        )?;
        let pages = split_pages(&String::from_utf8_lossy(&output.stdout));
        debug!("pdftotext: {} page(s)", pages.len());

        Ok(Box::new(PopplerDocument {
            backend: self,
            file,
            pages,
        }))
    }

    fn backend_name(&self) -> &str {
        "poppler"
    }
}

struct PopplerDocument<'a> {
    backend: &'a PopplerBackend,
    file: NamedTempFile,
    pages: Vec<String>,
}

impl PopplerDocument<'_> {
    fn check_page(&self, page: usize) -> Result<(), UnitextError> {
        if page == 0 || page > self.pages.len() {
            return Err(UnitextError::Parse(format!(
                "page {page} out of range (document has {})",
                self.pages.len()
            )));
        }
        Ok(())
    }

    fn rasterize(
        &self,
        page: usize,
        dpi: u32,
        crop: Option<[u32; 4]>,
    ) -> Result<Vec<u8>, UnitextError> {
        self.check_page(page)?;
        let out_dir = tempfile::tempdir()?;
        let prefix = out_dir.path().join("render");
        let page_arg = page.to_string();

        let mut cmd = Command::new(self.backend.tool_path(PDFTOPPM));
        cmd.arg("-f")
            .arg(&page_arg)
            .arg("-l")
            .arg(&page_arg)
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-png")
            .arg("-singlefile");
        if let Some([x, y, w, h]) = crop {
            cmd.arg("-x")
                .arg(x.to_string())
                .arg("-y")
                .arg(y.to_string())
                .arg("-W")
                .arg(w.to_string())
                .arg("-H")
                .arg(h.to_string());
        }
        cmd.arg(self.file.path()).arg(&prefix);
        self.backend.run(PDFTOPPM, &mut cmd)?;

        Ok(std::fs::read(prefix.with_extension("png"))?)
    }
}

impl PdfDocument for PopplerDocument<'_> {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, page: usize) -> Result<String, UnitextError> {
        self.check_page(page)?;
        Ok(self.pages[page - 1].clone())
    }

    fn page_images(&self, page: usize) -> Result<Vec<BBox>, UnitextError> {
        self.check_page(page)?;
        let out_dir = tempfile::tempdir()?;
        let prefix = out_dir.path().join("layout");
        let page_arg = page.to_string();

        self.backend.run(
            PDFTOHTML,
            Command::new(self.backend.tool_path(PDFTOHTML))
                .arg("-xml")
                .arg("-zoom")
                .arg("1")
                .arg("-q")
                .arg("-nodrm")
                .arg("-f")
                .arg(&page_arg)
                .arg("-l")
                .arg(&page_arg)
                .arg(self.file.path())
                .arg(&prefix),
        )?;

        let xml = std::fs::read_to_string(prefix.with_extension("xml"))?;
        parse_image_xml(&xml)
    }

    fn render_page(&self, page: usize, dpi: u32) -> Result<Vec<u8>, UnitextError> {
        self.rasterize(page, dpi, None)
    }

    fn render_region(&self, page: usize, bbox: &BBox, dpi: u32) -> Result<Vec<u8>, UnitextError> {
        self.rasterize(page, dpi, Some(crop_pixels(bbox, dpi)))
    }
}

/// Split pdftotext output into per-page text. Every page ends with a form feed.
fn split_pages(text: &str) -> Vec<String> {
    let mut pages: Vec<String> = text.split('\x0c').map(str::to_string).collect();
    if text.ends_with('\x0c') {
        pages.pop();
    }
    pages
}

/// Convert a point-space box to a `[x, y, w, h]` pixel crop at `dpi`.
fn crop_pixels(bbox: &BBox, dpi: u32) -> [u32; 4] {
    let scale = dpi as f32 / 72.0;
    let px = |v: f32| (v.max(0.0) * scale).round() as u32;
    [
        px(bbox.x_min),
        px(bbox.y_min),
        px(bbox.width()).max(1),
        px(bbox.height()).max(1),
    ]
}

/// Collect `<image top left width height>` elements from pdftohtml XML output.
fn parse_image_xml(xml: &str) -> Result<Vec<BBox>, UnitextError> {
    let mut reader = Reader::from_str(xml);
    // pdftohtml can emit mis-nested <b>/<i> inside <text>.
    reader.config_mut().check_end_names = false;

    let mut boxes = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"image" => {
                let (mut top, mut left, mut width, mut height) = (None, None, None, None);
                for attr in e.attributes().flatten() {
                    let value = attr
                        .unescape_value()
                        .ok()
                        .and_then(|v| v.trim().parse::<f32>().ok());
                    match attr.key.as_ref() {
                        b"top" => top = value,
                        b"left" => left = value,
                        b"width" => width = value,
                        b"height" => height = value,
                        _ => {}
                    }
                }
                match (top, left, width, height) {
                    (Some(top), Some(left), Some(width), Some(height)) => boxes.push(BBox {
                        x_min: left,
                        y_min: top,
                        x_max: left + width,
                        y_max: top + height,
                    }),
                    _ => debug!("pdftohtml image element without full geometry, ignored"),
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(UnitextError::Parse(format!(
                    "pdftohtml XML at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
        }
    }
    Ok(boxes)
}
