use std::collections::HashMap;
use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::UnitextError;
use crate::extraction::ExtractStrategy;
use crate::model::{ExtractedUnit, Location};
use crate::ocr::{read_image, OcrEngine};

const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";

/// Paths (local names) below the root that hold body content.
const BODY: &[&str] = &["document", "body"];
const TABLE: &[&str] = &["document", "body", "tbl"];
const ROW: &[&str] = &["document", "body", "tbl", "tr"];
const CELL: &[&str] = &["document", "body", "tbl", "tr", "tc"];

/// DOCX body paragraphs (with OCR of their inline images), then body tables.
pub struct WordExtraction<'a> {
    ocr: &'a dyn OcrEngine,
}

impl<'a> WordExtraction<'a> {
    pub fn new(ocr: &'a dyn OcrEngine) -> Self {
        WordExtraction { ocr }
    }

    fn inline_image_text(
        &self,
        archive: &mut ZipArchive<Cursor<&[u8]>>,
        rels: &HashMap<String, String>,
        rel_id: &str,
    ) -> Result<String, UnitextError> {
        let part = rels
            .get(rel_id)
            .ok_or_else(|| UnitextError::Parse(format!("no relationship '{rel_id}'")))?;
        let bytes = read_part(archive, part)?;
        read_image(self.ocr, &bytes)
    }
}

impl ExtractStrategy for WordExtraction<'_> {
    fn extract(&self, bytes: &[u8], filename: &str) -> Result<Vec<ExtractedUnit>, UnitextError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| UnitextError::Parse(format!("not a DOCX container: {e}")))?;

        let document = String::from_utf8(read_part(&mut archive, DOCUMENT_PART)?)
            .map_err(|e| UnitextError::Parse(format!("{DOCUMENT_PART}: {e}")))?;
        let body = parse_document(&document)?;
        debug!(
            "{}: {} paragraph(s), {} table(s)",
            filename,
            body.paragraphs.len(),
            body.tables.len()
        );

        let has_images = body.paragraphs.iter().any(|p| !p.images.is_empty());
        let rels = if has_images {
            match read_part(&mut archive, DOCUMENT_RELS_PART)
                .and_then(|xml| parse_relationships(&String::from_utf8_lossy(&xml)))
            {
                Ok(rels) => rels,
                Err(e) => {
                    warn!("{}: image relationships unavailable: {}", filename, e);
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        let mut units = Vec::new();
        for para in &body.paragraphs {
            units.extend(ExtractedUnit::new(
                &para.text,
                "paragraph",
                Location::row(para.index),
            ));

            for rel_id in &para.images {
                match self.inline_image_text(&mut archive, &rels, rel_id) {
                    Ok(text) => units.extend(ExtractedUnit::from_image(
                        &text,
                        format!("inline_image_para_{}", para.index),
                        Location::row(para.index),
                    )),
                    Err(e) => warn!(
                        "{}: paragraph {} image {}: {}",
                        filename, para.index, rel_id, e
                    ),
                }
            }
        }

        for (t, table) in body.tables.iter().enumerate() {
            for (r, row) in table.iter().enumerate() {
                let line = row
                    .iter()
                    .map(|cell| cell.trim())
                    .filter(|cell| !cell.is_empty())
                    .collect::<Vec<_>>()
                    .join(" | ");
                units.extend(ExtractedUnit::new(
                    &line,
                    format!("table_{}", t + 1),
                    Location::row(r + 1),
                ));
            }
        }

        Ok(units)
    }
}

fn read_part(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<Vec<u8>, UnitextError> {
    let mut part = archive
        .by_name(name)
        .map_err(|e| UnitextError::Parse(format!("{name}: {e}")))?;
    let mut buf = Vec::new();
    part.read_to_end(&mut buf)?;
    Ok(buf)
}

#[derive(Debug, Default)]
struct Paragraph {
    /// 1-based position among all body paragraphs, empty ones included.
    index: usize,
    text: String,
    /// Relationship ids of images drawn in this paragraph.
    images: Vec<String>,
}

/// Rows of cells; each cell is its paragraphs joined by newlines.
type Table = Vec<Vec<String>>;

#[derive(Debug, Default)]
struct Body {
    paragraphs: Vec<Paragraph>,
    tables: Vec<Table>,
}

enum Open {
    Body(Paragraph),
    Cell(String),
}

/// Paragraph currently being collected and the stack depth of its `<w:p>`.
struct OpenParagraph {
    depth: usize,
    open: Open,
}

#[derive(Default)]
struct BodyParser {
    stack: Vec<String>,
    body: Body,
    paragraph_count: usize,
    paragraph: Option<OpenParagraph>,
    table: Option<Table>,
    cell_paragraphs: Vec<String>,
}

impl BodyParser {
    fn at(&self, path: &[&str]) -> bool {
        self.stack.len() == path.len() && self.stack.iter().zip(path).all(|(a, b)| a == b)
    }

    /// Path below the open paragraph, if one is open.
    fn in_paragraph(&self) -> Option<&[String]> {
        self.paragraph
            .as_ref()
            .map(|p| &self.stack[p.depth.min(self.stack.len())..])
    }

    fn in_run(&self) -> bool {
        match self.in_paragraph() {
            Some(rel) => {
                matches!(rel, [r] if r == "r")
                    || matches!(rel, [h, r] if h == "hyperlink" && r == "r")
            }
            None => false,
        }
    }

    fn open(&mut self, name: &str, e: &BytesStart) {
        if name == "p" && self.at(BODY) {
            self.paragraph_count += 1;
            self.paragraph = Some(OpenParagraph {
                depth: self.stack.len() + 1,
                open: Open::Body(Paragraph {
                    index: self.paragraph_count,
                    ..Paragraph::default()
                }),
            });
        } else if name == "p" && self.table.is_some() && self.at(CELL) {
            self.paragraph = Some(OpenParagraph {
                depth: self.stack.len() + 1,
                open: Open::Cell(String::new()),
            });
        } else if name == "tbl" && self.at(BODY) {
            self.table = Some(Vec::new());
        } else if name == "tr" && self.at(TABLE) {
            if let Some(table) = self.table.as_mut() {
                table.push(Vec::new());
            }
        } else if name == "tc" && self.at(ROW) {
            self.cell_paragraphs.clear();
        } else {
            self.leaf(name, e);
        }
    }

    fn leaf(&mut self, name: &str, e: &BytesStart) {
        let in_run = self.in_run();
        let Some(current) = self.paragraph.as_mut() else {
            return;
        };
        match (name, &mut current.open) {
            ("tab", Open::Body(p)) if in_run => p.text.push('\t'),
            ("tab", Open::Cell(s)) if in_run => s.push('\t'),
            ("br" | "cr", Open::Body(p)) if in_run => p.text.push('\n'),
            ("br" | "cr", Open::Cell(s)) if in_run => s.push('\n'),
            ("blip", Open::Body(p)) => {
                let embed = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.local_name().as_ref() == b"embed")
                    .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()));
                if let Some(id) = embed {
                    p.images.push(id);
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        let capture = match self.in_paragraph() {
            Some(rel) => {
                matches!(rel, [r, t] if r == "r" && t == "t")
                    || matches!(rel, [h, r, t] if h == "hyperlink" && r == "r" && t == "t")
            }
            None => false,
        };
        if !capture {
            return;
        }
        match self.paragraph.as_mut().map(|p| &mut p.open) {
            Some(Open::Body(p)) => p.text.push_str(text),
            Some(Open::Cell(s)) => s.push_str(text),
            None => {}
        }
    }

    /// Called after `name` has been popped off the stack.
    fn close(&mut self, name: &str) {
        if self
            .paragraph
            .as_ref()
            .is_some_and(|p| self.stack.len() < p.depth)
        {
            if let Some(done) = self.paragraph.take() {
                match done.open {
                    Open::Body(p) => self.body.paragraphs.push(p),
                    Open::Cell(s) => self.cell_paragraphs.push(s),
                }
            }
            return;
        }

        if name == "tc" && self.at(ROW) {
            let cell = self.cell_paragraphs.join("\n");
            self.cell_paragraphs.clear();
            if let Some(row) = self.table.as_mut().and_then(|t| t.last_mut()) {
                row.push(cell);
            }
        } else if name == "tbl" && self.at(BODY) {
            if let Some(table) = self.table.take() {
                self.body.tables.push(table);
            }
        }
    }

    /// Self-closing element: open and close in one step.
    fn empty(&mut self, name: &str, e: &BytesStart) {
        self.open(name, e);
        self.close(name);
    }
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Collect body paragraphs and body tables from `word/document.xml`.
fn parse_document(xml: &str) -> Result<Body, UnitextError> {
    let mut reader = Reader::from_str(xml);
    let mut parser = BodyParser::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                parser.open(&name, &e);
                parser.stack.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e);
                parser.empty(&name, &e);
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| UnitextError::Parse(format!("{DOCUMENT_PART}: {e}")))?;
                parser.text(&text);
            }
            Ok(Event::End(_)) => {
                if let Some(name) = parser.stack.pop() {
                    parser.close(&name);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(UnitextError::Parse(format!(
                    "{DOCUMENT_PART} at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
        }
    }

    Ok(parser.body)
}

/// Map relationship ids to archive part names, skipping external targets.
fn parse_relationships(xml: &str) -> Result<HashMap<String, String>, UnitextError> {
    let mut reader = Reader::from_str(xml);
    let mut rels = HashMap::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut id = None;
                let mut target = None;
                let mut external = false;
                for attr in e.attributes().flatten() {
                    let value = attr
                        .unescape_value()
                        .map_err(|e| UnitextError::Parse(format!("{DOCUMENT_RELS_PART}: {e}")))?
                        .into_owned();
                    match attr.key.local_name().as_ref() {
                        b"Id" => id = Some(value),
                        b"Target" => target = Some(value),
                        b"TargetMode" => external = value.eq_ignore_ascii_case("external"),
                        _ => {}
                    }
                }
                match (id, target) {
                    (Some(id), Some(target)) if !external => {
                        rels.insert(id, resolve_target(&target));
                    }
                    (Some(id), _) if external => debug!("relationship {} is external, skipped", id),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(UnitextError::Parse(format!("{DOCUMENT_RELS_PART}: {e}")));
            }
        }
    }
    Ok(rels)
}

/// Resolve a relationship target against the `word/` directory.
fn resolve_target(target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("word/{target}"),
    };
    let mut parts: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main""#;

    fn doc(body: &str) -> String {
        format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document {W}><w:body>{body}<w:sectPr/></w:body></w:document>"#)
    }

    #[test]
    fn paragraphs_keep_original_positions() {
        let xml = doc(concat!(
            r#"<w:p><w:r><w:t>First</w:t></w:r></w:p>"#,
            r#"<w:p/>"#,
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr></w:p>"#,
            r#"<w:p><w:r><w:t xml:space="preserve">Fourth </w:t></w:r><w:hyperlink r:id="rId9"><w:r><w:t>link</w:t></w:r></w:hyperlink></w:p>"#,
        ));
        let body = parse_document(&xml).unwrap();
        let got: Vec<_> = body
            .paragraphs
            .iter()
            .map(|p| (p.index, p.text.as_str()))
            .collect();
        assert_eq!(got, vec![(1, "First"), (2, ""), (3, ""), (4, "Fourth link")]);
    }

    #[test]
    fn tabs_and_breaks() {
        let xml = doc(r#"<w:p><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c</w:t></w:r></w:p>"#);
        let body = parse_document(&xml).unwrap();
        assert_eq!(body.paragraphs[0].text, "a\tb\nc");
    }

    #[test]
    fn tables_are_separate_from_paragraphs() {
        let xml = doc(concat!(
            r#"<w:p><w:r><w:t>Intro</w:t></w:r></w:p>"#,
            r#"<w:tbl><w:tblPr/>"#,
            r#"<w:tr><w:tc><w:p><w:r><w:t>Name</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Qty</w:t></w:r></w:p></w:tc></w:tr>"#,
            r#"<w:tr><w:tc><w:p/></w:tc><w:tc><w:p><w:r><w:t>two</w:t></w:r></w:p><w:p><w:r><w:t>lines</w:t></w:r></w:p></w:tc></w:tr>"#,
            r#"</w:tbl>"#,
            r#"<w:p><w:r><w:t>Outro</w:t></w:r></w:p>"#,
        ));
        let body = parse_document(&xml).unwrap();
        assert_eq!(body.paragraphs.len(), 2);
        assert_eq!(body.paragraphs[1].index, 2);
        assert_eq!(body.tables.len(), 1);
        assert_eq!(body.tables[0][0], vec!["Name", "Qty"]);
        assert_eq!(body.tables[0][1], vec!["", "two\nlines"]);
    }

    #[test]
    fn blip_ids_collected_per_paragraph() {
        let xml = doc(concat!(
            r#"<w:p><w:r><w:drawing><wp:inline xmlns:wp="x"><a:graphic><a:graphicData>"#,
            r#"<pic:pic xmlns:pic="y"><pic:blipFill><a:blip r:embed="rId4"/></pic:blipFill></pic:pic>"#,
            r#"</a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#,
        ));
        let body = parse_document(&xml).unwrap();
        assert_eq!(body.paragraphs[0].images, vec!["rId4"]);
        assert_eq!(body.paragraphs[0].text, "");
    }

    #[test]
    fn relationships_resolve_and_skip_external() {
        let xml = r#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId4" Type="http://x/image" Target="media/image1.png"/>
  <Relationship Id="rId5" Type="http://x/image" Target="/word/media/image2.jpeg"/>
  <Relationship Id="rId6" Type="http://x/image" Target="../customXml/item.png"/>
  <Relationship Id="rId9" Type="http://x/hyperlink" Target="https://example.com" TargetMode="External"/>
</Relationships>"#;
        let rels = parse_relationships(xml).unwrap();
        assert_eq!(rels["rId4"], "word/media/image1.png");
        assert_eq!(rels["rId5"], "word/media/image2.jpeg");
        assert_eq!(rels["rId6"], "customXml/item.png");
        assert!(!rels.contains_key("rId9"));
    }

    #[test]
    fn not_a_zip_is_an_error() {
        struct NoOcr;
        impl OcrEngine for NoOcr {
            fn recognize(&self, _: &::image::GrayImage) -> Result<String, UnitextError> {
                Ok(String::new())
            }
            fn engine_name(&self) -> &str {
                "none"
            }
        }
        assert!(WordExtraction::new(&NoOcr).extract(b"plain text", "x.docx").is_err());
    }
}
