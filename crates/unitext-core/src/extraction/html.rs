use scraper::{Html, Node};

use crate::error::UnitextError;
use crate::extraction::ExtractStrategy;
use crate::model::{ExtractedUnit, Location};

/// Elements whose text never reaches the output.
const STRIPPED: &[&str] = &["script", "style", "meta", "noscript"];

/// Visible text of an HTML page, one unit per non-empty line.
pub struct HtmlExtraction;

impl ExtractStrategy for HtmlExtraction {
    fn extract(&self, bytes: &[u8], _filename: &str) -> Result<Vec<ExtractedUnit>, UnitextError> {
        let source = String::from_utf8_lossy(bytes);
        let document = Html::parse_document(&source);

        let mut segments: Vec<&str> = Vec::new();
        for node in document.tree.root().descendants() {
            let Node::Text(text) = node.value() else {
                continue;
            };
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|el| STRIPPED.contains(&el.name()))
            });
            if !hidden {
                segments.push(text);
            }
        }

        let joined = segments.join("\n");
        Ok(joined
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .filter_map(|(i, line)| ExtractedUnit::new(line, "html_body", Location::row(i + 1)))
            .collect())
    }
}
