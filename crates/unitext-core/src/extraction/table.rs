use std::io::Cursor;

use calamine::{Data, DataType, Reader};
use tracing::{debug, warn};

use crate::error::UnitextError;
use crate::extraction::{ExtractStrategy, TableMode};
use crate::model::{ExtractedUnit, Location};

/// Source label for rows of delimited text.
const CSV_SOURCE: &str = "csv";

/// Row-per-unit extraction for workbooks and delimited text.
///
/// A file that cannot be parsed at all yields no units instead of an error.
pub struct TableExtraction {
    mode: TableMode,
}

impl TableExtraction {
    pub fn new(mode: TableMode) -> Self {
        TableExtraction { mode }
    }
}

impl ExtractStrategy for TableExtraction {
    fn extract(&self, bytes: &[u8], filename: &str) -> Result<Vec<ExtractedUnit>, UnitextError> {
        let parsed = match self.mode {
            TableMode::Csv => csv_rows(bytes),
            TableMode::Workbook => workbook_rows(bytes),
        };
        match parsed {
            Ok(units) => Ok(units),
            Err(e) => {
                warn!("{}: unreadable as {:?}, no content: {}", filename, self.mode, e);
                Ok(Vec::new())
            }
        }
    }
}

/// Join the non-empty trimmed cells of a row with `" | "`.
fn join_cells<'c>(cells: impl IntoIterator<Item = &'c str>) -> String {
    cells
        .into_iter()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}

fn csv_rows(bytes: &[u8]) -> Result<Vec<ExtractedUnit>, UnitextError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut units = Vec::new();
    for (i, record) in reader.byte_records().enumerate() {
        let record = record.map_err(|e| UnitextError::Parse(e.to_string()))?;
        let cells: Vec<_> = record.iter().map(String::from_utf8_lossy).collect();
        let line = join_cells(cells.iter().map(|c| c.as_ref()));
        if let Some(unit) = ExtractedUnit::new(&line, CSV_SOURCE, Location::row(i + 1)) {
            units.push(unit);
        }
    }
    Ok(units)
}

fn workbook_rows(bytes: &[u8]) -> Result<Vec<ExtractedUnit>, UnitextError> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| UnitextError::Parse(format!("failed to open workbook: {e}")))?;

    let mut units = Vec::new();
    for sheet in workbook.sheet_names() {
        let range = match workbook.worksheet_range(&sheet) {
            Ok(range) => range,
            Err(e) => {
                warn!("sheet '{}' skipped: {}", sheet, e);
                continue;
            }
        };
        debug!("sheet '{}': {} row(s) including header", sheet, range.height());

        // The first used row is the header; data rows are numbered from 1 after it.
        for (number, row) in range.rows().enumerate().skip(1) {
            let cells: Vec<String> = row
                .iter()
                .map(|cell| cell_text(cell, &sheet, number))
                .collect();
            let line = join_cells(cells.iter().map(String::as_str));
            let location = Location::sheet_row(number, sheet.as_str());
            if let Some(unit) = ExtractedUnit::new(&line, sheet.as_str(), location) {
                units.push(unit);
            }
        }
    }
    Ok(units)
}

/// String form of a cell. Empty and error cells become the empty string.
fn cell_text(cell: &Data, sheet: &str, row: usize) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) if dt.is_duration() => match dt.as_duration() {
            Some(d) => format_duration(d),
            None => dt.as_f64().to_string(),
        },
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_datetime() {
            Some(dt) => dt.format(DATETIME_FORMAT).to_string(),
            None => cell.to_string(),
        },
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => {
            debug!("sheet '{}' row {}: cell error {} treated as empty", sheet, row, e);
            String::new()
        }
    }
}

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `H:MM:SS`, with a leading sign for negative spans.
fn format_duration(d: chrono::Duration) -> String {
    let secs = d.num_seconds();
    let sign = if secs < 0 { "-" } else { "" };
    let secs = secs.abs();
    format!("{sign}{}:{:02}:{:02}", secs / 3600, secs % 3600 / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv(input: &str) -> Vec<ExtractedUnit> {
        TableExtraction::new(TableMode::Csv)
            .extract(input.as_bytes(), "data.csv")
            .unwrap()
    }

    #[test]
    fn csv_rows_join_non_empty_cells() {
        let units = csv("name,qty,note\nbolts, 40 ,\n,,\n,only,\n");
        let texts: Vec<_> = units.iter().map(|u| u.text.as_str()).collect();
        assert_eq!(texts, vec!["name | qty | note", "bolts | 40", "only"]);
        assert_eq!(units[2].location, Location::row(4));
        assert_eq!(units[0].source, "csv");
    }

    #[test]
    fn csv_first_row_is_data() {
        let units = csv("a,b\n");
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].location, Location::row(1));
    }

    #[test]
    fn ragged_rows_accepted() {
        let units = csv("a\nb,c,d\ne,f\n");
        assert_eq!(units.len(), 3);
        assert_eq!(units[1].text, "b | c | d");
    }

    #[test]
    fn empty_input_is_empty() {
        assert!(csv("").is_empty());
    }

    #[test]
    fn corrupt_workbook_degrades_to_empty() {
        let units = TableExtraction::new(TableMode::Workbook)
            .extract(b"PK\x03\x04 definitely not a workbook", "broken.xlsx")
            .unwrap();
        assert!(units.is_empty());
    }

    #[test]
    fn cell_strings() {
        assert_eq!(cell_text(&Data::Empty, "s", 1), "");
        assert_eq!(cell_text(&Data::Float(2.5), "s", 1), "2.5");
        assert_eq!(cell_text(&Data::Int(7), "s", 1), "7");
        assert_eq!(cell_text(&Data::Bool(true), "s", 1), "true");
        assert_eq!(
            cell_text(&Data::Error(calamine::CellErrorType::Div0), "s", 1),
            ""
        );
    }

    #[test]
    fn date_cells_render_as_calendar_dates() {
        use calamine::{ExcelDateTime, ExcelDateTimeType};

        let date = Data::DateTime(ExcelDateTime::new(45366.0, ExcelDateTimeType::DateTime, false));
        assert_eq!(cell_text(&date, "s", 1), "2024-03-15 00:00:00");

        let noon = Data::DateTime(ExcelDateTime::new(45366.5, ExcelDateTimeType::DateTime, false));
        assert_eq!(cell_text(&noon, "s", 1), "2024-03-15 12:00:00");

        let iso = Data::DateTimeIso("2024-03-15T08:30:00".to_string());
        assert_eq!(cell_text(&iso, "s", 1), "2024-03-15 08:30:00");

        let span = Data::DateTime(ExcelDateTime::new(
            1.5 / 24.0,
            ExcelDateTimeType::TimeDelta,
            false,
        ));
        assert_eq!(cell_text(&span, "s", 1), "1:30:00");
    }
}
