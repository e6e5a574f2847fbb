use std::path::Path;

use unitext_core::error::UnitextError;
use unitext_core::model::BatchReport;

pub fn print(report: &BatchReport) -> Result<(), UnitextError> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{json}");
    Ok(())
}

pub fn write(report: &BatchReport, path: &Path) -> Result<(), UnitextError> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}
