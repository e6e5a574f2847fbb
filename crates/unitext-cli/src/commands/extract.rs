use std::path::PathBuf;

use unitext_core::error::UnitextError;
use unitext_core::model::BatchReport;
use unitext_core::Extractor;

use crate::output;

pub fn run(
    extractor: &Extractor,
    files: &[PathBuf],
    output_format: &str,
    output_file: Option<PathBuf>,
) -> Result<(), UnitextError> {
    let outcomes = extractor.extract_paths(files)?;
    let report = BatchReport::new(outcomes);

    match output_file {
        Some(path) => {
            // The file always gets the full JSON report.
            output::json::write(&report, &path)?;
            let failed = report.failed_count();
            eprintln!(
                "Extracted {} file(s), written to {}",
                report.results.len() - failed,
                path.display()
            );
            if failed > 0 {
                output::text::print_failures(&report);
            }
        }
        None => match output_format {
            "json" => output::json::print(&report)?,
            _ => output::text::print(&report),
        },
    }

    Ok(())
}
