use unitext_core::model::{BatchEntry, BatchReport};

/// Plain-text view: each file's units separated by blank lines.
pub fn print(report: &BatchReport) {
    let multi_file = report.results.len() > 1;

    for (i, entry) in report.results.iter().enumerate() {
        if multi_file && i > 0 {
            println!();
        }
        match entry {
            BatchEntry::Extracted(result) => {
                if multi_file {
                    println!(
                        "=== {} ({}, {:.2} ms) ===\n",
                        result.filename, result.file_type, result.processing_time_ms
                    );
                }
                if result.content.is_empty() {
                    eprintln!("  {}: no text found", result.filename);
                } else {
                    println!("{}", result.plain_text());
                }
            }
            BatchEntry::Failed { filename, error } => {
                if multi_file {
                    println!("=== {} ===\n", filename);
                }
                eprintln!("  error: {error}");
            }
        }
    }
}

pub fn print_failures(report: &BatchReport) {
    for entry in &report.results {
        if let BatchEntry::Failed { error, .. } = entry {
            eprintln!("  error: {error}");
        }
    }
}
