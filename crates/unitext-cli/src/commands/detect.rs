use std::path::PathBuf;

use unitext_core::detect::{DetectionMethod, TypeDetector};
use unitext_core::dispatch::display_name;
use unitext_core::error::UnitextError;

pub fn run(files: &[PathBuf]) -> Result<(), UnitextError> {
    let detector = TypeDetector::new();
    let width = files
        .iter()
        .map(|f| display_name(f).len())
        .max()
        .unwrap_or(10);

    for path in files {
        let name = display_name(path);
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                println!("  {:<width$}  unreadable ({})", name, e, width = width);
                continue;
            }
        };

        match detector.detect(&bytes, &name) {
            Some(d) => {
                let how = match d.method {
                    DetectionMethod::Content => "content".to_string(),
                    DetectionMethod::Extension => match d.sniffed {
                        Some(mime) => format!("extension, sniffed {mime}"),
                        None => "extension, sniffer failed".to_string(),
                    },
                };
                println!(
                    "  {:<width$}  {:<5} ({}) -> {:?}",
                    name,
                    d.file_type,
                    how,
                    d.file_type.strategy(),
                    width = width
                );
            }
            None => println!("  {:<width$}  unsupported", name, width = width),
        }
    }
    Ok(())
}
