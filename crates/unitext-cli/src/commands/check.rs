use unitext_core::config::ExtractionConfig;
use unitext_core::error::UnitextError;
use unitext_core::ocr::TesseractOcr;
use unitext_core::pdf::PopplerBackend;

pub fn run(config: &ExtractionConfig) -> Result<(), UnitextError> {
    println!("External tools:\n");

    match TesseractOcr::locate(&config.ocr) {
        Ok(engine) => println!(
            "  {:<10} ok ({}, language {})",
            "tesseract",
            engine.binary().display(),
            config.ocr.language
        ),
        Err(e) => println!("  {:<10} missing: {}", "tesseract", e),
    }

    let poppler = PopplerBackend::with_bin_dir(config.pdf.poppler_dir.clone());
    for (tool, ok) in poppler.tool_status() {
        let status = if ok { "ok" } else { "missing" };
        println!("  {:<10} {}", tool, status);
    }

    println!();
    println!("Without tesseract, images and scanned PDF pages produce errors;");
    println!("without poppler, PDFs cannot be read. Other formats are unaffected.");
    Ok(())
}
