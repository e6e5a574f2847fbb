use unitext_core::config::ExtractionConfig;
use unitext_core::error::UnitextError;

pub fn run(config: &ExtractionConfig) -> Result<(), UnitextError> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
