use std::path::{Path, PathBuf};
use std::process::Command;

use image::{GrayImage, ImageFormat};
use tracing::debug;

use crate::config::OcrConfig;
use crate::error::UnitextError;
use crate::ocr::OcrEngine;

/// OCR backend driving the `tesseract` command line tool.
///
/// Resolved once at startup with [`TesseractOcr::locate`]; the handle is then
/// shared by every extraction that needs OCR.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
    language: String,
    tessdata_dir: Option<PathBuf>,
}

impl TesseractOcr {
    /// Resolve the tesseract binary and confirm it runs.
    pub fn locate(config: &OcrConfig) -> Result<Self, UnitextError> {
        let binary = config
            .tesseract_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("tesseract"));

        let output = Command::new(&binary)
            .arg("--version")
            .output()
            .map_err(|e| UnitextError::OcrEngineNotFound(format!("{}: {}", binary.display(), e)))?;

        // Older releases print the version banner on stderr.
        let banner = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).to_string()
        } else {
            String::from_utf8_lossy(&output.stdout).to_string()
        };
        if !output.status.success() && banner.trim().is_empty() {
            return Err(UnitextError::OcrEngineNotFound(format!(
                "{} --version exited with {}",
                binary.display(),
                output.status
            )));
        }
        debug!(
            "using {} ({})",
            binary.display(),
            banner.lines().next().unwrap_or("unknown version").trim()
        );

        Ok(TesseractOcr {
            binary,
            language: config.language.clone(),
            tessdata_dir: config.tessdata_dir.clone(),
        })
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command(&self, image_path: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language);
        if let Some(dir) = &self.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image: &GrayImage) -> Result<String, UnitextError> {
        let tmpfile = tempfile::Builder::new().suffix(".png").tempfile()?;
        image
            .save_with_format(tmpfile.path(), ImageFormat::Png)
            .map_err(|e| UnitextError::ImageDecode(format!("failed to write OCR input: {e}")))?;

        let output = self.command(tmpfile.path()).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                UnitextError::OcrEngineNotFound(self.binary.display().to_string())
            } else {
                UnitextError::Io(e)
            }
        })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(UnitextError::OcrFailed { code, stderr });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn engine_name(&self) -> &str {
        "tesseract"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_reported() {
        let config = OcrConfig {
            tesseract_path: Some(PathBuf::from("/nonexistent/bin/tesseract")),
            ..OcrConfig::default()
        };
        match TesseractOcr::locate(&config) {
            Err(UnitextError::OcrEngineNotFound(msg)) => {
                assert!(msg.contains("/nonexistent/bin/tesseract"))
            }
            other => panic!("expected OcrEngineNotFound, got {other:?}"),
        }
    }

    #[test]
    fn command_line_shape() {
        let engine = TesseractOcr {
            binary: PathBuf::from("tesseract"),
            language: "swe".into(),
            tessdata_dir: Some(PathBuf::from("/opt/tessdata")),
        };
        let cmd = engine.command(Path::new("/tmp/page.png"));
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().to_string()).collect();
        assert_eq!(
            args,
            vec!["/tmp/page.png", "stdout", "-l", "swe", "--tessdata-dir", "/opt/tessdata"]
        );
    }
}
