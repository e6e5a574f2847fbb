use image::GrayImage;
use imageproc::contrast::{otsu_level, threshold, ThresholdType};

use crate::error::UnitextError;

/// Decode raw image bytes and binarize them for OCR.
///
/// The image is converted to 8-bit grayscale and thresholded at its Otsu
/// level, so every pixel of the result is either 0 or 255.
pub fn preprocess(image_bytes: &[u8]) -> Result<GrayImage, UnitextError> {
    let decoded = image::load_from_memory(image_bytes)
        .map_err(|e| UnitextError::ImageDecode(e.to_string()))?;
    Ok(binarize(&decoded.to_luma8()))
}

/// Otsu-threshold a grayscale image into pure black and white.
pub fn binarize(gray: &GrayImage) -> GrayImage {
    let level = otsu_level(gray);
    threshold(gray, level, ThresholdType::Binary)
}
