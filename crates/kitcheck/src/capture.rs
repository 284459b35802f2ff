//! Decode helpers bridging the `image` crate to the analysis pipeline.

use kitcheck_analyze::{AnalysisPipeline, AnalysisResult, AnalyzeError, Template};
use kitcheck_core::{GrayImageView, RgbImage, RgbImageView};
use kitcheck_marker::Marker;
use std::path::Path;

/// Errors at the capture boundary.
#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("captured image bytes could not be decoded: {0}")]
    Decode(#[from] ::image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Analyze(#[from] AnalyzeError),
}

/// Decode captured image bytes into an RGB8 image.
///
/// Undecodable bytes fail immediately; there is nothing to degrade to.
pub fn decode_rgb(bytes: &[u8]) -> Result<::image::RgbImage, CaptureError> {
    Ok(::image::load_from_memory(bytes)?.to_rgb8())
}

/// Borrow an `image::RgbImage` as the lightweight core view type.
pub fn rgb_view(img: &::image::RgbImage) -> RgbImageView<'_> {
    RgbImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Borrow an `image::GrayImage` as the lightweight core view type.
pub fn gray_view(img: &::image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Convert an owned core RGB image (e.g. the annotated rendering) back
/// into an `image::RgbImage` for encoding.
pub fn to_image_rgb(img: &RgbImage) -> Option<::image::RgbImage> {
    ::image::RgbImage::from_raw(img.width as u32, img.height as u32, img.data.clone())
}

/// Load a template definition from a JSON file.
pub fn load_template_json(path: impl AsRef<Path>) -> Result<Template, CaptureError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Decode captured bytes and run a full analysis.
pub fn analyze_image_bytes(
    pipeline: &AnalysisPipeline,
    template: &Template,
    bytes: &[u8],
) -> Result<AnalysisResult, CaptureError> {
    let rgb = decode_rgb(bytes)?;
    Ok(pipeline.analyze(template, &rgb_view(&rgb))?)
}

/// Read, decode and analyze a captured photo from disk.
pub fn analyze_image_path(
    pipeline: &AnalysisPipeline,
    template: &Template,
    path: impl AsRef<Path>,
) -> Result<AnalysisResult, CaptureError> {
    let bytes = std::fs::read(path)?;
    analyze_image_bytes(pipeline, template, &bytes)
}

/// Locate fiducial markers in arbitrary captured bytes.
///
/// Standalone preview entry point for template-authoring tooling.
pub fn locate_markers_in_bytes(bytes: &[u8]) -> Result<Vec<Marker>, CaptureError> {
    let gray = ::image::load_from_memory(bytes)?.to_luma8();
    Ok(kitcheck_analyze::detect_markers(&gray_view(&gray)))
}
