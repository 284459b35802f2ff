//! Per-slot pixel signals.

use crate::config::DetectionConfig;
use kitcheck_core::{luma_u8, saturation_u8, Region, RgbImageView};
use serde::{Deserialize, Serialize};

/// Signals computed over one slot region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionSignals {
    /// Fraction of region pixels brighter than the brightness threshold.
    pub brightness_ratio: f32,
    /// Fraction of region pixels more saturated than the saturation
    /// threshold (colored handles).
    pub saturation_ratio: f32,
    /// Fraction of region pixels on a detected edge (metallic contours).
    pub edge_density: f32,
    /// Mean luma over the region; diagnostic only.
    pub mean_brightness: f32,
}

impl RegionSignals {
    /// All-zero signals, used when a region could not be sampled.
    pub fn zeroed() -> Self {
        Self::default()
    }
}

/// Compute the region signals for one slot.
///
/// The region's bounding rectangle is clamped to the image; polygon
/// regions additionally mask pixels outside the outline. Returns `None`
/// when no pixel of the region lies inside the image (the caller turns
/// that into an `uncertain` verdict rather than failing the check-in).
pub fn extract_signals(
    img: &RgbImageView<'_>,
    region: &Region,
    cfg: &DetectionConfig,
) -> Option<RegionSignals> {
    let b = region.bounds();
    let x0 = b.x.max(0);
    let y0 = b.y.max(0);
    let x1 = (b.x + b.width as i32).min(img.width as i32);
    let y1 = (b.y + b.height as i32).min(img.height as i32);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }
    let (cw, ch) = ((x1 - x0) as usize, (y1 - y0) as usize);

    // grayscale crop of the bounding rectangle plus the region mask
    let mut gray = vec![0u8; cw * ch];
    let mut mask = vec![false; cw * ch];
    let mut inside = 0usize;
    let mut bright = 0usize;
    let mut saturated = 0usize;
    let mut luma_sum = 0u64;

    for cy in 0..ch {
        for cx in 0..cw {
            let (px, py) = (x0 + cx as i32, y0 + cy as i32);
            let i = (py as usize * img.width + px as usize) * 3;
            let (r, g, bl) = (img.data[i], img.data[i + 1], img.data[i + 2]);
            let luma = luma_u8(r, g, bl);
            gray[cy * cw + cx] = luma;

            if !region.contains_pixel(px, py) {
                continue;
            }
            mask[cy * cw + cx] = true;
            inside += 1;
            luma_sum += luma as u64;
            if luma > cfg.brightness_threshold {
                bright += 1;
            }
            if saturation_u8(r, g, bl) > cfg.saturation_threshold {
                saturated += 1;
            }
        }
    }
    if inside == 0 {
        return None;
    }

    let edges = count_edge_pixels(&gray, &mask, cw, ch, cfg.edge_gradient_threshold);

    let n = inside as f32;
    Some(RegionSignals {
        brightness_ratio: bright as f32 / n,
        saturation_ratio: saturated as f32 / n,
        edge_density: edges as f32 / n,
        mean_brightness: luma_sum as f32 / n,
    })
}

/// Count masked pixels whose Sobel gradient magnitude exceeds `threshold`.
///
/// The magnitude is normalized back to the 0-255 intensity scale. Crop
/// border pixels have no full 3x3 neighborhood and never count as edges.
fn count_edge_pixels(gray: &[u8], mask: &[bool], w: usize, h: usize, threshold: f32) -> usize {
    if w < 3 || h < 3 {
        return 0;
    }
    let px = |x: usize, y: usize| gray[y * w + x] as f32;
    let mut count = 0usize;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            if !mask[y * w + x] {
                continue;
            }
            let gx = (px(x + 1, y - 1) + 2.0 * px(x + 1, y) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2.0 * px(x - 1, y) + px(x - 1, y + 1));
            let gy = (px(x - 1, y + 1) + 2.0 * px(x, y + 1) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2.0 * px(x, y - 1) + px(x + 1, y - 1));
            let mag = (gx * gx + gy * gy).sqrt() / 4.0;
            if mag > threshold {
                count += 1;
            }
        }
    }
    count
}
