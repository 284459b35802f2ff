//! Marker location: quad candidates -> decoded fiducials.

use crate::quads::find_quad_candidates;
use crate::threshold::otsu_threshold;
use crate::{Dictionary, Matcher};
use kitcheck_core::{sample_bilinear, GrayImageView};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// A located fiducial marker.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Marker {
    pub id: u32,
    /// Corner points in image coordinates, canonical order: the marker's
    /// printed top-left first, then clockwise.
    pub corners: [Point2<f32>; 4],
    /// Centroid (mean of the four corners).
    pub center: Point2<f32>,
    /// Rotation the decoder had to undo (quarter turns).
    pub rotation: u8,
    /// Hamming distance to the matched dictionary code.
    pub hamming: u8,
    /// Decode quality in [0, 1] (border integrity x code agreement).
    pub score: f32,
}

/// Tuning knobs for [`locate_markers`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocateParams {
    /// Dark component size bounds as fractions of the image pixel count.
    pub min_component_frac: f64,
    pub max_component_frac: f64,
    /// Reject quads with any side shorter than this.
    pub min_side_px: f32,
    /// Quiet-zone border width in marker cells.
    pub border_bits: usize,
    /// Require at least this fraction of border cells to read black.
    pub min_border_score: f32,
    /// Hamming budget for dictionary matching (clamped by the dictionary).
    pub max_hamming: u8,
    /// Keep only the best detection per id.
    pub dedup_by_id: bool,
}

impl Default for LocateParams {
    fn default() -> Self {
        Self {
            min_component_frac: 1e-4,
            max_component_frac: 0.25,
            min_side_px: 12.0,
            border_bits: 1,
            min_border_score: 0.85,
            max_hamming: 1,
            dedup_by_id: true,
        }
    }
}

/// Locate and decode fiducial markers in a grayscale image.
///
/// Runs independently per image and fails softly: no recognizable marker
/// means an empty list. Marker order carries no meaning beyond the dedup
/// grouping by id.
pub fn locate_markers(
    img: &GrayImageView<'_>,
    dict: &Dictionary,
    params: &LocateParams,
) -> Vec<Marker> {
    let total_px = img.width * img.height;
    if total_px == 0 {
        return Vec::new();
    }

    let dark_threshold = otsu_threshold(img.data);
    let min_px = (params.min_component_frac * total_px as f64).ceil() as usize;
    let max_px = (params.max_component_frac * total_px as f64) as usize;

    let quads = find_quad_candidates(
        img,
        dark_threshold,
        min_px.max(4),
        max_px,
        params.min_side_px,
    );
    log::debug!(
        "marker locate: {} quad candidate(s) at threshold {}",
        quads.len(),
        dark_threshold
    );

    let matcher = Matcher::new(dict.clone(), params.max_hamming);
    let mut found: Vec<Marker> = Vec::new();

    for quad in &quads {
        if let Some(marker) = decode_quad(img, &quad.corners, params, &matcher) {
            found.push(marker);
        }
    }

    if params.dedup_by_id {
        dedup_by_id_keep_best(found)
    } else {
        found
    }
}

const MIN_SAMPLE_CONTRAST: u8 = 64;

fn decode_quad(
    img: &GrayImageView<'_>,
    corners: &[Point2<f32>; 4],
    params: &LocateParams,
    matcher: &Matcher,
) -> Option<Marker> {
    let bits = matcher.dictionary().marker_size;
    let cells = bits + 2 * params.border_bits;
    if bits * bits > 64 || cells == 0 {
        return None;
    }

    // mean side length defines the sampling square
    let mut s = 0.0f32;
    for i in 0..4 {
        s += (corners[i] - corners[(i + 1) % 4]).norm();
    }
    s /= 4.0;
    if s <= 1.0 {
        return None;
    }

    let cell_square = [
        Point2::new(0.0, 0.0),
        Point2::new(s, 0.0),
        Point2::new(s, s),
        Point2::new(0.0, s),
    ];
    let h = kitcheck_core::perspective_from_quad(&cell_square, corners)?;

    let step = s / cells as f32;
    let mut samples = Vec::with_capacity(cells * cells);
    for cy in 0..cells {
        for cx in 0..cells {
            let p = h.apply(Point2::new(
                (cx as f32 + 0.5) * step,
                (cy as f32 + 0.5) * step,
            ));
            samples.push(sample_mean_3x3(img, p.x, p.y));
        }
    }

    // a decodable marker has both ink and paper in view; a flat quad
    // (solid shadow, colored block) carries no code
    let min_sample = samples.iter().copied().min().unwrap_or(0);
    let max_sample = samples.iter().copied().max().unwrap_or(0);
    if max_sample - min_sample < MIN_SAMPLE_CONTRAST {
        return None;
    }

    let thr = otsu_threshold(&samples);
    let mut border_dark = 0u32;
    let mut border_total = 0u32;
    let mut code = 0u64;
    let border = params.border_bits;

    for cy in 0..cells {
        for cx in 0..cells {
            let is_dark = samples[cy * cells + cx] <= thr;
            let on_border = cx < border || cy < border || cx >= cells - border || cy >= cells - border;
            if on_border {
                border_total += 1;
                if is_dark {
                    border_dark += 1;
                }
            } else if is_dark {
                let bx = cx - border;
                let by = cy - border;
                code |= 1u64 << (by * bits + bx);
            }
        }
    }

    let border_score = if border_total > 0 {
        border_dark as f32 / border_total as f32
    } else {
        1.0
    };
    if border_score < params.min_border_score {
        return None;
    }

    let m = matcher.match_code(code)?;

    // observed == rotate(dict, r) means the printed top-left sits at
    // sampled corner index r; rotating left by r restores canonical order
    let mut canonical = *corners;
    canonical.rotate_left(m.rotation as usize);

    let center = Point2::new(
        canonical.iter().map(|p| p.x).sum::<f32>() / 4.0,
        canonical.iter().map(|p| p.y).sum::<f32>() / 4.0,
    );
    let bit_count = matcher.dictionary().bit_count().max(1) as f32;
    let score = (border_score * (1.0 - m.hamming as f32 / bit_count)).clamp(0.0, 1.0);

    Some(Marker {
        id: m.id,
        corners: canonical,
        center,
        rotation: m.rotation,
        hamming: m.hamming,
        score,
    })
}

fn dedup_by_id_keep_best(mut markers: Vec<Marker>) -> Vec<Marker> {
    markers.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut out: Vec<Marker> = Vec::with_capacity(markers.len());
    for m in markers {
        if out.iter().all(|kept| kept.id != m.id) {
            out.push(m);
        }
    }
    out
}

fn sample_mean_3x3(img: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    let mut sum = 0.0f32;
    for dy in -1..=1 {
        for dx in -1..=1 {
            sum += sample_bilinear(img, x + dx as f32, y + dy as f32);
        }
    }
    (sum / 9.0).clamp(0.0, 255.0) as u8
}
