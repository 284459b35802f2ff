//! Annotated review image.
//!
//! Draws slot outlines in verdict colors onto a copy of the analyzed
//! image. The rendering is a derived artifact for human review; nothing
//! downstream reads it back.

use crate::classify::{SlotStatus, SlotVerdict};
use kitcheck_core::{Region, RgbImage, RgbImageView};
use kitcheck_marker::Marker;
use nalgebra::Point2;

const COLOR_PRESENT: [u8; 3] = [0, 200, 0];
const COLOR_MISSING: [u8; 3] = [220, 0, 0];
const COLOR_UNCERTAIN: [u8; 3] = [255, 165, 0];
const COLOR_MARKER: [u8; 3] = [0, 255, 255];

const OUTLINE_THICKNESS: i32 = 2;

/// Outline color for a verdict.
pub fn status_color(status: SlotStatus) -> [u8; 3] {
    match status {
        SlotStatus::Present => COLOR_PRESENT,
        SlotStatus::Missing => COLOR_MISSING,
        SlotStatus::Uncertain => COLOR_UNCERTAIN,
    }
}

/// Draw every slot region in its verdict color.
///
/// `regions` must be index-aligned with `verdicts` (the pipeline passes
/// the working-frame regions it actually sampled).
pub fn annotate(
    img: &RgbImageView<'_>,
    verdicts: &[SlotVerdict],
    regions: &[Region],
) -> RgbImage {
    let mut out = RgbImage {
        width: img.width,
        height: img.height,
        data: img.data.to_vec(),
    };
    for (verdict, region) in verdicts.iter().zip(regions.iter()) {
        draw_region(&mut out, region, status_color(verdict.status));
    }
    out
}

/// Overlay marker outlines for registration debugging.
pub fn draw_markers(img: &mut RgbImage, markers: &[Marker]) {
    for m in markers {
        for i in 0..4 {
            let a = m.corners[i];
            let b = m.corners[(i + 1) % 4];
            draw_line(img, a, b, COLOR_MARKER);
        }
    }
}

fn draw_region(img: &mut RgbImage, region: &Region, color: [u8; 3]) {
    match region {
        Region::Rect {
            x,
            y,
            width,
            height,
        } => {
            let (x0, y0) = (*x as f32, *y as f32);
            let (x1, y1) = (x0 + *width as f32 - 1.0, y0 + *height as f32 - 1.0);
            let corners = [
                Point2::new(x0, y0),
                Point2::new(x1, y0),
                Point2::new(x1, y1),
                Point2::new(x0, y1),
            ];
            for i in 0..4 {
                draw_line(img, corners[i], corners[(i + 1) % 4], color);
            }
        }
        Region::Polygon { vertices } => {
            for i in 0..vertices.len() {
                let a = vertices[i];
                let b = vertices[(i + 1) % vertices.len()];
                draw_line(img, a, b, color);
            }
        }
    }
}

/// Bresenham segment, thickened by stamping a small square per step.
fn draw_line(img: &mut RgbImage, a: Point2<f32>, b: Point2<f32>, color: [u8; 3]) {
    let (mut x0, mut y0) = (a.x.round() as i32, a.y.round() as i32);
    let (x1, y1) = (b.x.round() as i32, b.y.round() as i32);

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        stamp(img, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn stamp(img: &mut RgbImage, x: i32, y: i32, color: [u8; 3]) {
    let r = OUTLINE_THICKNESS / 2;
    for oy in -r..=r {
        for ox in -r..=r {
            let (px, py) = (x + ox, y + oy);
            if px < 0 || py < 0 || px >= img.width as i32 || py >= img.height as i32 {
                continue;
            }
            let i = (py as usize * img.width + px as usize) * 3;
            img.data[i..i + 3].copy_from_slice(&color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::RegionSignals;

    fn verdict(status: SlotStatus) -> SlotVerdict {
        SlotVerdict {
            tool_id: "t".into(),
            name: "t".into(),
            slot_index: 1,
            status,
            confidence: 0.0,
            signals: RegionSignals::zeroed(),
        }
    }

    fn pixel(img: &RgbImage, x: usize, y: usize) -> [u8; 3] {
        let i = (y * img.width + x) * 3;
        [img.data[i], img.data[i + 1], img.data[i + 2]]
    }

    #[test]
    fn outline_uses_the_verdict_color() {
        let base = RgbImage {
            width: 40,
            height: 40,
            data: vec![0u8; 40 * 40 * 3],
        };
        let region = Region::Rect {
            x: 5,
            y: 5,
            width: 20,
            height: 20,
        };
        let out = annotate(
            &base.as_view(),
            &[verdict(SlotStatus::Missing)],
            &[region],
        );
        assert_eq!(pixel(&out, 5, 5), COLOR_MISSING);
        assert_eq!(pixel(&out, 24, 5), COLOR_MISSING);
        // region interior stays untouched
        assert_eq!(pixel(&out, 15, 15), [0, 0, 0]);
    }

    #[test]
    fn annotation_does_not_modify_the_input() {
        let base = RgbImage {
            width: 10,
            height: 10,
            data: vec![7u8; 300],
        };
        let region = Region::Rect {
            x: 1,
            y: 1,
            width: 5,
            height: 5,
        };
        let _ = annotate(
            &base.as_view(),
            &[verdict(SlotStatus::Present)],
            &[region],
        );
        assert!(base.data.iter().all(|&v| v == 7));
    }
}
