//! Dark-quad candidate extraction.
//!
//! Marker candidates are connected components of dark pixels whose convex
//! hull is close to a quadrilateral. The four corners are recovered as the
//! hull's diameter pair plus the two hull points farthest from that
//! diagonal on either side.

use kitcheck_core::GrayImageView;
use nalgebra::Point2;

/// A candidate marker quadrilateral, corners ordered consistently with the
/// unit sampling square (TL, TR, BR, BL winding in image coordinates).
#[derive(Clone, Debug)]
pub struct QuadCandidate {
    pub corners: [Point2<f32>; 4],
    /// Pixel count of the originating dark component.
    pub component_size: usize,
}

/// Extract quad candidates from a binarized view of `img`.
///
/// `dark_threshold` separates marker ink from background; pixels at or
/// below it are dark (Otsu reports the last background bin). Components
/// outside `[min_px, max_px]` pixels are ignored, as are quads with a
/// side shorter than `min_side_px`.
pub fn find_quad_candidates(
    img: &GrayImageView<'_>,
    dark_threshold: u8,
    min_px: usize,
    max_px: usize,
    min_side_px: f32,
) -> Vec<QuadCandidate> {
    let (w, h) = (img.width, img.height);
    if w == 0 || h == 0 {
        return Vec::new();
    }

    let mut visited = vec![false; w * h];
    let mut out = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    let mut component: Vec<(i32, i32)> = Vec::new();

    for start in 0..w * h {
        if visited[start] || img.data[start] > dark_threshold {
            continue;
        }

        component.clear();
        stack.clear();
        stack.push(start);
        visited[start] = true;

        while let Some(idx) = stack.pop() {
            let (x, y) = ((idx % w) as i32, (idx / w) as i32);
            component.push((x, y));

            for (nx, ny) in [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)] {
                if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                    continue;
                }
                let nidx = ny as usize * w + nx as usize;
                if !visited[nidx] && img.data[nidx] <= dark_threshold {
                    visited[nidx] = true;
                    stack.push(nidx);
                }
            }
        }

        if component.len() < min_px || component.len() > max_px {
            continue;
        }

        let hull = convex_hull(&mut component);
        if let Some(corners) = quad_from_hull(&hull, min_side_px) {
            out.push(QuadCandidate {
                corners,
                component_size: component.len(),
            });
        }
    }

    out
}

/// Andrew monotone chain; strictly convex, collinear points dropped.
fn convex_hull(points: &mut Vec<(i32, i32)>) -> Vec<(i32, i32)> {
    points.sort_unstable();
    points.dedup();
    let n = points.len();
    if n < 3 {
        return points.clone();
    }

    let cross = |o: (i32, i32), a: (i32, i32), b: (i32, i32)| -> i64 {
        (a.0 - o.0) as i64 * (b.1 - o.1) as i64 - (a.1 - o.1) as i64 * (b.0 - o.0) as i64
    };

    let mut hull: Vec<(i32, i32)> = Vec::with_capacity(2 * n);
    for &p in points.iter() {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in points.iter().rev() {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0 {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

fn quad_from_hull(hull: &[(i32, i32)], min_side_px: f32) -> Option<[Point2<f32>; 4]> {
    if hull.len() < 4 {
        return None;
    }

    // diameter pair
    let mut best = (0usize, 0usize, -1i64);
    for i in 0..hull.len() {
        for j in (i + 1)..hull.len() {
            let dx = (hull[i].0 - hull[j].0) as i64;
            let dy = (hull[i].1 - hull[j].1) as i64;
            let d2 = dx * dx + dy * dy;
            if d2 > best.2 {
                best = (i, j, d2);
            }
        }
    }
    let (a, b) = (hull[best.0], hull[best.1]);

    // farthest point on each side of the diagonal a-b
    let side = |p: (i32, i32)| -> i64 {
        (b.0 - a.0) as i64 * (p.1 - a.1) as i64 - (b.1 - a.1) as i64 * (p.0 - a.0) as i64
    };
    let mut pos: Option<((i32, i32), i64)> = None;
    let mut neg: Option<((i32, i32), i64)> = None;
    for &p in hull {
        let s = side(p);
        if s > 0 && pos.map_or(true, |(_, sp)| s > sp) {
            pos = Some((p, s));
        }
        if s < 0 && neg.map_or(true, |(_, sn)| s < sn) {
            neg = Some((p, s));
        }
    }
    let (c, _) = pos?;
    let (d, _) = neg?;

    let mut corners = [
        Point2::new(a.0 as f32, a.1 as f32),
        Point2::new(c.0 as f32, c.1 as f32),
        Point2::new(b.0 as f32, b.1 as f32),
        Point2::new(d.0 as f32, d.1 as f32),
    ];
    order_like_sampling_square(&mut corners);

    // side length and convexity gates
    for i in 0..4 {
        let p = corners[i];
        let q = corners[(i + 1) % 4];
        if (p - q).norm() < min_side_px {
            return None;
        }
    }
    if !is_convex(&corners) {
        return None;
    }
    Some(corners)
}

/// Sort corners by angle around the centroid so they wind like the unit
/// sampling square (TL, TR, BR, BL in image coordinates), then start at
/// the corner with the smallest `x + y`.
fn order_like_sampling_square(corners: &mut [Point2<f32>; 4]) {
    let cx = corners.iter().map(|p| p.x).sum::<f32>() / 4.0;
    let cy = corners.iter().map(|p| p.y).sum::<f32>() / 4.0;
    corners.sort_by(|p, q| {
        let ap = (p.y - cy).atan2(p.x - cx);
        let aq = (q.y - cy).atan2(q.x - cx);
        ap.partial_cmp(&aq).unwrap_or(std::cmp::Ordering::Equal)
    });

    let start = (0..4)
        .min_by(|&i, &j| {
            let si = corners[i].x + corners[i].y;
            let sj = corners[j].x + corners[j].y;
            si.partial_cmp(&sj).unwrap_or(std::cmp::Ordering::Equal)
        })
        .unwrap_or(0);
    corners.rotate_left(start);
}

fn is_convex(corners: &[Point2<f32>; 4]) -> bool {
    let mut sign = 0.0f32;
    for i in 0..4 {
        let p = corners[i];
        let q = corners[(i + 1) % 4];
        let r = corners[(i + 2) % 4];
        let cross = (q.x - p.x) * (r.y - q.y) - (q.y - p.y) * (r.x - q.x);
        if cross == 0.0 {
            return false;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use kitcheck_core::GrayImage;

    fn white_canvas(w: usize, h: usize) -> GrayImage {
        GrayImage {
            width: w,
            height: h,
            data: vec![255u8; w * h],
        }
    }

    fn fill_rect(img: &mut GrayImage, x0: usize, y0: usize, side: usize, value: u8) {
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                img.data[y * img.width + x] = value;
            }
        }
    }

    #[test]
    fn detects_a_dark_square() {
        let mut img = white_canvas(120, 120);
        fill_rect(&mut img, 30, 40, 50, 0);

        let quads = find_quad_candidates(&img.as_view(), 128, 100, 10_000, 10.0);
        assert_eq!(quads.len(), 1);

        let c = &quads[0].corners;
        // corner 0 is the top-left of the square
        assert!((c[0].x - 30.0).abs() <= 1.0 && (c[0].y - 40.0).abs() <= 1.0);
        assert!((c[2].x - 79.0).abs() <= 1.0 && (c[2].y - 89.0).abs() <= 1.0);
    }

    #[test]
    fn small_specks_are_ignored() {
        let mut img = white_canvas(60, 60);
        fill_rect(&mut img, 10, 10, 2, 0);
        let quads = find_quad_candidates(&img.as_view(), 128, 100, 10_000, 10.0);
        assert!(quads.is_empty());
    }

    #[test]
    fn thin_lines_are_rejected() {
        let mut img = white_canvas(100, 100);
        for x in 5..95 {
            for y in 48..52 {
                img.data[y * 100 + x] = 0;
            }
        }
        let quads = find_quad_candidates(&img.as_view(), 128, 100, 10_000, 10.0);
        assert!(quads.is_empty());
    }
}
