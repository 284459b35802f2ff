use crate::image::{sample_bilinear_rgb, sample_bilinear_u8};
use crate::{GrayImage, GrayImageView, RgbImage, RgbImageView};
use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector3};

/// A planar perspective transform (3x3 homography, `h33` normalized to 1).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Perspective {
    pub h: Matrix3<f64>,
}

impl Perspective {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        Point2::new((v[0] / w) as f32, (v[1] / w) as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

/// Similarity transform that centers `pts` and scales their mean distance
/// from the centroid to `sqrt(2)` (Hartley conditioning).
fn conditioning_transform(pts: &[Point2<f32>; 4]) -> Matrix3<f64> {
    let mut cx = 0.0_f64;
    let mut cy = 0.0_f64;
    for p in pts {
        cx += p.x as f64;
        cy += p.y as f64;
    }
    cx /= 4.0;
    cy /= 4.0;

    let mut mean_dist = 0.0_f64;
    for p in pts {
        let dx = p.x as f64 - cx;
        let dy = p.y as f64 - cy;
        mean_dist += (dx * dx + dy * dy).sqrt();
    }
    mean_dist /= 4.0;

    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };
    Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

fn condition(pts: &[Point2<f32>; 4], t: &Matrix3<f64>) -> [Point2<f64>; 4] {
    let mut out = [Point2::new(0.0_f64, 0.0_f64); 4];
    for (o, p) in out.iter_mut().zip(pts.iter()) {
        let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
        *o = Point2::new(v[0], v[1]);
    }
    out
}

/// Estimate H such that `dst ~ H * src` from 4 point correspondences.
///
/// Corner order must be consistent between `src` and `dst`. Returns `None`
/// for degenerate configurations (three collinear points, repeated points).
pub fn perspective_from_quad(
    src: &[Point2<f32>; 4],
    dst: &[Point2<f32>; 4],
) -> Option<Perspective> {
    // Solve for [h11..h32] with h33 = 1. Each correspondence (x,y)->(u,v)
    // contributes:
    //   h11 x + h12 y + h13 - u h31 x - u h32 y = u
    //   h21 x + h22 y + h23 - v h31 x - v h32 y = v
    let t_src = conditioning_transform(src);
    let t_dst = conditioning_transform(dst);
    let sn = condition(src, &t_src);
    let dn = condition(dst, &t_dst);

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();

    for k in 0..4 {
        let (x, y) = (sn[k].x, sn[k].y);
        let (u, v) = (dn[k].x, dn[k].y);

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = 2 * k + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    let x = a.lu().solve(&b)?;
    let hn = Matrix3::<f64>::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    );

    // Undo conditioning: H = T_dst^{-1} * Hn * T_src, then renormalize h33.
    let h = t_dst.try_inverse()? * hn * t_src;
    let s = h[(2, 2)];
    if s.abs() < 1e-12 {
        return None;
    }
    Some(Perspective::new(h / s))
}

/// Warp a grayscale image: for each output pixel, map through
/// `src_from_out` and sample the source bilinearly.
pub fn warp_perspective_gray(
    src: &GrayImageView<'_>,
    src_from_out: Perspective,
    out_w: usize,
    out_h: usize,
) -> GrayImage {
    let mut out = vec![0u8; out_w * out_h];
    for y in 0..out_h {
        for x in 0..out_w {
            // sample at pixel center
            let p = src_from_out.apply(Point2::new(x as f32 + 0.5, y as f32 + 0.5));
            out[y * out_w + x] = sample_bilinear_u8(src, p.x, p.y);
        }
    }
    GrayImage {
        width: out_w,
        height: out_h,
        data: out,
    }
}

/// RGB counterpart of [`warp_perspective_gray`].
pub fn warp_perspective_rgb(
    src: &RgbImageView<'_>,
    src_from_out: Perspective,
    out_w: usize,
    out_h: usize,
) -> RgbImage {
    let mut out = vec![0u8; out_w * out_h * 3];
    for y in 0..out_h {
        for x in 0..out_w {
            let p = src_from_out.apply(Point2::new(x as f32 + 0.5, y as f32 + 0.5));
            let px = sample_bilinear_rgb(src, p.x, p.y);
            let i = (y * out_w + x) * 3;
            out[i..i + 3].copy_from_slice(&px);
        }
    }
    RgbImage {
        width: out_w,
        height: out_h,
        data: out,
    }
}
