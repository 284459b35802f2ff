//! Slot regions: the image area watched for one tool.
//!
//! A region is either an axis-aligned rectangle or a simple polygon. Both
//! expose an integer bounding rectangle; the polygon additionally masks
//! pixels via an even-odd containment test.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Integer bounding rectangle of a region, in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Region errors surfaced during template validation.
#[derive(thiserror::Error, Debug)]
pub enum RegionError {
    #[error("rectangle must have non-zero width and height")]
    EmptyRect,
    #[error("polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),
    #[error("polygon vertex is not finite")]
    NonFiniteVertex,
}

/// A tool slot region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Region {
    Rect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
    Polygon {
        vertices: Vec<Point2<f32>>,
    },
}

impl Region {
    /// Check the structural invariants a persisted region must satisfy.
    pub fn validate(&self) -> Result<(), RegionError> {
        match self {
            Region::Rect { width, height, .. } => {
                if *width == 0 || *height == 0 {
                    return Err(RegionError::EmptyRect);
                }
                Ok(())
            }
            Region::Polygon { vertices } => {
                if vertices.len() < 3 {
                    return Err(RegionError::TooFewVertices(vertices.len()));
                }
                if vertices.iter().any(|v| !v.x.is_finite() || !v.y.is_finite()) {
                    return Err(RegionError::NonFiniteVertex);
                }
                Ok(())
            }
        }
    }

    /// Minimal integer bounding rectangle.
    pub fn bounds(&self) -> RegionBounds {
        match self {
            Region::Rect {
                x,
                y,
                width,
                height,
            } => RegionBounds {
                x: *x,
                y: *y,
                width: *width,
                height: *height,
            },
            Region::Polygon { vertices } => {
                let mut min_x = f32::INFINITY;
                let mut min_y = f32::INFINITY;
                let mut max_x = f32::NEG_INFINITY;
                let mut max_y = f32::NEG_INFINITY;
                for v in vertices {
                    min_x = min_x.min(v.x);
                    min_y = min_y.min(v.y);
                    max_x = max_x.max(v.x);
                    max_y = max_y.max(v.y);
                }
                if vertices.is_empty() {
                    return RegionBounds {
                        x: 0,
                        y: 0,
                        width: 0,
                        height: 0,
                    };
                }
                let x0 = min_x.floor() as i32;
                let y0 = min_y.floor() as i32;
                let x1 = max_x.ceil() as i32;
                let y1 = max_y.ceil() as i32;
                RegionBounds {
                    x: x0,
                    y: y0,
                    width: (x1 - x0).max(0) as u32,
                    height: (y1 - y0).max(0) as u32,
                }
            }
        }
    }

    /// Whether the pixel center `(px + 0.5, py + 0.5)` belongs to the region.
    ///
    /// Rectangles contain every pixel of their bounds; polygons use an
    /// even-odd ray test.
    pub fn contains_pixel(&self, px: i32, py: i32) -> bool {
        match self {
            Region::Rect {
                x,
                y,
                width,
                height,
            } => {
                px >= *x && py >= *y && px < x + *width as i32 && py < y + *height as i32
            }
            Region::Polygon { vertices } => {
                let x = px as f32 + 0.5;
                let y = py as f32 + 0.5;
                let mut inside = false;
                let n = vertices.len();
                let mut j = n.wrapping_sub(1);
                for i in 0..n {
                    let (vi, vj) = (vertices[i], vertices[j]);
                    if (vi.y > y) != (vj.y > y) {
                        let t = (y - vi.y) / (vj.y - vi.y);
                        if x < vi.x + t * (vj.x - vi.x) {
                            inside = !inside;
                        }
                    }
                    j = i;
                }
                inside
            }
        }
    }

    /// Region with all coordinates scaled by `(sx, sy)`.
    ///
    /// Used on the degraded (non-registered) path when the captured image
    /// resolution differs from the template reference resolution.
    pub fn scaled(&self, sx: f32, sy: f32) -> Region {
        match self {
            Region::Rect {
                x,
                y,
                width,
                height,
            } => Region::Rect {
                x: (*x as f32 * sx).round() as i32,
                y: (*y as f32 * sy).round() as i32,
                width: (*width as f32 * sx).round().max(0.0) as u32,
                height: (*height as f32 * sy).round().max(0.0) as u32,
            },
            Region::Polygon { vertices } => Region::Polygon {
                vertices: vertices
                    .iter()
                    .map(|v| Point2::new(v.x * sx, v.y * sy))
                    .collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Region {
        Region::Polygon {
            vertices: vec![
                Point2::new(0.0, 0.0),
                Point2::new(10.0, 0.0),
                Point2::new(0.0, 10.0),
            ],
        }
    }

    #[test]
    fn rect_bounds_and_containment() {
        let r = Region::Rect {
            x: 5,
            y: 6,
            width: 4,
            height: 3,
        };
        assert_eq!(
            r.bounds(),
            RegionBounds {
                x: 5,
                y: 6,
                width: 4,
                height: 3
            }
        );
        assert!(r.contains_pixel(5, 6));
        assert!(r.contains_pixel(8, 8));
        assert!(!r.contains_pixel(9, 6));
        assert!(!r.contains_pixel(5, 9));
    }

    #[test]
    fn polygon_bounds_cover_vertices() {
        let b = triangle().bounds();
        assert_eq!((b.x, b.y), (0, 0));
        assert_eq!((b.width, b.height), (10, 10));
    }

    #[test]
    fn polygon_masks_outside_pixels() {
        let t = triangle();
        assert!(t.contains_pixel(1, 1));
        // far corner of the bounding box lies outside the triangle
        assert!(!t.contains_pixel(9, 9));
    }

    #[test]
    fn scaling_is_deterministic() {
        let r = Region::Rect {
            x: 10,
            y: 20,
            width: 30,
            height: 40,
        };
        let s = r.scaled(0.5, 2.0);
        assert_eq!(
            s,
            Region::Rect {
                x: 5,
                y: 40,
                width: 15,
                height: 80
            }
        );
    }

    #[test]
    fn validation_rejects_bad_shapes() {
        assert!(Region::Rect {
            x: 0,
            y: 0,
            width: 0,
            height: 5
        }
        .validate()
        .is_err());
        assert!(Region::Polygon {
            vertices: vec![Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)],
        }
        .validate()
        .is_err());
        assert!(triangle().validate().is_ok());
    }

    #[test]
    fn region_serde_round_trip() {
        let r = triangle();
        let json = serde_json::to_string(&r).expect("serialize");
        assert!(json.contains("\"kind\":\"polygon\""));
        let back: Region = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, r);
    }
}
