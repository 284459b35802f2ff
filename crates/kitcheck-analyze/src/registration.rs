//! Geometric registration of a captured photo against the template
//! reference frame.
//!
//! Registration is best-effort by design: a complete fiducial set on both
//! sides yields a perspective warp into the reference frame; anything less
//! falls back to plain resolution scaling of the slot regions. Neither
//! path can fail the check-in.

use crate::template::{ReferenceMarkers, Template};
use kitcheck_core::{perspective_from_quad, warp_perspective_rgb, RgbImage, RgbImageView};
use kitcheck_marker::{Marker, CORNER_MARKER_IDS};
use serde::{Deserialize, Serialize};

/// Why the degraded path was taken.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedReason {
    /// The template reference image carries no marker layout.
    NoReferenceLayout,
    /// The captured photo exposed fewer than the four corner ids.
    IncompleteCapture { found: usize },
    /// Marker geometry did not admit a perspective transform.
    DegenerateGeometry,
}

impl DegradedReason {
    fn describe(&self) -> String {
        match self {
            DegradedReason::NoReferenceLayout => {
                "template has no reference marker layout".to_string()
            }
            DegradedReason::IncompleteCapture { found } => {
                format!("only {found} of 4 corner markers detected")
            }
            DegradedReason::DegenerateGeometry => {
                "marker geometry does not admit a perspective transform".to_string()
            }
        }
    }
}

/// Registration diagnostics, persisted with each check-in record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegistrationInfo {
    pub markers_detected: usize,
    pub markers_expected: usize,
    pub homography_applied: bool,
    #[serde(default)]
    pub fallback_reason: Option<String>,
}

/// Outcome of registering one captured image.
#[derive(Debug)]
pub struct Registration {
    /// Warped image in the reference frame, when registration succeeded.
    pub warped: Option<RgbImage>,
    /// Region scale factors for the degraded path (1.0 when registered).
    pub roi_scale: (f32, f32),
    pub info: RegistrationInfo,
}

impl Registration {
    /// True when the photo was warped into the reference frame.
    #[inline]
    pub fn is_registered(&self) -> bool {
        self.warped.is_some()
    }
}

/// Register `captured` against the template's reference frame.
///
/// On the degraded path the captured image is used as-is and slot regions
/// are scaled by the resolution ratio between the capture and the
/// reference.
pub fn register(
    captured: &RgbImageView<'_>,
    captured_markers: &[Marker],
    template: &Template,
) -> Registration {
    let detected = captured_markers.len();

    let degraded = |reason: DegradedReason| {
        log::info!("registration degraded: {}", reason.describe());
        Registration {
            warped: None,
            roi_scale: (
                captured.width as f32 / template.image_width as f32,
                captured.height as f32 / template.image_height as f32,
            ),
            info: RegistrationInfo {
                markers_detected: detected,
                markers_expected: CORNER_MARKER_IDS.len(),
                homography_applied: false,
                fallback_reason: Some(reason.describe()),
            },
        }
    };

    let Some(reference) = template.reference_markers else {
        return degraded(DegradedReason::NoReferenceLayout);
    };
    let Some(captured_layout) = ReferenceMarkers::from_markers(captured_markers) else {
        let found = CORNER_MARKER_IDS
            .iter()
            .filter(|id| captured_markers.iter().any(|m| m.id == **id))
            .count();
        return degraded(DegradedReason::IncompleteCapture { found });
    };

    // H maps reference coordinates to captured coordinates; warping pulls
    // each reference-frame pixel from the capture through it.
    let Some(h) = perspective_from_quad(&reference.centers(), &captured_layout.centers()) else {
        return degraded(DegradedReason::DegenerateGeometry);
    };

    let warped = warp_perspective_rgb(
        captured,
        h,
        template.image_width as usize,
        template.image_height as usize,
    );
    log::debug!(
        "registration applied: {}x{} -> {}x{}",
        captured.width,
        captured.height,
        template.image_width,
        template.image_height
    );

    Registration {
        warped: Some(warped),
        roi_scale: (1.0, 1.0),
        info: RegistrationInfo {
            markers_detected: detected,
            markers_expected: CORNER_MARKER_IDS.len(),
            homography_applied: true,
            fallback_reason: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{FoamColor, ReferenceMarkers, Template};
    use chrono::Utc;
    use kitcheck_core::RgbImage;
    use nalgebra::Point2;

    fn template_with_markers(w: u32, h: u32) -> Template {
        Template {
            template_id: "t".into(),
            name: "t".into(),
            description: None,
            foam_color: FoamColor::default(),
            image_width: w,
            image_height: h,
            tools: Vec::new(),
            thresholds: None,
            reference_markers: Some(ReferenceMarkers {
                top_left: Point2::new(20.0, 20.0),
                top_right: Point2::new(180.0, 20.0),
                bottom_right: Point2::new(180.0, 140.0),
                bottom_left: Point2::new(20.0, 140.0),
            }),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn marker_at(id: u32, x: f32, y: f32) -> Marker {
        Marker {
            id,
            corners: [
                Point2::new(x - 5.0, y - 5.0),
                Point2::new(x + 5.0, y - 5.0),
                Point2::new(x + 5.0, y + 5.0),
                Point2::new(x - 5.0, y + 5.0),
            ],
            center: Point2::new(x, y),
            rotation: 0,
            hamming: 0,
            score: 1.0,
        }
    }

    fn gray_capture(w: usize, h: usize) -> RgbImage {
        RgbImage {
            width: w,
            height: h,
            data: vec![128u8; w * h * 3],
        }
    }

    #[test]
    fn complete_sets_register_with_consistent_transform() {
        let template = template_with_markers(200, 160);
        let captured = gray_capture(400, 320);
        // capture is the reference uniformly scaled by 2
        let markers = vec![
            marker_at(0, 40.0, 40.0),
            marker_at(1, 360.0, 40.0),
            marker_at(2, 360.0, 280.0),
            marker_at(3, 40.0, 280.0),
        ];

        let reg = register(&captured.as_view(), &markers, &template);
        assert!(reg.is_registered());
        assert!(reg.info.homography_applied);
        assert_eq!(reg.info.markers_detected, 4);
        assert_eq!(reg.roi_scale, (1.0, 1.0));

        let warped = reg.warped.expect("warped image");
        assert_eq!((warped.width, warped.height), (200, 160));
    }

    #[test]
    fn reference_centers_map_onto_captured_centers() {
        let template = template_with_markers(200, 160);
        let captured = gray_capture(400, 320);
        let markers = vec![
            marker_at(0, 42.0, 38.0),
            marker_at(1, 355.0, 47.0),
            marker_at(2, 362.0, 285.0),
            marker_at(3, 36.0, 276.0),
        ];

        let reference = template.reference_markers.expect("layout").centers();
        let captured_centers: Vec<Point2<f32>> = markers.iter().map(|m| m.center).collect();

        let h = perspective_from_quad(
            &reference,
            &[
                captured_centers[0],
                captured_centers[1],
                captured_centers[2],
                captured_centers[3],
            ],
        )
        .expect("transform");
        for (r, c) in reference.iter().zip(captured_centers.iter()) {
            let mapped = h.apply(*r);
            assert!((mapped - c).norm() < 0.5, "reprojection off: {mapped:?} vs {c:?}");
        }
    }

    #[test]
    fn incomplete_capture_degrades_with_scaling() {
        let template = template_with_markers(200, 160);
        let captured = gray_capture(400, 320);
        let markers = vec![marker_at(0, 40.0, 40.0), marker_at(2, 360.0, 280.0)];

        let reg = register(&captured.as_view(), &markers, &template);
        assert!(!reg.is_registered());
        assert_eq!(reg.roi_scale, (2.0, 2.0));
        assert_eq!(reg.info.markers_detected, 2);
        let reason = reg.info.fallback_reason.expect("reason");
        assert!(reason.contains("2 of 4"));
    }

    #[test]
    fn missing_reference_layout_degrades() {
        let mut template = template_with_markers(200, 160);
        template.reference_markers = None;
        let captured = gray_capture(200, 160);

        let reg = register(&captured.as_view(), &[], &template);
        assert!(!reg.is_registered());
        assert_eq!(reg.roi_scale, (1.0, 1.0));
    }
}
