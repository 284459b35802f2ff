//! Corner fiducial dictionary and marker locator.
//!
//! Toolkits carry four square fiducial markers, one per board corner, with
//! ids 0..=3 (top-left, top-right, bottom-right, bottom-left). This crate:
//! - generates the deterministic built-in code dictionary,
//! - matches observed codes against it across the four rotations,
//! - locates marker quads in a grayscale image and decodes them.
//!
//! Location fails softly: an image with no recognizable markers yields an
//! empty list, never an error.

mod dictionary;
mod locate;
mod matcher;
mod quads;
mod threshold;

pub use dictionary::{toolkit_dictionary, Dictionary};
pub use locate::{locate_markers, LocateParams, Marker};
pub use matcher::{rotate_code, CodeMatch, Matcher};
pub use quads::{find_quad_candidates, QuadCandidate};
pub use threshold::otsu_threshold;

/// Marker ids expected at the four board corners, in TL, TR, BR, BL order.
pub const CORNER_MARKER_IDS: [u32; 4] = [0, 1, 2, 3];

/// True if `markers` contains every id in [`CORNER_MARKER_IDS`].
pub fn corner_set_complete(markers: &[Marker]) -> bool {
    CORNER_MARKER_IDS
        .iter()
        .all(|id| markers.iter().any(|m| m.id == *id))
}
