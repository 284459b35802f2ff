//! Marker code dictionary.
//!
//! Codes are generated deterministically instead of being shipped as a
//! data table: a fixed-seed generator proposes candidate codes and a
//! greedy filter keeps those far enough (in rotated Hamming distance) from
//! everything already accepted, including their own rotations. The same
//! seed always yields the same dictionary, so printed markers stay valid
//! across releases.

use crate::matcher::rotate_code;
use std::sync::OnceLock;

/// A fixed marker dictionary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dictionary {
    /// Human-readable name (for logging and reports).
    pub name: &'static str,
    /// Marker side length in bits (inner payload, border excluded).
    pub marker_size: usize,
    /// Minimum rotated Hamming distance between any two dictionary entries.
    pub min_distance: u8,
    /// One `u64` per marker id, inner bits row-major, **black = 1**.
    pub codes: Vec<u64>,
}

impl Dictionary {
    /// Total number of payload bits per marker.
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }

    /// Maximum Hamming distance the matcher may correct without risking
    /// id confusion.
    #[inline]
    pub fn max_correction_bits(&self) -> u8 {
        self.min_distance.saturating_sub(1) / 2
    }

    /// Generate a dictionary with `count` codes of `marker_size`×`marker_size`
    /// bits, every pair (and every pair of rotations, including a code's own
    /// non-identity rotations) at least `min_distance` apart.
    ///
    /// Returns `None` when the constraints cannot be met within the attempt
    /// budget; the built-in configuration is well inside feasible territory.
    pub fn generate(
        name: &'static str,
        marker_size: usize,
        count: usize,
        min_distance: u8,
        seed: u64,
    ) -> Option<Dictionary> {
        let bits = marker_size * marker_size;
        if bits == 0 || bits > 64 {
            return None;
        }
        let mask = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };

        let mut state = seed;
        let mut codes: Vec<u64> = Vec::with_capacity(count);
        let mut attempts = 0usize;
        const MAX_ATTEMPTS: usize = 200_000;

        while codes.len() < count && attempts < MAX_ATTEMPTS {
            attempts += 1;
            state = splitmix(state);
            let candidate = state & mask;

            if !rotation_unambiguous(candidate, marker_size, min_distance) {
                continue;
            }
            let far_enough = codes.iter().all(|&existing| {
                (0..4).all(|r| {
                    let rotated = rotate_code(existing, marker_size, r);
                    hamming(candidate, rotated) >= min_distance as u32
                })
            });
            if far_enough {
                codes.push(candidate);
            }
        }

        if codes.len() < count {
            return None;
        }
        Some(Dictionary {
            name,
            marker_size,
            min_distance,
            codes,
        })
    }
}

/// The built-in toolkit dictionary: 4×4 payload, 16 ids.
///
/// Only ids 0..=3 are used as corner fiducials; the remaining ids are
/// headroom for kit labeling.
pub fn toolkit_dictionary() -> &'static Dictionary {
    static DICT: OnceLock<Dictionary> = OnceLock::new();
    DICT.get_or_init(|| {
        Dictionary::generate("KIT_4X4_16", 4, 16, 4, 0x6b69_7463_6865_636b)
            .expect("built-in dictionary parameters are feasible")
    })
}

#[inline]
fn hamming(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

/// A code must differ from its own non-identity rotations, otherwise the
/// decoded orientation is undefined.
fn rotation_unambiguous(code: u64, n: usize, min_distance: u8) -> bool {
    (1..4).all(|r| hamming(code, rotate_code(code, n, r)) >= min_distance as u32)
}

/// splitmix64 step; deterministic and platform-independent.
fn splitmix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
