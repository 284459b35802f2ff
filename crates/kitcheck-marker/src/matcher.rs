//! Rotation-aware code matching.

use crate::Dictionary;

/// A dictionary match for an observed marker code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodeMatch {
    /// Marker id in the dictionary.
    pub id: u32,
    /// Rotation `0..=3` such that `observed == rotate(dict_code, rotation)`.
    pub rotation: u8,
    /// Hamming distance after rotation.
    pub hamming: u8,
}

/// Matcher over a fixed dictionary.
///
/// Brute force over ids and rotations; the dictionary is tiny, so the
/// rotated table stays small and the scan is fast.
#[derive(Clone, Debug)]
pub struct Matcher {
    dict: Dictionary,
    max_hamming: u8,
    rotated: Vec<[u64; 4]>,
}

impl Matcher {
    /// Build a matcher, clamping `max_hamming` to what the dictionary can
    /// correct without ambiguity.
    pub fn new(dict: Dictionary, max_hamming: u8) -> Self {
        let max_hamming = max_hamming.min(dict.max_correction_bits());
        let rotated = dict
            .codes
            .iter()
            .map(|&code| {
                [
                    code,
                    rotate_code(code, dict.marker_size, 1),
                    rotate_code(code, dict.marker_size, 2),
                    rotate_code(code, dict.marker_size, 3),
                ]
            })
            .collect();
        Self {
            dict,
            max_hamming,
            rotated,
        }
    }

    #[inline]
    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    #[inline]
    pub fn max_hamming(&self) -> u8 {
        self.max_hamming
    }

    /// Best match within the Hamming budget, if any.
    pub fn match_code(&self, observed: u64) -> Option<CodeMatch> {
        let mut best: Option<CodeMatch> = None;
        for (id, rots) in self.rotated.iter().enumerate() {
            for (rot, &cand) in rots.iter().enumerate() {
                let h = (observed ^ cand).count_ones() as u8;
                if h > self.max_hamming {
                    continue;
                }
                if best.map_or(true, |prev| h < prev.hamming) {
                    best = Some(CodeMatch {
                        id: id as u32,
                        rotation: rot as u8,
                        hamming: h,
                    });
                    if h == 0 {
                        return best;
                    }
                }
            }
        }
        best
    }
}

/// Rotate a row-major code (`idx = y * n + x`) by `rot` quarter turns.
pub fn rotate_code(code: u64, n: usize, rot: u8) -> u64 {
    let rot = rot & 3;
    if rot == 0 {
        return code;
    }

    let mut out = 0u64;
    for y in 0..n {
        for x in 0..n {
            let (sx, sy) = match rot {
                1 => (y, n - 1 - x),
                2 => (n - 1 - x, n - 1 - y),
                _ => (n - 1 - y, x),
            };
            let bit = (code >> (sy * n + sx)) & 1;
            out |= bit << (y * n + x);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolkit_dictionary;

    #[test]
    fn four_quarter_turns_are_identity() {
        let code = 0xaf37_u64;
        let mut r = code;
        for _ in 0..4 {
            r = rotate_code(r, 4, 1);
        }
        assert_eq!(code, r);
    }

    #[test]
    fn matcher_reports_rotation() {
        let dict = toolkit_dictionary().clone();
        let matcher = Matcher::new(dict.clone(), 0);

        for rot in 0..4u8 {
            let observed = rotate_code(dict.codes[2], dict.marker_size, rot);
            let m = matcher.match_code(observed).expect("match");
            assert_eq!(m.id, 2);
            assert_eq!(m.rotation, rot);
            assert_eq!(m.hamming, 0);
        }
    }

    #[test]
    fn single_bit_error_is_corrected() {
        let dict = toolkit_dictionary().clone();
        let matcher = Matcher::new(dict.clone(), 1);

        let corrupted = dict.codes[5] ^ 0b100;
        let m = matcher.match_code(corrupted).expect("correctable");
        assert_eq!(m.id, 5);
        assert_eq!(m.hamming, 1);
    }

    #[test]
    fn garbage_code_does_not_match_with_zero_budget() {
        let dict = toolkit_dictionary().clone();
        let matcher = Matcher::new(dict.clone(), 0);
        // flip three bits: beyond any zero-budget match, and the dictionary
        // min distance keeps it from reaching another id
        let garbage = dict.codes[0] ^ 0b111;
        assert!(matcher.match_code(garbage).is_none());
    }
}
