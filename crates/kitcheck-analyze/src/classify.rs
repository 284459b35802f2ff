//! Presence classification.
//!
//! Stateless and pure: identical signals always produce identical
//! verdicts. Weights and cutoffs are global constants; per-template tuning
//! stops at the extraction thresholds. Making these configurable is a
//! known limitation.

use crate::signals::RegionSignals;
use serde::{Deserialize, Serialize};

pub const WEIGHT_BRIGHTNESS: f32 = 0.5;
pub const WEIGHT_SATURATION: f32 = 0.3;
pub const WEIGHT_EDGES: f32 = 0.2;

/// Confidence at or above this is a `Present` verdict.
pub const PRESENT_CUTOFF: f32 = 0.7;
/// Confidence at or below this is a `Missing` verdict.
pub const MISSING_CUTOFF: f32 = 0.3;

/// Discrete presence verdict for one slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Present,
    Missing,
    Uncertain,
}

/// Verdict for one slot, with the signals that produced it exposed
/// verbatim for UI diagnostics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SlotVerdict {
    pub tool_id: String,
    pub name: String,
    pub slot_index: u32,
    pub status: SlotStatus,
    /// Combined confidence score in [0, 1].
    pub confidence: f32,
    pub signals: RegionSignals,
}

/// Weighted combination of the three signal ratios, clamped to [0, 1].
pub fn confidence(signals: &RegionSignals) -> f32 {
    (WEIGHT_BRIGHTNESS * signals.brightness_ratio
        + WEIGHT_SATURATION * signals.saturation_ratio
        + WEIGHT_EDGES * signals.edge_density)
        .clamp(0.0, 1.0)
}

/// Classify a slot from its signals.
pub fn classify(signals: &RegionSignals) -> (SlotStatus, f32) {
    let score = confidence(signals);
    let status = if score >= PRESENT_CUTOFF {
        SlotStatus::Present
    } else if score <= MISSING_CUTOFF {
        SlotStatus::Missing
    } else {
        SlotStatus::Uncertain
    };
    (status, score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(brightness: f32, saturation: f32, edges: f32) -> RegionSignals {
        RegionSignals {
            brightness_ratio: brightness,
            saturation_ratio: saturation,
            edge_density: edges,
            mean_brightness: 0.0,
        }
    }

    #[test]
    fn classification_is_idempotent() {
        let s = signals(0.8, 0.6, 0.3);
        let first = classify(&s);
        for _ in 0..10 {
            assert_eq!(classify(&s), first);
        }
    }

    #[test]
    fn saturated_signals_are_present() {
        // 0.5 + 0.3 + 0.2 = 1.0
        let (status, score) = classify(&signals(1.0, 1.0, 1.0));
        assert_eq!(status, SlotStatus::Present);
        assert!((score - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn zero_signals_are_missing() {
        let (status, score) = classify(&signals(0.0, 0.0, 0.0));
        assert_eq!(status, SlotStatus::Missing);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn cutoffs_are_inclusive() {
        // exactly 0.7: 0.5*1.0 + 0.3*... pick brightness=1.0, saturation=2/3
        let (status, score) = classify(&signals(1.0, 2.0 / 3.0, 0.0));
        assert!((score - 0.7).abs() < 1e-6);
        assert_eq!(status, SlotStatus::Present);

        // exactly 0.3 via saturation alone
        let (status, score) = classify(&signals(0.0, 1.0, 0.0));
        assert!((score - 0.3).abs() < 1e-6);
        assert_eq!(status, SlotStatus::Missing);
    }

    #[test]
    fn midpoint_is_uncertain() {
        let (status, score) = classify(&signals(1.0, 0.0, 0.0));
        assert!((score - 0.5).abs() < 1e-6);
        assert_eq!(status, SlotStatus::Uncertain);
    }
}
