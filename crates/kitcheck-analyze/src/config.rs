//! Detection thresholds: global defaults plus per-template overrides.
//!
//! Resolution is a pure merge done once per analysis, never mutable global
//! state: `DetectionConfig::resolve` folds a template's overrides over the
//! defaults and the result is threaded through signal extraction.

use serde::{Deserialize, Serialize};

/// Pixel-level thresholds used by signal extraction (0-255 scales).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Luma above which a pixel counts as bright.
    pub brightness_threshold: u8,
    /// Saturation above which a pixel counts as colored.
    pub saturation_threshold: u8,
    /// Sobel gradient magnitude above which a pixel counts as an edge.
    pub edge_gradient_threshold: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        // tuned for tools in dark foam cutouts
        Self {
            brightness_threshold: 60,
            saturation_threshold: 40,
            edge_gradient_threshold: 50.0,
        }
    }
}

impl DetectionConfig {
    /// Fold a template's overrides over these defaults.
    pub fn resolve(&self, overrides: Option<&ThresholdOverrides>) -> DetectionConfig {
        let Some(o) = overrides else {
            return *self;
        };
        DetectionConfig {
            brightness_threshold: o.brightness_threshold.unwrap_or(self.brightness_threshold),
            saturation_threshold: o.saturation_threshold.unwrap_or(self.saturation_threshold),
            edge_gradient_threshold: o
                .edge_gradient_threshold
                .unwrap_or(self.edge_gradient_threshold),
        }
    }
}

/// Optional per-template threshold overrides; unset fields inherit the
/// global defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdOverrides {
    #[serde(default)]
    pub brightness_threshold: Option<u8>,
    #[serde(default)]
    pub saturation_threshold: Option<u8>,
    #[serde(default)]
    pub edge_gradient_threshold: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_overrides_keeps_defaults() {
        let cfg = DetectionConfig::default();
        assert_eq!(cfg.resolve(None), cfg);
    }

    #[test]
    fn partial_overrides_merge_over_defaults() {
        let cfg = DetectionConfig::default();
        let o = ThresholdOverrides {
            brightness_threshold: Some(90),
            ..ThresholdOverrides::default()
        };
        let resolved = cfg.resolve(Some(&o));
        assert_eq!(resolved.brightness_threshold, 90);
        assert_eq!(resolved.saturation_threshold, cfg.saturation_threshold);
        assert_eq!(
            resolved.edge_gradient_threshold,
            cfg.edge_gradient_threshold
        );
    }
}
