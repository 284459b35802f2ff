//! The check-in analysis pipeline.

use crate::classify::{classify, SlotStatus, SlotVerdict};
use crate::config::DetectionConfig;
use crate::registration::{register, RegistrationInfo};
use crate::signals::{extract_signals, RegionSignals};
use crate::template::{Template, TemplateError};
use crate::visualize::{annotate, draw_markers};
use kitcheck_core::{rgb_to_gray, Region, RgbImage, RgbImageView};
use kitcheck_marker::{locate_markers, toolkit_dictionary, LocateParams};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Aggregate outcome of one analysis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Every slot verdict is `present`.
    Complete,
    /// At least one slot is `missing` or `uncertain`.
    Incomplete,
}

/// Verdict counts; always sums to the slot count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub present: usize,
    pub missing: usize,
    pub uncertain: usize,
}

impl Summary {
    pub fn from_verdicts(verdicts: &[SlotVerdict]) -> Self {
        let mut s = Summary {
            total: verdicts.len(),
            ..Summary::default()
        };
        for v in verdicts {
            match v.status {
                SlotStatus::Present => s.present += 1,
                SlotStatus::Missing => s.missing += 1,
                SlotStatus::Uncertain => s.uncertain += 1,
            }
        }
        s
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.missing == 0 && self.uncertain == 0
    }
}

/// Errors that abort an analysis before any image work.
#[derive(thiserror::Error, Debug)]
pub enum AnalyzeError {
    #[error("template not usable for analysis: {0}")]
    Configuration(#[from] TemplateError),
}

/// Result of analyzing one captured image against a template.
#[derive(Clone, Debug)]
pub struct AnalysisResult {
    pub template_id: String,
    pub status: AnalysisStatus,
    pub per_slot: Vec<SlotVerdict>,
    pub summary: Summary,
    pub registration: RegistrationInfo,
    /// Annotated review image; `None` when rendering is disabled.
    pub annotated: Option<RgbImage>,
}

/// The two-stage analysis pipeline: registration, then per-slot
/// classification.
///
/// Pure over its inputs; safe to run for different toolkits concurrently.
#[derive(Clone, Debug)]
pub struct AnalysisPipeline {
    config: DetectionConfig,
    locate: LocateParams,
    render_annotated: bool,
    render_markers: bool,
}

impl Default for AnalysisPipeline {
    fn default() -> Self {
        Self {
            config: DetectionConfig::default(),
            locate: LocateParams::default(),
            render_annotated: true,
            render_markers: false,
        }
    }
}

impl AnalysisPipeline {
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Disable or enable the annotated review image.
    pub fn with_annotated(mut self, enabled: bool) -> Self {
        self.render_annotated = enabled;
        self
    }

    /// Also overlay located markers on the annotated image.
    pub fn with_marker_overlay(mut self, enabled: bool) -> Self {
        self.render_markers = enabled;
        self
    }

    #[inline]
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Analyze one captured image against a template.
    ///
    /// Fails only on unusable templates; registration problems and
    /// per-slot sampling problems degrade into diagnostics and
    /// `uncertain` verdicts respectively.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, template, captured),
            fields(
                template = %template.template_id,
                width = captured.width,
                height = captured.height
            )
        )
    )]
    pub fn analyze(
        &self,
        template: &Template,
        captured: &RgbImageView<'_>,
    ) -> Result<AnalysisResult, AnalyzeError> {
        template.validate_for_analysis()?;

        let gray = rgb_to_gray(captured);
        let markers = locate_markers(&gray.as_view(), toolkit_dictionary(), &self.locate);
        let registration = register(captured, &markers, template);

        let working: RgbImageView<'_> = match &registration.warped {
            Some(w) => w.as_view(),
            None => *captured,
        };

        let cfg = self.config.resolve(template.thresholds.as_ref());
        let (sx, sy) = registration.roi_scale;

        let mut verdicts: Vec<SlotVerdict> = Vec::with_capacity(template.tools.len());
        let mut working_regions: Vec<Region> = Vec::with_capacity(template.tools.len());

        for tool in &template.tools {
            let region = tool.region.as_ref().ok_or_else(|| {
                TemplateError::MissingRegion {
                    tool_id: tool.tool_id.clone(),
                }
            })?;
            let working_region = if registration.is_registered() {
                region.clone()
            } else {
                region.scaled(sx, sy)
            };

            let (status, confidence, signals) =
                match extract_signals(&working, &working_region, &cfg) {
                    Some(signals) => {
                        let (status, confidence) = classify(&signals);
                        (status, confidence, signals)
                    }
                    None => {
                        // a slot that cannot be sampled must not block the
                        // rest of the toolkit
                        log::warn!(
                            "slot '{}' falls outside the working image; marking uncertain",
                            tool.tool_id
                        );
                        (SlotStatus::Uncertain, 0.0, RegionSignals::zeroed())
                    }
                };

            verdicts.push(SlotVerdict {
                tool_id: tool.tool_id.clone(),
                name: tool.name.clone(),
                slot_index: tool.slot_index,
                status,
                confidence,
                signals,
            });
            working_regions.push(working_region);
        }

        let summary = Summary::from_verdicts(&verdicts);
        let status = if summary.is_complete() {
            AnalysisStatus::Complete
        } else {
            AnalysisStatus::Incomplete
        };

        let annotated = if self.render_annotated {
            let mut img = annotate(&working, &verdicts, &working_regions);
            if self.render_markers && !registration.is_registered() {
                draw_markers(&mut img, &markers);
            }
            Some(img)
        } else {
            None
        };

        log::info!(
            "analysis of template '{}': {:?} ({} present / {} missing / {} uncertain of {})",
            template.template_id,
            status,
            summary.present,
            summary.missing,
            summary.uncertain,
            summary.total
        );

        Ok(AnalysisResult {
            template_id: template.template_id.clone(),
            status,
            per_slot: verdicts,
            summary,
            registration: registration.info,
            annotated,
        })
    }
}

/// Locate markers in an already-grayscale captured image.
///
/// Standalone entry point for template-authoring tooling that wants to
/// preview marker alignment without a full analysis.
pub fn detect_markers(gray: &kitcheck_core::GrayImageView<'_>) -> Vec<kitcheck_marker::Marker> {
    locate_markers(gray, toolkit_dictionary(), &LocateParams::default())
}
