//! Template: the immutable layout blueprint of a toolkit type.

use crate::config::ThresholdOverrides;
use chrono::{DateTime, Utc};
use kitcheck_core::{Region, RegionError};
use kitcheck_marker::{Marker, CORNER_MARKER_IDS};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Foam colors a template may declare; informational for operators and a
/// hook for future per-color tuning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoamColor {
    #[default]
    DarkGrey,
    Black,
    Yellow,
    Red,
    Blue,
}

/// One tool slot in the template layout.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub tool_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// 1-based position in the layout; ordering is stable across edits.
    pub slot_index: u32,
    /// Editing may leave this unset; analysis refuses templates with
    /// region-less tools.
    #[serde(default)]
    pub region: Option<Region>,
}

/// Centers of the four corner fiducials on the reference image, keyed by
/// their fixed ids (0=TL, 1=TR, 2=BR, 3=BL).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceMarkers {
    pub top_left: Point2<f32>,
    pub top_right: Point2<f32>,
    pub bottom_right: Point2<f32>,
    pub bottom_left: Point2<f32>,
}

impl ReferenceMarkers {
    /// Centers in fixed id order 0..=3.
    pub fn centers(&self) -> [Point2<f32>; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Build the corner layout from located markers.
    ///
    /// Returns `None` unless all four corner ids are present.
    pub fn from_markers(markers: &[Marker]) -> Option<Self> {
        let center = |id: u32| markers.iter().find(|m| m.id == id).map(|m| m.center);
        Some(Self {
            top_left: center(CORNER_MARKER_IDS[0])?,
            top_right: center(CORNER_MARKER_IDS[1])?,
            bottom_right: center(CORNER_MARKER_IDS[2])?,
            bottom_left: center(CORNER_MARKER_IDS[3])?,
        })
    }
}

/// Errors that make a template unusable for analysis.
///
/// These are setup bugs, not runtime conditions, so the whole analysis
/// fails before any image work.
#[derive(thiserror::Error, Debug)]
pub enum TemplateError {
    #[error("template '{template_id}' has no tool definitions")]
    NoTools { template_id: String },
    #[error("tool '{tool_id}' has no region")]
    MissingRegion { tool_id: String },
    #[error("tool '{tool_id}' region invalid: {source}")]
    InvalidRegion {
        tool_id: String,
        source: RegionError,
    },
    #[error("reference dimensions must be positive, got {width}x{height}")]
    BadReferenceDimensions { width: u32, height: u32 },
}

/// Immutable layout blueprint for a toolkit type.
///
/// Produced and edited by CRUD tooling; the analysis pipeline only reads
/// it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Template {
    pub template_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub foam_color: FoamColor,
    /// Reference image dimensions; slot regions are expressed in this
    /// coordinate frame.
    pub image_width: u32,
    pub image_height: u32,
    pub tools: Vec<ToolDefinition>,
    /// Per-template detection threshold overrides over the global config.
    #[serde(default)]
    pub thresholds: Option<ThresholdOverrides>,
    /// Corner fiducial centers on the reference image, when the reference
    /// photo carries markers.
    #[serde(default)]
    pub reference_markers: Option<ReferenceMarkers>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    /// Check the invariants analysis relies on: positive reference
    /// dimensions, at least one tool, and a valid region on every tool.
    pub fn validate_for_analysis(&self) -> Result<(), TemplateError> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err(TemplateError::BadReferenceDimensions {
                width: self.image_width,
                height: self.image_height,
            });
        }
        if self.tools.is_empty() {
            return Err(TemplateError::NoTools {
                template_id: self.template_id.clone(),
            });
        }
        for tool in &self.tools {
            let region = tool.region.as_ref().ok_or_else(|| {
                TemplateError::MissingRegion {
                    tool_id: tool.tool_id.clone(),
                }
            })?;
            region.validate().map_err(|source| TemplateError::InvalidRegion {
                tool_id: tool.tool_id.clone(),
                source,
            })?;
        }
        Ok(())
    }
}
