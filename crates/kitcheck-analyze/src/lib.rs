//! Toolkit photo analysis.
//!
//! This crate wires the check-in pipeline together: locate corner
//! fiducials, register the photo against the template reference frame (or
//! fall back to resolution scaling), extract per-slot pixel signals,
//! classify slot presence, and render the annotated review image.
//!
//! The pipeline is synchronous and pure: the same template and pixels
//! always produce the same result. Toolkit state is owned by
//! `kitcheck-state`; the caller feeds the verdicts into its transition
//! engine.

mod classify;
mod config;
mod pipeline;
mod registration;
mod signals;
mod template;
mod visualize;

pub use classify::{
    classify, confidence, SlotStatus, SlotVerdict, MISSING_CUTOFF, PRESENT_CUTOFF,
    WEIGHT_BRIGHTNESS, WEIGHT_EDGES, WEIGHT_SATURATION,
};
pub use config::{DetectionConfig, ThresholdOverrides};
pub use pipeline::{
    detect_markers, AnalysisPipeline, AnalysisResult, AnalysisStatus, AnalyzeError, Summary,
};
pub use registration::{register, DegradedReason, Registration, RegistrationInfo};
pub use signals::{extract_signals, RegionSignals};
pub use template::{FoamColor, ReferenceMarkers, Template, TemplateError, ToolDefinition};
pub use visualize::{annotate, draw_markers, status_color};
