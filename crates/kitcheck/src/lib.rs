//! High-level facade crate for the `kitcheck-*` workspace.
//!
//! This crate provides:
//! - stable, convenient re-exports of the underlying crates
//! - (feature-gated) helpers that decode captured photos with the `image`
//!   crate and run the analysis pipeline end to end.
//!
//! ## Quickstart
//!
//! ```no_run
//! use kitcheck::capture;
//! use kitcheck::analyze::AnalysisPipeline;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let template = capture::load_template_json("template.json")?;
//! let photo = std::fs::read("checkin.jpg")?;
//! let rgb = capture::decode_rgb(&photo)?;
//!
//! let result = AnalysisPipeline::default().analyze(&template, &capture::rgb_view(&rgb))?;
//! println!("status: {:?}", result.status);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `kitcheck::core`: image views, regions, perspective transforms.
//! - `kitcheck::marker`: fiducial dictionary and the marker locator.
//! - `kitcheck::analyze`: registration, slot signals, verdicts, rendering.
//! - `kitcheck::state`: toolkit lifecycle, stores and the check-in service.
//! - `kitcheck::capture` (feature `image`): decode helpers bridging the
//!   `image` crate to the pipeline.

pub use kitcheck_analyze as analyze;
pub use kitcheck_core as core;
pub use kitcheck_marker as marker;
pub use kitcheck_state as state;

pub use kitcheck_analyze::{
    AnalysisPipeline, AnalysisResult, AnalysisStatus, SlotStatus, SlotVerdict, Summary, Template,
};
pub use kitcheck_core::Region;
pub use kitcheck_marker::{locate_markers, Marker};
pub use kitcheck_state::{CheckInService, Toolkit, ToolkitStatus};

#[cfg(feature = "image")]
pub mod capture;
