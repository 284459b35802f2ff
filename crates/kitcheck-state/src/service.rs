//! Check-in/checkout orchestration over the stores and the analysis
//! pipeline.

use crate::model::{CheckInRecord, SlotState, Toolkit, ToolkitStatus};
use crate::store::{HistoryStore, StoreError, TemplateStore, ToolkitStore};
use crate::transition::{apply_checkin, apply_checkout, TransitionError};
use chrono::Utc;
use kitcheck_analyze::{AnalysisPipeline, AnalyzeError, ReferenceMarkers, SlotStatus, Template};
use kitcheck_core::{RgbImage, RgbImageView};

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Analyze(#[from] AnalyzeError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("toolkit '{0}' already exists")]
    AlreadyExists(String),
}

/// Everything one check-in produced.
#[derive(Debug)]
pub struct CheckInOutcome {
    pub toolkit: Toolkit,
    pub record: CheckInRecord,
    /// Annotated review image, when the pipeline rendered one.
    pub annotated: Option<RgbImage>,
}

/// Orchestrates check-ins and checkouts for one store backend.
///
/// Each mutating call is a single read-modify-write on the toolkit;
/// concurrent events for the *same* toolkit id must be serialized by the
/// persistence layer, different toolkits are independent.
pub struct CheckInService<S> {
    stores: S,
    pipeline: AnalysisPipeline,
}

impl<S> CheckInService<S>
where
    S: TemplateStore + ToolkitStore + HistoryStore,
{
    pub fn new(stores: S, pipeline: AnalysisPipeline) -> Self {
        Self { stores, pipeline }
    }

    #[inline]
    pub fn stores(&self) -> &S {
        &self.stores
    }

    /// Create a toolkit instance from a template, with every slot unknown
    /// until the first check-in.
    pub fn create_toolkit(
        &self,
        toolkit_id: &str,
        template_id: &str,
        name: &str,
        location: Option<String>,
    ) -> Result<Toolkit, ServiceError> {
        let template = self.stores.get_template(template_id)?;
        if self.stores.get_toolkit(toolkit_id).is_ok() {
            return Err(ServiceError::AlreadyExists(toolkit_id.to_string()));
        }

        let now = Utc::now();
        let toolkit = Toolkit {
            toolkit_id: toolkit_id.to_string(),
            template_id: template_id.to_string(),
            name: name.to_string(),
            description: None,
            status: ToolkitStatus::NeverChecked,
            location,
            slots: template
                .tools
                .iter()
                .map(|tool| SlotState {
                    tool_id: tool.tool_id.clone(),
                    name: tool.name.clone(),
                    status: SlotStatus::Uncertain,
                    confidence: 0.0,
                    last_seen: None,
                })
                .collect(),
            last_checkin: None,
            last_checkout: None,
            created_at: now,
            updated_at: now,
        };
        self.stores.put_toolkit(&toolkit)?;
        Ok(toolkit)
    }

    /// Run a full check-in: analyze the photo, transition the toolkit,
    /// persist the new state and append the history record.
    pub fn check_in(
        &self,
        toolkit_id: &str,
        captured: &RgbImageView<'_>,
        checked_in_by: Option<String>,
        notes: Option<String>,
    ) -> Result<CheckInOutcome, ServiceError> {
        let mut toolkit = self.stores.get_toolkit(toolkit_id)?;
        let template = self.stores.get_template(&toolkit.template_id)?;

        let mut analysis = self.pipeline.analyze(&template, captured)?;
        let annotated = analysis.annotated.take();

        let record = apply_checkin(&mut toolkit, &analysis, Utc::now(), checked_in_by, notes);

        self.stores.put_toolkit(&toolkit)?;
        self.stores.append_record(&record)?;

        Ok(CheckInOutcome {
            toolkit,
            record,
            annotated,
        })
    }

    /// Check a toolkit out.
    pub fn check_out(
        &self,
        toolkit_id: &str,
        location: Option<String>,
    ) -> Result<Toolkit, ServiceError> {
        let mut toolkit = self.stores.get_toolkit(toolkit_id)?;
        apply_checkout(&mut toolkit, Utc::now(), location)?;
        self.stores.put_toolkit(&toolkit)?;
        Ok(toolkit)
    }

    /// Check-in history for a toolkit, most recent first.
    pub fn history(
        &self,
        toolkit_id: &str,
        limit: usize,
    ) -> Result<Vec<CheckInRecord>, ServiceError> {
        Ok(self.stores.history(toolkit_id, limit)?)
    }

    /// Attach a new reference image to a template.
    ///
    /// Stores the encoded image, adopts its dimensions as the template's
    /// reference frame, and replaces the corner marker layout (cleared
    /// when the caller could not locate a complete set).
    pub fn set_reference_image(
        &self,
        template_id: &str,
        image_bytes: &[u8],
        width: u32,
        height: u32,
        reference_markers: Option<ReferenceMarkers>,
    ) -> Result<Template, ServiceError> {
        let mut template = self.stores.get_template(template_id)?;
        self.stores.put_reference_image(template_id, image_bytes)?;

        if reference_markers.is_none() {
            log::warn!(
                "template '{template_id}': reference image has no complete corner marker set; \
                 check-ins will use the scaled fallback"
            );
        }
        template.image_width = width;
        template.image_height = height;
        template.reference_markers = reference_markers;
        template.updated_at = Utc::now();
        self.stores.put_template(&template)?;
        Ok(template)
    }
}
