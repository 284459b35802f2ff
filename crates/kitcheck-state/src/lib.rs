//! Toolkit lifecycle state.
//!
//! A toolkit is an instance of a template bound to a physical box. Its
//! status is driven by two events: `checkin` (a photo analysis applied
//! through the transition engine) and `checkout`. Check-ins append
//! immutable [`CheckInRecord`]s; the toolkit's slot snapshot is the
//! materialized view of the latest record.

mod model;
mod service;
mod store;
mod transition;

pub use model::{CheckInRecord, SlotState, Toolkit, ToolkitStatus};
pub use service::{CheckInOutcome, CheckInService, ServiceError};
pub use store::{HistoryStore, JsonFileStore, StoreError, TemplateStore, ToolkitStore};
pub use transition::{
    apply_checkin, apply_checkout, rebuild_from_record, status_after_checkin, TransitionError,
};
