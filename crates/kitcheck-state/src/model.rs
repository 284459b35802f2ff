//! Toolkit instances and check-in records.

use chrono::{DateTime, Utc};
use kitcheck_analyze::{RegistrationInfo, SlotStatus, SlotVerdict, Summary};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a toolkit instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolkitStatus {
    /// Created but never analyzed.
    NeverChecked,
    /// Last check-in found every slot present.
    CheckedIn,
    /// Handed out for use.
    CheckedOut,
    /// Last check-in found missing or uncertain slots.
    Incomplete,
}

/// Current state of one slot, refreshed on every check-in.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SlotState {
    pub tool_id: String,
    pub name: String,
    pub status: SlotStatus,
    pub confidence: f32,
    /// Last time this slot was seen `present`.
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

/// A physical toolkit instance bound to a template.
///
/// `status` and `slots` are the only fields the core mutates; both are
/// overwritten atomically per check-in/checkout event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Toolkit {
    pub toolkit_id: String,
    pub template_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: ToolkitStatus,
    /// Current location or assignee.
    #[serde(default)]
    pub location: Option<String>,
    pub slots: Vec<SlotState>,
    #[serde(default)]
    pub last_checkin: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_checkout: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only record of one check-in event.
///
/// Never mutated after creation; the record stream is the source of truth
/// for toolkit history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckInRecord {
    /// Unique, timestamp-derived identifier (`ci_<toolkit>_<utc stamp>`).
    pub checkin_id: String,
    pub toolkit_id: String,
    pub template_id: String,
    pub timestamp: DateTime<Utc>,
    /// Toolkit status this check-in resulted in.
    pub status: ToolkitStatus,
    pub verdicts: Vec<SlotVerdict>,
    pub summary: Summary,
    #[serde(default)]
    pub registration: Option<RegistrationInfo>,
    #[serde(default)]
    pub checked_in_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Path or key of the stored annotated image, if one was persisted.
    #[serde(default)]
    pub annotated_ref: Option<String>,
}

impl CheckInRecord {
    /// Derive the record id from its toolkit and timestamp.
    pub fn derive_id(toolkit_id: &str, timestamp: DateTime<Utc>) -> String {
        format!("ci_{}_{}", toolkit_id, timestamp.format("%Y%m%d_%H%M%S"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn record_id_is_timestamp_derived() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 7).unwrap();
        assert_eq!(
            CheckInRecord::derive_id("MKA-001", ts),
            "ci_MKA-001_20240305_143007"
        );
    }

    #[test]
    fn toolkit_status_serializes_snake_case() {
        let json = serde_json::to_string(&ToolkitStatus::NeverChecked).expect("serialize");
        assert_eq!(json, "\"never_checked\"");
        let back: ToolkitStatus = serde_json::from_str("\"checked_out\"").expect("deserialize");
        assert_eq!(back, ToolkitStatus::CheckedOut);
    }
}
