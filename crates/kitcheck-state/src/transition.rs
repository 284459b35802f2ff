//! The status transition engine.
//!
//! State machine over [`ToolkitStatus`] with two events:
//!
//! - `checkin(verdicts)`: reachable from any state; all-present goes to
//!   `CheckedIn`, anything else to `Incomplete`. Replaces the slot
//!   snapshot and produces the immutable record to append.
//! - `checkout()`: only from `CheckedIn` or `Incomplete`. Checking out of
//!   `NeverChecked` or `CheckedOut` is rejected: a box that was never
//!   verified (or is already out) has no meaningful checkout.
//!
//! There is no terminal state; the machine cycles for the toolkit's
//! operational life.

use crate::model::{CheckInRecord, SlotState, Toolkit, ToolkitStatus};
use chrono::{DateTime, Utc};
use kitcheck_analyze::{AnalysisResult, SlotStatus, Summary};

/// Rejected transitions.
#[derive(thiserror::Error, Debug)]
pub enum TransitionError {
    #[error("cannot check out a toolkit in status '{status:?}'")]
    CheckoutNotAllowed { status: ToolkitStatus },
}

/// Status resulting from a set of verdict counts.
pub fn status_after_checkin(summary: &Summary) -> ToolkitStatus {
    if summary.is_complete() {
        ToolkitStatus::CheckedIn
    } else {
        ToolkitStatus::Incomplete
    }
}

/// Apply a check-in event to the toolkit.
///
/// Overwrites the status and slot snapshot, stamps the timestamps, and
/// returns the immutable record for the history store. The caller persists
/// both; per-toolkit write serialization is the persistence layer's duty.
pub fn apply_checkin(
    toolkit: &mut Toolkit,
    analysis: &AnalysisResult,
    now: DateTime<Utc>,
    checked_in_by: Option<String>,
    notes: Option<String>,
) -> CheckInRecord {
    let status = status_after_checkin(&analysis.summary);

    toolkit.slots = analysis
        .per_slot
        .iter()
        .map(|v| {
            let prior_seen = toolkit
                .slots
                .iter()
                .find(|s| s.tool_id == v.tool_id)
                .and_then(|s| s.last_seen);
            SlotState {
                tool_id: v.tool_id.clone(),
                name: v.name.clone(),
                status: v.status,
                confidence: v.confidence,
                last_seen: if v.status == SlotStatus::Present {
                    Some(now)
                } else {
                    prior_seen
                },
            }
        })
        .collect();

    toolkit.status = status;
    toolkit.last_checkin = Some(now);
    toolkit.updated_at = now;

    log::info!(
        "toolkit '{}' checked in: {:?} ({}/{} present)",
        toolkit.toolkit_id,
        status,
        analysis.summary.present,
        analysis.summary.total
    );

    CheckInRecord {
        checkin_id: CheckInRecord::derive_id(&toolkit.toolkit_id, now),
        toolkit_id: toolkit.toolkit_id.clone(),
        template_id: toolkit.template_id.clone(),
        timestamp: now,
        status,
        verdicts: analysis.per_slot.clone(),
        summary: analysis.summary,
        registration: Some(analysis.registration.clone()),
        checked_in_by,
        notes,
        annotated_ref: None,
    }
}

/// Apply a checkout event to the toolkit.
///
/// Leaves the slot snapshot untouched and appends no record.
pub fn apply_checkout(
    toolkit: &mut Toolkit,
    now: DateTime<Utc>,
    location: Option<String>,
) -> Result<(), TransitionError> {
    match toolkit.status {
        ToolkitStatus::CheckedIn | ToolkitStatus::Incomplete => {}
        status @ (ToolkitStatus::NeverChecked | ToolkitStatus::CheckedOut) => {
            return Err(TransitionError::CheckoutNotAllowed { status });
        }
    }

    toolkit.status = ToolkitStatus::CheckedOut;
    toolkit.last_checkout = Some(now);
    toolkit.updated_at = now;
    if location.is_some() {
        toolkit.location = location;
    }
    log::info!("toolkit '{}' checked out", toolkit.toolkit_id);
    Ok(())
}

/// Rebuild the materialized snapshot from the latest history record.
///
/// The record stream is authoritative; this recomputes the view a
/// `checkin` would have left behind, e.g. after restoring from backup.
pub fn rebuild_from_record(toolkit: &mut Toolkit, record: &CheckInRecord) {
    toolkit.status = record.status;
    toolkit.last_checkin = Some(record.timestamp);
    toolkit.slots = record
        .verdicts
        .iter()
        .map(|v| SlotState {
            tool_id: v.tool_id.clone(),
            name: v.name.clone(),
            status: v.status,
            confidence: v.confidence,
            last_seen: (v.status == SlotStatus::Present).then_some(record.timestamp),
        })
        .collect();
    toolkit.updated_at = record.timestamp;
}

#[cfg(test)]
mod tests {
    use super::*;
    use kitcheck_analyze::{
        AnalysisStatus, RegionSignals, RegistrationInfo, SlotVerdict,
    };

    fn verdict(id: &str, status: SlotStatus) -> SlotVerdict {
        SlotVerdict {
            tool_id: id.into(),
            name: id.into(),
            slot_index: 1,
            status,
            confidence: 0.9,
            signals: RegionSignals::zeroed(),
        }
    }

    fn analysis(verdicts: Vec<SlotVerdict>) -> AnalysisResult {
        let summary = Summary::from_verdicts(&verdicts);
        AnalysisResult {
            template_id: "tmpl".into(),
            status: if summary.is_complete() {
                AnalysisStatus::Complete
            } else {
                AnalysisStatus::Incomplete
            },
            per_slot: verdicts,
            summary,
            registration: RegistrationInfo {
                markers_detected: 0,
                markers_expected: 4,
                homography_applied: false,
                fallback_reason: None,
            },
            annotated: None,
        }
    }

    fn toolkit(status: ToolkitStatus) -> Toolkit {
        let now = Utc::now();
        Toolkit {
            toolkit_id: "KIT-1".into(),
            template_id: "tmpl".into(),
            name: "Kit 1".into(),
            description: None,
            status,
            location: None,
            slots: Vec::new(),
            last_checkin: None,
            last_checkout: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn all_present_checks_in_from_any_state() {
        for initial in [
            ToolkitStatus::NeverChecked,
            ToolkitStatus::CheckedIn,
            ToolkitStatus::CheckedOut,
            ToolkitStatus::Incomplete,
        ] {
            let mut kit = toolkit(initial);
            let a = analysis(vec![verdict("a", SlotStatus::Present)]);
            let record = apply_checkin(&mut kit, &a, Utc::now(), None, None);
            assert_eq!(kit.status, ToolkitStatus::CheckedIn, "from {initial:?}");
            assert_eq!(record.status, ToolkitStatus::CheckedIn);
            assert!(kit.last_checkin.is_some());
        }
    }

    #[test]
    fn any_missing_or_uncertain_goes_incomplete() {
        for bad in [SlotStatus::Missing, SlotStatus::Uncertain] {
            let mut kit = toolkit(ToolkitStatus::CheckedIn);
            let a = analysis(vec![
                verdict("a", SlotStatus::Present),
                verdict("b", bad),
            ]);
            let record = apply_checkin(&mut kit, &a, Utc::now(), None, None);
            assert_eq!(kit.status, ToolkitStatus::Incomplete, "bad={bad:?}");
            assert_eq!(record.status, ToolkitStatus::Incomplete);
            let s = record.summary;
            assert_eq!(s.present + s.missing + s.uncertain, s.total);
        }
    }

    #[test]
    fn checkin_replaces_the_snapshot() {
        let mut kit = toolkit(ToolkitStatus::NeverChecked);
        let now = Utc::now();
        let a = analysis(vec![
            verdict("a", SlotStatus::Present),
            verdict("b", SlotStatus::Missing),
        ]);
        let record = apply_checkin(&mut kit, &a, now, Some("op".into()), None);

        assert_eq!(kit.status, ToolkitStatus::Incomplete);
        assert_eq!(kit.slots.len(), 2);
        assert_eq!(kit.slots[0].last_seen, Some(now));
        assert_eq!(kit.slots[1].last_seen, None);
        assert_eq!(record.summary.present + record.summary.missing, 2);
        assert_eq!(record.checked_in_by.as_deref(), Some("op"));
    }

    #[test]
    fn checkout_only_from_verified_states() {
        for ok in [ToolkitStatus::CheckedIn, ToolkitStatus::Incomplete] {
            let mut kit = toolkit(ok);
            assert!(apply_checkout(&mut kit, Utc::now(), None).is_ok());
            assert_eq!(kit.status, ToolkitStatus::CheckedOut);
            assert!(kit.last_checkout.is_some());
        }
        for bad in [ToolkitStatus::NeverChecked, ToolkitStatus::CheckedOut] {
            let mut kit = toolkit(bad);
            let err = apply_checkout(&mut kit, Utc::now(), None).unwrap_err();
            assert!(matches!(err, TransitionError::CheckoutNotAllowed { .. }));
            assert_eq!(kit.status, bad, "rejected checkout must not mutate");
        }
    }

    #[test]
    fn checkout_keeps_the_snapshot() {
        let mut kit = toolkit(ToolkitStatus::NeverChecked);
        let a = analysis(vec![verdict("a", SlotStatus::Present)]);
        apply_checkin(&mut kit, &a, Utc::now(), None, None);
        let snapshot = kit.slots.clone();

        apply_checkout(&mut kit, Utc::now(), Some("bay 4".into())).expect("checkout");
        assert_eq!(kit.slots.len(), snapshot.len());
        assert_eq!(kit.location.as_deref(), Some("bay 4"));
    }

    #[test]
    fn rebuild_matches_direct_application() {
        let mut kit = toolkit(ToolkitStatus::NeverChecked);
        let now = Utc::now();
        let a = analysis(vec![
            verdict("a", SlotStatus::Present),
            verdict("b", SlotStatus::Uncertain),
        ]);
        let record = apply_checkin(&mut kit, &a, now, None, None);

        let mut restored = toolkit(ToolkitStatus::NeverChecked);
        rebuild_from_record(&mut restored, &record);
        assert_eq!(restored.status, kit.status);
        assert_eq!(restored.slots.len(), kit.slots.len());
        assert_eq!(restored.last_checkin, kit.last_checkin);
    }
}
