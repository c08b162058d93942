//! Reconciliation merge
//!
//! Combines a freshly built document with the previously persisted document
//! for the same date. The union is keyed by time of day, kinds are re-derived
//! positionally from the merged sequence, and total hours are recomputed from
//! the merged first-to-last span. Re-deriving rather than appending keeps the
//! merge idempotent and keeps one record per time of day even when a later
//! cycle reclassifies an earlier punch (yesterday's provisional check-out
//! becomes an intermediate once an evening punch arrives).

use chrono::NaiveTime;
use std::collections::btree_map::Entry;
use std::collections::BTreeSet;

use super::classifier::{assign_kinds, day_status, span_hours};
use super::{AttendanceDocument, UserDailyAttendance};

/// Merge `incoming` into `existing`.
///
/// With no existing document (first cycle of the day) the incoming document
/// is returned unchanged. Users only present in `existing` are retained;
/// users only present in `incoming` are adopted verbatim. The existing
/// document's id survives the merge.
pub fn merge(existing: Option<AttendanceDocument>, incoming: AttendanceDocument) -> AttendanceDocument {
    let Some(mut merged) = existing else {
        return incoming;
    };

    for (user_id, theirs) in incoming.users {
        match merged.users.entry(user_id) {
            Entry::Vacant(slot) => {
                slot.insert(theirs);
            }
            Entry::Occupied(mut slot) => merge_user(slot.get_mut(), &theirs),
        }
    }

    merged
}

fn merge_user(ours: &mut UserDailyAttendance, theirs: &UserDailyAttendance) {
    let mut times: BTreeSet<NaiveTime> = ours.records.iter().map(|r| r.hour).collect();
    times.extend(theirs.records.iter().map(|r| r.hour));

    let times: Vec<NaiveTime> = times.into_iter().collect();
    ours.records = assign_kinds(&times);
    ours.total_hours = span_hours(&times);
    ours.status = day_status(times.len());
}
