//! Attendance document assembly
//!
//! Groups the day's punches per user, classifies each user's times, and
//! aggregates the results with the device identity into one dated document.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use std::collections::BTreeMap;
use tracing::warn;

use crate::device::{DeviceUser, Punch};

use super::classifier::classify;
use super::AttendanceDocument;

/// Group raw punches by user id, keeping only punches that fall on `date`.
///
/// Built by explicit insertion into a typed map; the device reports punches
/// for past days too, so the date filter is load-bearing.
pub fn group_punches(punches: &[Punch], date: NaiveDate) -> BTreeMap<String, Vec<NaiveDateTime>> {
    let mut by_user: BTreeMap<String, Vec<NaiveDateTime>> = BTreeMap::new();
    for punch in punches {
        if punch.timestamp.date() == date {
            by_user.entry(punch.user_id.clone()).or_default().push(punch.timestamp);
        }
    }
    by_user
}

/// Build the day's document from per-user punch times and the user directory.
///
/// User ids present in punch data but absent from the directory are skipped:
/// the device keeps reporting fingerprints of deleted users, which is noise,
/// not an error.
pub fn build_document(
    serial_number: &str,
    date: NaiveDate,
    directory: &BTreeMap<String, DeviceUser>,
    per_user_times: BTreeMap<String, Vec<NaiveDateTime>>,
) -> AttendanceDocument {
    let mut users = BTreeMap::new();

    for (user_id, times) in per_user_times {
        let Some(user) = directory.get(&user_id) else {
            warn!(user_id = %user_id, "skipping punches for user id not in device directory");
            continue;
        };
        if let Some(day) = classify(&user_id, &user.name, &times) {
            users.insert(user_id, day);
        }
    }

    AttendanceDocument {
        id: new_document_id(),
        serial_number: serial_number.to_string(),
        date,
        users,
    }
}

/// Opaque document id derived from build time.
fn new_document_id() -> String {
    Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string()
}
