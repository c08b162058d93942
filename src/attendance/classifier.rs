//! Punch classification
//!
//! Turns the unordered set of raw punch timestamps one user produced on one
//! date into an ordered, typed record sequence plus a completeness status.
//! Kinds are positional: the earliest punch is the check-in, the latest (when
//! there are at least two) is the check-out, everything between is
//! intermediate. Exact-duplicate timestamps are collapsed to a single event,
//! keeping the first, so a double-scan at the reader does not show up as a
//! phantom intermediate punch.

use chrono::{NaiveDateTime, NaiveTime};

use super::{AttendanceRecord, DayStatus, PunchKind, UserDailyAttendance};

/// Classify one user's punches for one date.
///
/// Returns `None` when `times` is empty; a single punch yields one CHECKIN
/// record with INCOMPLETE status and zero hours. Input need not be sorted.
pub fn classify(user_id: &str, user_name: &str, times: &[NaiveDateTime]) -> Option<UserDailyAttendance> {
    if times.is_empty() {
        return None;
    }

    let mut sorted: Vec<NaiveDateTime> = times.to_vec();
    sorted.sort();
    sorted.dedup();

    let hours: Vec<NaiveTime> = sorted.iter().map(|t| t.time()).collect();
    let records = assign_kinds(&hours);
    let status = day_status(hours.len());

    Some(UserDailyAttendance {
        user_id: user_id.to_string(),
        user_name: user_name.to_string(),
        total_hours: span_hours(&hours),
        status,
        records,
    })
}

/// Assign positional kinds to an ascending, duplicate-free time sequence.
pub(crate) fn assign_kinds(hours: &[NaiveTime]) -> Vec<AttendanceRecord> {
    let last = hours.len().saturating_sub(1);
    hours
        .iter()
        .enumerate()
        .map(|(index, &hour)| AttendanceRecord {
            hour,
            kind: if index == 0 {
                PunchKind::Checkin
            } else if index == last {
                PunchKind::Checkout
            } else {
                PunchKind::Intermediate
            },
        })
        .collect()
}

/// First-to-last span in hours, formatted to two decimals.
pub(crate) fn span_hours(hours: &[NaiveTime]) -> String {
    if hours.len() < 2 {
        return "0.00".to_string();
    }
    let seconds = (hours[hours.len() - 1] - hours[0]).num_seconds();
    format!("{:.2}", seconds as f64 / 3600.0)
}

pub(crate) fn day_status(count: usize) -> DayStatus {
    if count >= 2 {
        DayStatus::Complete
    } else {
        DayStatus::Incomplete
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 6)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn full_day_is_classified_positionally() {
        let day = classify("1", "Ada", &[at(8, 0), at(12, 0), at(13, 0), at(17, 0)]).unwrap();

        let kinds: Vec<PunchKind> = day.records.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PunchKind::Checkin,
                PunchKind::Intermediate,
                PunchKind::Intermediate,
                PunchKind::Checkout,
            ]
        );
        assert_eq!(day.total_hours, "9.00");
        assert_eq!(day.status, DayStatus::Complete);
    }

    #[test]
    fn unsorted_input_is_sorted_first() {
        let day = classify("1", "Ada", &[at(17, 0), at(8, 0), at(12, 30)]).unwrap();

        assert_eq!(day.records[0].hour, at(8, 0).time());
        assert_eq!(day.records[0].kind, PunchKind::Checkin);
        assert_eq!(day.records[2].hour, at(17, 0).time());
        assert_eq!(day.records[2].kind, PunchKind::Checkout);
        assert_eq!(day.total_hours, "9.00");
    }

    #[test]
    fn single_punch_is_incomplete_checkin() {
        let day = classify("2", "Grace", &[at(8, 15)]).unwrap();

        assert_eq!(day.records.len(), 1);
        assert_eq!(day.records[0].kind, PunchKind::Checkin);
        assert_eq!(day.total_hours, "0.00");
        assert_eq!(day.status, DayStatus::Incomplete);
    }

    #[test]
    fn exact_duplicate_timestamps_collapse() {
        let day = classify("3", "Linus", &[at(8, 0), at(8, 0), at(17, 0)]).unwrap();

        assert_eq!(day.records.len(), 2);
        assert_eq!(day.records[0].kind, PunchKind::Checkin);
        assert_eq!(day.records[1].kind, PunchKind::Checkout);
    }

    #[test]
    fn no_punches_yields_nothing() {
        assert!(classify("4", "Nobody", &[]).is_none());
    }

    #[test]
    fn two_punches_span_is_minute_accurate() {
        let day = classify("5", "Edsger", &[at(9, 10), at(17, 40)]).unwrap();
        assert_eq!(day.total_hours, "8.50");
    }
}
