//! Attendance domain model
//!
//! Types shared by the classifier, document builder, and reconciliation
//! merger, serialized in the persisted document format:
//!
//! ```json
//! {
//!   "id": "20260806T103201.412Z",
//!   "serial_number": "A8N5200760332",
//!   "date": "2026-08-06",
//!   "users": {
//!     "12": {
//!       "user_id": "12",
//!       "user_name": "Ada",
//!       "records": [{ "hour": "08:00:00", "type": 1 }],
//!       "total_hours": "0.00",
//!       "status": 0
//!     }
//!   }
//! }
//! ```

pub mod builder;
pub mod classifier;
pub mod merger;
pub mod store;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of a single punch within a user's day
///
/// Integer codes are part of the persisted/wire format and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PunchKind {
    Checkout = 0,
    Checkin = 1,
    Intermediate = 2,
}

impl From<PunchKind> for u8 {
    fn from(kind: PunchKind) -> u8 {
        kind as u8
    }
}

impl TryFrom<u8> for PunchKind {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(PunchKind::Checkout),
            1 => Ok(PunchKind::Checkin),
            2 => Ok(PunchKind::Intermediate),
            other => Err(format!("invalid punch kind code: {other}")),
        }
    }
}

/// Completeness of a user's day: COMPLETE requires at least two punches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum DayStatus {
    Incomplete = 0,
    Complete = 1,
}

impl From<DayStatus> for u8 {
    fn from(status: DayStatus) -> u8 {
        status as u8
    }
}

impl TryFrom<u8> for DayStatus {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(DayStatus::Incomplete),
            1 => Ok(DayStatus::Complete),
            other => Err(format!("invalid day status code: {other}")),
        }
    }
}

/// One classified punch: a time of day plus its positional kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub hour: NaiveTime,
    #[serde(rename = "type")]
    pub kind: PunchKind,
}

/// A user's attendance for one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDailyAttendance {
    pub user_id: String,
    pub user_name: String,
    /// Ordered by `hour`; no two entries share the same `hour`
    pub records: Vec<AttendanceRecord>,
    /// First-to-last span in hours, two decimals ("0.00" when under two punches)
    pub total_hours: String,
    pub status: DayStatus,
}

/// The persisted aggregate of one device's attendance for one date
///
/// Owned exclusively by the pipeline for its lifetime; the unit of
/// durability. Record counts per user only ever grow across the
/// reconciliation cycles of a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceDocument {
    pub id: String,
    pub serial_number: String,
    pub date: NaiveDate,
    pub users: BTreeMap<String, UserDailyAttendance>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punch_kind_codes_round_trip() {
        for kind in [PunchKind::Checkout, PunchKind::Checkin, PunchKind::Intermediate] {
            let code = u8::from(kind);
            assert_eq!(PunchKind::try_from(code).unwrap(), kind);
        }
        assert!(PunchKind::try_from(3).is_err());
    }

    #[test]
    fn record_serializes_to_wire_format() {
        let record = AttendanceRecord {
            hour: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            kind: PunchKind::Checkin,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, serde_json::json!({ "hour": "08:00:00", "type": 1 }));
    }

    #[test]
    fn document_serializes_date_and_status_codes() {
        let mut users = BTreeMap::new();
        users.insert(
            "7".to_string(),
            UserDailyAttendance {
                user_id: "7".to_string(),
                user_name: "Ada".to_string(),
                records: vec![],
                total_hours: "0.00".to_string(),
                status: DayStatus::Incomplete,
            },
        );
        let document = AttendanceDocument {
            id: "x".to_string(),
            serial_number: "SN1".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 8, 6).unwrap(),
            users,
        };
        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(json["date"], "2026-08-06");
        assert_eq!(json["users"]["7"]["status"], 0);
    }
}
