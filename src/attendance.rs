// src/attendance.rs
use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::AttendanceRecord;
use crate::date_range::{DateRange, DateRangeError};
use crate::holidays::HolidayCalendar;

pub const ABSENT_REASON: &str = "Did not log out";

// --- Status Types ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
    #[serde(rename = "Not Logged Out")]
    NotLoggedOut,
    Holyday,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "Present",
            AttendanceStatus::Absent => "Absent",
            AttendanceStatus::NotLoggedOut => "Not Logged Out",
            AttendanceStatus::Holyday => "Holyday",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = ReconciliationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "not logged out" => Ok(AttendanceStatus::NotLoggedOut),
            "holyday" | "holiday" => Ok(AttendanceStatus::Holyday),
            _ => Err(ReconciliationError::UnknownStatus(s.to_string())),
        }
    }
}

/// Outcome for a single calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayStatus {
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub reason: Option<String>,
}

impl DayStatus {
    fn new(date: NaiveDate, status: AttendanceStatus, reason: Option<&str>) -> Self {
        Self {
            date,
            status,
            reason: reason.map(str::to_string),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationError {
    #[error("Invalid date range: {0}")]
    InvalidRange(#[from] DateRangeError),
    #[error("Attendance record {record_id} has a malformed login timestamp '{value}'")]
    MalformedTimestamp { record_id: i64, value: String },
    #[error("Unknown attendance status '{0}'")]
    UnknownStatus(String),
}

// --- Reconciliation ---

/// Calendar day of the login, taken from the leading `YYYY-MM-DD` of the timestamp.
pub fn login_date(record: &AttendanceRecord) -> Result<NaiveDate, ReconciliationError> {
    let raw = record.login_timestamp.trim();
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .ok_or_else(|| ReconciliationError::MalformedTimestamp {
            record_id: record.attn_id,
            value: record.login_timestamp.clone(),
        })
}

/// Status implied by a record found for the day.
pub fn classify_record(record: &AttendanceRecord) -> (AttendanceStatus, Option<&'static str>) {
    match (record.is_login_out, record.has_logout()) {
        (Some(true), true) => (AttendanceStatus::Present, None),
        (Some(false), _) => (AttendanceStatus::Absent, Some(ABSENT_REASON)),
        (Some(true), false) => {
            warn!(
                "Attendance record {} is flagged complete but has no logout timestamp; reporting Not Logged Out",
                record.attn_id
            );
            (AttendanceStatus::NotLoggedOut, None)
        }
        (None, _) => (AttendanceStatus::NotLoggedOut, None),
    }
}

/// Produces one `DayStatus` per calendar day of `[start, end]`, ascending.
///
/// Holidays win over attendance records; the first record whose login falls
/// on a day decides that day; days without a record are `Not Logged Out`.
/// An unset bound yields an empty list. Every record's login timestamp must
/// parse, otherwise the whole call fails.
pub fn reconcile_attendance(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
    records: &[AttendanceRecord],
    holidays: &HolidayCalendar,
) -> Result<Vec<DayStatus>, ReconciliationError> {
    let (start, end) = match (start, end) {
        (Some(start), Some(end)) => (start, end),
        _ => {
            debug!("Start or end date not selected, nothing to reconcile.");
            return Ok(Vec::new());
        }
    };
    let range = DateRange::new(start, end, today)?;

    let mut records_by_day: HashMap<NaiveDate, &AttendanceRecord> = HashMap::new();
    for record in records {
        let day = login_date(record)?;
        records_by_day.entry(day).or_insert(record);
    }

    let days: Vec<DayStatus> = range
        .days()
        .map(|date| {
            if let Some(name) = holidays.get(date) {
                return DayStatus::new(date, AttendanceStatus::Holyday, Some(name));
            }
            match records_by_day.get(&date) {
                Some(record) => {
                    let (status, reason) = classify_record(record);
                    DayStatus::new(date, status, reason)
                }
                None => DayStatus::new(date, AttendanceStatus::NotLoggedOut, None),
            }
        })
        .collect();

    info!(
        "Reconciled {} days ({} to {}) from {} attendance records",
        days.len(),
        range.start,
        range.end,
        records.len()
    );
    Ok(days)
}

// --- Derived views ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub present: usize,
    pub absent: usize,
    pub not_logged_out: usize,
    pub holyday: usize,
}

impl StatusCounts {
    pub fn from_days(days: &[DayStatus]) -> Self {
        days.iter().fold(Self::default(), |mut counts, day| {
            match day.status {
                AttendanceStatus::Present => counts.present += 1,
                AttendanceStatus::Absent => counts.absent += 1,
                AttendanceStatus::NotLoggedOut => counts.not_logged_out += 1,
                AttendanceStatus::Holyday => counts.holyday += 1,
            }
            counts
        })
    }

    pub fn total(&self) -> usize {
        self.present + self.absent + self.not_logged_out + self.holyday
    }

    pub fn get(&self, status: AttendanceStatus) -> usize {
        match status {
            AttendanceStatus::Present => self.present,
            AttendanceStatus::Absent => self.absent,
            AttendanceStatus::NotLoggedOut => self.not_logged_out,
            AttendanceStatus::Holyday => self.holyday,
        }
    }
}

/// `None` keeps every day.
pub fn filter_by_status(days: &[DayStatus], status: Option<AttendanceStatus>) -> Vec<&DayStatus> {
    days.iter()
        .filter(|day| status.map_or(true, |wanted| day.status == wanted))
        .collect()
}

/// Calendar marks keyed by date. Sundays are never marked.
pub fn marked_dates(
    days: &[DayStatus],
    status: Option<AttendanceStatus>,
) -> BTreeMap<NaiveDate, AttendanceStatus> {
    filter_by_status(days, status)
        .into_iter()
        .filter(|day| day.date.weekday() != Weekday::Sun)
        .map(|day| (day.date, day.status))
        .collect()
}

/// Figures for the statistics cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceSummary {
    pub total_days: usize,
    pub present_days: usize,
    pub absent_days: usize,
    pub not_logged_out_days: usize,
    pub holidays: usize,
    /// Present days over non-holiday days, in percent with one decimal.
    pub attendance_rate: Option<Decimal>,
}

impl AttendanceSummary {
    pub fn from_days(days: &[DayStatus]) -> Self {
        let counts = StatusCounts::from_days(days);
        let working_days = counts.total() - counts.holyday;
        let attendance_rate = if working_days == 0 {
            None
        } else {
            let rate = Decimal::from(counts.present as u64) * dec!(100)
                / Decimal::from(working_days as u64);
            Some(rate.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero))
        };
        Self {
            total_days: counts.total(),
            present_days: counts.present,
            absent_days: counts.absent,
            not_logged_out_days: counts.not_logged_out,
            holidays: counts.holyday,
            attendance_rate,
        }
    }
}
