// src/work_hours.rs
use chrono::{DateTime, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::AttendanceRecord;

#[derive(Error, Debug)]
pub enum WorkHoursError {
    #[error("Unknown period '{0}' (expected 'Last Week', 'Last Month' or 'Last Year')")]
    UnknownPeriod(String),
    #[error("Logout before login on {date}")]
    LogoutBeforeLogin { date: NaiveDate },
    #[error("Malformed time '{value}' on {date}")]
    MalformedTime { date: NaiveDate, value: String },
    #[error("Attendance record {record_id} has a malformed timestamp '{value}'")]
    MalformedTimestamp { record_id: i64, value: String },
    #[error("Failed to read work records from {path}")]
    Io {
        #[source]
        source: std::io::Error,
        path: String,
    },
    #[error("Invalid work records JSON")]
    Json(#[from] serde_json::Error),
}

/// Look-back window selectable on the analytics screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Period {
    LastWeek,
    LastMonth,
    LastYear,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::LastWeek => "Last Week",
            Period::LastMonth => "Last Month",
            Period::LastYear => "Last Year",
        }
    }

    /// First day of the window ending at `today`.
    pub fn window_start(&self, today: NaiveDate) -> NaiveDate {
        let start = match self {
            Period::LastWeek => today.checked_sub_days(Days::new(7)),
            Period::LastMonth => today.checked_sub_months(Months::new(1)),
            Period::LastYear => today.checked_sub_months(Months::new(12)),
        };
        start.unwrap_or(NaiveDate::MIN)
    }

    pub fn window(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        (self.window_start(today), today)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = WorkHoursError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Last Week" => Ok(Period::LastWeek),
            "Last Month" => Ok(Period::LastMonth),
            "Last Year" => Ok(Period::LastYear),
            other => Err(WorkHoursError::UnknownPeriod(other.to_string())),
        }
    }
}

/// One worked day, times as `HH:MM` or `HH:MM:SS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRecord {
    pub date: NaiveDate,
    pub login_time: String,
    pub logout_time: String,
}

impl WorkRecord {
    pub fn new(date: NaiveDate, login_time: impl Into<String>, logout_time: impl Into<String>) -> Self {
        Self {
            date,
            login_time: login_time.into(),
            logout_time: logout_time.into(),
        }
    }

    fn parse_time(&self, value: &str) -> Result<NaiveTime, WorkHoursError> {
        let value = value.trim();
        NaiveTime::parse_from_str(value, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
            .map_err(|_| WorkHoursError::MalformedTime {
                date: self.date,
                value: value.to_string(),
            })
    }

    /// Parsed login and logout; a logout earlier than the login is rejected.
    pub fn times(&self) -> Result<(NaiveTime, NaiveTime), WorkHoursError> {
        let login = self.parse_time(&self.login_time)?;
        let logout = self.parse_time(&self.logout_time)?;
        if logout < login {
            return Err(WorkHoursError::LogoutBeforeLogin { date: self.date });
        }
        Ok((login, logout))
    }

    pub fn worked_seconds(&self) -> Result<i64, WorkHoursError> {
        let (login, logout) = self.times()?;
        Ok((logout - login).num_seconds())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkHoursSummary {
    pub period: Period,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub record_count: usize,
    pub total_hours: Decimal,
    /// `None` when the window holds no records.
    pub average_hours: Option<Decimal>,
    pub average_check_in: Option<NaiveTime>,
    pub average_check_out: Option<NaiveTime>,
}

impl WorkHoursSummary {
    pub fn average_display(&self) -> String {
        self.average_hours
            .map(|avg| avg.to_string())
            .unwrap_or_else(|| "N/A".to_string())
    }

    pub fn check_in_display(&self) -> String {
        display_time(self.average_check_in)
    }

    pub fn check_out_display(&self) -> String {
        display_time(self.average_check_out)
    }
}

fn display_time(time: Option<NaiveTime>) -> String {
    time.map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

// Mean time of day, truncated to the second.
fn mean_time_of_day(times: &[NaiveTime]) -> Option<NaiveTime> {
    if times.is_empty() {
        return None;
    }
    let total: u64 = times
        .iter()
        .map(|t| u64::from(t.num_seconds_from_midnight()))
        .sum();
    let mean = total / times.len() as u64;
    NaiveTime::from_num_seconds_from_midnight_opt(u32::try_from(mean).ok()?, 0)
}

fn round_one_decimal(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// Total and average hours for records dated inside the period's window.
pub fn summarize_work_hours(
    period: Period,
    today: NaiveDate,
    records: &[WorkRecord],
) -> Result<WorkHoursSummary, WorkHoursError> {
    let (window_start, window_end) = period.window(today);
    let in_window: Vec<&WorkRecord> = records
        .iter()
        .filter(|record| record.date >= window_start && record.date <= window_end)
        .collect();
    debug!(
        "{} of {} work records fall in {} ({} to {})",
        in_window.len(),
        records.len(),
        period,
        window_start,
        window_end
    );

    let mut total_seconds: i64 = 0;
    let mut check_ins = Vec::with_capacity(in_window.len());
    let mut check_outs = Vec::with_capacity(in_window.len());
    for record in &in_window {
        let (login, logout) = record.times()?;
        total_seconds += (logout - login).num_seconds();
        check_ins.push(login);
        check_outs.push(logout);
    }

    let total_hours = round_one_decimal(Decimal::from(total_seconds) / Decimal::from(3600));
    let average_hours = if in_window.is_empty() {
        None
    } else {
        Some(round_one_decimal(
            total_hours / Decimal::from(in_window.len() as u64),
        ))
    };

    info!(
        "Work hours for {}: total {} over {} records",
        period,
        total_hours,
        in_window.len()
    );
    Ok(WorkHoursSummary {
        period,
        window_start,
        window_end,
        record_count: in_window.len(),
        total_hours,
        average_hours,
        average_check_in: mean_time_of_day(&check_ins),
        average_check_out: mean_time_of_day(&check_outs),
    })
}

/// Backend timestamps: space or `T` separated, optional seconds and fraction,
/// optional `Z` or UTC offset. Offsets keep the wall-clock time as written.
fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    let value = value.trim_end_matches('Z');
    [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%d %H:%M:%S%:z",
    ]
    .iter()
    .find_map(|fmt| {
        NaiveDateTime::parse_from_str(value, fmt)
            .ok()
            .or_else(|| DateTime::parse_from_str(value, fmt).ok().map(|dt| dt.naive_local()))
    })
}

/// Turns fetched attendance records into work records. Records without a
/// logout are skipped; sessions crossing midnight are skipped with a warning.
pub fn work_records_from_attendance(
    records: &[AttendanceRecord],
) -> Result<Vec<WorkRecord>, WorkHoursError> {
    let mut work_records = Vec::new();
    for record in records.iter().filter(|r| r.has_logout()) {
        let login = parse_timestamp(&record.login_timestamp).ok_or_else(|| {
            WorkHoursError::MalformedTimestamp {
                record_id: record.attn_id,
                value: record.login_timestamp.clone(),
            }
        })?;
        let raw_logout = record.logout_timestamp.as_deref().unwrap_or_default();
        let logout = parse_timestamp(raw_logout).ok_or_else(|| WorkHoursError::MalformedTimestamp {
            record_id: record.attn_id,
            value: raw_logout.to_string(),
        })?;
        if logout.date() != login.date() {
            warn!(
                "Attendance record {} spans {} to {}; not counted as work hours",
                record.attn_id,
                login.date(),
                logout.date()
            );
            continue;
        }
        work_records.push(WorkRecord::new(
            login.date(),
            login.time().format("%H:%M:%S").to_string(),
            logout.time().format("%H:%M:%S").to_string(),
        ));
    }
    Ok(work_records)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserData {
    attendance_records: Vec<WorkRecord>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WorkRecordsDocument {
    Export {
        #[serde(rename = "userData")]
        user_data: UserData,
    },
    Plain(Vec<WorkRecord>),
}

/// Accepts `{"userData": {"attendanceRecords": [...]}}` or a bare array.
pub fn parse_work_records(json: &str) -> Result<Vec<WorkRecord>, WorkHoursError> {
    let records = match serde_json::from_str::<WorkRecordsDocument>(json)? {
        WorkRecordsDocument::Export { user_data } => user_data.attendance_records,
        WorkRecordsDocument::Plain(records) => records,
    };
    Ok(records)
}

pub fn load_work_records(path: &Path) -> Result<Vec<WorkRecord>, WorkHoursError> {
    let content = fs::read_to_string(path).map_err(|source| WorkHoursError::Io {
        source,
        path: path.display().to_string(),
    })?;
    let records = parse_work_records(&content)?;
    info!("Loaded {} work records from {}", records.len(), path.display());
    Ok(records)
}
