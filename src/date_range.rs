// src/date_range.rs
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Earliest date the attendance screens accept.
pub const MIN_SUPPORTED_DATE: (i32, u32, u32) = (2000, 1, 1);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateRangeError {
    #[error("Start date {start} is after end date {end}")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },
    #[error("Start date {start} is before the earliest supported date {min}")]
    BeforeMinimum { start: NaiveDate, min: NaiveDate },
    #[error("End date {end} is later than today ({today})")]
    AfterToday { end: NaiveDate, today: NaiveDate },
    #[error("Unknown range preset '{0}'")]
    UnknownPreset(String),
}

pub fn min_supported_date() -> NaiveDate {
    let (y, m, d) = MIN_SUPPORTED_DATE;
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}

/// Inclusive date range, always `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Validates the bounds used by the attendance calendar: not before
    /// 2000-01-01, not after `today`, and `start <= end`.
    pub fn new(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError::StartAfterEnd { start, end });
        }
        let min = min_supported_date();
        if start < min {
            return Err(DateRangeError::BeforeMinimum { start, min });
        }
        if end > today {
            return Err(DateRangeError::AfterToday { end, today });
        }
        Ok(Self { start, end })
    }

    /// Number of calendar days in the range, both ends included.
    pub fn day_count(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        dates_between(self.start, self.end)
    }
}

/// Every calendar day from `start` to `end` inclusive. Empty when `start > end`.
pub fn dates_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start
        .iter_days()
        .take_while(move |day| *day <= end)
}

/// Quick selections offered next to the custom date picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePreset {
    ThisWeek,
    ThisMonth,
    LastMonth,
}

impl RangePreset {
    /// Resolves the preset relative to `today`. Weeks start on Monday and
    /// current periods end at `today`.
    pub fn resolve(&self, today: NaiveDate) -> DateRange {
        match self {
            RangePreset::ThisWeek => {
                let offset = today.weekday().num_days_from_monday() as u64;
                let start = today.checked_sub_days(Days::new(offset)).unwrap_or(today);
                DateRange { start, end: today }
            }
            RangePreset::ThisMonth => {
                let start = today.with_day(1).unwrap_or(today);
                DateRange { start, end: today }
            }
            RangePreset::LastMonth => {
                let first_of_this_month = today.with_day(1).unwrap_or(today);
                let end = first_of_this_month.pred_opt().unwrap_or(first_of_this_month);
                let start = end.with_day(1).unwrap_or(end);
                DateRange { start, end }
            }
        }
    }
}

impl FromStr for RangePreset {
    type Err = DateRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['_', ' '], "-").as_str() {
            "week" | "this-week" => Ok(RangePreset::ThisWeek),
            "month" | "this-month" => Ok(RangePreset::ThisMonth),
            "last-month" => Ok(RangePreset::LastMonth),
            _ => Err(DateRangeError::UnknownPreset(s.to_string())),
        }
    }
}
