// src/holidays.rs
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::date_range::dates_between;

pub const SUNDAY_LABEL: &str = "Sunday";

#[derive(Error, Debug)]
pub enum HolidayError {
    #[error("Holiday name must not be empty (date {date})")]
    EmptyName { date: NaiveDate },
    #[error("Failed to read holiday file {path}")]
    Io {
        #[source]
        source: std::io::Error,
        path: String,
    },
    #[error("Invalid holiday file {path}")]
    Json {
        #[source]
        source: serde_json::Error,
        path: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayEntry {
    pub date: NaiveDate,
    pub name: String,
}

impl HolidayEntry {
    pub fn new(date: NaiveDate, name: impl Into<String>) -> Self {
        Self {
            date,
            name: name.into(),
        }
    }
}

/// Non-working days consulted before any attendance record.
/// One name per date; later inserts replace earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidayCalendar {
    entries: BTreeMap<NaiveDate, String>,
}

impl HolidayCalendar {
    pub fn new(entries: impl IntoIterator<Item = HolidayEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| (entry.date, entry.name))
            .collect();
        Self { entries }
    }

    /// The two company holidays shipped with the app.
    pub fn builtin() -> Self {
        let mut calendar = Self::default();
        for (y, m, d, name) in [(2023, 12, 25, "Christmas"), (2023, 11, 23, "Thanksgiving")] {
            if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
                calendar.entries.insert(date, name.to_string());
            }
        }
        calendar
    }

    /// Loads a JSON array of `{"date": "YYYY-MM-DD", "name": "..."}` objects.
    pub fn from_json_file(path: &Path) -> Result<Self, HolidayError> {
        let content = fs::read_to_string(path).map_err(|source| HolidayError::Io {
            source,
            path: path.display().to_string(),
        })?;
        let entries: Vec<HolidayEntry> =
            serde_json::from_str(&content).map_err(|source| HolidayError::Json {
                source,
                path: path.display().to_string(),
            })?;
        let mut calendar = Self::default();
        for entry in entries {
            calendar.add(entry)?;
        }
        info!(
            "Loaded {} holidays from {}",
            calendar.len(),
            path.display()
        );
        Ok(calendar)
    }

    pub fn add(&mut self, entry: HolidayEntry) -> Result<(), HolidayError> {
        let name = entry.name.trim();
        if name.is_empty() {
            return Err(HolidayError::EmptyName { date: entry.date });
        }
        debug!("Configuring holiday: {} ({})", entry.date, name);
        self.entries.insert(entry.date, name.to_string());
        Ok(())
    }

    /// Marks every Sunday between `start` and `end` as a holiday unless the
    /// date already carries a named holiday.
    pub fn with_sundays(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        for day in dates_between(start, end).filter(|day| day.weekday() == Weekday::Sun) {
            self.entries
                .entry(day)
                .or_insert_with(|| SUNDAY_LABEL.to_string());
        }
        self
    }

    pub fn get(&self, date: NaiveDate) -> Option<&str> {
        self.entries.get(&date).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending date order.
    pub fn entries(&self) -> impl Iterator<Item = HolidayEntry> + '_ {
        self.entries
            .iter()
            .map(|(date, name)| HolidayEntry::new(*date, name.clone()))
    }

    pub fn entries_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Iterator<Item = HolidayEntry> + '_ {
        self.entries
            .range(start..=end)
            .map(|(date, name)| HolidayEntry::new(*date, name.clone()))
    }
}
