// src/config.rs
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

use crate::backend::{
    BackendConfig, DEFAULT_ATTENDANCE_PATH, DEFAULT_BACKEND_URL, DEFAULT_DASHBOARD_PATH,
    DEFAULT_EXPENSES_PATH, DEFAULT_EXPENSE_SUBMIT_PATH, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::holidays::{HolidayCalendar, HolidayError};
use crate::session::{SessionStore, SESSION_FILE_NAME};

pub const ENV_PREFIX: &str = "ATTENDANCE_";

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}
fn default_attendance_path() -> String {
    DEFAULT_ATTENDANCE_PATH.to_string()
}
fn default_expenses_path() -> String {
    DEFAULT_EXPENSES_PATH.to_string()
}
fn default_expense_submit_path() -> String {
    DEFAULT_EXPENSE_SUBMIT_PATH.to_string()
}
fn default_dashboard_path() -> String {
    DEFAULT_DASHBOARD_PATH.to_string()
}
fn default_session_file() -> PathBuf {
    PathBuf::from(SESSION_FILE_NAME)
}
fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// Settings read from `ATTENDANCE_*` environment variables (and `.env`).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default = "default_attendance_path")]
    pub attendance_path: String,
    #[serde(default = "default_expenses_path")]
    pub expenses_path: String,
    #[serde(default = "default_expense_submit_path")]
    pub expense_submit_path: String,
    #[serde(default = "default_dashboard_path")]
    pub dashboard_path: String,
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,
    pub holidays_file: Option<PathBuf>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let config = envy::prefixed(ENV_PREFIX).from_env::<AppConfig>()?;
        info!(
            "Configuration loaded. Backend: {}, session file: {}",
            config.backend_url,
            config.session_file.display()
        );
        Ok(config)
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            base_url: self.backend_url.clone(),
            attendance_path: self.attendance_path.clone(),
            expenses_path: self.expenses_path.clone(),
            expense_submit_path: self.expense_submit_path.clone(),
            dashboard_path: self.dashboard_path.clone(),
            request_timeout_secs: self.request_timeout_secs,
        }
    }

    pub fn session_store(&self) -> SessionStore {
        SessionStore::new(self.session_file.clone())
    }

    /// The configured holiday file, or the built-in company holidays.
    pub fn holiday_calendar(&self) -> Result<HolidayCalendar, HolidayError> {
        match &self.holidays_file {
            Some(path) => HolidayCalendar::from_json_file(path),
            None => Ok(HolidayCalendar::builtin()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> AppConfig {
        let vars = pairs
            .iter()
            .map(|(k, v)| (format!("{}{}", ENV_PREFIX, k), v.to_string()));
        envy::prefixed(ENV_PREFIX).from_iter(vars).unwrap()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = from_pairs(&[]);
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.attendance_path, "/Backend/fetchAttendance.php");
        assert_eq!(config.session_file, PathBuf::from(SESSION_FILE_NAME));
        assert_eq!(config.holidays_file, None);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn overrides_are_read() {
        let config = from_pairs(&[
            ("BACKEND_URL", "https://hr.example.com/api"),
            ("REQUEST_TIMEOUT_SECS", "5"),
            ("HOLIDAYS_FILE", "holidays.json"),
        ]);
        let backend = config.backend_config();
        assert_eq!(backend.base_url, "https://hr.example.com/api");
        assert_eq!(backend.request_timeout_secs, 5);
        assert_eq!(config.holidays_file, Some(PathBuf::from("holidays.json")));
    }

    #[test]
    fn builtin_calendar_without_holiday_file() {
        let calendar = from_pairs(&[]).holiday_calendar().unwrap();
        assert_eq!(calendar, HolidayCalendar::builtin());
    }
}
