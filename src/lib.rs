// src/lib.rs
pub mod attendance;
pub mod backend;
pub mod config;
pub mod data_service;
pub mod date_range;
pub mod expense;
pub mod export;
pub mod holidays;
pub mod session;
pub mod work_hours;

#[cfg(test)]
mod data_service_tests;

use reqwest::StatusCode;
use thiserror::Error;
use tracing::error;

use crate::attendance::ReconciliationError;
use crate::backend::BackendError;
use crate::date_range::DateRangeError;
use crate::expense::ExpenseError;
use crate::holidays::HolidayError;
use crate::session::SessionError;
use crate::work_hours::WorkHoursError;

pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] envy::Error),
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
    #[error("Backend API returned an error: {status} - {message}")]
    BackendApi { status: StatusCode, message: String },
    #[error("Backend rejected the request: {0}")]
    BackendRejected(String),
    #[error("Backend error: {0}")]
    Backend(BackendError),
    #[error("Attendance reconciliation failed: {0}")]
    Reconciliation(#[from] ReconciliationError),
    #[error("Work hours calculation failed: {0}")]
    WorkHours(#[from] WorkHoursError),
    #[error("Expense error: {0}")]
    Expense(#[from] ExpenseError),
    #[error("Holiday calendar error: {0}")]
    Holiday(#[from] HolidayError),
    #[error("Invalid date range: {0}")]
    DateRange(#[from] DateRangeError),
    #[error("CSV export failed: {0}")]
    Export(#[from] csv::Error),
}

impl From<BackendError> for AppError {
    fn from(e: BackendError) -> Self {
        convert_backend_error(e)
    }
}

/// Lifts API-level failures into dedicated variants, keeps the rest wrapped.
pub fn convert_backend_error(e: BackendError) -> AppError {
    match e {
        BackendError::ApiError { status, message } => AppError::BackendApi { status, message },
        BackendError::Rejected(message) => AppError::BackendRejected(message),
        other => AppError::Backend(other),
    }
}

impl AppError {
    /// Text shown to the user. Transport and data-shape failures collapse to a
    /// generic message; the detailed error is logged.
    pub fn user_message(&self) -> String {
        match self {
            AppError::BackendRejected(message) => message.clone(),
            AppError::Session(SessionError::NotLoggedIn) => {
                "You are not logged in. Run `attendance login --user-id <ID>` first.".to_string()
            }
            AppError::Reconciliation(ReconciliationError::InvalidRange(e)) | AppError::DateRange(e) => {
                format!("Invalid date range: {}", e)
            }
            AppError::WorkHours(WorkHoursError::UnknownPeriod(period)) => format!(
                "Unknown period '{}'. Choose Last Week, Last Month or Last Year.",
                period
            ),
            AppError::Expense(ExpenseError::MissingField(field)) => {
                format!("Please fill in the {} field.", field)
            }
            AppError::Expense(ExpenseError::InvalidAmount(_)) => {
                "Please enter a valid amount.".to_string()
            }
            other => {
                error!("Error occurred: {}", other);
                GENERIC_FAILURE_MESSAGE.to_string()
            }
        }
    }
}
