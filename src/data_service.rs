// src/data_service.rs
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{error, info};

use crate::attendance::{reconcile_attendance, DayStatus};
use crate::backend::{AttendanceBackend, SubmittedExpense, UserProfile};
use crate::convert_backend_error;
use crate::date_range::DateRange;
use crate::expense::{transform_expenses, Expense, ExpenseDraft, ExpenseFilter, SubmittedExpenseFilter};
use crate::holidays::HolidayCalendar;
use crate::work_hours::{summarize_work_hours, work_records_from_attendance, Period, WorkHoursSummary};
use crate::AppError;

/// Screen-level operations: fetch from the backend, then run the local logic.
#[derive(Clone)]
pub struct DataService<B: AttendanceBackend> {
    backend: Arc<B>,
    holidays: Arc<HolidayCalendar>,
}

impl<B: AttendanceBackend> DataService<B> {
    pub fn new(backend: Arc<B>, holidays: HolidayCalendar) -> Self {
        Self {
            backend,
            holidays: Arc::new(holidays),
        }
    }

    // --- Attendance ---

    /// Fetches the records for `[start, end]` and reconciles them day by day.
    pub async fn attendance_for_range(
        &self,
        user_id: &str,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> Result<Vec<DayStatus>, AppError> {
        // Validate before going to the network
        let range = DateRange::new(start, end, today)?;
        info!(
            "Fetching attendance for user {} ({} to {})...",
            user_id, range.start, range.end
        );

        let records = match self
            .backend
            .fetch_attendance(user_id, range.start, range.end)
            .await
        {
            Ok(records) => records,
            Err(e) => {
                error!("Failed to fetch attendance for user {}: {}", user_id, e);
                return Err(convert_backend_error(e));
            }
        };

        reconcile_attendance(Some(range.start), Some(range.end), today, &records, &self.holidays)
            .map_err(|e| {
                error!("Failed to reconcile attendance for user {}: {}", user_id, e);
                AppError::from(e)
            })
    }

    // --- Work hours ---

    pub async fn work_hours(
        &self,
        user_id: &str,
        period: Period,
        today: NaiveDate,
    ) -> Result<WorkHoursSummary, AppError> {
        let (window_start, window_end) = period.window(today);
        info!(
            "Fetching work hours for user {} ({}: {} to {})...",
            user_id, period, window_start, window_end
        );

        let records = match self
            .backend
            .fetch_attendance(user_id, window_start, window_end)
            .await
        {
            Ok(records) => records,
            Err(e) => {
                error!("Failed to fetch attendance for work hours: {}", e);
                return Err(convert_backend_error(e));
            }
        };

        let work_records = work_records_from_attendance(&records).map_err(|e| {
            error!("Failed to read work times for user {}: {}", user_id, e);
            AppError::from(e)
        })?;
        summarize_work_hours(period, today, &work_records).map_err(|e| {
            error!("Failed to summarize work hours for user {}: {}", user_id, e);
            AppError::from(e)
        })
    }

    // --- Expenses ---

    pub async fn expenses(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>, AppError> {
        info!("Fetching expenses...");
        let rows = match self.backend.fetch_expenses().await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Failed to fetch expenses: {}", e);
                return Err(convert_backend_error(e));
            }
        };

        let expenses = transform_expenses(rows).map_err(|e| {
            error!("Failed to transform expenses: {}", e);
            AppError::from(e)
        })?;
        let total = expenses.len();
        let filtered: Vec<Expense> = expenses.into_iter().filter(|e| filter.matches(e)).collect();
        info!("{} of {} expenses match the filter", filtered.len(), total);
        Ok(filtered)
    }

    /// The submitter-side list, searched on a single field.
    pub async fn submitted_expenses(
        &self,
        filter: &SubmittedExpenseFilter,
    ) -> Result<Vec<SubmittedExpense>, AppError> {
        info!("Fetching submitted expenses...");
        let rows = match self.backend.fetch_submitted_expenses().await {
            Ok(rows) => rows,
            Err(e) => {
                error!("Failed to fetch submitted expenses: {}", e);
                return Err(convert_backend_error(e));
            }
        };
        let total = rows.len();
        let filtered: Vec<SubmittedExpense> = rows.into_iter().filter(|e| filter.matches(e)).collect();
        info!("{} of {} submitted expenses match the search", filtered.len(), total);
        Ok(filtered)
    }

    /// Validates the draft and posts it. Returns the backend's confirmation.
    pub async fn submit_expense(&self, draft: ExpenseDraft, today: NaiveDate) -> Result<String, AppError> {
        let submission = draft.into_submission(today).map_err(|e| {
            error!("Expense draft rejected: {}", e);
            AppError::from(e)
        })?;
        info!(
            "Submitting expense '{}' ({}) for {}",
            submission.title, submission.amount, submission.created_by
        );
        match self.backend.submit_expense(&submission).await {
            Ok(message) => {
                info!("Expense submitted: {}", message);
                Ok(message)
            }
            Err(e) => {
                error!("Failed to submit expense '{}': {}", submission.title, e);
                Err(convert_backend_error(e))
            }
        }
    }

    // --- Profile ---

    pub async fn profile(&self, user_id: &str) -> Result<UserProfile, AppError> {
        info!("Fetching profile for user {}...", user_id);
        match self.backend.fetch_user_profile(user_id).await {
            Ok(profile) => Ok(profile),
            Err(e) => {
                error!("Failed to fetch profile for user {}: {}", user_id, e);
                Err(convert_backend_error(e))
            }
        }
    }
}
