// src/data_service_tests.rs

#[cfg(test)]
mod tests {
    use crate::attendance::AttendanceStatus;
    use crate::backend::*;
    use crate::data_service::DataService;
    use crate::expense::{
        ExpenseDraft, ExpenseFilter, ExpenseStatus, ExpenseSubmission, ExpenseType, SearchField,
        SubmittedExpenseFilter,
    };
    use crate::holidays::HolidayCalendar;
    use crate::work_hours::{Period, WorkHoursError};
    use crate::AppError;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use reqwest::StatusCode;
    use rust_decimal_macros::dec;
    use std::sync::{Arc, Mutex};
    use tokio::runtime::Runtime;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[derive(Default)]
    struct MockBackend {
        records: Vec<AttendanceRecord>,
        expenses: Vec<ApiExpense>,
        submitted_rows: Vec<SubmittedExpense>,
        reject_attendance: Option<String>,
        submit_error: Option<String>,
        fetch_calls: Mutex<Vec<(String, NaiveDate, NaiveDate)>>,
        submitted: Mutex<Vec<ExpenseSubmission>>,
    }

    #[async_trait]
    impl AttendanceBackend for MockBackend {
        async fn fetch_attendance(
            &self,
            user_id: &str,
            start_date: NaiveDate,
            end_date: NaiveDate,
        ) -> Result<Vec<AttendanceRecord>, BackendError> {
            self.fetch_calls
                .lock()
                .unwrap()
                .push((user_id.to_string(), start_date, end_date));
            if let Some(message) = &self.reject_attendance {
                return Err(BackendError::Rejected(message.clone()));
            }
            Ok(self.records.clone())
        }

        async fn fetch_expenses(&self) -> Result<Vec<ApiExpense>, BackendError> {
            Ok(self.expenses.clone())
        }

        async fn submit_expense(&self, submission: &ExpenseSubmission) -> Result<String, BackendError> {
            if let Some(error) = &self.submit_error {
                return Err(BackendError::ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: error.clone(),
                });
            }
            self.submitted.lock().unwrap().push(submission.clone());
            Ok("Expense submitted successfully".to_string())
        }

        async fn fetch_submitted_expenses(&self) -> Result<Vec<SubmittedExpense>, BackendError> {
            Ok(self.submitted_rows.clone())
        }

        async fn fetch_user_profile(&self, user_id: &str) -> Result<UserProfile, BackendError> {
            if user_id == "404" {
                return Err(BackendError::Rejected("User not found".to_string()));
            }
            Ok(UserProfile {
                user_id: user_id.to_string(),
                first_name: "Amit".to_string(),
                last_name: "Roy".to_string(),
                location: Some("Dhaka".to_string()),
                ..UserProfile::default()
            })
        }
    }

    fn record(id: i64, login: &str, logout: Option<&str>, flag: Option<bool>) -> AttendanceRecord {
        AttendanceRecord {
            attn_id: id,
            user_id: 3,
            login_timestamp: login.to_string(),
            logout_timestamp: logout.map(str::to_string),
            is_login_out: flag,
        }
    }

    fn expense_row(id: &str, title: &str, status: Option<i64>, type_id: i64) -> ApiExpense {
        ApiExpense {
            expense_track_id: id.to_string(),
            expense_track_title: title.to_string(),
            expense_type_id: type_id,
            expense_total_amount: dec!(100.00),
            expense_track_status: status,
            expense_track_app_rej_remarks: None,
            expense_track_created_at: "2024-03-02 10:15:00".to_string(),
            expense_track_created_by: Some(3),
            expense_track_submitted_to: None,
            expense_track_approved_rejected_by: None,
            expense_track_approved_rejected_at: None,
            created_by_full_name: "Amit Roy".to_string(),
        }
    }

    fn service(backend: MockBackend) -> (DataService<MockBackend>, Arc<MockBackend>) {
        let backend = Arc::new(backend);
        (
            DataService::new(backend.clone(), HolidayCalendar::builtin()),
            backend,
        )
    }

    #[test]
    fn attendance_for_range_fetches_and_reconciles() {
        let (service, backend) = service(MockBackend {
            records: vec![record(
                1,
                "2023-12-24 09:00:00",
                Some("2023-12-24 17:30:00"),
                Some(true),
            )],
            ..MockBackend::default()
        });

        let rt = Runtime::new().unwrap();
        let days = rt
            .block_on(async {
                service
                    .attendance_for_range("3", d("2023-12-24"), d("2023-12-26"), d("2024-01-15"))
                    .await
            })
            .unwrap();

        let statuses: Vec<_> = days.iter().map(|day| day.status).collect();
        assert_eq!(
            statuses,
            vec![
                AttendanceStatus::Present,
                AttendanceStatus::Holyday,
                AttendanceStatus::NotLoggedOut
            ]
        );
        assert_eq!(
            backend.fetch_calls.lock().unwrap().as_slice(),
            &[("3".to_string(), d("2023-12-24"), d("2023-12-26"))]
        );
    }

    #[test]
    fn invalid_range_never_reaches_the_backend() {
        let (service, backend) = service(MockBackend::default());
        let rt = Runtime::new().unwrap();
        let result = rt.block_on(async {
            service
                .attendance_for_range("3", d("2024-02-10"), d("2024-02-01"), d("2024-03-01"))
                .await
        });
        assert!(matches!(result, Err(AppError::DateRange(_))));
        assert!(backend.fetch_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn backend_rejection_surfaces_its_message() {
        let (service, _) = service(MockBackend {
            reject_attendance: Some("No attendance records found".to_string()),
            ..MockBackend::default()
        });
        let rt = Runtime::new().unwrap();
        let err = rt
            .block_on(async {
                service
                    .attendance_for_range("3", d("2024-02-01"), d("2024-02-10"), d("2024-03-01"))
                    .await
            })
            .unwrap_err();
        assert_eq!(err.user_message(), "No attendance records found");
    }

    #[test]
    fn work_hours_uses_the_period_window() {
        let (service, backend) = service(MockBackend {
            records: vec![
                record(1, "2024-03-11 09:00:00", Some("2024-03-11 17:00:00"), Some(true)),
                record(2, "2024-03-12 09:00:00", Some("2024-03-12 18:00:00"), Some(true)),
                record(3, "2024-03-13 09:00:00", None, Some(false)),
            ],
            ..MockBackend::default()
        });
        let rt = Runtime::new().unwrap();
        let summary = rt
            .block_on(async { service.work_hours("3", Period::LastWeek, d("2024-03-14")).await })
            .unwrap();

        assert_eq!(summary.record_count, 2);
        assert_eq!(summary.total_hours, dec!(17.0));
        assert_eq!(summary.average_hours, Some(dec!(8.5)));
        let calls = backend.fetch_calls.lock().unwrap();
        assert_eq!(calls[0].1, d("2024-03-07"));
        assert_eq!(calls[0].2, d("2024-03-14"));
    }

    #[test]
    fn work_hours_accepts_fractional_and_offset_timestamps() {
        let (service, _) = service(MockBackend {
            records: vec![
                record(1, "2024-03-11 09:00:00.000", Some("2024-03-11 17:00:00.000"), Some(true)),
                record(2, "2024-03-12T09:00:00+05:30", Some("2024-03-12T18:00:00+05:30"), Some(true)),
            ],
            ..MockBackend::default()
        });
        let rt = Runtime::new().unwrap();
        let summary = rt
            .block_on(async { service.work_hours("3", Period::LastWeek, d("2024-03-14")).await })
            .unwrap();
        assert_eq!(summary.record_count, 2);
        assert_eq!(summary.total_hours, dec!(17.0));
        assert_eq!(summary.check_in_display(), "09:00");
        assert_eq!(summary.check_out_display(), "17:30");
    }

    #[test]
    fn unreadable_work_timestamp_is_a_work_hours_error() {
        let (service, _) = service(MockBackend {
            records: vec![record(9, "12/03/2024 09:00", Some("12/03/2024 17:00"), Some(true))],
            ..MockBackend::default()
        });
        let rt = Runtime::new().unwrap();
        let result = rt.block_on(async { service.work_hours("3", Period::LastWeek, d("2024-03-14")).await });
        assert!(matches!(
            result,
            Err(AppError::WorkHours(WorkHoursError::MalformedTimestamp { record_id: 9, .. }))
        ));
    }

    #[test]
    fn work_hours_with_no_records_is_not_an_error() {
        let (service, _) = service(MockBackend::default());
        let rt = Runtime::new().unwrap();
        let summary = rt
            .block_on(async { service.work_hours("3", Period::LastMonth, d("2024-03-14")).await })
            .unwrap();
        assert_eq!(summary.average_display(), "N/A");
    }

    #[test]
    fn expenses_are_transformed_and_filtered() {
        let (service, _) = service(MockBackend {
            expenses: vec![
                expense_row("1", "Taxi to client", Some(1), 0),
                expense_row("2", "Team lunch", Some(2), 1),
                expense_row("3", "Printer paper", None, 3),
            ],
            ..MockBackend::default()
        });
        let rt = Runtime::new().unwrap();

        let all = rt
            .block_on(async { service.expenses(&ExpenseFilter::default()).await })
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].status, ExpenseStatus::Draft);

        let pending = ExpenseFilter {
            search: String::new(),
            status: Some(ExpenseStatus::Pending),
        };
        let filtered = rt.block_on(async { service.expenses(&pending).await }).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "Team lunch");

        let search = ExpenseFilter {
            search: "TAXI".to_string(),
            status: None,
        };
        let found = rt.block_on(async { service.expenses(&search).await }).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].expense_type, ExpenseType::Travel);
    }

    #[test]
    fn unknown_expense_code_fails_the_list() {
        let (service, _) = service(MockBackend {
            expenses: vec![expense_row("1", "Mystery", Some(9), 0)],
            ..MockBackend::default()
        });
        let rt = Runtime::new().unwrap();
        let result = rt.block_on(async { service.expenses(&ExpenseFilter::default()).await });
        assert!(matches!(result, Err(AppError::Expense(_))));
    }

    fn submitted_row(title: &str, date: &str, location: &str) -> SubmittedExpense {
        SubmittedExpense {
            title: title.to_string(),
            date_submitted: date.to_string(),
            location: Some(location.to_string()),
            expense_type: "Travel".to_string(),
            amount: dec!(75),
            status: None,
            created_by: Some("Amit Roy".to_string()),
            approved_by: None,
        }
    }

    #[test]
    fn submitted_expenses_are_searched_by_field() {
        let (service, _) = service(MockBackend {
            submitted_rows: vec![
                submitted_row("Cab to Howrah", "2024-03-02", "Kolkata"),
                submitted_row("Kolkata hotel", "2024-03-05", "Siliguri"),
            ],
            ..MockBackend::default()
        });
        let rt = Runtime::new().unwrap();

        let by_location = SubmittedExpenseFilter {
            field: SearchField::Location,
            query: "kolkata".to_string(),
        };
        let rows = rt
            .block_on(async { service.submitted_expenses(&by_location).await })
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Cab to Howrah");

        let everything = rt
            .block_on(async { service.submitted_expenses(&SubmittedExpenseFilter::default()).await })
            .unwrap();
        assert_eq!(everything.len(), 2);
    }

    fn draft() -> ExpenseDraft {
        ExpenseDraft {
            title: "Client visit".to_string(),
            expense_type: Some(ExpenseType::Travel),
            amount: "450.75".to_string(),
            submitted_to: "Manager".to_string(),
            approver_name: "Sima Das".to_string(),
            bill_date: None,
            location: Some("Dhaka".to_string()),
            first_name: "Amit".to_string(),
            middle_name: None,
            last_name: "Roy".to_string(),
        }
    }

    #[test]
    fn submit_expense_posts_validated_payload() {
        let (service, backend) = service(MockBackend::default());
        let rt = Runtime::new().unwrap();
        let message = rt
            .block_on(async { service.submit_expense(draft(), d("2024-03-14")).await })
            .unwrap();
        assert_eq!(message, "Expense submitted successfully");

        let submitted = backend.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].amount, dec!(450.75));
        assert_eq!(submitted[0].created_by, "Amit Roy");
        assert_eq!(submitted[0].date_submitted, d("2024-03-14"));
    }

    #[test]
    fn invalid_draft_is_not_posted() {
        let (service, backend) = service(MockBackend::default());
        let rt = Runtime::new().unwrap();
        let mut bad = draft();
        bad.amount = "-5".to_string();
        let result = rt.block_on(async { service.submit_expense(bad, d("2024-03-14")).await });
        assert!(matches!(result, Err(AppError::Expense(_))));
        assert!(backend.submitted.lock().unwrap().is_empty());
    }

    #[test]
    fn submit_failure_is_converted() {
        let (service, _) = service(MockBackend {
            submit_error: Some("Database error".to_string()),
            ..MockBackend::default()
        });
        let rt = Runtime::new().unwrap();
        let result = rt.block_on(async { service.submit_expense(draft(), d("2024-03-14")).await });
        match result {
            Err(AppError::BackendApi { status, message }) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(message, "Database error");
            }
            other => panic!("expected BackendApi error, got {:?}", other),
        }
    }

    #[test]
    fn profile_lookup() {
        let (service, _) = service(MockBackend::default());
        let rt = Runtime::new().unwrap();
        let profile = rt.block_on(async { service.profile("3").await }).unwrap();
        assert_eq!(profile.full_name(), "Amit Roy");

        let missing = rt.block_on(async { service.profile("404").await });
        assert!(matches!(missing, Err(AppError::BackendRejected(_))));
    }
}
