// src/backend.rs

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::expense::ExpenseSubmission;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost";
pub const DEFAULT_ATTENDANCE_PATH: &str = "/Backend/fetchAttendance.php";
pub const DEFAULT_EXPENSES_PATH: &str = "/all-expense.php";
pub const DEFAULT_EXPENSE_SUBMIT_PATH: &str = "/server/server.php";
pub const DEFAULT_DASHBOARD_PATH: &str = "/dashboard.php";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// Characters of a non-JSON body kept in the error message
const BODY_SNIPPET_LEN: usize = 50;

// --- Backend Data Structures ---

/// One login session as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub attn_id: i64,
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub user_id: i64,
    pub login_timestamp: String,
    #[serde(default)]
    pub logout_timestamp: Option<String>,
    /// Completion flag: whether the login was paired with a logout.
    #[serde(default, deserialize_with = "deserialize_completion_flag")]
    pub is_login_out: Option<bool>,
}

impl AttendanceRecord {
    pub fn has_logout(&self) -> bool {
        self.logout_timestamp
            .as_deref()
            .map_or(false, |ts| !ts.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceFetchRequest<'a> {
    pub user_id: &'a str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceFetchResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub records: Vec<AttendanceRecord>,
    pub message: Option<String>,
}

/// Expense row exactly as the list endpoint returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiExpense {
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub expense_track_id: String,
    pub expense_track_title: String,
    #[serde(deserialize_with = "deserialize_flexible_id")]
    pub expense_type_id: i64,
    pub expense_total_amount: Decimal,
    #[serde(default, deserialize_with = "deserialize_optional_flexible_id")]
    pub expense_track_status: Option<i64>,
    #[serde(default)]
    pub expense_track_app_rej_remarks: Option<String>,
    #[serde(default)]
    pub expense_track_created_at: String,
    #[serde(default, deserialize_with = "deserialize_optional_flexible_id")]
    pub expense_track_created_by: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_flexible_id")]
    pub expense_track_submitted_to: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_flexible_id")]
    pub expense_track_approved_rejected_by: Option<i64>,
    #[serde(default)]
    pub expense_track_approved_rejected_at: Option<String>,
    #[serde(default)]
    pub created_by_full_name: String,
}

/// Row of the submitted-expense list served by the submission endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedExpense {
    pub title: String,
    #[serde(default)]
    pub date_submitted: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(rename = "type", deserialize_with = "deserialize_string_or_number")]
    pub expense_type: String,
    pub amount: Decimal,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub approved_by: Option<String>,
}

impl SubmittedExpense {
    /// Rows without a status are awaiting approval.
    pub fn status_or_pending(&self) -> &str {
        self.status
            .as_deref()
            .filter(|status| !status.trim().is_empty())
            .unwrap_or("pending")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitExpenseResponse {
    pub message: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardRequest<'a> {
    #[serde(rename = "userId")]
    pub user_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardResponse {
    pub status: String,
    pub data: Option<UserProfile>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub user_id: String,
    #[serde(rename = "u_fname", default)]
    pub first_name: String,
    #[serde(rename = "u_mname", default)]
    pub middle_name: Option<String>,
    #[serde(rename = "u_lname", default)]
    pub last_name: String,
    #[serde(rename = "u_email", default)]
    pub email: Option<String>,
    #[serde(rename = "u_phone", default)]
    pub phone: Option<String>,
    #[serde(rename = "u_mob", default)]
    pub mobile: Option<String>,
    #[serde(rename = "u_location", default)]
    pub location: Option<String>,
    #[serde(rename = "u_street_addr", default)]
    pub street_address: Option<String>,
    #[serde(rename = "u_department", default)]
    pub department: Option<String>,
    #[serde(rename = "u_employment_type", default)]
    pub employment_type: Option<String>,
    #[serde(rename = "u_join_date", default)]
    pub join_date: Option<String>,
    #[serde(rename = "u_created_at", default)]
    pub created_at: Option<String>,
    #[serde(rename = "u_pro_image", default)]
    pub profile_image: Option<String>,
}

impl UserProfile {
    /// First, middle and last name joined by single spaces, blanks skipped.
    pub fn full_name(&self) -> String {
        [
            self.first_name.as_str(),
            self.middle_name.as_deref().unwrap_or(""),
            self.last_name.as_str(),
        ]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

// Error bodies come back as {"error": ...} or {"message": ...}
#[derive(Debug, Clone, Deserialize)]
struct ErrorPayload {
    error: Option<String>,
    message: Option<String>,
}

// --- Lenient field decoding for PHP payloads ---

fn deserialize_flexible_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| de::Error::custom(format!("numeric value out of range: {}", n))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| de::Error::custom(format!("expected a numeric string, got '{}'", s))),
        other => Err(de::Error::custom(format!(
            "expected a number or numeric string, got {}",
            other
        ))),
    }
}

fn deserialize_optional_flexible_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(value) => deserialize_flexible_id(value)
            .map(Some)
            .map_err(de::Error::custom),
    }
}

fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected a string or number, got {}",
            other
        ))),
    }
}

fn deserialize_completion_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(flag)),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(0) => Ok(Some(false)),
            Some(1) => Ok(Some(true)),
            _ => Err(de::Error::custom(format!("invalid completion flag: {}", n))),
        },
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "0" | "false" => Ok(Some(false)),
            "1" | "true" => Ok(Some(true)),
            "" => Ok(None),
            _ => Err(de::Error::custom(format!("invalid completion flag: '{}'", s))),
        },
        Some(other) => Err(de::Error::custom(format!(
            "invalid completion flag: {}",
            other
        ))),
    }
}

// --- Backend Error Type ---
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP request failed")]
    Request(#[from] reqwest::Error),

    #[error("JSON processing error")]
    Json(#[from] serde_json::Error),

    #[error("URL parsing error")]
    UrlParse(#[from] url::ParseError),

    #[error("Expected JSON but got: {snippet}... (Status={status})")]
    UnexpectedContentType { status: StatusCode, snippet: String },

    #[error("Backend API error: Status={status}, Message='{message}'")]
    ApiError { status: StatusCode, message: String },

    /// The backend answered but reported failure in the payload.
    #[error("Backend rejected the request: {0}")]
    Rejected(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: String,
    pub attendance_path: String,
    pub expenses_path: String,
    pub expense_submit_path: String,
    pub dashboard_path: String,
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            attendance_path: DEFAULT_ATTENDANCE_PATH.to_string(),
            expenses_path: DEFAULT_EXPENSES_PATH.to_string(),
            expense_submit_path: DEFAULT_EXPENSE_SUBMIT_PATH.to_string(),
            dashboard_path: DEFAULT_DASHBOARD_PATH.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl BackendConfig {
    /// Resolves an endpoint path against the base URL. Absolute URLs pass through.
    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, BackendError> {
        let base = self.base_url.trim_end_matches('/');
        let url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else if endpoint.starts_with('/') {
            format!("{}{}", base, endpoint)
        } else {
            format!("{}/{}", base, endpoint)
        };
        Ok(Url::parse(&url)?)
    }
}

/// Turns a raw HTTP exchange into `T`: checks the content type, then the
/// status, then parses the body.
pub fn decode_response<T: DeserializeOwned>(
    status: StatusCode,
    content_type: Option<&str>,
    body: &[u8],
    context_msg: &str,
) -> Result<T, BackendError> {
    let is_json = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false);
    if !is_json {
        let snippet: String = String::from_utf8_lossy(body)
            .chars()
            .take(BODY_SNIPPET_LEN)
            .collect();
        warn!(
            "Non-JSON response for '{}' (content-type {:?}, status {})",
            context_msg, content_type, status
        );
        return Err(BackendError::UnexpectedContentType { status, snippet });
    }

    if !status.is_success() {
        let raw = String::from_utf8_lossy(body).to_string();
        let message = match serde_json::from_slice::<ErrorPayload>(body) {
            Ok(payload) => payload.error.or(payload.message).unwrap_or(raw),
            Err(_) => raw,
        };
        error!(
            "API Error Response for '{}': Status={}, Message='{}'",
            context_msg, status, message
        );
        return Err(BackendError::ApiError { status, message });
    }

    serde_json::from_slice::<T>(body).map_err(|e| {
        error!("JSON deserialization failed for '{}': {}", context_msg, e);
        BackendError::Json(e)
    })
}

// --- Backend Client ---

#[derive(Clone)]
pub struct BackendClient {
    config: Arc<BackendConfig>,
    http_client: Client,
}

impl BackendClient {
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        if config.request_timeout_secs == 0 {
            return Err(BackendError::ConfigError(
                "request timeout must be at least one second".to_string(),
            ));
        }
        // Fail early on an unusable base URL
        config.endpoint_url("/")?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            http_client,
        })
    }

    pub fn build_request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder, BackendError> {
        let url = self.config.endpoint_url(endpoint)?;
        Ok(self
            .http_client
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json"))
    }

    pub async fn send_and_deserialize<T: DeserializeOwned>(
        &self,
        request_builder: RequestBuilder,
        context_msg: &str,
    ) -> Result<T, BackendError> {
        let request = request_builder.build().map_err(|e| {
            error!("Request build failed for '{}': {}", context_msg, e);
            BackendError::Request(e)
        })?;
        let request_url = request.url().to_string();
        debug!("Sending request for '{}' to URL: {}", context_msg, request_url);

        let response = self.http_client.execute(request).await.map_err(|e| {
            error!(
                "HTTP execution failed before receiving response for '{}' (URL: {}): {}",
                context_msg, request_url, e
            );
            BackendError::Request(e)
        })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        info!(
            "Received response for '{}' (URL: {}): Status={}",
            context_msg, request_url, status
        );

        let bytes = response.bytes().await.map_err(|e| {
            error!("Failed to read response body for '{}': {}", context_msg, e);
            BackendError::Request(e)
        })?;
        match std::str::from_utf8(&bytes) {
            Ok(text) => debug!("Raw Response Body for '{}': {}", context_msg, text),
            Err(_) => debug!(
                "Raw Response Body (Hex) for '{}': {}",
                context_msg,
                hex::encode(&bytes)
            ),
        }

        decode_response(status, content_type.as_deref(), &bytes, context_msg)
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str, context_msg: &str) -> Result<T, BackendError> {
        let request = self.build_request(Method::GET, endpoint)?;
        self.send_and_deserialize(request, context_msg).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
        context_msg: &str,
    ) -> Result<T, BackendError> {
        let request = self.build_request(Method::POST, endpoint)?.json(body);
        self.send_and_deserialize(request, context_msg).await
    }

    // --- API Methods ---

    pub async fn get_attendance_records(
        &self,
        user_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, BackendError> {
        let payload = AttendanceFetchRequest {
            user_id,
            start_date,
            end_date,
        };
        let response: AttendanceFetchResponse = self
            .post_json(&self.config.attendance_path, &payload, "Fetch Attendance")
            .await?;
        if !response.success {
            let message = response
                .message
                .unwrap_or_else(|| "Failed to fetch attendance data".to_string());
            warn!("Attendance fetch rejected for user {}: {}", user_id, message);
            return Err(BackendError::Rejected(message));
        }
        info!(
            "Fetched {} attendance records for user {} ({} to {})",
            response.records.len(),
            user_id,
            start_date,
            end_date
        );
        Ok(response.records)
    }

    pub async fn get_expenses(&self) -> Result<Vec<ApiExpense>, BackendError> {
        self.get(&self.config.expenses_path, "Fetch Expenses").await
    }

    pub async fn post_expense(&self, submission: &ExpenseSubmission) -> Result<String, BackendError> {
        let response: SubmitExpenseResponse = self
            .post_json(&self.config.expense_submit_path, submission, "Submit Expense")
            .await?;
        match (response.message, response.error) {
            (_, Some(error)) => Err(BackendError::Rejected(error)),
            (Some(message), None) => Ok(message),
            (None, None) => Ok("Expense submitted".to_string()),
        }
    }

    pub async fn get_submitted_expenses(&self) -> Result<Vec<SubmittedExpense>, BackendError> {
        let expenses: Vec<SubmittedExpense> = self
            .get(&self.config.expense_submit_path, "Fetch Submitted Expenses")
            .await?;
        info!("Fetched {} submitted expenses", expenses.len());
        Ok(expenses)
    }

    pub async fn get_user_profile(&self, user_id: &str) -> Result<UserProfile, BackendError> {
        let response: DashboardResponse = self
            .post_json(
                &self.config.dashboard_path,
                &DashboardRequest { user_id },
                "Fetch User Profile",
            )
            .await?;
        match (response.status.as_str(), response.data) {
            ("success", Some(profile)) => Ok(profile),
            ("success", None) => Err(BackendError::Rejected(
                "No user data available".to_string(),
            )),
            _ => Err(BackendError::Rejected(
                response
                    .message
                    .unwrap_or_else(|| "Failed to fetch user data".to_string()),
            )),
        }
    }
}

/// The backend exchanges the app performs.
#[async_trait]
pub trait AttendanceBackend: Send + Sync {
    async fn fetch_attendance(
        &self,
        user_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, BackendError>;

    async fn fetch_expenses(&self) -> Result<Vec<ApiExpense>, BackendError>;

    async fn submit_expense(&self, submission: &ExpenseSubmission) -> Result<String, BackendError>;

    async fn fetch_submitted_expenses(&self) -> Result<Vec<SubmittedExpense>, BackendError>;

    async fn fetch_user_profile(&self, user_id: &str) -> Result<UserProfile, BackendError>;
}

#[async_trait]
impl AttendanceBackend for BackendClient {
    async fn fetch_attendance(
        &self,
        user_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, BackendError> {
        self.get_attendance_records(user_id, start_date, end_date).await
    }

    async fn fetch_expenses(&self) -> Result<Vec<ApiExpense>, BackendError> {
        self.get_expenses().await
    }

    async fn submit_expense(&self, submission: &ExpenseSubmission) -> Result<String, BackendError> {
        self.post_expense(submission).await
    }

    async fn fetch_submitted_expenses(&self) -> Result<Vec<SubmittedExpense>, BackendError> {
        self.get_submitted_expenses().await
    }

    async fn fetch_user_profile(&self, user_id: &str) -> Result<UserProfile, BackendError> {
        self.get_user_profile(user_id).await
    }
}
