// src/expense.rs
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::backend::{ApiExpense, SubmittedExpense};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpenseError {
    #[error("Unknown expense status code {0}")]
    UnknownStatusCode(i64),
    #[error("Unknown expense type code {0}")]
    UnknownTypeCode(i64),
    #[error("Unknown expense status '{0}'")]
    UnknownStatus(String),
    #[error("Unknown expense type '{0}'")]
    UnknownType(String),
    #[error("Mandatory field missing: {0}")]
    MissingField(&'static str),
    #[error("Invalid amount '{0}': expected a positive number")]
    InvalidAmount(String),
    #[error("Unknown search field '{0}' (expected title, date or location)")]
    UnknownSearchField(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpenseStatus {
    Draft,
    Rejected,
    Approved,
    Pending,
}

impl ExpenseStatus {
    /// Maps the backend's `expense_track_status`. `None` is a draft that was
    /// never sent for approval.
    pub fn from_code(code: Option<i64>) -> Result<Self, ExpenseError> {
        match code {
            None => Ok(ExpenseStatus::Draft),
            Some(0) => Ok(ExpenseStatus::Rejected),
            Some(1) => Ok(ExpenseStatus::Approved),
            Some(2) => Ok(ExpenseStatus::Pending),
            Some(other) => Err(ExpenseError::UnknownStatusCode(other)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseStatus::Draft => "Draft",
            ExpenseStatus::Rejected => "Rejected",
            ExpenseStatus::Approved => "Approved",
            ExpenseStatus::Pending => "Pending",
        }
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseStatus {
    type Err = ExpenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(ExpenseStatus::Draft),
            "rejected" => Ok(ExpenseStatus::Rejected),
            "approved" => Ok(ExpenseStatus::Approved),
            "pending" => Ok(ExpenseStatus::Pending),
            _ => Err(ExpenseError::UnknownStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExpenseType {
    Travel,
    Food,
    Accommodation,
    OfficeSupplies,
}

impl ExpenseType {
    pub fn from_code(code: i64) -> Result<Self, ExpenseError> {
        match code {
            0 => Ok(ExpenseType::Travel),
            1 => Ok(ExpenseType::Food),
            2 => Ok(ExpenseType::Accommodation),
            3 => Ok(ExpenseType::OfficeSupplies),
            other => Err(ExpenseError::UnknownTypeCode(other)),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            ExpenseType::Travel => 0,
            ExpenseType::Food => 1,
            ExpenseType::Accommodation => 2,
            ExpenseType::OfficeSupplies => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExpenseType::Travel => "Travel",
            ExpenseType::Food => "Food",
            ExpenseType::Accommodation => "Accommodation",
            ExpenseType::OfficeSupplies => "Office Supplies",
        }
    }
}

impl fmt::Display for ExpenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ExpenseType {
    type Err = ExpenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "travel" => Ok(ExpenseType::Travel),
            "food" => Ok(ExpenseType::Food),
            "accommodation" => Ok(ExpenseType::Accommodation),
            "office supplies" => Ok(ExpenseType::OfficeSupplies),
            _ => Err(ExpenseError::UnknownType(s.to_string())),
        }
    }
}

/// Expense as shown in the list and detail views.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expense {
    pub id: String,
    pub employee: String,
    pub title: String,
    pub expense_type: ExpenseType,
    pub amount: Decimal,
    pub created_at: String,
    pub status: ExpenseStatus,
    pub remarks: Option<String>,
}

impl Expense {
    pub fn from_api(row: ApiExpense) -> Result<Self, ExpenseError> {
        Ok(Self {
            expense_type: ExpenseType::from_code(row.expense_type_id)?,
            status: ExpenseStatus::from_code(row.expense_track_status)?,
            id: row.expense_track_id,
            employee: row.created_by_full_name,
            title: row.expense_track_title,
            amount: row.expense_total_amount,
            created_at: row.expense_track_created_at,
            remarks: row.expense_track_app_rej_remarks,
        })
    }

    /// `Jan 5, 2024` style date, `N/A` when the backend sent nothing. Unparseable
    /// values are shown as received.
    pub fn display_date(&self) -> String {
        let raw = self.created_at.trim();
        if raw.is_empty() {
            return "N/A".to_string();
        }
        parse_backend_date(raw)
            .map(|date| date.format("%b %-d, %Y").to_string())
            .unwrap_or_else(|| raw.to_string())
    }
}

fn parse_backend_date(raw: &str) -> Option<NaiveDate> {
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
}

/// Transforms every backend row. A single unknown code fails the whole list.
pub fn transform_expenses(rows: Vec<ApiExpense>) -> Result<Vec<Expense>, ExpenseError> {
    rows.into_iter().map(Expense::from_api).collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    pub search: String,
    /// `None` shows every status.
    pub status: Option<ExpenseStatus>,
}

impl ExpenseFilter {
    pub fn matches(&self, expense: &Expense) -> bool {
        let query = self.search.trim().to_lowercase();
        let matches_search = query.is_empty()
            || expense.employee.to_lowercase().contains(&query)
            || expense.title.to_lowercase().contains(&query)
            || expense
                .remarks
                .as_deref()
                .map_or(false, |remarks| remarks.to_lowercase().contains(&query));
        let matches_status = self.status.map_or(true, |status| expense.status == status);
        matches_search && matches_status
    }

    pub fn apply<'a>(&self, expenses: &'a [Expense]) -> Vec<&'a Expense> {
        expenses.iter().filter(|e| self.matches(e)).collect()
    }
}

/// Column searched on the submitted-expense list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchField {
    #[default]
    Title,
    Date,
    Location,
}

impl FromStr for SearchField {
    type Err = ExpenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(SearchField::Title),
            "date" => Ok(SearchField::Date),
            "location" => Ok(SearchField::Location),
            _ => Err(ExpenseError::UnknownSearchField(s.to_string())),
        }
    }
}

/// Case-insensitive substring search on one field. A blank query keeps every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmittedExpenseFilter {
    pub field: SearchField,
    pub query: String,
}

impl SubmittedExpenseFilter {
    pub fn matches(&self, expense: &SubmittedExpense) -> bool {
        let query = self.query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        let haystack = match self.field {
            SearchField::Title => Some(expense.title.as_str()),
            SearchField::Date => Some(expense.date_submitted.as_str()),
            SearchField::Location => expense.location.as_deref(),
        };
        haystack.map_or(false, |value| value.to_lowercase().contains(&query))
    }

    pub fn apply<'a>(&self, expenses: &'a [SubmittedExpense]) -> Vec<&'a SubmittedExpense> {
        expenses.iter().filter(|e| self.matches(e)).collect()
    }
}

/// Payload posted to the submission endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseSubmission {
    pub title: String,
    #[serde(rename = "type")]
    pub expense_type: i64,
    pub amount: Decimal,
    pub location: Option<String>,
    pub created_by: String,
    pub date_submitted: NaiveDate,
    pub submitted_to: String,
    pub submitted_to_name: String,
}

/// Form contents before validation.
#[derive(Debug, Clone, Default)]
pub struct ExpenseDraft {
    pub title: String,
    pub expense_type: Option<ExpenseType>,
    pub amount: String,
    pub submitted_to: String,
    pub approver_name: String,
    pub bill_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
}

impl ExpenseDraft {
    pub fn into_submission(self, today: NaiveDate) -> Result<ExpenseSubmission, ExpenseError> {
        let title = required(&self.title, "title")?;
        let expense_type = self.expense_type.ok_or(ExpenseError::MissingField("expense type"))?;
        let amount_raw = required(&self.amount, "amount")?;
        let submitted_to = required(&self.submitted_to, "submitted to")?;
        let submitted_to_name = required(&self.approver_name, "approver name")?;

        let amount = Decimal::from_str(&amount_raw)
            .ok()
            .filter(|amount| amount.is_sign_positive() && !amount.is_zero())
            .ok_or_else(|| ExpenseError::InvalidAmount(amount_raw.clone()))?;

        let created_by = [
            self.first_name.as_str(),
            self.middle_name.as_deref().unwrap_or(""),
            self.last_name.as_str(),
        ]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(ExpenseSubmission {
            title,
            expense_type: expense_type.code(),
            amount,
            location: self.location.filter(|l| !l.trim().is_empty()),
            created_by,
            date_submitted: self.bill_date.unwrap_or(today),
            submitted_to,
            submitted_to_name,
        })
    }
}

fn required(value: &str, field: &'static str) -> Result<String, ExpenseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ExpenseError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn api_row(id: &str, type_id: i64, status: Option<i64>) -> ApiExpense {
        ApiExpense {
            expense_track_id: id.to_string(),
            expense_track_title: "Client visit".to_string(),
            expense_type_id: type_id,
            expense_total_amount: dec!(120.50),
            expense_track_status: status,
            expense_track_app_rej_remarks: None,
            expense_track_created_at: "2024-01-05 10:22:11".to_string(),
            expense_track_created_by: Some(7),
            expense_track_submitted_to: None,
            expense_track_approved_rejected_by: None,
            expense_track_approved_rejected_at: None,
            created_by_full_name: "John Doe".to_string(),
        }
    }

    fn expense(employee: &str, title: &str, remarks: Option<&str>, status: ExpenseStatus) -> Expense {
        Expense {
            id: "1".to_string(),
            employee: employee.to_string(),
            title: title.to_string(),
            expense_type: ExpenseType::Food,
            amount: dec!(10),
            created_at: String::new(),
            status,
            remarks: remarks.map(str::to_string),
        }
    }

    #[test]
    fn status_codes_map_exhaustively() {
        assert_eq!(ExpenseStatus::from_code(None).unwrap(), ExpenseStatus::Draft);
        assert_eq!(ExpenseStatus::from_code(Some(0)).unwrap(), ExpenseStatus::Rejected);
        assert_eq!(ExpenseStatus::from_code(Some(1)).unwrap(), ExpenseStatus::Approved);
        assert_eq!(ExpenseStatus::from_code(Some(2)).unwrap(), ExpenseStatus::Pending);
        assert_eq!(
            ExpenseStatus::from_code(Some(3)),
            Err(ExpenseError::UnknownStatusCode(3))
        );
    }

    #[test]
    fn type_codes_fail_loudly_on_unknown_values() {
        assert_eq!(ExpenseType::from_code(3).unwrap().label(), "Office Supplies");
        assert_eq!(ExpenseType::from_code(4), Err(ExpenseError::UnknownTypeCode(4)));
        assert!("other".parse::<ExpenseType>().is_err());
        assert_eq!(ExpenseType::from_code(9), Err(ExpenseError::UnknownTypeCode(9)));
        assert_eq!(ExpenseType::from_code(-1), Err(ExpenseError::UnknownTypeCode(-1)));
    }

    #[test]
    fn from_api_transforms_row() {
        let expense = Expense::from_api(api_row("42", 0, Some(2))).unwrap();
        assert_eq!(expense.id, "42");
        assert_eq!(expense.employee, "John Doe");
        assert_eq!(expense.expense_type, ExpenseType::Travel);
        assert_eq!(expense.status, ExpenseStatus::Pending);
        assert_eq!(expense.amount, dec!(120.50));
        assert_eq!(expense.display_date(), "Jan 5, 2024");
    }

    #[test]
    fn transform_fails_on_first_unknown_code() {
        let rows = vec![api_row("1", 1, Some(1)), api_row("2", 1, Some(7))];
        assert_eq!(
            transform_expenses(rows),
            Err(ExpenseError::UnknownStatusCode(7))
        );
    }

    #[test]
    fn display_date_fallbacks() {
        let mut e = expense("A", "B", None, ExpenseStatus::Draft);
        assert_eq!(e.display_date(), "N/A");
        e.created_at = "2024-12-31".to_string();
        assert_eq!(e.display_date(), "Dec 31, 2024");
        e.created_at = "yesterday".to_string();
        assert_eq!(e.display_date(), "yesterday");
    }

    #[test]
    fn filter_searches_employee_title_and_remarks() {
        let expenses = vec![
            expense("Michael Scott", "Paper", None, ExpenseStatus::Approved),
            expense("Jim Halpert", "Hotel", Some("Conference in Scranton"), ExpenseStatus::Pending),
            expense("Dwight Schrute", "Beets", None, ExpenseStatus::Rejected),
        ];

        let filter = ExpenseFilter {
            search: "scranton".to_string(),
            status: None,
        };
        let hits: Vec<&str> = filter
            .apply(&expenses)
            .into_iter()
            .map(|e| e.employee.as_str())
            .collect();
        assert_eq!(hits, vec!["Jim Halpert"]);

        let filter = ExpenseFilter {
            search: "".to_string(),
            status: Some(ExpenseStatus::Rejected),
        };
        assert_eq!(filter.apply(&expenses).len(), 1);

        let filter = ExpenseFilter {
            search: "PAPER".to_string(),
            status: Some(ExpenseStatus::Pending),
        };
        assert!(filter.apply(&expenses).is_empty());

        assert_eq!(ExpenseFilter::default().apply(&expenses).len(), 3);
    }

    fn submitted(title: &str, date: &str, location: Option<&str>) -> SubmittedExpense {
        SubmittedExpense {
            title: title.to_string(),
            date_submitted: date.to_string(),
            location: location.map(str::to_string),
            expense_type: "0".to_string(),
            amount: dec!(20),
            status: None,
            created_by: None,
            approved_by: None,
        }
    }

    #[test]
    fn submitted_filter_searches_one_field() {
        let rows = vec![
            submitted("Taxi to Salt Lake", "2024-03-02", Some("Kolkata")),
            submitted("Hotel Kolkata", "2024-04-11", None),
            submitted("Lunch", "2024-03-15", Some("Dhaka")),
        ];

        let by_title = SubmittedExpenseFilter {
            field: SearchField::Title,
            query: "kolkata".to_string(),
        };
        let titles: Vec<&str> = by_title.apply(&rows).into_iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Hotel Kolkata"]);

        let by_location = SubmittedExpenseFilter {
            field: SearchField::Location,
            query: "KOLKATA".to_string(),
        };
        let titles: Vec<&str> = by_location
            .apply(&rows)
            .into_iter()
            .map(|e| e.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Taxi to Salt Lake"]);

        let by_date = SubmittedExpenseFilter {
            field: SearchField::Date,
            query: "2024-03".to_string(),
        };
        assert_eq!(by_date.apply(&rows).len(), 2);

        let blank = SubmittedExpenseFilter {
            field: SearchField::Location,
            query: "  ".to_string(),
        };
        assert_eq!(blank.apply(&rows).len(), 3);
    }

    #[test]
    fn search_field_parsing() {
        assert_eq!("Date".parse::<SearchField>().unwrap(), SearchField::Date);
        assert_eq!(SearchField::default(), SearchField::Title);
        assert_eq!(
            "amount".parse::<SearchField>(),
            Err(ExpenseError::UnknownSearchField("amount".to_string()))
        );
    }

    #[test]
    fn submitted_rows_default_to_pending() {
        let mut row = submitted("Lunch", "2024-03-15", None);
        assert_eq!(row.status_or_pending(), "pending");
        row.status = Some("approved".to_string());
        assert_eq!(row.status_or_pending(), "approved");
    }

    fn valid_draft() -> ExpenseDraft {
        ExpenseDraft {
            title: " Taxi to site ".to_string(),
            expense_type: Some(ExpenseType::Travel),
            amount: "35.75".to_string(),
            submitted_to: "manager".to_string(),
            approver_name: "Michael Scott".to_string(),
            bill_date: None,
            location: Some("22.486425, 88.3746501".to_string()),
            first_name: "John".to_string(),
            middle_name: Some("".to_string()),
            last_name: "Doe".to_string(),
        }
    }

    #[test]
    fn draft_becomes_submission() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let submission = valid_draft().into_submission(today).unwrap();
        assert_eq!(submission.title, "Taxi to site");
        assert_eq!(submission.expense_type, 0);
        assert_eq!(submission.amount, dec!(35.75));
        assert_eq!(submission.created_by, "John Doe");
        assert_eq!(submission.date_submitted, today);

        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["type"], 0);
        assert_eq!(json["createdBy"], "John Doe");
        assert_eq!(json["submittedToName"], "Michael Scott");
        assert_eq!(json["dateSubmitted"], "2024-03-01");
    }

    #[test]
    fn draft_validation_errors() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        let mut draft = valid_draft();
        draft.title = "  ".to_string();
        assert_eq!(draft.into_submission(today), Err(ExpenseError::MissingField("title")));

        let mut draft = valid_draft();
        draft.expense_type = None;
        assert_eq!(
            draft.into_submission(today),
            Err(ExpenseError::MissingField("expense type"))
        );

        let mut draft = valid_draft();
        draft.approver_name = String::new();
        assert_eq!(
            draft.into_submission(today),
            Err(ExpenseError::MissingField("approver name"))
        );

        let mut draft = valid_draft();
        draft.amount = "twelve".to_string();
        assert_eq!(
            draft.into_submission(today),
            Err(ExpenseError::InvalidAmount("twelve".to_string()))
        );

        let mut draft = valid_draft();
        draft.amount = "-4".to_string();
        assert!(matches!(
            draft.into_submission(today),
            Err(ExpenseError::InvalidAmount(_))
        ));
    }

    #[test]
    fn status_and_type_parse_from_user_input() {
        assert_eq!("approved".parse::<ExpenseStatus>().unwrap(), ExpenseStatus::Approved);
        assert_eq!("office-supplies".parse::<ExpenseType>().unwrap(), ExpenseType::OfficeSupplies);
        assert!("lunch".parse::<ExpenseType>().is_err());
    }
}
