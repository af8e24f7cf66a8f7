// src/main.rs
use anyhow::{Context, Result};
use attendance_core::attendance::{
    filter_by_status, AttendanceStatus, AttendanceSummary, StatusCounts,
};
use attendance_core::backend::BackendClient;
use attendance_core::config::AppConfig;
use attendance_core::data_service::DataService;
use attendance_core::date_range::{DateRange, RangePreset};
use attendance_core::expense::{
    ExpenseDraft, ExpenseFilter, ExpenseStatus, ExpenseType, SearchField, SubmittedExpenseFilter,
};
use attendance_core::export::write_day_statuses_csv;
use attendance_core::holidays::HolidayCalendar;
use attendance_core::work_hours::{load_work_records, summarize_work_hours, Period};
use attendance_core::AppError;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "attendance", version, about = "Attendance, work hours and expenses from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Remember the user id for later commands
    Login {
        #[arg(long)]
        user_id: String,
    },
    /// Forget the stored user id
    Logout,
    /// Day-by-day attendance status for a date range
    Attendance(AttendanceArgs),
    /// List configured holidays
    Holidays {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Also list every Sunday in the range
        #[arg(long, requires_all = ["from", "to"])]
        include_sundays: bool,
    },
    /// Total and average work hours for a period
    WorkHours {
        /// "Last Week", "Last Month" or "Last Year"
        #[arg(long, default_value = "Last Week")]
        period: String,
        /// Read work records from a JSON file instead of the backend
        #[arg(long)]
        records: Option<PathBuf>,
    },
    /// List expenses
    Expenses {
        #[arg(long, default_value = "")]
        search: String,
        /// Draft, Rejected, Approved or Pending
        #[arg(long)]
        status: Option<ExpenseStatus>,
    },
    /// List submitted expenses, searching one field
    SubmittedExpenses {
        #[arg(long, default_value = "")]
        search: String,
        /// title, date or location
        #[arg(long, default_value = "title")]
        field: SearchField,
    },
    /// Submit a new expense
    SubmitExpense(SubmitExpenseArgs),
    /// Show the logged-in user's profile
    Profile,
}

#[derive(Args)]
struct AttendanceArgs {
    #[arg(long, requires = "end", conflicts_with = "preset")]
    start: Option<NaiveDate>,
    #[arg(long, requires = "start")]
    end: Option<NaiveDate>,
    /// this-week, this-month or last-month
    #[arg(long)]
    preset: Option<RangePreset>,
    /// Only show days with this status
    #[arg(long)]
    status: Option<AttendanceStatus>,
    /// Write the days as CSV to this file
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[derive(Args)]
struct SubmitExpenseArgs {
    #[arg(long)]
    title: String,
    /// Travel, Food, Accommodation or Office Supplies
    #[arg(long = "type")]
    expense_type: ExpenseType,
    #[arg(long)]
    amount: String,
    /// Role of the approver, e.g. Manager
    #[arg(long)]
    submitted_to: String,
    #[arg(long)]
    approver: String,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    bill_date: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- Setup ---
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Failed to load configuration")?;

    match run(cli.command, &config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    }
}

async fn run(command: Command, config: &AppConfig) -> Result<(), AppError> {
    let today = Local::now().date_naive();
    let sessions = config.session_store();

    match command {
        Command::Login { user_id } => {
            sessions.save(&user_id)?;
            println!("Logged in as user {}", user_id);
        }
        Command::Logout => {
            sessions.clear()?;
            println!("Logged out");
        }
        Command::Holidays {
            from,
            to,
            include_sundays,
        } => {
            let mut calendar = config.holiday_calendar()?;
            if let (true, Some(from), Some(to)) = (include_sundays, from, to) {
                calendar = calendar.with_sundays(from, to);
            }
            print_holidays(&calendar, from, to);
        }
        Command::WorkHours {
            period,
            records: Some(path),
        } => {
            let period: Period = period.parse()?;
            let records = load_work_records(&path)?;
            let summary = summarize_work_hours(period, today, &records)?;
            print_work_hours(&summary);
        }
        command => {
            // Everything below talks to the backend
            let user_id = sessions.require_user_id()?;
            let client = BackendClient::new(config.backend_config())?;
            let service = DataService::new(Arc::new(client), config.holiday_calendar()?);
            info!("Backend client initialized for {}", config.backend_url);
            run_remote(command, &service, &user_id, today).await?;
        }
    }
    Ok(())
}

async fn run_remote(
    command: Command,
    service: &DataService<BackendClient>,
    user_id: &str,
    today: NaiveDate,
) -> Result<(), AppError> {
    match command {
        Command::Attendance(args) => {
            let range = match (args.start, args.end, args.preset) {
                (Some(start), Some(end), _) => DateRange::new(start, end, today)?,
                (_, _, Some(preset)) => preset.resolve(today),
                _ => RangePreset::ThisMonth.resolve(today),
            };
            let days = service
                .attendance_for_range(user_id, range.start, range.end, today)
                .await?;

            for day in filter_by_status(&days, args.status) {
                match &day.reason {
                    Some(reason) => println!("{}  {:<15} {}", day.date, day.status, reason),
                    None => println!("{}  {}", day.date, day.status),
                }
            }

            let counts = StatusCounts::from_days(&days);
            let summary = AttendanceSummary::from_days(&days);
            println!();
            println!(
                "Present: {}  Absent: {}  Not Logged Out: {}  Holyday: {}",
                counts.present, counts.absent, counts.not_logged_out, counts.holyday
            );
            match summary.attendance_rate {
                Some(rate) => println!("Attendance rate: {}%", rate),
                None => println!("Attendance rate: N/A"),
            }

            if let Some(path) = args.csv {
                let file = File::create(&path).map_err(csv::Error::from)?;
                write_day_statuses_csv(file, &days)?;
                println!("Wrote {} days to {}", days.len(), path.display());
            }
        }
        Command::WorkHours { period, .. } => {
            let period: Period = period.parse()?;
            let summary = service.work_hours(user_id, period, today).await?;
            print_work_hours(&summary);
        }
        Command::Expenses { search, status } => {
            let expenses = service.expenses(&ExpenseFilter { search, status }).await?;
            if expenses.is_empty() {
                println!("No expenses found");
            }
            for expense in &expenses {
                println!(
                    "#{:<6} {:<14} {:<10} {:>12} {:<16} {}",
                    expense.id,
                    expense.display_date(),
                    expense.status,
                    expense.amount,
                    expense.expense_type,
                    expense.title
                );
            }
        }
        Command::SubmittedExpenses { search, field } => {
            let rows = service
                .submitted_expenses(&SubmittedExpenseFilter { field, query: search })
                .await?;
            if rows.is_empty() {
                println!("No submitted expenses found");
            }
            for row in &rows {
                println!(
                    "{:<12} {:<16} {:<16} {:>12} {:<9} {}",
                    row.date_submitted,
                    row.location.as_deref().unwrap_or("-"),
                    row.expense_type,
                    row.amount,
                    row.status_or_pending(),
                    row.title
                );
            }
        }
        Command::SubmitExpense(args) => {
            let profile = service.profile(user_id).await?;
            let draft = ExpenseDraft {
                title: args.title,
                expense_type: Some(args.expense_type),
                amount: args.amount,
                submitted_to: args.submitted_to,
                approver_name: args.approver,
                bill_date: args.bill_date,
                location: args.location.or(profile.location),
                first_name: profile.first_name,
                middle_name: profile.middle_name,
                last_name: profile.last_name,
            };
            let message = service.submit_expense(draft, today).await?;
            println!("{}", message);
        }
        Command::Profile => {
            let profile = service.profile(user_id).await?;
            println!("{} (user {})", profile.full_name(), profile.user_id);
            let optional = [
                ("Email", &profile.email),
                ("Phone", &profile.phone),
                ("Department", &profile.department),
                ("Location", &profile.location),
                ("Joined", &profile.join_date),
            ];
            for (label, value) in optional {
                if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                    println!("{}: {}", label, value);
                }
            }
        }
        Command::Login { .. } | Command::Logout | Command::Holidays { .. } => {}
    }
    Ok(())
}

fn print_holidays(calendar: &HolidayCalendar, from: Option<NaiveDate>, to: Option<NaiveDate>) {
    let entries: Vec<_> = match (from, to) {
        (Some(from), Some(to)) => calendar.entries_between(from, to).collect(),
        (Some(from), None) => calendar.entries().filter(|e| e.date >= from).collect(),
        (None, Some(to)) => calendar.entries().filter(|e| e.date <= to).collect(),
        (None, None) => calendar.entries().collect(),
    };
    if entries.is_empty() {
        println!("No holidays");
    }
    for entry in entries {
        println!("{}  {}", entry.date.format("%a %b %-d, %Y"), entry.name);
    }
}

fn print_work_hours(summary: &attendance_core::work_hours::WorkHoursSummary) {
    println!(
        "{} ({} to {}), {} records",
        summary.period, summary.window_start, summary.window_end, summary.record_count
    );
    println!("Total Hours: {}", summary.total_hours);
    println!("Average Hours: {}", summary.average_display());
    println!("Average Check-in: {}", summary.check_in_display());
    println!("Average Check-out: {}", summary.check_out_display());
}
