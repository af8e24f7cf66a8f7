// src/export.rs
use std::io::Write;

use crate::attendance::DayStatus;

/// Writes one CSV row per day with the header `date,status,reason`.
pub fn write_day_statuses_csv<W: Write>(writer: W, days: &[DayStatus]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["date", "status", "reason"])?;
    for day in days {
        let date = day.date.format("%Y-%m-%d").to_string();
        wtr.write_record([
            date.as_str(),
            day.status.as_str(),
            day.reason.as_deref().unwrap_or(""),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
