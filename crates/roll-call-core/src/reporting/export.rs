use super::monthly::MonthlyReport;
use crate::error::Error;
use crate::storage::models::AttendanceRecord;
use chrono::NaiveDate;
use std::io::Write;

const CHECK_IN_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub date: Option<NaiveDate>,
    pub class_name: Option<String>,
}

pub fn filter_records<'a>(
    records: &'a [AttendanceRecord],
    filter: &RecordFilter,
) -> Vec<&'a AttendanceRecord> {
    records
        .iter()
        .filter(|r| filter.date.map_or(true, |date| r.calendar_date == date))
        .filter(|r| {
            filter
                .class_name
                .as_deref()
                .map_or(true, |class| r.class_name == class)
        })
        .collect()
}

pub fn write_records_csv<W: Write>(
    records: &[&AttendanceRecord],
    writer: W,
) -> Result<usize, Error> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["Student ID", "Name", "Class", "Check-in", "Status"])?;
    for record in records {
        let check_in = record.check_in_at.format(CHECK_IN_FORMAT).to_string();
        csv.write_record([
            record.student_id.as_str(),
            record.student_name.as_str(),
            record.class_name.as_str(),
            check_in.as_str(),
            record.status.label(),
        ])?;
    }
    csv.flush()?;
    Ok(records.len())
}

pub fn write_report_csv<W: Write>(report: &MonthlyReport, writer: W) -> Result<usize, Error> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "Student ID",
        "Name",
        "Class",
        "Present Days",
        "Total Days",
        "Percentage",
        "Status",
    ])?;
    for row in &report.rows {
        csv.write_record([
            row.student_id.clone(),
            row.name.clone(),
            row.class_name.clone(),
            row.present_days.to_string(),
            row.total_days.to_string(),
            format!("{}%", row.percentage),
            row.standing.to_string(),
        ])?;
    }
    csv.flush()?;
    Ok(report.rows.len())
}
