//! Read-only views derived from the record store.

pub mod dashboard;
pub mod export;
pub mod monthly;
pub mod roster;

pub use dashboard::{dashboard_counters, weekly_series, DailyAttendance, DashboardCounters};
pub use export::{filter_records, write_records_csv, write_report_csv, RecordFilter};
pub use monthly::{
    monthly_report, student_summary, MonthlyReport, ReportSummary, Standing, StudentReportRow,
    StudentSummary,
};
pub use roster::{class_names, search_students};

/// `round(part / whole * 100)`, or 0 when `whole` is 0.
pub(crate) fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}
