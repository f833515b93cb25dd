use super::percentage;
use crate::storage::models::{AttendanceRecord, Roster};
use chrono::Datelike;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Percentage at or above which a student's attendance counts as good.
pub const GOOD_STANDING_PERCENT: u32 = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Standing {
    Good,
    Low,
}

impl Standing {
    pub fn from_percentage(percentage: u32) -> Self {
        if percentage >= GOOD_STANDING_PERCENT {
            Standing::Good
        } else {
            Standing::Low
        }
    }
}

impl fmt::Display for Standing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Standing::Good => f.write_str("Good"),
            Standing::Low => f.write_str("Low"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReportRow {
    pub student_id: String,
    pub name: String,
    pub class_name: String,
    pub present_days: usize,
    pub total_days: usize,
    pub percentage: u32,
    pub standing: Standing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_students: usize,
    pub total_present_days: usize,
    pub average_present_days: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub class_filter: Option<String>,
    pub rows: Vec<StudentReportRow>,
    pub summary: ReportSummary,
}

/// Per-student attendance for one month, optionally limited to one class.
///
/// `total_days` is the number of distinct dates present in the filtered
/// record set and is shared by every row, so a class with fewer sessions
/// than others under the same filter reads lower than its own day count
/// would suggest. Rows follow roster order.
pub fn monthly_report(
    roster: &Roster,
    records: &[AttendanceRecord],
    year: i32,
    month: u32,
    class_filter: Option<&str>,
) -> MonthlyReport {
    let in_scope: Vec<&AttendanceRecord> = records
        .iter()
        .filter(|r| r.calendar_date.year() == year && r.calendar_date.month() == month)
        .filter(|r| class_filter.map_or(true, |class| r.class_name == class))
        .collect();

    let total_days = in_scope
        .iter()
        .map(|r| r.calendar_date)
        .collect::<HashSet<_>>()
        .len();

    let rows: Vec<StudentReportRow> = roster
        .iter()
        .filter(|(_, student)| class_filter.map_or(true, |class| student.class_name == class))
        .map(|(student_id, student)| {
            let present_days = in_scope
                .iter()
                .filter(|r| &r.student_id == student_id)
                .count();
            let percentage = percentage(present_days, total_days);
            StudentReportRow {
                student_id: student_id.clone(),
                name: student.name.clone(),
                class_name: student.class_name.clone(),
                present_days,
                total_days,
                percentage,
                standing: Standing::from_percentage(percentage),
            }
        })
        .collect();

    let total_present_days: usize = rows.iter().map(|row| row.present_days).sum();
    let average_present_days = if rows.is_empty() {
        0
    } else {
        (total_present_days as f64 / rows.len() as f64).round() as usize
    };

    MonthlyReport {
        year,
        month,
        class_filter: class_filter.map(str::to_string),
        summary: ReportSummary {
            total_students: rows.len(),
            total_present_days,
            average_present_days,
        },
        rows,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub student_id: String,
    pub present_days: usize,
    pub total_days: usize,
    pub percentage: u32,
}

/// Lifetime attendance for one student against every day anyone checked in.
pub fn student_summary(records: &[AttendanceRecord], student_id: &str) -> StudentSummary {
    let present_days = records
        .iter()
        .filter(|r| r.student_id == student_id)
        .count();
    let total_days = records
        .iter()
        .map(|r| r.calendar_date)
        .collect::<HashSet<_>>()
        .len();

    StudentSummary {
        student_id: student_id.to_string(),
        present_days,
        total_days,
        percentage: percentage(present_days, total_days),
    }
}
