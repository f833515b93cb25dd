use super::percentage;
use crate::storage::models::{AttendanceRecord, AttendanceStatus, Roster};
use chrono::{Duration, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCounters {
    pub total_students: usize,
    pub present_today: usize,
    pub on_time_today: usize,
    pub late_today: usize,
    pub absent_today: usize,
}

pub fn dashboard_counters(
    roster: &Roster,
    records: &[AttendanceRecord],
    today: NaiveDate,
) -> DashboardCounters {
    let todays: Vec<&AttendanceRecord> = records
        .iter()
        .filter(|r| r.calendar_date == today)
        .collect();
    let on_time_today = todays
        .iter()
        .filter(|r| r.status == AttendanceStatus::OnTime)
        .count();
    let late_today = todays
        .iter()
        .filter(|r| r.status == AttendanceStatus::Late)
        .count();

    DashboardCounters {
        total_students: roster.len(),
        present_today: todays.len(),
        on_time_today,
        late_today,
        absent_today: roster.len().saturating_sub(todays.len()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyAttendance {
    pub date: NaiveDate,
    pub count: usize,
    pub percentage: u32,
}

/// The last seven calendar days ending with `today`, oldest first.
pub fn weekly_series(
    total_students: usize,
    records: &[AttendanceRecord],
    today: NaiveDate,
) -> Vec<DailyAttendance> {
    (0..7)
        .rev()
        .map(|days_back| {
            let date = today - Duration::days(days_back);
            let count = records.iter().filter(|r| r.calendar_date == date).count();
            DailyAttendance {
                date,
                count,
                percentage: percentage(count, total_students),
            }
        })
        .collect()
}
