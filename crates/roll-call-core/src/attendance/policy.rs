use crate::storage::models::{AttendanceRecord, AttendanceStatus, Roster, Settings};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Why a scan did not produce a record. These are ordinary outcomes, not failures.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("Attendance is not active")]
    InactiveWindow,
    #[error("Attendance has not started yet")]
    NotStarted,
    #[error("Attendance window has closed")]
    WindowClosed,
    #[error("Student not found")]
    StudentNotFound,
    #[error("Attendance already marked today")]
    AlreadyMarked,
    #[error("No fingerprints registered")]
    NoTemplatesEnrolled,
    #[error("Fingerprint not recognized")]
    NoMatch,
    #[error("Scanner is busy")]
    ScannerBusy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStatus {
    Inactive,
    NotStarted,
    InProgress,
    Closed,
}

impl fmt::Display for WindowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WindowStatus::Inactive => "Attendance Not Active",
            WindowStatus::NotStarted => "Attendance Not Started",
            WindowStatus::InProgress => "Attendance in Progress",
            WindowStatus::Closed => "Attendance Closed",
        };
        f.write_str(label)
    }
}

/// Window bounds are `HH:MM`, so the current time is compared at minute
/// granularity and both ends are inclusive.
fn minute_of(now: NaiveDateTime) -> NaiveTime {
    NaiveTime::from_hms_opt(now.hour(), now.minute(), 0).unwrap_or(now.time())
}

pub fn window_status(settings: &Settings, now: NaiveDateTime) -> WindowStatus {
    if !settings.attendance_active {
        return WindowStatus::Inactive;
    }
    let minute = minute_of(now);
    if minute < settings.window_start {
        WindowStatus::NotStarted
    } else if minute > settings.window_end {
        WindowStatus::Closed
    } else {
        WindowStatus::InProgress
    }
}

/// Gates 1 and 2 of the decision: active flag, then the daily window.
pub fn check_window(settings: &Settings, now: NaiveDateTime) -> Result<(), Rejection> {
    match window_status(settings, now) {
        WindowStatus::Inactive => Err(Rejection::InactiveWindow),
        WindowStatus::NotStarted => Err(Rejection::NotStarted),
        WindowStatus::Closed => Err(Rejection::WindowClosed),
        WindowStatus::InProgress => Ok(()),
    }
}

/// On time up to and including `late_threshold_minutes` whole minutes after
/// the window opens; late from the next minute on.
pub fn classify_arrival(settings: &Settings, now: NaiveDateTime) -> AttendanceStatus {
    let start = now.date().and_time(settings.window_start);
    if now <= start {
        return AttendanceStatus::OnTime;
    }
    let late_minutes = (now - start).num_minutes();
    if late_minutes > i64::from(settings.late_threshold_minutes) {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::OnTime
    }
}

pub fn is_marked(records: &[AttendanceRecord], student_id: &str, date: NaiveDate) -> bool {
    records
        .iter()
        .any(|r| r.student_id == student_id && r.calendar_date == date)
}

/// Run the full decision for a matched student and build the record to append.
///
/// Checks run in a fixed order and the first failure is returned: active
/// flag, window, student lookup, duplicate check. The caller is responsible
/// for appending the returned record.
pub fn decide(
    settings: &Settings,
    roster: &Roster,
    records: &[AttendanceRecord],
    student_id: &str,
    now: NaiveDateTime,
) -> Result<AttendanceRecord, Rejection> {
    check_window(settings, now)?;

    let student = roster.get(student_id).ok_or(Rejection::StudentNotFound)?;

    let today = now.date();
    if is_marked(records, student_id, today) {
        return Err(Rejection::AlreadyMarked);
    }

    let status = classify_arrival(settings, now);
    debug!("Student {} checked in at {} ({})", student_id, now, status);

    Ok(AttendanceRecord {
        student_id: student_id.to_string(),
        student_name: student.name.clone(),
        class_name: student.class_name.clone(),
        check_in_at: now,
        calendar_date: today,
        status,
    })
}
