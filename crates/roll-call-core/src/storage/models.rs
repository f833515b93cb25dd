use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const TEMPLATE_VERSION: &str = "1.0";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
pub const DEFAULT_LATE_THRESHOLD_MINUTES: u32 = 15;

/// A student, keyed by id in the persisted `students` mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub name: String,
    #[serde(rename = "class")]
    pub class_name: String,
    pub roll_no: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "joined")]
    pub joined_at: NaiveDateTime,
}

/// Students in insertion order, keyed by student id.
pub type Roster = IndexMap<String, StudentProfile>;

/// Composite enrollment template. `source_readings` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintTemplate {
    #[serde(rename = "pattern")]
    pub base_pattern: String,
    #[serde(rename = "templates")]
    pub source_readings: Vec<String>,
    #[serde(rename = "quality")]
    pub average_quality: f64,
    #[serde(rename = "registered")]
    pub registered_at: NaiveDateTime,
    #[serde(default = "default_template_version")]
    pub version: String,
}

fn default_template_version() -> String {
    TEMPLATE_VERSION.to_string()
}

/// Templates in enrollment order, keyed by student id.
pub type TemplateSet = IndexMap<String, FingerprintTemplate>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    #[serde(rename = "On Time")]
    OnTime,
    Late,
}

impl AttendanceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AttendanceStatus::OnTime => "On Time",
            AttendanceStatus::Late => "Late",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One check-in. At most one exists per (student_id, calendar_date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub student_id: String,
    #[serde(rename = "name")]
    pub student_name: String,
    #[serde(rename = "class")]
    pub class_name: String,
    #[serde(rename = "check_in")]
    pub check_in_at: NaiveDateTime,
    #[serde(rename = "date")]
    pub calendar_date: NaiveDate,
    pub status: AttendanceStatus,
}

/// Process-wide attendance settings, persisted as individual string keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub late_threshold_minutes: u32,
    pub attendance_active: bool,
    pub admin_password: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_start: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default(),
            window_end: NaiveTime::from_hms_opt(10, 30, 0).unwrap_or_default(),
            late_threshold_minutes: DEFAULT_LATE_THRESHOLD_MINUTES,
            attendance_active: false,
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }
}

/// Parse an `HH:MM` time-of-day.
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()
}

pub fn format_time_of_day(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}
