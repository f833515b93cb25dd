//! Whole-store JSON backup and overwrite-style restore.

use crate::error::Error;
use crate::storage::models::{
    format_time_of_day, parse_time_of_day, AttendanceRecord, Roster, TemplateSet,
};
use crate::storage::records::{
    ATTENDANCE_RECORDS_KEY, END_TIME_KEY, FINGERPRINTS_KEY, LATE_THRESHOLD_KEY, START_TIME_KEY,
    STUDENTS_KEY,
};
use crate::storage::{KeyValueStore, RecordStore};
use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use tracing::info;

pub const RESTORE_DEFAULT_START: &str = "09:00";
pub const RESTORE_DEFAULT_END: &str = "09:30";
pub const RESTORE_DEFAULT_THRESHOLD: u32 = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSettings {
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub threshold: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    pub students: Roster,
    pub fingerprints: TemplateSet,
    pub attendance: Vec<AttendanceRecord>,
    pub settings: BackupSettings,
    pub backup_date: NaiveDateTime,
}

/// Lenient shape accepted on restore: every section may be absent or null.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IncomingBackup {
    #[serde(default)]
    students: Option<Roster>,
    #[serde(default)]
    fingerprints: Option<TemplateSet>,
    #[serde(default)]
    attendance: Option<Vec<AttendanceRecord>>,
    #[serde(default)]
    settings: Option<BackupSettings>,
}

/// Window settings carried by a backup's `settings` object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoredSettings {
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub late_threshold_minutes: u32,
}

/// Validated contents of a backup, ready to overwrite the store.
///
/// `settings` is `None` when the document has no `settings` object; the
/// stored window and threshold are then left as they are.
#[derive(Debug, Clone, PartialEq)]
pub struct RestorePlan {
    pub students: Roster,
    pub fingerprints: TemplateSet,
    pub attendance: Vec<AttendanceRecord>,
    pub settings: Option<RestoredSettings>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, found {}",
            other
        ))),
    }
}

pub fn create_backup<S: KeyValueStore>(
    store: &RecordStore<S>,
    taken_at: NaiveDateTime,
) -> Result<BackupDocument, Error> {
    let settings = store.settings()?;
    Ok(BackupDocument {
        students: store.students()?,
        fingerprints: store.templates()?,
        attendance: store.attendance_records()?,
        settings: BackupSettings {
            start_time: Some(format_time_of_day(settings.window_start)),
            end_time: Some(format_time_of_day(settings.window_end)),
            threshold: Some(settings.late_threshold_minutes.to_string()),
        },
        backup_date: taken_at,
    })
}

pub fn backup_to_json(document: &BackupDocument) -> Result<String, Error> {
    Ok(serde_json::to_string_pretty(document)?)
}

fn restore_error(msg: impl Into<String>) -> Error {
    Error::RestoreFormat(msg.into())
}

fn parse_setting_time(raw: Option<&str>, default: &str, field: &str) -> Result<NaiveTime, Error> {
    let raw = raw.filter(|s| !s.trim().is_empty()).unwrap_or(default);
    parse_time_of_day(raw)
        .ok_or_else(|| restore_error(format!("{} '{}' is not HH:MM", field, raw)))
}

/// Parse and validate a backup document without touching any store.
pub fn parse_backup(json: &str) -> Result<RestorePlan, Error> {
    let incoming: IncomingBackup =
        serde_json::from_str(json).map_err(|e| restore_error(e.to_string()))?;

    let fingerprints = incoming.fingerprints.unwrap_or_default();
    if let Some((student_id, _)) = fingerprints
        .iter()
        .find(|(_, template)| template.source_readings.is_empty())
    {
        return Err(restore_error(format!(
            "template for '{}' has no source readings",
            student_id
        )));
    }

    let attendance = incoming.attendance.unwrap_or_default();
    let mut seen = HashSet::new();
    for record in &attendance {
        if !seen.insert((record.student_id.as_str(), record.calendar_date)) {
            return Err(restore_error(format!(
                "duplicate attendance for '{}' on {}",
                record.student_id, record.calendar_date
            )));
        }
    }

    let settings = incoming
        .settings
        .as_ref()
        .map(parse_backup_settings)
        .transpose()?;

    Ok(RestorePlan {
        students: incoming.students.unwrap_or_default(),
        fingerprints,
        attendance,
        settings,
    })
}

/// Missing fields take the restore defaults; malformed ones are rejected.
fn parse_backup_settings(settings: &BackupSettings) -> Result<RestoredSettings, Error> {
    let window_start = parse_setting_time(
        settings.start_time.as_deref(),
        RESTORE_DEFAULT_START,
        "startTime",
    )?;
    let window_end =
        parse_setting_time(settings.end_time.as_deref(), RESTORE_DEFAULT_END, "endTime")?;
    let late_threshold_minutes = match settings.threshold.as_deref().map(str::trim) {
        None | Some("") => RESTORE_DEFAULT_THRESHOLD,
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|minutes| *minutes >= 1)
            .ok_or_else(|| {
                restore_error(format!("threshold '{}' is not a positive integer", raw))
            })?,
    };
    Ok(RestoredSettings {
        window_start,
        window_end,
        late_threshold_minutes,
    })
}

/// Overwrite students, templates, records and (when present) window settings
/// in one batch.
///
/// The active flag and admin password are left as they are.
pub fn apply_restore<S: KeyValueStore>(
    store: &RecordStore<S>,
    plan: &RestorePlan,
) -> Result<(), Error> {
    let mut entries = vec![
        (STUDENTS_KEY, serde_json::to_string(&plan.students)?),
        (FINGERPRINTS_KEY, serde_json::to_string(&plan.fingerprints)?),
        (ATTENDANCE_RECORDS_KEY, serde_json::to_string(&plan.attendance)?),
    ];
    if let Some(settings) = &plan.settings {
        entries.push((START_TIME_KEY, format_time_of_day(settings.window_start)));
        entries.push((END_TIME_KEY, format_time_of_day(settings.window_end)));
        entries.push((
            LATE_THRESHOLD_KEY,
            settings.late_threshold_minutes.to_string(),
        ));
    }
    store.put_raw_batch(&entries)?;
    info!(
        "Restored {} students, {} templates, {} attendance records",
        plan.students.len(),
        plan.fingerprints.len(),
        plan.attendance.len()
    );
    Ok(())
}
