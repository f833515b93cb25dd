use super::models::{
    format_time_of_day, parse_time_of_day, AttendanceRecord, Roster, Settings, TemplateSet,
};
use super::KeyValueStore;
use crate::error::Error;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

pub const STUDENTS_KEY: &str = "students";
pub const FINGERPRINTS_KEY: &str = "fingerprints";
pub const ATTENDANCE_RECORDS_KEY: &str = "attendanceRecords";
pub const START_TIME_KEY: &str = "attendanceStartTime";
pub const END_TIME_KEY: &str = "attendanceEndTime";
pub const LATE_THRESHOLD_KEY: &str = "lateThreshold";
pub const ACTIVE_KEY: &str = "attendanceActive";
pub const ADMIN_PASSWORD_KEY: &str = "adminPassword";

/// Typed accessors over the persisted collections.
///
/// Collections are stored as JSON documents and always written whole.
/// A missing key reads as the collection's empty value. There is no
/// cross-process locking: two writers replacing the same collection
/// concurrently will lose one of the updates.
pub struct RecordStore<S> {
    backend: S,
}

impl<S: KeyValueStore> RecordStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn get<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, Error> {
        match self.backend.load(key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(T::default()),
        }
    }

    pub fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), Error> {
        let raw = serde_json::to_string(value)?;
        self.backend.store(key, &raw)
    }

    /// Write several raw entries atomically.
    pub fn put_raw_batch(&self, entries: &[(&str, String)]) -> Result<(), Error> {
        self.backend.store_batch(entries)
    }

    pub fn students(&self) -> Result<Roster, Error> {
        self.get(STUDENTS_KEY)
    }

    pub fn put_students(&self, students: &Roster) -> Result<(), Error> {
        self.put(STUDENTS_KEY, students)?;
        debug!("Saved {} students", students.len());
        Ok(())
    }

    pub fn templates(&self) -> Result<TemplateSet, Error> {
        self.get(FINGERPRINTS_KEY)
    }

    pub fn put_templates(&self, templates: &TemplateSet) -> Result<(), Error> {
        self.put(FINGERPRINTS_KEY, templates)?;
        debug!("Saved {} fingerprint templates", templates.len());
        Ok(())
    }

    pub fn attendance_records(&self) -> Result<Vec<AttendanceRecord>, Error> {
        self.get(ATTENDANCE_RECORDS_KEY)
    }

    pub fn put_attendance_records(&self, records: &[AttendanceRecord]) -> Result<(), Error> {
        self.put(ATTENDANCE_RECORDS_KEY, records)?;
        debug!("Saved {} attendance records", records.len());
        Ok(())
    }

    /// Read settings, substituting defaults for missing or unparseable keys.
    pub fn settings(&self) -> Result<Settings, Error> {
        let mut settings = Settings::default();

        if let Some(raw) = self.backend.load(START_TIME_KEY)? {
            match parse_time_of_day(&raw) {
                Some(time) => settings.window_start = time,
                None => warn!("Ignoring malformed {} value '{}'", START_TIME_KEY, raw),
            }
        }
        if let Some(raw) = self.backend.load(END_TIME_KEY)? {
            match parse_time_of_day(&raw) {
                Some(time) => settings.window_end = time,
                None => warn!("Ignoring malformed {} value '{}'", END_TIME_KEY, raw),
            }
        }
        if let Some(raw) = self.backend.load(LATE_THRESHOLD_KEY)? {
            match raw.trim().parse::<u32>() {
                Ok(minutes) if minutes >= 1 => settings.late_threshold_minutes = minutes,
                _ => warn!("Ignoring malformed {} value '{}'", LATE_THRESHOLD_KEY, raw),
            }
        }
        if let Some(raw) = self.backend.load(ACTIVE_KEY)? {
            settings.attendance_active = raw.trim() == "true";
        }
        if let Some(raw) = self.backend.load(ADMIN_PASSWORD_KEY)? {
            if !raw.is_empty() {
                settings.admin_password = raw;
            }
        }

        Ok(settings)
    }

    pub fn put_settings(&self, settings: &Settings) -> Result<(), Error> {
        self.backend.store_batch(&[
            (START_TIME_KEY, format_time_of_day(settings.window_start)),
            (END_TIME_KEY, format_time_of_day(settings.window_end)),
            (
                LATE_THRESHOLD_KEY,
                settings.late_threshold_minutes.to_string(),
            ),
            (ACTIVE_KEY, settings.attendance_active.to_string()),
            (ADMIN_PASSWORD_KEY, settings.admin_password.clone()),
        ])?;
        debug!(
            "Saved settings: window {}-{}, threshold {}m, active {}",
            format_time_of_day(settings.window_start),
            format_time_of_day(settings.window_end),
            settings.late_threshold_minutes,
            settings.attendance_active,
        );
        Ok(())
    }

    pub fn clear(&self) -> Result<(), Error> {
        self.backend.clear()
    }
}
