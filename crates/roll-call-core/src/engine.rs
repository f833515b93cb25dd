use crate::attendance::{self, Rejection, WindowStatus};
use crate::backup::{self, BackupDocument, RestorePlan};
use crate::biometric::enrollment::{capture_readings, check_cancelled};
use crate::biometric::{self, CaptureDevice, ENROLLMENT_SAMPLES};
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::error::Error;
use crate::progress::ProgressReporter;
use crate::reporting::{
    self, DailyAttendance, DashboardCounters, MonthlyReport, RecordFilter, StudentSummary,
};
use crate::storage::models::{
    AttendanceRecord, FingerprintTemplate, Roster, Settings, StudentProfile,
};
use crate::storage::records::{FINGERPRINTS_KEY, STUDENTS_KEY};
use crate::storage::{Database, KeyValueStore, RecordStore};
use chrono::{Datelike, NaiveDateTime, NaiveTime};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Result of an admin login, passed explicitly to every privileged operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminSession {
    verified: bool,
}

impl AdminSession {
    pub fn unverified() -> Self {
        Self { verified: false }
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    fn require(&self) -> Result<(), Error> {
        if self.verified {
            Ok(())
        } else {
            Err(Error::AdminRequired)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Marked(AttendanceRecord),
    Rejected(Rejection),
}

/// Input for creating or editing a student.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewStudent {
    pub id: String,
    pub name: String,
    pub class_name: String,
    pub roll_no: String,
    pub course: Option<String>,
    pub email: Option<String>,
}

fn blank_to_none(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl NewStudent {
    fn validate(&self) -> Result<(), Error> {
        let required = [
            ("student id", &self.id),
            ("name", &self.name),
            ("class", &self.class_name),
            ("roll number", &self.roll_no),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::validation(format!("{} is required", field)));
            }
        }
        Ok(())
    }

    fn into_profile(self, joined_at: NaiveDateTime) -> StudentProfile {
        StudentProfile {
            name: self.name.trim().to_string(),
            class_name: self.class_name.trim().to_string(),
            roll_no: self.roll_no.trim().to_string(),
            course: blank_to_none(&self.course),
            email: blank_to_none(&self.email),
            joined_at,
        }
    }
}

/// Holds the single scanner while an enrollment or scan is in flight.
struct ScannerGuard<'a> {
    busy: &'a AtomicBool,
}

impl<'a> ScannerGuard<'a> {
    fn acquire(busy: &'a AtomicBool) -> Option<Self> {
        busy.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| ScannerGuard { busy })
    }
}

impl Drop for ScannerGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

/// Attendance core: enrollment, identification, check-in decisions,
/// settings, student management, reporting and backup over one record store.
///
/// Operations run one at a time on the caller's thread. Captures are the only
/// suspension points; the store is written only after the last one succeeds.
pub struct AttendanceEngine<S> {
    store: RecordStore<S>,
    config: AppConfig,
    clock: Box<dyn Clock>,
    scanner_busy: AtomicBool,
    cancel_token: Arc<AtomicBool>,
}

impl AttendanceEngine<Database> {
    /// Open (or create) the SQLite store named in the configuration.
    pub fn open(config: AppConfig) -> Result<Self, Error> {
        let db = Database::open(&config.database_path)?;
        Ok(Self::new(db, config))
    }
}

impl<S: KeyValueStore> AttendanceEngine<S> {
    pub fn new(backend: S, config: AppConfig) -> Self {
        Self {
            store: RecordStore::new(backend),
            config,
            clock: Box::new(SystemClock),
            scanner_busy: AtomicBool::new(false),
            cancel_token: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn store(&self) -> &RecordStore<S> {
        &self.store
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Setting the token aborts the in-flight enrollment or scan at its next
    /// suspension point. It is cleared when the next operation starts.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel_token)
    }

    pub fn is_scanning(&self) -> bool {
        self.scanner_busy.load(Ordering::SeqCst)
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    // ── Admin & settings ─────────────────────────────────────────

    pub fn login(&self, password: &str) -> Result<AdminSession, Error> {
        let settings = self.store.settings()?;
        let verified = password == settings.admin_password;
        if verified {
            info!("Admin login successful");
        } else {
            warn!("Admin login failed");
        }
        Ok(AdminSession { verified })
    }

    pub fn change_password(&self, session: &AdminSession, new_password: &str) -> Result<(), Error> {
        session.require()?;
        if new_password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(Error::validation(format!(
                "password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            )));
        }
        let mut settings = self.store.settings()?;
        settings.admin_password = new_password.to_string();
        self.store.put_settings(&settings)?;
        info!("Admin password changed");
        Ok(())
    }

    pub fn settings(&self) -> Result<Settings, Error> {
        self.store.settings()
    }

    pub fn set_window(
        &self,
        session: &AdminSession,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<Settings, Error> {
        session.require()?;
        if start > end {
            return Err(Error::validation(format!(
                "window start {} is after end {}",
                start.format("%H:%M"),
                end.format("%H:%M")
            )));
        }
        let mut settings = self.store.settings()?;
        settings.window_start = start;
        settings.window_end = end;
        self.store.put_settings(&settings)?;
        info!(
            "Attendance window set to {}-{}",
            start.format("%H:%M"),
            end.format("%H:%M")
        );
        Ok(settings)
    }

    pub fn set_late_threshold(
        &self,
        session: &AdminSession,
        minutes: u32,
    ) -> Result<Settings, Error> {
        session.require()?;
        if minutes < 1 {
            return Err(Error::validation("late threshold must be at least 1 minute"));
        }
        let mut settings = self.store.settings()?;
        settings.late_threshold_minutes = minutes;
        self.store.put_settings(&settings)?;
        info!("Late threshold set to {} minutes", minutes);
        Ok(settings)
    }

    pub fn set_active(&self, session: &AdminSession, active: bool) -> Result<Settings, Error> {
        session.require()?;
        let mut settings = self.store.settings()?;
        settings.attendance_active = active;
        self.store.put_settings(&settings)?;
        info!("Attendance {}", if active { "started" } else { "stopped" });
        Ok(settings)
    }

    /// Flip the active flag and return its new value.
    pub fn toggle_attendance(&self, session: &AdminSession) -> Result<bool, Error> {
        let current = self.store.settings()?.attendance_active;
        let settings = self.set_active(session, !current)?;
        Ok(settings.attendance_active)
    }

    pub fn window_status(&self) -> Result<WindowStatus, Error> {
        let settings = self.store.settings()?;
        Ok(attendance::window_status(&settings, self.clock.now()))
    }

    // ── Students ─────────────────────────────────────────────────

    /// Register a student whose fingerprint is already enrolled.
    pub fn add_student(
        &self,
        session: &AdminSession,
        student: NewStudent,
    ) -> Result<StudentProfile, Error> {
        session.require()?;
        student.validate()?;
        let student_id = student.id.trim().to_string();

        if !self.store.templates()?.contains_key(&student_id) {
            return Err(Error::validation(format!(
                "register a fingerprint for '{}' first",
                student_id
            )));
        }

        let mut students = self.store.students()?;
        if students.contains_key(&student_id) {
            return Err(Error::validation(format!(
                "student '{}' already exists",
                student_id
            )));
        }

        let profile = student.into_profile(self.clock.now());
        students.insert(student_id.clone(), profile.clone());
        self.store.put_students(&students)?;
        info!("Student {} ({}) added", profile.name, student_id);
        Ok(profile)
    }

    /// Replace a student's details, keeping their join date.
    pub fn update_student(
        &self,
        session: &AdminSession,
        student: NewStudent,
    ) -> Result<StudentProfile, Error> {
        session.require()?;
        student.validate()?;
        let student_id = student.id.trim().to_string();

        let mut students = self.store.students()?;
        let joined_at = students
            .get(&student_id)
            .map(|existing| existing.joined_at)
            .ok_or_else(|| {
                Error::validation(format!("student '{}' does not exist", student_id))
            })?;

        let profile = student.into_profile(joined_at);
        students.insert(student_id.clone(), profile.clone());
        self.store.put_students(&students)?;
        info!("Student {} updated", student_id);
        Ok(profile)
    }

    /// Delete a student and their template. Attendance history is kept.
    pub fn remove_student(&self, session: &AdminSession, student_id: &str) -> Result<bool, Error> {
        session.require()?;
        let mut students = self.store.students()?;
        let mut templates = self.store.templates()?;
        let removed = students.shift_remove(student_id).is_some();
        let had_template = templates.shift_remove(student_id).is_some();

        let mut entries = Vec::new();
        if removed {
            entries.push((STUDENTS_KEY, serde_json::to_string(&students)?));
        }
        if had_template {
            entries.push((FINGERPRINTS_KEY, serde_json::to_string(&templates)?));
        }
        if !entries.is_empty() {
            self.store.put_raw_batch(&entries)?;
        }

        if removed {
            info!("Student {} removed", student_id);
        }
        Ok(removed)
    }

    pub fn students(&self) -> Result<Roster, Error> {
        self.store.students()
    }

    pub fn class_names(&self) -> Result<Vec<String>, Error> {
        Ok(reporting::class_names(&self.store.students()?))
    }

    pub fn search_students(&self, term: &str) -> Result<Vec<(String, StudentProfile)>, Error> {
        let students = self.store.students()?;
        Ok(reporting::search_students(&students, term)
            .into_iter()
            .map(|(id, profile)| (id.to_string(), profile.clone()))
            .collect())
    }

    pub fn template(&self, student_id: &str) -> Result<Option<FingerprintTemplate>, Error> {
        Ok(self.store.templates()?.shift_remove(student_id))
    }

    // ── Enrollment & scanning ────────────────────────────────────

    /// Capture [`ENROLLMENT_SAMPLES`] readings and store them as the student's
    /// template, replacing any previous one.
    pub fn enroll<D: CaptureDevice + ?Sized>(
        &self,
        student_id: &str,
        device: &mut D,
        reporter: &dyn ProgressReporter,
    ) -> Result<FingerprintTemplate, Error> {
        let student_id = student_id.trim();
        if student_id.is_empty() {
            return Err(Error::validation("student id is required"));
        }

        let _guard = ScannerGuard::acquire(&self.scanner_busy).ok_or(Error::ScannerBusy)?;
        self.cancel_token.store(false, Ordering::SeqCst);

        info!("Enrolling fingerprint for {}", student_id);
        reporter.on_enroll_start(student_id, ENROLLMENT_SAMPLES);
        let readings = capture_readings(device, ENROLLMENT_SAMPLES, &self.cancel_token, reporter)?;
        let template = biometric::compose_template(&readings, self.clock.now())?;

        if self.config.require_registered_student
            && !self.store.students()?.contains_key(student_id)
        {
            return Err(Error::validation(format!(
                "no student record exists for '{}'",
                student_id
            )));
        }

        let mut templates = self.store.templates()?;
        templates.insert(student_id.to_string(), template.clone());
        self.store.put_templates(&templates)?;

        info!(
            "Fingerprint registered for {} (average quality {:.1})",
            student_id, template.average_quality
        );
        reporter.on_enroll_complete(student_id, template.average_quality);
        Ok(template)
    }

    /// Capture one reading, identify the student and record their check-in.
    pub fn scan<D: CaptureDevice + ?Sized>(
        &self,
        session: &AdminSession,
        device: &mut D,
        reporter: &dyn ProgressReporter,
    ) -> Result<ScanOutcome, Error> {
        session.require()?;

        let settings = self.store.settings()?;
        if let Err(rejection) = attendance::check_window(&settings, self.clock.now()) {
            info!("Scan rejected: {}", rejection);
            return Ok(ScanOutcome::Rejected(rejection));
        }

        let Some(_guard) = ScannerGuard::acquire(&self.scanner_busy) else {
            info!("Scan rejected: scanner busy");
            return Ok(ScanOutcome::Rejected(Rejection::ScannerBusy));
        };
        self.cancel_token.store(false, Ordering::SeqCst);

        reporter.on_scan_start();
        let outcome = self.identify_and_mark(device, reporter);
        reporter.on_scan_complete();

        match &outcome {
            Ok(ScanOutcome::Marked(record)) => info!(
                "Attendance marked for {} ({})",
                record.student_name, record.status
            ),
            Ok(ScanOutcome::Rejected(rejection)) => info!("Scan rejected: {}", rejection),
            Err(e) => warn!("Scan aborted: {}", e),
        }
        outcome
    }

    fn identify_and_mark<D: CaptureDevice + ?Sized>(
        &self,
        device: &mut D,
        reporter: &dyn ProgressReporter,
    ) -> Result<ScanOutcome, Error> {
        check_cancelled(&self.cancel_token)?;
        let templates = self.store.templates()?;
        if templates.is_empty() {
            return Ok(ScanOutcome::Rejected(Rejection::NoTemplatesEnrolled));
        }

        let reading = device.capture()?;
        check_cancelled(&self.cancel_token)?;

        reporter.on_scan_matching();
        let match_delay = self.config.match_delay();
        if !match_delay.is_zero() {
            thread::sleep(match_delay);
        }
        check_cancelled(&self.cancel_token)?;

        let Some(student_id) = biometric::find_match(&templates, &reading) else {
            return Ok(ScanOutcome::Rejected(Rejection::NoMatch));
        };
        debug!("Reading matched template of {}", student_id);

        let settings = self.store.settings()?;
        let students = self.store.students()?;
        let mut records = self.store.attendance_records()?;
        match attendance::decide(&settings, &students, &records, student_id, self.clock.now()) {
            Ok(record) => {
                records.push(record.clone());
                self.store.put_attendance_records(&records)?;
                Ok(ScanOutcome::Marked(record))
            }
            Err(rejection) => Ok(ScanOutcome::Rejected(rejection)),
        }
    }

    // ── Reporting ────────────────────────────────────────────────

    pub fn dashboard_snapshot(&self) -> Result<DashboardCounters, Error> {
        let students = self.store.students()?;
        let records = self.store.attendance_records()?;
        Ok(reporting::dashboard_counters(
            &students,
            &records,
            self.clock.now().date(),
        ))
    }

    pub fn weekly_series(&self) -> Result<Vec<DailyAttendance>, Error> {
        let students = self.store.students()?;
        let records = self.store.attendance_records()?;
        Ok(reporting::weekly_series(
            students.len(),
            &records,
            self.clock.now().date(),
        ))
    }

    /// Report for `month` (1-12) of the current year. A blank class filter means all classes.
    pub fn monthly_report(
        &self,
        month: u32,
        class_filter: Option<&str>,
    ) -> Result<MonthlyReport, Error> {
        if !(1..=12).contains(&month) {
            return Err(Error::validation(format!("month {} is not in 1-12", month)));
        }
        let class_filter = class_filter.map(str::trim).filter(|c| !c.is_empty());
        let students = self.store.students()?;
        let records = self.store.attendance_records()?;
        Ok(reporting::monthly_report(
            &students,
            &records,
            self.clock.now().year(),
            month,
            class_filter,
        ))
    }

    pub fn student_summary(&self, student_id: &str) -> Result<Option<StudentSummary>, Error> {
        if !self.store.students()?.contains_key(student_id) {
            return Ok(None);
        }
        let records = self.store.attendance_records()?;
        Ok(Some(reporting::student_summary(&records, student_id)))
    }

    pub fn records(&self, filter: &RecordFilter) -> Result<Vec<AttendanceRecord>, Error> {
        let records = self.store.attendance_records()?;
        Ok(reporting::filter_records(&records, filter)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn export_records_csv<W: Write>(
        &self,
        filter: &RecordFilter,
        writer: W,
    ) -> Result<usize, Error> {
        let records = self.store.attendance_records()?;
        let selected = reporting::filter_records(&records, filter);
        reporting::write_records_csv(&selected, writer)
    }

    // ── Maintenance ──────────────────────────────────────────────

    pub fn backup(&self) -> Result<BackupDocument, Error> {
        backup::create_backup(&self.store, self.clock.now())
    }

    /// Overwrite the store with the contents of a backup document.
    pub fn restore(&self, session: &AdminSession, json: &str) -> Result<RestorePlan, Error> {
        session.require()?;
        let plan = backup::parse_backup(json)?;
        backup::apply_restore(&self.store, &plan)?;
        Ok(plan)
    }

    /// Drop every attendance record, keeping students and templates.
    pub fn reset_records(&self, session: &AdminSession) -> Result<usize, Error> {
        session.require()?;
        let cleared = self.store.attendance_records()?.len();
        self.store.put_attendance_records(&[])?;
        info!("Cleared {} attendance records", cleared);
        Ok(cleared)
    }

    /// Wipe the whole store, settings and password included.
    pub fn clear_all(&self, session: &AdminSession) -> Result<(), Error> {
        session.require()?;
        self.store.clear()?;
        info!("All data cleared");
        Ok(())
    }
}
