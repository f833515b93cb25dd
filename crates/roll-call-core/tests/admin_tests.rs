mod common;

use common::*;
use roll_call_core::storage::models::DEFAULT_ADMIN_PASSWORD;
use roll_call_core::storage::records::FINGERPRINTS_KEY;
use roll_call_core::{
    AdminSession, AttendanceEngine, Error, KeyValueStore, MemoryStore, NewStudent, Reading,
    SilentReporter, WindowStatus,
};
use std::sync::atomic::{AtomicBool, Ordering};

/// Memory store that can be told to reject writes touching one key.
struct FlakyStore {
    inner: MemoryStore,
    fail_key: &'static str,
    failing: AtomicBool,
}

impl FlakyStore {
    fn check(&self, key: &str) -> Result<(), Error> {
        if self.failing.load(Ordering::SeqCst) && key == self.fail_key {
            return Err(Error::Store(format!("write to '{}' refused", key)));
        }
        Ok(())
    }
}

impl KeyValueStore for FlakyStore {
    fn load(&self, key: &str) -> Result<Option<String>, Error> {
        self.inner.load(key)
    }

    fn store(&self, key: &str, value: &str) -> Result<(), Error> {
        self.check(key)?;
        self.inner.store(key, value)
    }

    fn store_batch(&self, entries: &[(&str, String)]) -> Result<(), Error> {
        for (key, _) in entries {
            self.check(key)?;
        }
        self.inner.store_batch(entries)
    }

    fn clear(&self) -> Result<(), Error> {
        self.inner.clear()
    }
}

#[test]
fn test_default_password_and_change() {
    let (engine, _clock) = engine_at(at("2024-03-11", "08:00:00"));
    let session = engine.login(DEFAULT_ADMIN_PASSWORD).unwrap();
    assert!(session.is_verified());

    assert!(matches!(
        engine.change_password(&session, "short"),
        Err(Error::Validation(_))
    ));
    engine.change_password(&session, "longer-secret").unwrap();

    assert!(!engine.login(DEFAULT_ADMIN_PASSWORD).unwrap().is_verified());
    assert!(engine.login("longer-secret").unwrap().is_verified());
}

#[test]
fn test_admin_actions_require_verified_session() {
    let (engine, _clock) = engine_at(at("2024-03-11", "08:00:00"));
    let guest = AdminSession::unverified();

    assert!(matches!(
        engine.set_window(&guest, time("08:00"), time("09:00")),
        Err(Error::AdminRequired)
    ));
    assert!(matches!(engine.set_late_threshold(&guest, 5), Err(Error::AdminRequired)));
    assert!(matches!(engine.set_active(&guest, true), Err(Error::AdminRequired)));
    assert!(matches!(engine.toggle_attendance(&guest), Err(Error::AdminRequired)));
    assert!(matches!(engine.change_password(&guest, "whatever"), Err(Error::AdminRequired)));
    assert!(matches!(
        engine.add_student(&guest, student("S1", "Ada", "CS-A")),
        Err(Error::AdminRequired)
    ));
    assert!(matches!(engine.remove_student(&guest, "S1"), Err(Error::AdminRequired)));
    assert!(matches!(engine.reset_records(&guest), Err(Error::AdminRequired)));
    assert!(matches!(engine.clear_all(&guest), Err(Error::AdminRequired)));
    assert!(matches!(engine.restore(&guest, "{}"), Err(Error::AdminRequired)));

    assert!(!engine.settings().unwrap().attendance_active);
}

#[test]
fn test_settings_validation() {
    let (engine, _clock) = engine_at(at("2024-03-11", "08:00:00"));
    let session = admin(&engine);

    assert!(matches!(
        engine.set_window(&session, time("10:00"), time("09:00")),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        engine.set_late_threshold(&session, 0),
        Err(Error::Validation(_))
    ));

    let settings = engine
        .set_window(&session, time("08:15"), time("08:45"))
        .unwrap();
    assert_eq!(settings.window_start, time("08:15"));
    assert_eq!(engine.settings().unwrap().window_end, time("08:45"));
}

#[test]
fn test_toggle_and_window_status() {
    let (engine, clock) = engine_at(at("2024-03-11", "09:00:00"));
    let session = admin(&engine);
    assert_eq!(engine.window_status().unwrap(), WindowStatus::Inactive);

    assert!(engine.toggle_attendance(&session).unwrap());
    assert_eq!(engine.window_status().unwrap(), WindowStatus::NotStarted);

    clock.set(at("2024-03-11", "10:00:00"));
    assert_eq!(engine.window_status().unwrap(), WindowStatus::InProgress);

    clock.set(at("2024-03-11", "11:00:00"));
    assert_eq!(engine.window_status().unwrap(), WindowStatus::Closed);

    assert!(!engine.toggle_attendance(&session).unwrap());
    assert_eq!(engine.window_status().unwrap(), WindowStatus::Inactive);
}

#[test]
fn test_add_student_requires_enrolled_fingerprint() {
    let (engine, _clock) = engine_at(at("2024-03-11", "08:00:00"));
    let session = admin(&engine);

    assert!(matches!(
        engine.add_student(&session, student("S1", "Ada", "CS-A")),
        Err(Error::Validation(_))
    ));

    let mut device = || Ok::<_, Error>(Reading::new(pattern(1), 90.0));
    engine.enroll("S1", &mut device, &SilentReporter).unwrap();
    let profile = engine
        .add_student(&session, student("S1", "Ada", "CS-A"))
        .unwrap();
    assert_eq!(profile.joined_at, at("2024-03-11", "08:00:00"));

    assert!(matches!(
        engine.add_student(&session, student("S1", "Ada Again", "CS-A")),
        Err(Error::Validation(_))
    ));
}

#[test]
fn test_add_student_requires_fields() {
    let (engine, _clock) = engine_at(at("2024-03-11", "08:00:00"));
    let session = admin(&engine);
    let mut device = || Ok::<_, Error>(Reading::new(pattern(1), 90.0));
    engine.enroll("S1", &mut device, &SilentReporter).unwrap();

    let missing_roll = NewStudent {
        roll_no: " ".to_string(),
        ..student("S1", "Ada", "CS-A")
    };
    assert!(matches!(
        engine.add_student(&session, missing_roll),
        Err(Error::Validation(_))
    ));
    assert!(engine.students().unwrap().is_empty());
}

#[test]
fn test_update_student_keeps_join_date() {
    let (engine, clock) = engine_at(at("2024-03-11", "08:00:00"));
    let session = admin(&engine);
    enroll_student(&engine, &session, "S1", "CS-A", &pattern(1));

    clock.set(at("2024-04-01", "08:00:00"));
    let updated = engine
        .update_student(
            &session,
            NewStudent {
                email: Some("ada@example.edu".to_string()),
                course: Some("  ".to_string()),
                ..student("S1", "Ada Lovelace", "CS-B")
            },
        )
        .unwrap();
    assert_eq!(updated.name, "Ada Lovelace");
    assert_eq!(updated.class_name, "CS-B");
    assert_eq!(updated.email.as_deref(), Some("ada@example.edu"));
    assert_eq!(updated.course, None);
    assert_eq!(updated.joined_at, at("2024-03-11", "08:00:00"));

    assert!(matches!(
        engine.update_student(&session, student("NOPE", "X", "Y")),
        Err(Error::Validation(_))
    ));
}

#[test]
fn test_remove_student_keeps_history() {
    let (engine, _clock, session) = active_engine(at("2024-03-11", "09:35:00"));
    enroll_student(&engine, &session, "S1", "CS-A", &pattern(1));
    let mut device = || Ok::<_, Error>(Reading::new(pattern(1), 90.0));
    engine.scan(&session, &mut device, &SilentReporter).unwrap();

    assert!(engine.remove_student(&session, "S1").unwrap());
    assert!(!engine.remove_student(&session, "S1").unwrap());

    assert!(engine.students().unwrap().is_empty());
    assert_eq!(engine.template("S1").unwrap(), None);
    assert_eq!(engine.store().attendance_records().unwrap().len(), 1);
}

#[test]
fn test_class_names_and_search() {
    let (engine, _clock) = engine_at(at("2024-03-11", "08:00:00"));
    let session = admin(&engine);
    for (id, name, class_name) in [
        ("S1", "Ada", "CS-B"),
        ("S2", "Brian", "CS-A"),
        ("S3", "Adele", "CS-B"),
    ] {
        let mut device = || Ok::<_, Error>(Reading::new(pattern(7), 90.0));
        engine.enroll(id, &mut device, &SilentReporter).unwrap();
        engine
            .add_student(&session, student(id, name, class_name))
            .unwrap();
    }

    let mut classes = engine.class_names().unwrap();
    classes.sort();
    assert_eq!(classes, vec!["CS-A", "CS-B"]);

    let hits: Vec<String> = engine
        .search_students("ad")
        .unwrap()
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    assert_eq!(hits, vec!["S1", "S3"]);
}

#[test]
fn test_remove_student_is_all_or_nothing() {
    let store = FlakyStore {
        inner: MemoryStore::new(),
        fail_key: FINGERPRINTS_KEY,
        failing: AtomicBool::new(false),
    };
    let engine = AttendanceEngine::new(store, instant_config());
    let session = engine.login(PASSWORD).unwrap();
    let mut device = || Ok::<_, Error>(Reading::new(pattern(1), 90.0));
    engine.enroll("S1", &mut device, &SilentReporter).unwrap();
    engine
        .add_student(&session, student("S1", "Ada", "CS-A"))
        .unwrap();

    engine.store().backend().failing.store(true, Ordering::SeqCst);
    assert!(matches!(
        engine.remove_student(&session, "S1"),
        Err(Error::Store(_))
    ));
    assert!(engine.students().unwrap().contains_key("S1"));
    assert!(engine.template("S1").unwrap().is_some());

    engine.store().backend().failing.store(false, Ordering::SeqCst);
    assert!(engine.remove_student(&session, "S1").unwrap());
    assert!(engine.students().unwrap().is_empty());
    assert!(engine.template("S1").unwrap().is_none());
}
