use roll_call_core::storage::models::{
    AttendanceRecord, AttendanceStatus, Roster, Settings, StudentProfile,
};
use roll_call_core::storage::records::{
    ACTIVE_KEY, ADMIN_PASSWORD_KEY, LATE_THRESHOLD_KEY, START_TIME_KEY, STUDENTS_KEY,
};
use roll_call_core::storage::{Database, KeyValueStore, MemoryStore, RecordStore};
use chrono::{NaiveDate, NaiveTime};
use tempfile::tempdir;

fn joined() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 8)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

fn sample_roster() -> Roster {
    let mut roster = Roster::new();
    roster.insert(
        "S2".to_string(),
        StudentProfile {
            name: "Ada".to_string(),
            class_name: "CS-A".to_string(),
            roll_no: "12".to_string(),
            course: Some("BSc".to_string()),
            email: None,
            joined_at: joined(),
        },
    );
    roster.insert(
        "S1".to_string(),
        StudentProfile {
            name: "Brian".to_string(),
            class_name: "CS-B".to_string(),
            roll_no: "7".to_string(),
            course: None,
            email: Some("brian@example.edu".to_string()),
            joined_at: joined(),
        },
    );
    roster
}

fn exercise_backend<S: KeyValueStore>(backend: &S) {
    assert_eq!(backend.load("missing").unwrap(), None);

    backend.store("k", "v1").unwrap();
    backend.store("k", "v2").unwrap();
    assert_eq!(backend.load("k").unwrap().as_deref(), Some("v2"));

    backend
        .store_batch(&[("a", "1".to_string()), ("b", "2".to_string())])
        .unwrap();
    assert_eq!(backend.load("a").unwrap().as_deref(), Some("1"));
    assert_eq!(backend.load("b").unwrap().as_deref(), Some("2"));

    backend.clear().unwrap();
    assert_eq!(backend.load("k").unwrap(), None);
    assert_eq!(backend.load("a").unwrap(), None);
}

#[test]
fn test_sqlite_key_value_contract() {
    let db = Database::open_in_memory().unwrap();
    exercise_backend(&db);
    assert_eq!(db.entry_count().unwrap(), 0);
}

#[test]
fn test_memory_key_value_contract() {
    let store = MemoryStore::new();
    exercise_backend(&store);
    assert!(store.is_empty());
}

#[test]
fn test_sqlite_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("roll_call.db");
    let path = path.to_str().unwrap();

    {
        let store = RecordStore::new(Database::open(path).unwrap());
        store.put_students(&sample_roster()).unwrap();
    }

    let store = RecordStore::new(Database::open(path).unwrap());
    let roster = store.students().unwrap();
    assert_eq!(roster, sample_roster());
}

#[test]
fn test_roster_keeps_insertion_order() {
    let store = RecordStore::new(MemoryStore::new());
    store.put_students(&sample_roster()).unwrap();

    let ids: Vec<String> = store.students().unwrap().keys().cloned().collect();
    assert_eq!(ids, vec!["S2".to_string(), "S1".to_string()]);
}

#[test]
fn test_persisted_field_names() {
    let store = RecordStore::new(MemoryStore::new());
    store.put_students(&sample_roster()).unwrap();

    let raw = store.backend().load(STUDENTS_KEY).unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let ada = &json["S2"];
    assert_eq!(ada["name"], "Ada");
    assert_eq!(ada["class"], "CS-A");
    assert_eq!(ada["rollNo"], "12");
    assert_eq!(ada["course"], "BSc");
    assert!(ada.get("email").is_none());
    assert_eq!(ada["joined"], "2024-01-08T08:00:00");

    let record = AttendanceRecord {
        student_id: "S2".to_string(),
        student_name: "Ada".to_string(),
        class_name: "CS-A".to_string(),
        check_in_at: joined(),
        calendar_date: joined().date(),
        status: AttendanceStatus::OnTime,
    };
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["student_id"], "S2");
    assert_eq!(json["check_in"], "2024-01-08T08:00:00");
    assert_eq!(json["date"], "2024-01-08");
    assert_eq!(json["status"], "On Time");
}

#[test]
fn test_missing_collections_read_as_empty() {
    let store = RecordStore::new(MemoryStore::new());
    assert!(store.students().unwrap().is_empty());
    assert!(store.templates().unwrap().is_empty());
    assert!(store.attendance_records().unwrap().is_empty());
    assert_eq!(store.settings().unwrap(), Settings::default());
}

#[test]
fn test_settings_round_trip_as_strings() {
    let store = RecordStore::new(MemoryStore::new());
    let settings = Settings {
        window_start: NaiveTime::from_hms_opt(8, 5, 0).unwrap(),
        window_end: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        late_threshold_minutes: 10,
        attendance_active: true,
        admin_password: "s3cret!".to_string(),
    };
    store.put_settings(&settings).unwrap();

    let backend = store.backend();
    assert_eq!(backend.load(START_TIME_KEY).unwrap().as_deref(), Some("08:05"));
    assert_eq!(backend.load(LATE_THRESHOLD_KEY).unwrap().as_deref(), Some("10"));
    assert_eq!(backend.load(ACTIVE_KEY).unwrap().as_deref(), Some("true"));
    assert_eq!(backend.load(ADMIN_PASSWORD_KEY).unwrap().as_deref(), Some("s3cret!"));
    assert_eq!(store.settings().unwrap(), settings);
}

#[test]
fn test_malformed_settings_fall_back_to_defaults() {
    let store = RecordStore::new(MemoryStore::new());
    let backend = store.backend();
    backend.store(START_TIME_KEY, "half past nine").unwrap();
    backend.store(LATE_THRESHOLD_KEY, "0").unwrap();
    backend.store(ACTIVE_KEY, "yes").unwrap();

    let settings = store.settings().unwrap();
    let defaults = Settings::default();
    assert_eq!(settings.window_start, defaults.window_start);
    assert_eq!(settings.late_threshold_minutes, defaults.late_threshold_minutes);
    assert!(!settings.attendance_active);
}

#[test]
fn test_corrupt_collection_is_an_error() {
    let store = RecordStore::new(MemoryStore::new());
    store.backend().store(STUDENTS_KEY, "{not json").unwrap();
    assert!(matches!(
        store.students(),
        Err(roll_call_core::Error::Serialization(_))
    ));
}
