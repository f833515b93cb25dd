#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use roll_call_core::{
    AdminSession, AppConfig, AttendanceEngine, Error, FixedClock, MemoryStore, MockScanner,
    NewStudent, Reading, SilentReporter,
};

pub const PASSWORD: &str = "admin123";

pub fn date(raw: &str) -> NaiveDate {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
}

pub fn time(raw: &str) -> NaiveTime {
    NaiveTime::parse_from_str(raw, "%H:%M").unwrap()
}

pub fn at(day: &str, clock_time: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(
        &format!("{} {}", day, clock_time),
        "%Y-%m-%d %H:%M:%S",
    )
    .unwrap()
}

/// Deterministic 100-bit pattern, distinct per seed.
pub fn pattern(seed: u64) -> String {
    MockScanner::seeded(seed).read().pattern
}

/// Copy of `base` with the first `count` bits inverted.
pub fn flip_bits(base: &str, count: usize) -> String {
    base.chars()
        .enumerate()
        .map(|(i, c)| match (i < count, c) {
            (true, '0') => '1',
            (true, _) => '0',
            (false, c) => c,
        })
        .collect()
}

/// Default configuration without simulated scanner latency.
pub fn instant_config() -> AppConfig {
    AppConfig {
        capture_delay_ms: 0,
        match_delay_ms: 0,
        ..AppConfig::default()
    }
}

pub fn engine_at(now: NaiveDateTime) -> (AttendanceEngine<MemoryStore>, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(now));
    let engine = AttendanceEngine::new(MemoryStore::new(), instant_config())
        .with_clock(Arc::clone(&clock));
    (engine, clock)
}

pub fn admin(engine: &AttendanceEngine<MemoryStore>) -> AdminSession {
    let session = engine.login(PASSWORD).unwrap();
    assert!(session.is_verified());
    session
}

pub fn student(id: &str, name: &str, class_name: &str) -> NewStudent {
    NewStudent {
        id: id.to_string(),
        name: name.to_string(),
        class_name: class_name.to_string(),
        roll_no: format!("R-{}", id),
        course: None,
        email: None,
    }
}

/// Enroll `id` with three copies of `base` and register them as a student.
pub fn enroll_student(
    engine: &AttendanceEngine<MemoryStore>,
    session: &AdminSession,
    id: &str,
    class_name: &str,
    base: &str,
) {
    let mut device = || Ok::<_, Error>(Reading::new(base, 90.0));
    engine.enroll(id, &mut device, &SilentReporter).unwrap();
    engine
        .add_student(session, student(id, &format!("Student {}", id), class_name))
        .unwrap();
}

/// Engine with the 09:30-10:30 window, a 15 minute threshold and attendance started.
pub fn active_engine(
    now: NaiveDateTime,
) -> (AttendanceEngine<MemoryStore>, Arc<FixedClock>, AdminSession) {
    let (engine, clock) = engine_at(now);
    let session = admin(&engine);
    engine
        .set_window(&session, time("09:30"), time("10:30"))
        .unwrap();
    engine.set_late_threshold(&session, 15).unwrap();
    engine.set_active(&session, true).unwrap();
    (engine, clock, session)
}
