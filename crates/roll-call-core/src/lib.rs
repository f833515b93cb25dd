//! Core of the roll-call fingerprint attendance system.
//!
//! [`AttendanceEngine`] ties the simulated scanner, the template matcher and
//! the check-in policy to a persistent [`storage::KeyValueStore`].

pub mod attendance;
pub mod backup;
pub mod biometric;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod progress;
pub mod reporting;
pub mod storage;

pub use attendance::{Rejection, WindowStatus};
pub use biometric::{CaptureDevice, MockScanner, Reading};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{load_configuration, AppConfig};
pub use engine::{AdminSession, AttendanceEngine, NewStudent, ScanOutcome};
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
pub use storage::models::{AttendanceRecord, AttendanceStatus, Settings, StudentProfile};
pub use storage::{Database, KeyValueStore, MemoryStore};
