use crate::biometric::Reading;

/// Trait for reporting enrollment and scan progress.
///
/// CLI implements with indicatif. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_enroll_start(&self, _student_id: &str, _samples: usize) {}
    fn on_enroll_capture(&self, _captured: usize, _samples: usize, _reading: &Reading) {}
    fn on_enroll_complete(&self, _student_id: &str, _average_quality: f64) {}
    fn on_scan_start(&self) {}
    fn on_scan_matching(&self) {}
    fn on_scan_complete(&self) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
