use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use roll_call_core::{ProgressReporter, Reading};
use std::sync::Mutex;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Terminal feedback for enrollment (a bar per capture) and scanning (a spinner).
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn spinner(message: &'static str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars(TICK_CHARS),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }
}

impl ProgressReporter for CliReporter {
    fn on_enroll_start(&self, student_id: &str, samples: usize) {
        let pb = ProgressBar::new(samples as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} Enrolling {prefix} [{bar:20.cyan/dim}] {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─")
            .tick_chars(TICK_CHARS),
        );
        pb.set_prefix(student_id.to_string());
        pb.set_message("place finger on scanner");
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_enroll_capture(&self, captured: usize, samples: usize, reading: &Reading) {
        self.with_bar(|pb| {
            pb.set_position(captured as u64);
            if captured < samples {
                pb.set_message(format!(
                    "quality {:.0}%, lift and place again",
                    reading.quality
                ));
            }
        });
    }

    fn on_enroll_complete(&self, student_id: &str, average_quality: f64) {
        self.finish_bar();
        eprintln!(
            "  {} Fingerprint registered for {} (quality {:.1}%)",
            "✓".green(),
            student_id,
            average_quality
        );
    }

    fn on_scan_start(&self) {
        self.set_bar(Self::spinner("Place finger on scanner..."));
    }

    fn on_scan_matching(&self) {
        self.with_bar(|pb| pb.set_message("Matching fingerprint..."));
    }

    fn on_scan_complete(&self) {
        self.finish_bar();
    }
}
