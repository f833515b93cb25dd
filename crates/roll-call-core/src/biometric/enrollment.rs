use super::{CaptureDevice, Reading};
use crate::error::Error;
use crate::progress::ProgressReporter;
use crate::storage::models::{FingerprintTemplate, TEMPLATE_VERSION};
use chrono::NaiveDateTime;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Readings folded into one template.
pub const ENROLLMENT_SAMPLES: usize = 3;

/// Fail with [`Error::Cancelled`] if the caller asked to stop.
pub(crate) fn check_cancelled(cancel: &AtomicBool) -> Result<(), Error> {
    if cancel.load(Ordering::SeqCst) {
        return Err(Error::Cancelled);
    }
    Ok(())
}

/// Take `samples` sequential captures, reporting after each one.
///
/// Cancellation is honoured before every capture; nothing is persisted here.
pub fn capture_readings<D: CaptureDevice + ?Sized>(
    device: &mut D,
    samples: usize,
    cancel: &AtomicBool,
    reporter: &dyn ProgressReporter,
) -> Result<Vec<Reading>, Error> {
    let mut readings = Vec::with_capacity(samples);
    while readings.len() < samples {
        check_cancelled(cancel)?;
        let reading = device.capture()?;
        let captured = readings.len() + 1;
        debug!(
            "Reading {}/{} captured (quality {:.1})",
            captured, samples, reading.quality
        );
        reporter.on_enroll_capture(captured, samples, &reading);
        readings.push(reading);
    }
    check_cancelled(cancel)?;
    Ok(readings)
}

/// Fold readings into a template: the first pattern becomes the base, every
/// pattern is kept as a source reading, and quality is averaged.
pub fn compose_template(
    readings: &[Reading],
    registered_at: NaiveDateTime,
) -> Result<FingerprintTemplate, Error> {
    let first = readings
        .first()
        .ok_or_else(|| Error::validation("at least one reading is required"))?;

    let average_quality =
        readings.iter().map(|r| r.quality).sum::<f64>() / readings.len() as f64;

    Ok(FingerprintTemplate {
        base_pattern: first.pattern.clone(),
        source_readings: readings.iter().map(|r| r.pattern.clone()).collect(),
        average_quality,
        registered_at,
        version: TEMPLATE_VERSION.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentReporter;
    use chrono::NaiveDate;

    fn registered_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_compose_uses_first_pattern_as_base() {
        let readings = vec![
            Reading::new("1111", 90.0),
            Reading::new("0000", 60.0),
            Reading::new("1010", 30.0),
        ];
        let template = compose_template(&readings, registered_at()).unwrap();
        assert_eq!(template.base_pattern, "1111");
        assert_eq!(template.source_readings, vec!["1111", "0000", "1010"]);
        assert_eq!(template.average_quality, 60.0);
        assert_eq!(template.version, "1.0");
    }

    #[test]
    fn test_compose_rejects_empty() {
        let err = compose_template(&[], registered_at()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_capture_stops_when_cancelled() {
        let cancel = AtomicBool::new(false);
        let mut taken = 0;
        let mut device = || {
            taken += 1;
            if taken == 2 {
                cancel.store(true, Ordering::SeqCst);
            }
            Ok::<_, Error>(Reading::new("01", 50.0))
        };
        let err = capture_readings(&mut device, ENROLLMENT_SAMPLES, &cancel, &SilentReporter)
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        drop(device);
        assert_eq!(taken, 2);
    }
}
