use super::Reading;
use crate::storage::models::TemplateSet;

/// Scores must be strictly above this percentage to count as a match.
pub const MATCH_THRESHOLD: f64 = 85.0;

/// Percentage of equal positions over the shorter of the two patterns.
///
/// Placeholder metric over simulated bit strings, not a biometric comparator.
/// Two patterns with no overlapping positions score 0.
pub fn similarity(base: &str, scan: &str) -> f64 {
    let base = base.as_bytes();
    let scan = scan.as_bytes();
    let overlap = base.len().min(scan.len());
    if overlap == 0 {
        return 0.0;
    }

    let equal = base
        .iter()
        .zip(scan.iter())
        .filter(|(a, b)| a == b)
        .count();

    equal as f64 / overlap as f64 * 100.0
}

/// Return the first template, in store order, whose base pattern scores above
/// [`MATCH_THRESHOLD`] against `reading`.
///
/// This is first-match, not best-match: when several templates qualify, the
/// earliest enrolled wins.
pub fn find_match<'a>(templates: &'a TemplateSet, reading: &Reading) -> Option<&'a str> {
    templates
        .iter()
        .find(|(_, template)| {
            similarity(&template.base_pattern, &reading.pattern) > MATCH_THRESHOLD
        })
        .map(|(student_id, _)| student_id.as_str())
}
