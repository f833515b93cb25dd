pub mod enrollment;
pub mod matcher;
pub mod reading;

pub use enrollment::{compose_template, ENROLLMENT_SAMPLES};
pub use matcher::{find_match, similarity, MATCH_THRESHOLD};
pub use reading::{CaptureDevice, MockScanner, Reading, PATTERN_LENGTH};
