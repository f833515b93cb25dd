use crate::error::Error;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::thread;
use std::time::Duration;

/// Bits per simulated fingerprint pattern.
pub const PATTERN_LENGTH: usize = 100;

/// One capture from the scanner: a bit string of `'0'`/`'1'` and a quality in `0..100`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub pattern: String,
    pub quality: f64,
}

impl Reading {
    pub fn new(pattern: impl Into<String>, quality: f64) -> Self {
        Self {
            pattern: pattern.into(),
            quality,
        }
    }
}

/// A source of fingerprint readings. Each call is one suspension point and
/// may block while the hardware (or its simulation) produces a capture.
pub trait CaptureDevice {
    fn capture(&mut self) -> Result<Reading, Error>;
}

impl<F> CaptureDevice for F
where
    F: FnMut() -> Result<Reading, Error>,
{
    fn capture(&mut self) -> Result<Reading, Error> {
        self()
    }
}

/// Stand-in for scanner hardware: random bit patterns with random quality.
pub struct MockScanner {
    rng: StdRng,
    delay: Duration,
    presented: Option<(String, usize)>,
}

impl MockScanner {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            delay: Duration::ZERO,
            presented: None,
        }
    }

    /// Deterministic scanner for tests and demos.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            delay: Duration::ZERO,
            presented: None,
        }
    }

    /// Simulated hardware latency applied before every capture.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Simulate a known finger: every capture is `pattern` with up to
    /// `noise_bits` randomly chosen bits inverted.
    pub fn presenting(mut self, pattern: impl Into<String>, noise_bits: usize) -> Self {
        self.presented = Some((pattern.into(), noise_bits));
        self
    }

    pub fn read(&mut self) -> Reading {
        let pattern = match &self.presented {
            Some((base, noise_bits)) => {
                let mut bits: Vec<char> = base.chars().collect();
                for _ in 0..*noise_bits {
                    if bits.is_empty() {
                        break;
                    }
                    let i = self.rng.random_range(0..bits.len());
                    bits[i] = if bits[i] == '1' { '0' } else { '1' };
                }
                bits.into_iter().collect()
            }
            None => (0..PATTERN_LENGTH)
                .map(|_| if self.rng.random_bool(0.5) { '1' } else { '0' })
                .collect(),
        };
        let quality = self.rng.random_range(0.0..100.0);
        Reading { pattern, quality }
    }
}

impl Default for MockScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for MockScanner {
    fn capture(&mut self) -> Result<Reading, Error> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        Ok(self.read())
    }
}
