// src/recording/sampler.rs
//! Per-call sampling gate

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Keeps a capture with probability `rate`
///
/// Every call draws independently from a uniform [0, 1) source; a draw at or
/// above the rate discards the record.
#[derive(Debug)]
pub struct Sampler {
    rate: f64,
    rng: Mutex<StdRng>,
}

impl Sampler {
    pub fn new(rate: f64) -> Self {
        Self::with_rng(rate, StdRng::from_entropy())
    }

    /// Deterministic sampler for reproducible runs
    pub fn with_seed(rate: f64, seed: u64) -> Self {
        Self::with_rng(rate, StdRng::seed_from_u64(seed))
    }

    fn with_rng(rate: f64, rng: StdRng) -> Self {
        Self {
            rate: if rate.is_nan() { 1.0 } else { rate.clamp(0.0, 1.0) },
            rng: Mutex::new(rng),
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Draw once and decide whether to keep the record
    pub fn is_sampled(&self) -> bool {
        let draw: f64 = self.rng.lock().gen();
        draw < self.rate
    }
}
