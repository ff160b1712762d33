use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::metrics::Reading;

const BASE_ALPHA: f64 = 10.0; // 8-12 Hz
const BASE_BETA: f64 = 15.0; // 13-30 Hz
const BASE_GAMMA: f64 = 5.0; // 30-100 Hz

const ALPHA_SPREAD: f64 = 5.0;
const BETA_SPREAD: f64 = 8.0;
const GAMMA_SPREAD: f64 = 3.0;

/// Band powers never drop below this, so the beta/alpha ratio stays finite.
const MIN_BAND_POWER: f64 = 1.0;

/// Produces one reading per tick. The simulator is the only implementation
/// shipped; a hardware link would implement the same trait.
pub trait ReadingSource: Send {
    fn next_reading(&mut self, timestamp: i64) -> Reading;
}

pub struct SimulatedSource<R = StdRng> {
    rng: R,
}

impl SimulatedSource<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> SimulatedSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    fn fluctuation(&mut self) -> f64 {
        self.rng.gen_range(-1.0..=1.0)
    }
}

impl<R: Rng + Send> ReadingSource for SimulatedSource<R> {
    fn next_reading(&mut self, timestamp: i64) -> Reading {
        let alpha = (BASE_ALPHA + self.fluctuation() * ALPHA_SPREAD).max(MIN_BAND_POWER);
        let beta = (BASE_BETA + self.fluctuation() * BETA_SPREAD).max(MIN_BAND_POWER);
        let gamma = (BASE_GAMMA + self.fluctuation() * GAMMA_SPREAD).max(MIN_BAND_POWER);
        Reading::new(timestamp, alpha, beta, gamma)
    }
}

/// Replays a fixed list of readings in order, cycling when exhausted.
/// Timestamps are rewritten to the tick time.
pub struct ScriptedSource {
    readings: Vec<Reading>,
    cursor: usize,
}

impl ScriptedSource {
    pub fn new(readings: Vec<Reading>) -> Self {
        Self {
            readings,
            cursor: 0,
        }
    }

    /// Readings whose band powers produce exactly the given anxiety scores.
    /// Uses alpha = 10, gamma = 1 and solves the score formula for beta.
    pub fn from_scores(scores: &[f64]) -> Self {
        let readings = scores
            .iter()
            .map(|score| {
                let beta = ((score - 2.0) / 50.0 + 0.8) * 10.0;
                Reading::new(0, 10.0, beta.max(MIN_BAND_POWER), 1.0)
            })
            .collect();
        Self::new(readings)
    }
}

impl ReadingSource for ScriptedSource {
    fn next_reading(&mut self, timestamp: i64) -> Reading {
        if self.readings.is_empty() {
            return Reading::new(timestamp, BASE_ALPHA, BASE_BETA, BASE_GAMMA);
        }
        let template = self.readings[self.cursor % self.readings.len()];
        self.cursor = self.cursor.wrapping_add(1);
        Reading {
            timestamp,
            ..template
        }
    }
}
