//! Physical-layer attenuation plug-in capability (§1 Non-goals: the
//! physical layer itself is out of scope; this is the narrow interface the
//! core consumes — "provide an attenuation/CNI sample per tick").

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait AttenuationModel: std::fmt::Debug + Send + Sync {
    /// Samples the channel for superframe `sf`, returning an ESN0 estimate
    /// in dB for the terminal this model is attached to.
    fn sample(&mut self, sf: u32) -> f32;
}

/// A fixed ESN0, useful for tests and for terminals with no attenuation plug-in.
#[derive(Debug, Clone, Copy)]
pub struct ConstantAttenuation(pub f32);

impl AttenuationModel for ConstantAttenuation {
    fn sample(&mut self, _sf: u32) -> f32 {
        self.0
    }
}

/// Draws a uniform ESN0 within a configured range, seeded for reproducibility.
#[derive(Debug)]
pub struct RandomAttenuation {
    min_db: f32,
    max_db: f32,
    rng: StdRng,
}

impl RandomAttenuation {
    pub fn new(min_db: f32, max_db: f32, seed: u64) -> Self {
        RandomAttenuation {
            min_db,
            max_db,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl AttenuationModel for RandomAttenuation {
    fn sample(&mut self, _sf: u32) -> f32 {
        if self.max_db <= self.min_db {
            self.min_db
        } else {
            self.rng.gen_range(self.min_db..self.max_db)
        }
    }
}

/// Replays a fixed sequence of ESN0 samples (one per superframe), holding
/// the last value once exhausted. Stands in for a file-driven attenuation
/// trace without requiring filesystem access from the core.
#[derive(Debug, Clone)]
pub struct FileAttenuation {
    samples: Vec<f32>,
    cursor: usize,
}

impl FileAttenuation {
    pub fn new(samples: Vec<f32>) -> Self {
        FileAttenuation { samples, cursor: 0 }
    }
}

impl AttenuationModel for FileAttenuation {
    fn sample(&mut self, _sf: u32) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let value = self.samples[self.cursor.min(self.samples.len() - 1)];
        if self.cursor + 1 < self.samples.len() {
            self.cursor += 1;
        }
        value
    }
}
