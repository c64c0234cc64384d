use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::run_config::RunConfig;

/// Decides, once per round and before dispatch, whether the client will cut
/// the stream and after how long.
pub struct AbortScheduler {
    ratio: f64,
    min_secs: f64,
    max_secs: f64,
    rng: StdRng,
}

impl AbortScheduler {
    pub fn new(ratio: f64, min_secs: f64, max_secs: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        AbortScheduler {
            ratio,
            min_secs,
            max_secs,
            rng,
        }
    }

    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(
            config.abort_ratio,
            config.abort_min_secs,
            config.abort_max_secs,
            config.seed,
        )
    }

    pub fn decide(&mut self) -> Option<Duration> {
        if self.rng.gen::<f64>() >= self.ratio {
            return None;
        }
        let secs = if self.min_secs < self.max_secs {
            self.rng.gen_range(self.min_secs..=self.max_secs)
        } else {
            self.min_secs
        };
        Some(Duration::from_secs_f64(secs))
    }
}
