//! Single explicitly-seeded PRNG per engine run (§5, Design Notes).
//!
//! One [`EngineRng`] is owned by exactly one engine run; it is never shared
//! across concurrent runs and nothing in the engine reads process-global
//! randomness (`rand::thread_rng`). The generator is `ChaCha8Rng`, matching
//! the teacher's choice, seeded explicitly so that the iteration-by-
//! iteration behavior of a run is reproducible given the same seed (§8
//! scenario 4: deterministic replay).

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

pub struct EngineRng {
    inner: ChaCha8Rng,
}

impl EngineRng {
    pub fn seed_from_u64(seed: u64) -> Self {
        EngineRng {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn gen_unit(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    pub fn gen_range_usize(&mut self, range: std::ops::Range<usize>) -> usize {
        self.inner.gen_range(range)
    }

    pub fn gen_range_f64(&mut self, range: std::ops::Range<f64>) -> f64 {
        self.inner.gen_range(range)
    }

    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.inner.gen_bool(p.clamp(0.0, 1.0))
    }

    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.inner)
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.inner);
    }

    /// Normal-distributed sample with the given mean and standard
    /// deviation; `sigma <= 0.0` degenerates to returning `mean` exactly.
    pub fn gen_normal(&mut self, mean: f64, sigma: f64) -> f64 {
        if sigma <= 0.0 {
            return mean;
        }
        let normal = Normal::new(mean, sigma).expect("sigma must be finite and positive");
        normal.sample(&mut self.inner)
    }

    /// Semi-triangular neighborhood-size draw (§4.4):
    /// `rho(n) = round(n + 0.5 - sqrt(1-U)*n)`, biased toward small sizes,
    /// clamped to `[1, n]`.
    pub fn semi_triangular_rho(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        let u = self.gen_unit();
        let nf = n as f64;
        let raw = (nf + 0.5 - (1.0 - u).sqrt() * nf).round();
        (raw as i64).clamp(1, n as i64) as usize
    }

    /// Roulette-wheel selection proportional to `weights`; returns `None`
    /// if `weights` is empty or sums to <= 0 (falls back to uniform in
    /// that case).
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        if weights.is_empty() {
            return None;
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Some(self.gen_range_usize(0..weights.len()));
        }
        let mut target = self.gen_range_f64(0.0..total);
        for (i, &w) in weights.iter().enumerate() {
            if target < w {
                return Some(i);
            }
            target -= w;
        }
        Some(weights.len() - 1)
    }
}
