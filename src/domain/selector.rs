//! Operator selector (§4.6): adaptive roulette-wheel over an operator
//! catalogue. Destroy and repair wheels are independent instances of the
//! same type.

use crate::config::SelectorParams;
use crate::rng::EngineRng;

/// Outcome of one applied operator, scored at the point of acceptance
/// (§4.6, §4.7 step f).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NewGlobalBest,
    BetterNotBest,
    AcceptedWorse,
}

#[derive(Debug, Clone)]
struct OperatorStats {
    score: f64,
    uses: usize,
    weight: f64,
}

/// One adaptive roulette wheel over `n` operators, indexed `0..n`.
#[derive(Debug, Clone)]
pub struct OperatorSelector {
    params: SelectorParams,
    stats: Vec<OperatorStats>,
}

impl OperatorSelector {
    pub fn new(params: SelectorParams, operator_count: usize) -> Self {
        OperatorSelector {
            params,
            stats: vec![
                OperatorStats {
                    score: 0.0,
                    uses: 0,
                    weight: 1.0,
                };
                operator_count
            ],
        }
    }

    pub fn operator_count(&self) -> usize {
        self.stats.len()
    }

    /// Samples an operator index proportional to its current weight.
    pub fn sample(&self, rng: &mut EngineRng) -> usize {
        let weights: Vec<f64> = self.stats.iter().map(|s| s.weight).collect();
        rng.weighted_index(&weights)
            .expect("selector must be constructed with at least one operator")
    }

    /// Records the outcome of applying operator `i`; `None` means the
    /// operator was sampled but not actually used this iteration (no-op,
    /// σ4).
    pub fn record(&mut self, i: usize, outcome: Option<Outcome>) {
        let stats = &mut self.stats[i];
        stats.uses += 1;
        stats.score += match outcome {
            Some(Outcome::NewGlobalBest) => self.params.sigma_new_best,
            Some(Outcome::BetterNotBest) => self.params.sigma_better,
            Some(Outcome::AcceptedWorse) => self.params.sigma_accepted_worse,
            None => self.params.sigma_unused,
        };
    }

    /// Segment boundary (§4.6): `w_i <- (1-r)*w_i + r*(s_i/max(1,u_i))`,
    /// then reset scores and usage counts.
    pub fn step(&mut self) {
        let r = self.params.reaction_rate;
        for s in &mut self.stats {
            let avg = s.score / (s.uses.max(1) as f64);
            s.weight = (1.0 - r) * s.weight + r * avg;
            s.score = 0.0;
            s.uses = 0;
        }
    }

    /// Re-seed all weights uniformly (engine start only, §4.6; never at
    /// reheating).
    pub fn reset(&mut self) {
        for s in &mut self.stats {
            s.score = 0.0;
            s.uses = 0;
            s.weight = 1.0;
        }
    }

    pub fn weight(&self, i: usize) -> f64 {
        self.stats[i].weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_returns_valid_index() {
        let mut rng = EngineRng::seed_from_u64(1);
        let selector = OperatorSelector::new(SelectorParams::default(), 5);
        for _ in 0..50 {
            let i = selector.sample(&mut rng);
            assert!(i < 5);
        }
    }

    #[test]
    fn repeated_best_outcomes_raise_weight() {
        let mut selector = OperatorSelector::new(SelectorParams::default(), 2);
        for _ in 0..20 {
            selector.record(0, Some(Outcome::NewGlobalBest));
            selector.record(1, None);
            selector.step();
        }
        assert!(selector.weight(0) > selector.weight(1));
    }

    #[test]
    fn reset_restores_uniform_weights() {
        let mut selector = OperatorSelector::new(SelectorParams::default(), 3);
        selector.record(0, Some(Outcome::NewGlobalBest));
        selector.step();
        selector.reset();
        for i in 0..3 {
            assert_eq!(selector.weight(i), 1.0);
        }
    }
}
