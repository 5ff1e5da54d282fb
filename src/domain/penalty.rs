//! Penalty controller (§4.5): adaptive multipliers for soft-constraint
//! kinds, reacting to the recent feasibility rate.

use std::collections::HashMap;

use crate::config::PenaltyParams;

/// Soft-constraint kinds priced into `Tour`/`Schedule` cost. Tour-scoped
/// kinds are evaluated per tour; `Backorder` and `ContainerViolation` are
/// schedule-scoped (distribution-variant depot/container inventory).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    Volume,
    Weight,
    TimeWindow,
    Duration,
    Accessibility,
    HomeDepot,
    Backorder,
    ContainerViolation,
}

impl ConstraintKind {
    pub const ALL: [ConstraintKind; 8] = [
        ConstraintKind::Volume,
        ConstraintKind::Weight,
        ConstraintKind::TimeWindow,
        ConstraintKind::Duration,
        ConstraintKind::Accessibility,
        ConstraintKind::HomeDepot,
        ConstraintKind::Backorder,
        ConstraintKind::ContainerViolation,
    ];
}

#[derive(Debug, Clone)]
struct Counters {
    feasible: usize,
    total: usize,
}

impl Counters {
    fn fresh() -> Self {
        Counters { feasible: 0, total: 0 }
    }
}

/// Maintains `lambda_*` per constraint kind (§4.5). `record` is called once
/// per accepted iteration per kind; `step` is invoked every
/// `PenaltyParams::segment_length` accepted iterations by the engine.
#[derive(Debug, Clone)]
pub struct PenaltyController {
    params: PenaltyParams,
    lambda: HashMap<ConstraintKind, f64>,
    counters: HashMap<ConstraintKind, Counters>,
}

impl PenaltyController {
    pub fn new(params: PenaltyParams) -> Self {
        let mut lambda = HashMap::new();
        let mut counters = HashMap::new();
        for kind in ConstraintKind::ALL {
            lambda.insert(kind, params.initial_lambda);
            counters.insert(kind, Counters::fresh());
        }
        PenaltyController {
            params,
            lambda,
            counters,
        }
    }

    pub fn lambda(&self, kind: ConstraintKind) -> f64 {
        self.lambda[&kind]
    }

    /// Record whether the current accepted solution is feasible w.r.t.
    /// `kind` (violation == 0).
    pub fn record(&mut self, kind: ConstraintKind, feasible: bool) {
        let c = self.counters.get_mut(&kind).expect("all kinds pre-seeded");
        c.total += 1;
        if feasible {
            c.feasible += 1;
        }
    }

    /// Segment boundary (§4.5): react to the feasibility fraction observed
    /// since the last `step`, then reset counters.
    pub fn step(&mut self) {
        for kind in ConstraintKind::ALL {
            let c = self.counters.get_mut(&kind).expect("all kinds pre-seeded");
            if c.total > 0 {
                let frac = c.feasible as f64 / c.total as f64;
                let lambda = self.lambda.get_mut(&kind).expect("all kinds pre-seeded");
                if frac < self.params.f_low {
                    *lambda = (*lambda * self.params.eta_up).min(self.params.lambda_max);
                } else if frac > self.params.f_high {
                    *lambda = (*lambda / self.params.eta_up).max(self.params.lambda_min);
                }
            }
            *c = Counters::fresh();
        }
    }

    /// Reset on a new instance (§4.5): all lambdas back to the initial
    /// value, counters cleared.
    pub fn reset(&mut self) {
        for kind in ConstraintKind::ALL {
            self.lambda.insert(kind, self.params.initial_lambda);
            self.counters.insert(kind, Counters::fresh());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_feasibility_raises_lambda() {
        let params = PenaltyParams::default();
        let mut pc = PenaltyController::new(params);
        for _ in 0..10 {
            pc.record(ConstraintKind::Volume, false);
        }
        pc.step();
        assert!(pc.lambda(ConstraintKind::Volume) > params.initial_lambda);
    }

    #[test]
    fn high_feasibility_lowers_lambda() {
        let params = PenaltyParams::default();
        let mut pc = PenaltyController::new(params);
        for _ in 0..10 {
            pc.record(ConstraintKind::Volume, true);
        }
        pc.step();
        assert!(pc.lambda(ConstraintKind::Volume) < params.initial_lambda);
    }

    #[test]
    fn lambda_stays_within_bounds_under_repeated_pressure() {
        let params = PenaltyParams::default();
        let mut pc = PenaltyController::new(params);
        for _ in 0..1000 {
            for _ in 0..10 {
                pc.record(ConstraintKind::Weight, false);
            }
            pc.step();
        }
        assert!(pc.lambda(ConstraintKind::Weight) <= params.lambda_max);
    }

    #[test]
    fn reset_restores_initial_lambda() {
        let params = PenaltyParams::default();
        let mut pc = PenaltyController::new(params);
        for _ in 0..10 {
            pc.record(ConstraintKind::Duration, false);
        }
        pc.step();
        pc.reset();
        assert_eq!(pc.lambda(ConstraintKind::Duration), params.initial_lambda);
    }
}
