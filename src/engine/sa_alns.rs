//! SA-ALNS outer loop (§4.7).

use crate::config::{EngineParams, PenaltyParams, SelectorParams};
use crate::domain::penalty::{ConstraintKind, PenaltyController};
use crate::domain::problem::ProblemInstance;
use crate::domain::schedule::Schedule;
use crate::domain::selector::{Outcome, OperatorSelector};
use crate::engine::{construct, operator_tables};
use crate::errors::EngineResult;
use crate::operators::{dist_max, dist_min, Context};
use crate::rng::EngineRng;
use tracing::{debug, info, span, Level};

#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub best: Schedule,
    pub best_cost: f64,
    pub iterations: usize,
    pub cancelled: bool,
}

/// Runs one SA-ALNS search to the iteration budget, temperature floor, or
/// a `true` from `cancel` (polled between iterations, §4.7 "Cancellation";
/// `cancel` is cooperative, not preemptive).
pub fn run(
    problem: &ProblemInstance,
    engine_params: EngineParams,
    penalty_params: PenaltyParams,
    selector_params: SelectorParams,
    seed: u64,
    mut cancel: impl FnMut() -> bool,
) -> EngineResult<EngineOutput> {
    problem.validate()?;

    let mut rng = EngineRng::seed_from_u64(seed);
    let mut penalty = PenaltyController::new(penalty_params);
    let (destroy_table, repair_table) = operator_tables(problem.variant);
    let mut destroy_selector = OperatorSelector::new(selector_params, destroy_table.len());
    let mut repair_selector = OperatorSelector::new(selector_params, repair_table.len());

    let mut current = construct::build_initial_schedule(problem, &penalty)?;
    let mut current_cost = current.cost(problem, &penalty);
    let mut best = current.clone();
    let mut best_cost = current_cost;

    // T0 so a 5% worsening is accepted with probability 0.5 at the start.
    let initial_worsening = (0.05 * current_cost.abs()).max(1e-9);
    let mut temperature = initial_worsening / std::f64::consts::LN_2;

    let dmin = dist_min(problem);
    let dmax = dist_max(problem);

    let mut iter = 0usize;
    let mut segment_iter = 0usize;
    let mut segments_since_best = 0usize;
    let mut best_cost_at_segment_start = best_cost;
    let mut cancelled = false;

    let loop_span = span!(
        Level::INFO,
        "sa_alns_main_loop",
        iteration_budget = engine_params.iteration_budget
    );
    let _loop_guard = loop_span.enter();

    while iter < engine_params.iteration_budget && temperature > engine_params.min_temperature {
        if cancel() {
            cancelled = true;
            break;
        }

        let iter_span = span!(Level::DEBUG, "iteration", iter);
        let _iter_guard = iter_span.enter();

        let di = destroy_selector.sample(&mut rng);
        let ri = repair_selector.sample(&mut rng);

        let mut candidate = current.clone();
        let ctx = Context {
            penalty: &penalty,
            dist_min: dmin,
            dist_max: dmax,
            regret_k: 2,
        };
        let destroy_applied = destroy_table[di](&mut candidate, problem, &ctx, &mut rng)?;
        let repair_applied = repair_table[ri](&mut candidate, problem, &ctx, &mut rng)?;
        if engine_params.local_search_enabled {
            candidate.local_search_all(problem, &penalty);
        }

        let candidate_cost = candidate.cost(problem, &penalty);
        let delta = candidate_cost - current_cost;
        let accept = delta <= 0.0 || rng.gen_bool((-delta / temperature).exp());
        debug!(di, ri, candidate_cost, delta, accept, temperature, "candidate evaluated");

        // A no-op operator (0 applications, §4.4/§7) scores σ4 ("not used")
        // regardless of whether the unchanged candidate happens to be
        // accepted or rejected below.
        let outcome = if accept {
            current = candidate;
            current_cost = candidate_cost;

            let outcome = if current_cost < best_cost - 1e-9 {
                best = current.clone();
                best_cost = current_cost;
                info!(iter, best_cost, "new global best");
                Outcome::NewGlobalBest
            } else if delta < 0.0 {
                Outcome::BetterNotBest
            } else {
                Outcome::AcceptedWorse
            };
            for kind in ConstraintKind::ALL {
                penalty.record(kind, current.feasible_for(kind, problem));
            }
            Some(outcome)
        } else {
            None
        };

        destroy_selector.record(di, if destroy_applied == 0 { None } else { outcome });
        repair_selector.record(ri, if repair_applied == 0 { None } else { outcome });

        iter += 1;
        segment_iter += 1;

        if segment_iter >= engine_params.segment_length {
            destroy_selector.step();
            repair_selector.step();
            penalty.step();

            if best_cost < best_cost_at_segment_start - 1e-9 {
                segments_since_best = 0;
            } else {
                segments_since_best += 1;
            }
            best_cost_at_segment_start = best_cost;

            if segments_since_best >= engine_params.reheat_trigger_segments {
                temperature *= engine_params.reheat_factor;
                segments_since_best = 0;
            } else {
                temperature *= engine_params.cooling_factor;
            }
            segment_iter = 0;
        }
    }

    info!(iterations = iter, best_cost, cancelled, "sa-alns run complete");

    Ok(EngineOutput {
        best,
        best_cost,
        iterations: iter,
        cancelled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testutil::sample_irp_instance;

    #[test]
    fn run_never_returns_a_best_cost_worse_than_the_initial_construction() {
        let problem = sample_irp_instance(5, 4, 10.0);
        let mut engine_params = EngineParams::default();
        engine_params.iteration_budget = 200;
        engine_params.segment_length = 20;

        let construction_penalty = PenaltyController::new(PenaltyParams::default());
        let initial = construct::build_initial_schedule(&problem, &construction_penalty).unwrap();
        let initial_cost = initial.cost(&problem, &construction_penalty);

        let output = run(
            &problem,
            engine_params,
            PenaltyParams::default(),
            SelectorParams::default(),
            42,
            || false,
        )
        .unwrap();

        assert!(output.best_cost <= initial_cost + 1e-6);
        assert!(output.iterations > 0);
        assert!(!output.cancelled);
    }

    #[test]
    fn cancel_stops_the_loop_early() {
        let problem = sample_irp_instance(5, 4, 10.0);
        let mut engine_params = EngineParams::default();
        engine_params.iteration_budget = 10_000;

        let output = run(
            &problem,
            engine_params,
            PenaltyParams::default(),
            SelectorParams::default(),
            7,
            || true,
        )
        .unwrap();

        assert!(output.cancelled);
        assert_eq!(output.iterations, 0);
    }

    #[test]
    fn two_runs_with_the_same_seed_produce_the_same_best_cost() {
        let problem = sample_irp_instance(5, 4, 10.0);
        let mut engine_params = EngineParams::default();
        engine_params.iteration_budget = 150;
        engine_params.segment_length = 15;

        let a = run(
            &problem,
            engine_params,
            PenaltyParams::default(),
            SelectorParams::default(),
            123,
            || false,
        )
        .unwrap();
        let b = run(
            &problem,
            engine_params,
            PenaltyParams::default(),
            SelectorParams::default(),
            123,
            || false,
        )
        .unwrap();

        assert!((a.best_cost - b.best_cost).abs() < 1e-9);
    }
}
