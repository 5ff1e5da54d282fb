//! Destroy/repair operator catalogue (§4.4, §6). Each operator is a plain
//! function over `&mut Schedule` returning the number of points it
//! touched; `Ok(0)` is the documented no-op outcome for an unmet
//! precondition (§7), not an error.

pub mod clustering;
pub mod destroy;
pub mod repair;

use crate::domain::ids::{ContainerIdx, PointIdx};
use crate::domain::problem::ProblemInstance;
use crate::domain::schedule::Schedule;
use crate::errors::EngineResult;

pub type OperatorFn = fn(&mut Schedule, &ProblemInstance, &Context, &mut crate::rng::EngineRng) -> EngineResult<usize>;

/// Read-only values shared by every operator call within one iteration:
/// the current penalty multipliers and two problem-wide constants that
/// would otherwise be recomputed on every call (§4.4 D2/D8/D9).
pub struct Context<'a> {
    pub penalty: &'a crate::domain::penalty::PenaltyController,
    pub dist_min: f64,
    pub dist_max: f64,
    pub regret_k: usize,
}

/// Every `(tour_index, position, point)` currently holding a container
/// visit, across the whole schedule.
pub(crate) fn all_container_visits(
    schedule: &Schedule,
    problem: &ProblemInstance,
) -> Vec<(usize, usize, PointIdx)> {
    schedule
        .tours()
        .iter()
        .enumerate()
        .flat_map(|(ti, tour)| {
            tour.container_positions(problem)
                .into_iter()
                .map(move |pos| (ti, pos, tour.points()[pos]))
        })
        .collect()
}

/// Every `(container point, day)` pair not currently visited anywhere —
/// the pool repair operators draw insertion candidates from.
pub(crate) fn candidate_container_day_pairs(
    schedule: &Schedule,
    problem: &ProblemInstance,
) -> Vec<(PointIdx, usize)> {
    let mut pairs = Vec::new();
    for (ci, &point) in problem.containers.iter().enumerate() {
        let cidx = ContainerIdx(ci);
        for day in 0..problem.horizon {
            if !schedule.tracker().visited(cidx, day) {
                pairs.push((point, day));
            }
        }
    }
    pairs
}

/// Minimum pairwise distance among containers (§4.4 D2/D8 Shaw radius).
/// `f64::INFINITY` if fewer than two containers exist.
pub fn dist_min(problem: &ProblemInstance) -> f64 {
    let mut min = f64::INFINITY;
    for (i, &a) in problem.containers.iter().enumerate() {
        for &b in &problem.containers[i + 1..] {
            min = min.min(problem.distance(a, b));
        }
    }
    min
}

/// Maximum pairwise distance among containers (§4.4 D9 normalization).
pub fn dist_max(problem: &ProblemInstance) -> f64 {
    let mut max = 0.0_f64;
    for (i, &a) in problem.containers.iter().enumerate() {
        for &b in &problem.containers[i + 1..] {
            max = max.max(problem.distance(a, b));
        }
    }
    max
}
