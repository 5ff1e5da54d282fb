//! Repair operators R0-R10 (§4.4).

use crate::domain::ids::PointIdx;
use crate::domain::problem::ProblemInstance;
use crate::domain::schedule::Schedule;
use crate::errors::EngineResult;
use crate::rng::EngineRng;

use super::{candidate_container_day_pairs, Context};

/// R0: random-ρ-container insertion via per-tour best insertion.
pub fn random_container_insertion(
    schedule: &mut Schedule,
    problem: &ProblemInstance,
    ctx: &Context,
    rng: &mut EngineRng,
) -> EngineResult<usize> {
    let pairs = candidate_container_day_pairs(schedule, problem);
    if pairs.is_empty() {
        return Ok(0);
    }
    let rho = schedule.neighborhood_size(pairs.len(), rng);
    let mut inserted = 0;
    for _ in 0..rho {
        let pairs = candidate_container_day_pairs(schedule, problem);
        if pairs.is_empty() {
            break;
        }
        let (point, day) = pairs[rng.gen_range_usize(0..pairs.len())];
        if let Some((ti, pos)) = best_tour_for_insertion(schedule, problem, ctx, point, day) {
            schedule.insert_container(problem, ti, pos, point)?;
            inserted += 1;
        }
    }
    Ok(inserted)
}

/// R1: best-ρ-container insertion, globally greedy at each step.
pub fn best_container_insertion(
    schedule: &mut Schedule,
    problem: &ProblemInstance,
    ctx: &Context,
    rng: &mut EngineRng,
) -> EngineResult<usize> {
    let pairs = candidate_container_day_pairs(schedule, problem);
    if pairs.is_empty() {
        return Ok(0);
    }
    let rho = schedule.neighborhood_size(pairs.len(), rng);
    let mut inserted = 0;
    for _ in 0..rho {
        let pairs = candidate_container_day_pairs(schedule, problem);
        if pairs.is_empty() {
            break;
        }
        let mut best: Option<(usize, usize, PointIdx, f64)> = None;
        for &(point, day) in &pairs {
            for ti in schedule.tours_on_day(day) {
                let (pos, delta) =
                    schedule
                        .tour(ti)
                        .best_container_insertion(problem, schedule.tracker(), ctx.penalty, point);
                if best.as_ref().map_or(true, |&(_, _, _, bd)| delta < bd) {
                    best = Some((ti, pos, point, delta));
                }
            }
        }
        match best {
            Some((ti, pos, point, _)) => {
                schedule.insert_container(problem, ti, pos, point)?;
                inserted += 1;
            }
            None => break,
        }
    }
    Ok(inserted)
}

/// R2: Shaw insertion — reinsert a seed unvisited (container, day) plus
/// every unvisited container within `2*dist_min` sharing the same day.
pub fn shaw_insertion(
    schedule: &mut Schedule,
    problem: &ProblemInstance,
    ctx: &Context,
    rng: &mut EngineRng,
) -> EngineResult<usize> {
    let pairs = candidate_container_day_pairs(schedule, problem);
    if pairs.is_empty() {
        return Ok(0);
    }
    let (seed_point, seed_day) = pairs[rng.gen_range_usize(0..pairs.len())];
    let radius = 2.0 * ctx.dist_min;
    let related: Vec<(PointIdx, usize)> = pairs
        .into_iter()
        .filter(|&(p, d)| d == seed_day && (p == seed_point || problem.distance(seed_point, p) <= radius))
        .collect();

    let mut inserted = 0;
    for (point, day) in related {
        if let Some((ti, pos)) = best_tour_for_insertion(schedule, problem, ctx, point, day) {
            schedule.insert_container(problem, ti, pos, point)?;
            inserted += 1;
        }
    }
    Ok(inserted)
}

/// R3: swap a random container between two tours; rolls back (no-op) if
/// either already has a visit on the other's day.
pub fn swap_assignment(
    schedule: &mut Schedule,
    problem: &ProblemInstance,
    _ctx: &Context,
    rng: &mut EngineRng,
) -> EngineResult<usize> {
    let pool = super::all_container_visits(schedule, problem);
    if pool.len() < 2 {
        return Ok(0);
    }
    let i = rng.gen_range_usize(0..pool.len());
    let mut j = rng.gen_range_usize(0..pool.len());
    while j == i {
        j = rng.gen_range_usize(0..pool.len());
    }
    let (ti_a, pos_a, point_a) = pool[i];
    let (ti_b, pos_b, point_b) = pool[j];
    if ti_a == ti_b {
        return Ok(0);
    }

    let day_a = schedule.tour(ti_a).day();
    let day_b = schedule.tour(ti_b).day();
    let cidx_a = schedule.tracker().container_index_of(point_a).unwrap();
    let cidx_b = schedule.tracker().container_index_of(point_b).unwrap();
    if schedule.tracker().visited(cidx_a, day_b) || schedule.tracker().visited(cidx_b, day_a) {
        return Ok(0);
    }

    schedule.tour_mut(ti_a).set_point(pos_a, point_b);
    schedule.tour_mut(ti_b).set_point(pos_b, point_a);
    schedule.tracker_mut().update(problem, point_a, day_a, false)?;
    schedule.tracker_mut().update(problem, point_b, day_a, true)?;
    schedule.tracker_mut().update(problem, point_b, day_b, false)?;
    schedule.tracker_mut().update(problem, point_a, day_b, true)?;
    Ok(1)
}

/// R4: insert a random dump into a random tour.
pub fn random_dump(
    schedule: &mut Schedule,
    problem: &ProblemInstance,
    _ctx: &Context,
    rng: &mut EngineRng,
) -> EngineResult<usize> {
    if problem.dumps.is_empty() || schedule.tours().is_empty() {
        return Ok(0);
    }
    let ti = rng.gen_range_usize(0..schedule.tours().len());
    let &dump = rng.choose(&problem.dumps).unwrap();
    schedule.tour_mut(ti).insert_random_dump(dump, rng);
    Ok(1)
}

/// R5: insert the dump with the best insertion delta into a random tour.
pub fn best_dump(
    schedule: &mut Schedule,
    problem: &ProblemInstance,
    ctx: &Context,
    rng: &mut EngineRng,
) -> EngineResult<usize> {
    if problem.dumps.is_empty() || schedule.tours().is_empty() {
        return Ok(0);
    }
    let ti = rng.gen_range_usize(0..schedule.tours().len());
    let mut best: Option<(PointIdx, usize, f64)> = None;
    for &dump in &problem.dumps {
        let (pos, delta) = schedule
            .tour(ti)
            .best_dump_insertion(problem, schedule.tracker(), ctx.penalty, dump);
        if best.map_or(true, |(_, _, bd)| delta < bd) {
            best = Some((dump, pos, delta));
        }
    }
    match best {
        Some((dump, pos, _)) => {
            schedule.tour_mut(ti).insert(pos, dump);
            Ok(1)
        }
        None => Ok(0),
    }
}

/// R6: swap a dump visit between two tours that each have one.
pub fn swap_dumps(
    schedule: &mut Schedule,
    problem: &ProblemInstance,
    _ctx: &Context,
    rng: &mut EngineRng,
) -> EngineResult<usize> {
    let candidates: Vec<usize> = schedule
        .tours()
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.dump_positions(problem).is_empty())
        .map(|(i, _)| i)
        .collect();
    if candidates.len() < 2 {
        return Ok(0);
    }
    let i = rng.gen_range_usize(0..candidates.len());
    let mut j = rng.gen_range_usize(0..candidates.len());
    while j == i {
        j = rng.gen_range_usize(0..candidates.len());
    }
    let (ti_a, ti_b) = (candidates[i], candidates[j]);
    let pos_a_list = schedule.tour(ti_a).dump_positions(problem);
    let pos_b_list = schedule.tour(ti_b).dump_positions(problem);
    let pos_a = pos_a_list[rng.gen_range_usize(0..pos_a_list.len())];
    let pos_b = pos_b_list[rng.gen_range_usize(0..pos_b_list.len())];
    let point_a = schedule.tour(ti_a).points()[pos_a];
    let point_b = schedule.tour(ti_b).points()[pos_b];
    schedule.tour_mut(ti_a).set_point(pos_a, point_b);
    schedule.tour_mut(ti_b).set_point(pos_b, point_a);
    Ok(1)
}

/// R7: replace a random dump with a different random dump.
pub fn replace_random_dump(
    schedule: &mut Schedule,
    problem: &ProblemInstance,
    _ctx: &Context,
    rng: &mut EngineRng,
) -> EngineResult<usize> {
    let candidates: Vec<usize> = schedule
        .tours()
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.dump_positions(problem).is_empty())
        .map(|(i, _)| i)
        .collect();
    let Some(&ti) = rng.choose(&candidates) else {
        return Ok(0);
    };
    if problem.dumps.is_empty() {
        return Ok(0);
    }
    let &new_dump = rng.choose(&problem.dumps).unwrap();
    match schedule.tour_mut(ti).replace_random_dump(problem, new_dump, rng) {
        Some(_) => Ok(1),
        None => Ok(0),
    }
}

/// R8: reorder the dump visits of a random tour with at least two.
pub fn reorder_dumps(
    schedule: &mut Schedule,
    problem: &ProblemInstance,
    _ctx: &Context,
    rng: &mut EngineRng,
) -> EngineResult<usize> {
    let candidates: Vec<usize> = schedule
        .tours()
        .iter()
        .enumerate()
        .filter(|(_, t)| t.dump_positions(problem).len() >= 2)
        .map(|(i, _)| i)
        .collect();
    let Some(&ti) = rng.choose(&candidates) else {
        return Ok(0);
    };
    schedule.tour_mut(ti).reorder_dumps(problem, rng);
    Ok(1)
}

/// R9: replace a tour's destination starting point from the truck's
/// flexible set; syncs a later same-truck tour's origin.
pub fn replace_starting_point(
    schedule: &mut Schedule,
    problem: &ProblemInstance,
    _ctx: &Context,
    rng: &mut EngineRng,
) -> EngineResult<usize> {
    if schedule.tours().is_empty() {
        return Ok(0);
    }
    let ti = rng.gen_range_usize(0..schedule.tours().len());
    let truck_idx = schedule.tour(ti).truck();
    let truck = problem.truck(truck_idx);
    if truck.flexible_starts.len() < 2 {
        return Ok(0);
    }
    let &new_point = rng.choose(&truck.flexible_starts).unwrap();
    let day = schedule.tour(ti).day();
    schedule.tour_mut(ti).set_destination_starting_point(new_point);

    if let Some(next_ti) = schedule
        .tours()
        .iter()
        .enumerate()
        .filter(|(_, t)| t.truck() == truck_idx && t.day() > day)
        .min_by_key(|(_, t)| t.day())
        .map(|(i, _)| i)
    {
        schedule.tour_mut(next_ti).set_origin_starting_point(new_point);
    }
    Ok(1)
}

/// R10: k-regret container insertion. For each unvisited (container, day)
/// and each tour active that day, score by that tour's own
/// `containerInsertionRegret(point, k)` (§4.3: normalized difference
/// between the k-th best and best insertion cost); insert the
/// (tour, container) pair with the largest regret at its own best
/// position. Ties are broken by preferring the tour with fewer feasible
/// insertion positions (§4.4's stated tie-breaker).
pub fn k_regret_insertion(
    schedule: &mut Schedule,
    problem: &ProblemInstance,
    ctx: &Context,
    _rng: &mut EngineRng,
) -> EngineResult<usize> {
    let pairs = candidate_container_day_pairs(schedule, problem);
    if pairs.is_empty() {
        return Ok(0);
    }
    // (tour, pos, container, regret, feasible-position count)
    let mut best: Option<(usize, usize, PointIdx, f64, usize)> = None;
    for &(point, day) in &pairs {
        for ti in schedule.tours_on_day(day) {
            let Some((pos, regret)) = schedule.tour(ti).container_insertion_regret(
                problem,
                schedule.tracker(),
                ctx.penalty,
                point,
                ctx.regret_k,
            ) else {
                continue;
            };
            let position_count = schedule.tour(ti).feasible_position_count();
            let better = match &best {
                None => true,
                Some(&(_, _, _, best_regret, best_count)) => {
                    regret > best_regret + 1e-9
                        || ((regret - best_regret).abs() <= 1e-9 && position_count < best_count)
                }
            };
            if better {
                best = Some((ti, pos, point, regret, position_count));
            }
        }
    }
    match best {
        Some((ti, pos, point, ..)) => {
            schedule.insert_container(problem, ti, pos, point)?;
            Ok(1)
        }
        None => Ok(0),
    }
}

fn best_tour_for_insertion(
    schedule: &Schedule,
    problem: &ProblemInstance,
    ctx: &Context,
    point: PointIdx,
    day: usize,
) -> Option<(usize, usize)> {
    schedule
        .tours_on_day(day)
        .map(|ti| {
            let (pos, delta) =
                schedule
                    .tour(ti)
                    .best_container_insertion(problem, schedule.tracker(), ctx.penalty, point);
            (ti, pos, delta)
        })
        .min_by(|a, b| a.2.total_cmp(&b.2))
        .map(|(ti, pos, _)| (ti, pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PenaltyParams;
    use crate::domain::penalty::PenaltyController;
    use crate::domain::schedule::Schedule;
    use crate::domain::testutil::sample_irp_instance;

    fn ctx(penalty: &PenaltyController, problem: &ProblemInstance) -> Context<'_> {
        Context {
            penalty,
            dist_min: super::super::dist_min(problem),
            dist_max: super::super::dist_max(problem),
            regret_k: 2,
        }
    }

    #[test]
    fn random_container_insertion_populates_empty_schedule() {
        let problem = sample_irp_instance(3, 2, 10.0);
        let mut schedule = Schedule::new_empty(&problem).unwrap();
        let penalty = PenaltyController::new(PenaltyParams::default());
        let c = ctx(&penalty, &problem);
        let mut rng = EngineRng::seed_from_u64(5);
        let inserted = random_container_insertion(&mut schedule, &problem, &c, &mut rng).unwrap();
        assert!(inserted > 0);
    }

    #[test]
    fn best_container_insertion_is_idempotent_once_all_are_placed() {
        let problem = sample_irp_instance(2, 1, 10.0);
        let mut schedule = Schedule::new_empty(&problem).unwrap();
        let penalty = PenaltyController::new(PenaltyParams::default());
        let c = ctx(&penalty, &problem);
        let mut rng = EngineRng::seed_from_u64(9);
        for _ in 0..4 {
            best_container_insertion(&mut schedule, &problem, &c, &mut rng).unwrap();
        }
        let pairs = candidate_container_day_pairs(&schedule, &problem);
        assert!(pairs.is_empty());
    }

    #[test]
    fn swap_assignment_is_a_no_op_with_a_single_tour() {
        let problem = sample_irp_instance(2, 1, 10.0);
        let mut schedule = Schedule::new_empty(&problem).unwrap();
        let tour_idxs: Vec<usize> = schedule.tours_on_day(0).collect();
        let ti = tour_idxs[0];
        for &c in &problem.containers {
            let pos = schedule.tour(ti).len() - 1;
            schedule.insert_container(&problem, ti, pos, c).unwrap();
        }
        let penalty = PenaltyController::new(PenaltyParams::default());
        let c = ctx(&penalty, &problem);
        let mut rng = EngineRng::seed_from_u64(2);
        let applied = swap_assignment(&mut schedule, &problem, &c, &mut rng).unwrap();
        assert_eq!(applied, 0);
    }
}
