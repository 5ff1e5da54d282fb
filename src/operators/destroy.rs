//! Destroy operators D0-D10 (§4.4).

use crate::domain::ids::TruckIdx;
use crate::domain::problem::ProblemInstance;
use crate::domain::schedule::Schedule;
use crate::errors::EngineResult;
use crate::rng::EngineRng;

use super::{all_container_visits, clustering::cluster_by_mst, Context};

/// D0: random-ρ-container removal.
pub fn random_container_removal(
    schedule: &mut Schedule,
    problem: &ProblemInstance,
    _ctx: &Context,
    rng: &mut EngineRng,
) -> EngineResult<usize> {
    let pool = all_container_visits(schedule, problem);
    if pool.is_empty() {
        return Ok(0);
    }
    let rho = schedule.neighborhood_size(pool.len(), rng);
    let mut removed = 0;
    for _ in 0..rho {
        let pool = all_container_visits(schedule, problem);
        if pool.is_empty() {
            break;
        }
        let (ti, pos, _) = pool[rng.gen_range_usize(0..pool.len())];
        schedule.remove_point(problem, ti, pos)?;
        removed += 1;
    }
    Ok(removed)
}

/// D1: worst-ρ-container removal, maximum schedule-cost saving.
pub fn worst_container_removal(
    schedule: &mut Schedule,
    problem: &ProblemInstance,
    ctx: &Context,
    rng: &mut EngineRng,
) -> EngineResult<usize> {
    let pool = all_container_visits(schedule, problem);
    if pool.is_empty() {
        return Ok(0);
    }
    let rho = schedule.neighborhood_size(pool.len(), rng);
    let mut removed = 0;
    for _ in 0..rho {
        let pool = all_container_visits(schedule, problem);
        if pool.is_empty() {
            break;
        }
        let base = schedule.cost(problem, ctx.penalty);
        let mut best: Option<(usize, usize, f64)> = None;
        for &(ti, pos, _) in &pool {
            let mut candidate = schedule.clone();
            candidate.remove_point(problem, ti, pos)?;
            let saving = base - candidate.cost(problem, ctx.penalty);
            if best.map_or(true, |(_, _, bs)| saving > bs) {
                best = Some((ti, pos, saving));
            }
        }
        if let Some((ti, pos, _)) = best {
            schedule.remove_point(problem, ti, pos)?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// D2: Shaw removal within a random tour.
pub fn shaw_removal_within_tour(
    schedule: &mut Schedule,
    problem: &ProblemInstance,
    ctx: &Context,
    rng: &mut EngineRng,
) -> EngineResult<usize> {
    let candidates: Vec<usize> = schedule
        .tours()
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.container_positions(problem).is_empty())
        .map(|(i, _)| i)
        .collect();
    let Some(&ti) = rng.choose(&candidates) else {
        return Ok(0);
    };
    let positions = schedule.tour(ti).container_positions(problem);
    let Some(&seed_pos) = rng.choose(&positions) else {
        return Ok(0);
    };
    let seed = schedule.tour(ti).points()[seed_pos];
    let related = schedule.tour(ti).shaw_related_containers(problem, seed, ctx.dist_min);
    let mut positions: Vec<usize> = related.iter().map(|&(pos, _)| pos).collect();
    positions.sort_unstable_by(|a, b| b.cmp(a));
    let mut removed = 0;
    for pos in positions {
        schedule.remove_point(problem, ti, pos)?;
        removed += 1;
    }
    Ok(removed)
}

/// D3: empty one randomly chosen day.
pub fn empty_one_day(
    schedule: &mut Schedule,
    problem: &ProblemInstance,
    _ctx: &Context,
    rng: &mut EngineRng,
) -> EngineResult<usize> {
    if problem.horizon == 0 {
        return Ok(0);
    }
    let day = rng.gen_range_usize(0..problem.horizon);
    let tour_idxs: Vec<usize> = schedule.tours_on_day(day).collect();
    let mut removed = 0;
    for ti in tour_idxs {
        let emptied = schedule.tour_mut(ti).empty_tour();
        for p in emptied {
            if problem.point(p).is_container() {
                schedule.tracker_mut().update(problem, p, day, false)?;
                removed += 1;
            }
        }
    }
    Ok(removed)
}

/// D4: empty every tour belonging to one randomly chosen truck.
pub fn empty_one_truck(
    schedule: &mut Schedule,
    problem: &ProblemInstance,
    _ctx: &Context,
    rng: &mut EngineRng,
) -> EngineResult<usize> {
    if problem.trucks.is_empty() {
        return Ok(0);
    }
    let truck = TruckIdx(rng.gen_range_usize(0..problem.trucks.len()));
    let tour_idxs: Vec<usize> = schedule
        .tours()
        .iter()
        .enumerate()
        .filter(|(_, t)| t.truck() == truck)
        .map(|(i, _)| i)
        .collect();
    let mut removed = 0;
    for ti in tour_idxs {
        let day = schedule.tour(ti).day();
        let emptied = schedule.tour_mut(ti).empty_tour();
        for p in emptied {
            if problem.point(p).is_container() {
                schedule.tracker_mut().update(problem, p, day, false)?;
                removed += 1;
            }
        }
    }
    Ok(removed)
}

/// D5: remove a random dump from a random tour that has one.
pub fn remove_random_dump(
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
    match schedule.tour_mut(ti).remove_random_dump(problem, rng) {
        Some(_) => Ok(1),
        None => Ok(0),
    }
}

/// D6: remove the dump with the largest schedule-cost saving.
pub fn remove_worst_dump(
    schedule: &mut Schedule,
    problem: &ProblemInstance,
    ctx: &Context,
    _rng: &mut EngineRng,
) -> EngineResult<usize> {
    let mut best: Option<(usize, usize, f64)> = None;
    for (ti, tour) in schedule.tours().iter().enumerate() {
        if let Some((pos, saving)) = tour.worst_dump_removal(problem, schedule.tracker(), ctx.penalty) {
            if best.map_or(true, |(_, _, bs)| saving > bs) {
                best = Some((ti, pos, saving));
            }
        }
    }
    match best {
        Some((ti, pos, _)) => {
            schedule.tour_mut(ti).remove(pos);
            Ok(1)
        }
        None => Ok(0),
    }
}

/// D7: clear a day-`d` visit whenever day-`(d-1)` was also visited.
pub fn remove_consecutive_visits(
    schedule: &mut Schedule,
    problem: &ProblemInstance,
    _ctx: &Context,
    rng: &mut EngineRng,
) -> EngineResult<usize> {
    let mut pairs = Vec::new();
    for &point in &problem.containers {
        let cidx = schedule.tracker().container_index_of(point).unwrap();
        for d in 1..problem.horizon {
            if schedule.tracker().visited(cidx, d) && schedule.tracker().visited(cidx, d - 1) {
                pairs.push((point, d));
            }
        }
    }
    if pairs.is_empty() {
        return Ok(0);
    }
    let rho = schedule.neighborhood_size(pairs.len(), rng);
    let mut removed = 0;
    for _ in 0..rho {
        if pairs.is_empty() {
            break;
        }
        let idx = rng.gen_range_usize(0..pairs.len());
        let (point, d) = pairs.remove(idx);
        if let Some(ti) = schedule
            .tours()
            .iter()
            .position(|t| t.day() == d && t.points().contains(&point))
        {
            let pos = schedule.tour(ti).points().iter().position(|&p| p == point).unwrap();
            schedule.remove_point(problem, ti, pos)?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// D8: Shaw removal across every tour that shares a randomly chosen day.
pub fn global_shaw_removal(
    schedule: &mut Schedule,
    problem: &ProblemInstance,
    ctx: &Context,
    rng: &mut EngineRng,
) -> EngineResult<usize> {
    if problem.horizon == 0 {
        return Ok(0);
    }
    let day = rng.gen_range_usize(0..problem.horizon);
    let tour_idxs: Vec<usize> = schedule.tours_on_day(day).collect();
    let mut members: Vec<(usize, usize, crate::domain::ids::PointIdx)> = Vec::new();
    for &ti in &tour_idxs {
        for pos in schedule.tour(ti).container_positions(problem) {
            members.push((ti, pos, schedule.tour(ti).points()[pos]));
        }
    }
    if members.is_empty() {
        return Ok(0);
    }
    let &(_, _, seed) = &members[rng.gen_range_usize(0..members.len())];
    let radius = 2.0 * ctx.dist_min;
    let mut to_remove: Vec<(usize, usize)> = members
        .iter()
        .filter(|&&(_, _, p)| p == seed || problem.distance(seed, p) <= radius)
        .map(|&(ti, pos, _)| (ti, pos))
        .collect();
    to_remove.sort_by(|a, b| b.1.cmp(&a.1));
    let mut removed = 0;
    for (ti, pos) in to_remove {
        schedule.remove_point(problem, ti, pos)?;
        removed += 1;
    }
    Ok(removed)
}

/// D9: weighted-relatedness removal. Relatedness combines normalized
/// distance, time-window proximity and overflow-probability difference
/// in equal thirds (Open Question, resolved in DESIGN.md: the spec names
/// exactly three factors, no fourth is specified).
pub fn weighted_relatedness_removal(
    schedule: &mut Schedule,
    problem: &ProblemInstance,
    ctx: &Context,
    rng: &mut EngineRng,
) -> EngineResult<usize> {
    const THRESHOLD: f64 = 0.25;

    let pool = all_container_visits(schedule, problem);
    if pool.is_empty() {
        return Ok(0);
    }
    let (seed_ti, seed_pos, seed_point) = pool[rng.gen_range_usize(0..pool.len())];
    let seed_day = schedule.tour(seed_ti).day();
    let seed_cidx = schedule.tracker().container_index_of(seed_point).unwrap();

    let tw_span = problem
        .points
        .iter()
        .map(|p| p.tw_upper)
        .fold(0.0_f64, f64::max)
        .max(1e-9);

    let mut to_remove: Vec<(usize, usize)> = Vec::new();
    for &(ti, pos, point) in &pool {
        if (ti, pos) == (seed_ti, seed_pos) {
            continue;
        }
        let day = schedule.tour(ti).day();
        let cidx = schedule.tracker().container_index_of(point).unwrap();
        let norm_dist = if ctx.dist_max > 0.0 {
            problem.distance(seed_point, point) / ctx.dist_max
        } else {
            0.0
        };
        let norm_tw = (problem.point(seed_point).tw_upper - problem.point(point).tw_upper).abs() / tw_span;
        let overflow_diff = (schedule.tracker().overflow_probability(seed_cidx, seed_day)
            - schedule.tracker().overflow_probability(cidx, day))
        .abs();
        let relatedness = (norm_dist + norm_tw + overflow_diff) / 3.0;
        if relatedness <= THRESHOLD {
            to_remove.push((ti, pos));
        }
    }
    to_remove.push((seed_ti, seed_pos));

    // Per-tour, remove highest position first so earlier removals don't
    // shift the indices of ones still pending.
    to_remove.sort_by(|a, b| b.1.cmp(&a.1));
    let mut removed = 0;
    for (ti, pos) in to_remove {
        schedule.remove_point(problem, ti, pos)?;
        removed += 1;
    }
    Ok(removed)
}

/// D10: cluster removal via MST k-clustering, one cluster with at most
/// half of the day's containers.
pub fn cluster_removal(
    schedule: &mut Schedule,
    problem: &ProblemInstance,
    _ctx: &Context,
    rng: &mut EngineRng,
) -> EngineResult<usize> {
    if problem.horizon == 0 {
        return Ok(0);
    }
    let day = rng.gen_range_usize(0..problem.horizon);
    let tour_idxs: Vec<usize> = schedule.tours_on_day(day).collect();
    if tour_idxs.is_empty() {
        return Ok(0);
    }
    let k = tour_idxs.len().max(2);

    let mut member_positions: Vec<(usize, usize, crate::domain::ids::PointIdx)> = Vec::new();
    for &ti in &tour_idxs {
        for pos in schedule.tour(ti).container_positions(problem) {
            member_positions.push((ti, pos, schedule.tour(ti).points()[pos]));
        }
    }
    if member_positions.is_empty() {
        return Ok(0);
    }
    let members: Vec<crate::domain::ids::PointIdx> =
        member_positions.iter().map(|&(_, _, p)| p).collect();
    let clusters = cluster_by_mst(&members, k, problem);
    let half = member_positions.len() as f64 / 2.0;
    let eligible: Vec<&Vec<crate::domain::ids::PointIdx>> =
        clusters.iter().filter(|c| c.len() as f64 <= half).collect();
    if eligible.is_empty() {
        return Ok(0);
    }
    let chosen = eligible[rng.gen_range_usize(0..eligible.len())];
    let chosen_set: std::collections::HashSet<_> = chosen.iter().copied().collect();

    let mut to_remove: Vec<(usize, usize)> = member_positions
        .iter()
        .filter(|&&(_, _, p)| chosen_set.contains(&p))
        .map(|&(ti, pos, _)| (ti, pos))
        .collect();
    to_remove.sort_by(|a, b| b.1.cmp(&a.1));
    let mut removed = 0;
    for (ti, pos) in to_remove {
        schedule.remove_point(problem, ti, pos)?;
        removed += 1;
    }
    Ok(removed)
}
