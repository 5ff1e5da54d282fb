//! Tour (§4.3): one truck's ordered visit sequence on one day, sentinel
//! starting points at both ends.

use crate::domain::ids::{PointIdx, TruckIdx};
use crate::domain::penalty::{ConstraintKind, PenaltyController};
use crate::domain::problem::ProblemInstance;
use crate::domain::tracker::{ContainerTracker, TrackerPolicy};
use crate::rng::EngineRng;
use itertools::Itertools;

/// Route-level feasibility signals (§4.3), aggregated to scalars the
/// schedule and engine read.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TourFeasibility {
    pub volume_violation: f64,
    pub weight_violation: f64,
    pub time_window_violation: f64,
    pub duration_violation: f64,
    pub accessibility_violation: f64,
    pub home_depot_violation: f64,
}

impl TourFeasibility {
    pub fn is_feasible(&self, kind: ConstraintKind) -> bool {
        let v = match kind {
            ConstraintKind::Volume => self.volume_violation,
            ConstraintKind::Weight => self.weight_violation,
            ConstraintKind::TimeWindow => self.time_window_violation,
            ConstraintKind::Duration => self.duration_violation,
            ConstraintKind::Accessibility => self.accessibility_violation,
            ConstraintKind::HomeDepot => self.home_depot_violation,
            ConstraintKind::Backorder | ConstraintKind::ContainerViolation => return true,
        };
        v <= 0.0
    }

    pub fn is_fully_feasible(&self) -> bool {
        self.volume_violation <= 0.0
            && self.weight_violation <= 0.0
            && self.time_window_violation <= 0.0
            && self.duration_violation <= 0.0
            && self.accessibility_violation <= 0.0
            && self.home_depot_violation <= 0.0
    }
}

struct Walk {
    distance: f64,
    duration: f64,
    route_failure_cost: f64,
    overflow_cost: f64,
    feasibility: TourFeasibility,
}

/// One truck's ordered stop sequence for one day. `points[0]` and
/// `points[len-1]` are the origin/destination starting-point sentinels;
/// every interior position holds a container or dump visit.
#[derive(Debug, Clone, PartialEq)]
pub struct Tour {
    day: usize,
    truck: TruckIdx,
    points: Vec<PointIdx>,
}

impl Tour {
    pub fn new(day: usize, truck: TruckIdx, origin: PointIdx, destination: PointIdx) -> Self {
        Tour {
            day,
            truck,
            points: vec![origin, destination],
        }
    }

    pub fn day(&self) -> usize {
        self.day
    }

    pub fn truck(&self) -> TruckIdx {
        self.truck
    }

    pub fn points(&self) -> &[PointIdx] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.len() <= 2
    }

    fn insert_positions(&self) -> std::ops::Range<usize> {
        1..self.points.len()
    }

    /// Number of feasible insertion positions (§4.4's regret tie-breaker:
    /// "prefer containers with smaller feasible-position count").
    pub fn feasible_position_count(&self) -> usize {
        self.insert_positions().len()
    }

    fn interior_positions(&self) -> std::ops::Range<usize> {
        1..self.points.len().saturating_sub(1)
    }

    pub fn insert(&mut self, pos: usize, point: PointIdx) {
        assert!(self.insert_positions().contains(&pos), "insert position out of range");
        self.points.insert(pos, point);
    }

    pub fn remove(&mut self, pos: usize) -> PointIdx {
        assert!(self.interior_positions().contains(&pos), "remove position out of range");
        self.points.remove(pos)
    }

    pub fn swap(&mut self, i: usize, j: usize) {
        assert!(self.interior_positions().contains(&i) && self.interior_positions().contains(&j));
        self.points.swap(i, j);
    }

    pub fn set_point(&mut self, pos: usize, p: PointIdx) {
        assert!(self.interior_positions().contains(&pos), "set_point position out of range");
        self.points[pos] = p;
    }

    /// Reassigns the origin sentinel; day/truck are left untouched (the
    /// caller is responsible for keeping a same-truck later tour's origin
    /// in sync, per §4.8).
    pub fn set_origin_starting_point(&mut self, p: PointIdx) {
        let last = self.points.len() - 1;
        self.points[0] = p;
        if last == 0 {
            self.points.push(p);
        }
    }

    pub fn set_destination_starting_point(&mut self, p: PointIdx) {
        let last = self.points.len() - 1;
        self.points[last] = p;
    }

    pub fn origin(&self) -> PointIdx {
        self.points[0]
    }

    pub fn destination(&self) -> PointIdx {
        self.points[self.points.len() - 1]
    }

    /// Every position, interior or sentinel, holding a container.
    pub(crate) fn container_positions(&self, problem: &ProblemInstance) -> Vec<usize> {
        self.interior_positions()
            .filter(|&p| problem.point(self.points[p]).is_container())
            .collect()
    }

    pub(crate) fn dump_positions(&self, problem: &ProblemInstance) -> Vec<usize> {
        self.interior_positions()
            .filter(|&p| problem.point(self.points[p]).is_dump())
            .collect()
    }

    pub fn empty_tour(&mut self) -> Vec<PointIdx> {
        let origin = self.points[0];
        let destination = *self.points.last().unwrap();
        let removed: Vec<PointIdx> = self.points.drain(1..self.points.len() - 1).collect();
        self.points = vec![origin, destination];
        let _ = destination;
        removed
    }

    pub fn insert_random_container(&mut self, container: PointIdx, rng: &mut EngineRng) -> usize {
        let pos = rng.gen_range_usize(self.insert_positions());
        self.insert(pos, container);
        pos
    }

    pub fn insert_random_dump(&mut self, dump: PointIdx, rng: &mut EngineRng) -> usize {
        let pos = rng.gen_range_usize(self.insert_positions());
        self.insert(pos, dump);
        pos
    }

    pub fn remove_random_container(
        &mut self,
        problem: &ProblemInstance,
        rng: &mut EngineRng,
    ) -> Option<(usize, PointIdx)> {
        let positions = self.container_positions(problem);
        let &pos = rng.choose(&positions)?;
        Some((pos, self.remove(pos)))
    }

    pub fn remove_random_dump(
        &mut self,
        problem: &ProblemInstance,
        rng: &mut EngineRng,
    ) -> Option<(usize, PointIdx)> {
        let positions = self.dump_positions(problem);
        let &pos = rng.choose(&positions)?;
        Some((pos, self.remove(pos)))
    }

    pub fn replace_random_dump(
        &mut self,
        problem: &ProblemInstance,
        new_dump: PointIdx,
        rng: &mut EngineRng,
    ) -> Option<usize> {
        let positions = self.dump_positions(problem);
        let &pos = rng.choose(&positions)?;
        self.set_point(pos, new_dump);
        Some(pos)
    }

    pub fn reorder_dumps(&mut self, problem: &ProblemInstance, rng: &mut EngineRng) {
        let positions = self.dump_positions(problem);
        if positions.len() < 2 {
            return;
        }
        let mut values: Vec<PointIdx> = positions.iter().map(|&p| self.points[p]).collect();
        rng.shuffle(&mut values);
        for (&pos, value) in positions.iter().zip(values) {
            self.points[pos] = value;
        }
    }

    /// D2/D8 helper (§4.4): containers in this tour within `2*dist_min` of
    /// `seed`, `seed` included.
    pub fn shaw_related_containers(
        &self,
        problem: &ProblemInstance,
        seed: PointIdx,
        dist_min: f64,
    ) -> Vec<(usize, PointIdx)> {
        let radius = 2.0 * dist_min;
        self.container_positions(problem)
            .into_iter()
            .map(|p| (p, self.points[p]))
            .filter(|&(_, c)| c == seed || problem.distance(seed, c) <= radius)
            .collect()
    }

    /// R2 helper: inserts `point` at its own best position in this tour.
    pub fn shaw_insertion(
        &mut self,
        problem: &ProblemInstance,
        tracker: &ContainerTracker,
        penalty: &PenaltyController,
        point: PointIdx,
    ) -> f64 {
        let (pos, delta) = self.best_container_insertion(problem, tracker, penalty, point);
        self.insert(pos, point);
        delta
    }

    fn walk(&self, problem: &ProblemInstance, tracker: &ContainerTracker) -> Walk {
        let truck = problem.truck(self.truck);
        let mut distance = 0.0_f64;
        let mut duration = 0.0_f64;
        let mut clock = 0.0_f64;
        let mut volume_load = 0.0_f64;
        let mut weight_load = 0.0_f64;
        let mut feasibility = TourFeasibility::default();
        let mut route_failure_cost = 0.0_f64;
        let mut overflow_cost = 0.0_f64;

        for i in 0..self.points.len() {
            let p = self.points[i];
            let point = problem.point(p);

            if i > 0 {
                let prev = self.points[i - 1];
                let d = problem.distance(prev, p);
                distance += d;
                let travel_time = if truck.speed > 0.0 { d / truck.speed } else { 0.0 };
                clock += travel_time;
                duration += travel_time;
            }

            if !point.is_accessible_by(self.truck) {
                feasibility.accessibility_violation += 1.0;
            }

            if clock < point.tw_lower {
                clock = point.tw_lower;
            }
            if clock > point.tw_upper {
                feasibility.time_window_violation += clock - point.tw_upper;
            }
            clock += point.service_duration;
            duration += point.service_duration;

            if point.is_container() {
                if let Some(cidx) = tracker.container_index_of(p) {
                    let attrs = point.container();
                    let (vol_pick, wt_pick) = match tracker.policy() {
                        TrackerPolicy::Collection => (
                            tracker.volume_load(cidx, self.day),
                            tracker.weight_load(cidx, self.day),
                        ),
                        TrackerPolicy::Distribution => (
                            attrs.effective_volume(),
                            attrs.effective_volume() * attrs.flow_specific_weight,
                        ),
                    };
                    volume_load += vol_pick;
                    weight_load += wt_pick;
                    overflow_cost += tracker.attributed_overflow_cost(cidx, self.day);
                }
                feasibility.volume_violation = feasibility
                    .volume_violation
                    .max((volume_load - truck.capacity_volume).max(0.0));
                feasibility.weight_violation = feasibility
                    .weight_violation
                    .max((weight_load - truck.capacity_weight).max(0.0));
            } else if point.is_dump() {
                if self.day > 0 {
                    let exceedance = (volume_load - truck.capacity_volume).max(0.0);
                    route_failure_cost += exceedance * problem.cost_params.route_failure_multiplier;
                }
                volume_load = 0.0;
                weight_load = 0.0;
            }
        }

        feasibility.duration_violation =
            (duration - problem.cost_params.max_tour_duration).max(0.0);

        if truck.must_return_home(self.day) && self.destination() != truck.home {
            feasibility.home_depot_violation = 1.0;
        }

        Walk {
            distance,
            duration,
            route_failure_cost,
            overflow_cost,
            feasibility,
        }
    }

    pub fn feasibility(&self, problem: &ProblemInstance, tracker: &ContainerTracker) -> TourFeasibility {
        self.walk(problem, tracker).feasibility
    }

    /// Cost model (§4.3): fixed + distance + time + weighted soft-
    /// constraint penalties + attributed overflow cost for containers this
    /// tour visits + route-failure cost.
    pub fn cost(
        &self,
        problem: &ProblemInstance,
        tracker: &ContainerTracker,
        penalty: &PenaltyController,
    ) -> f64 {
        let truck = problem.truck(self.truck);
        let walk = self.walk(problem, tracker);
        let f = walk.feasibility;

        let penalty_cost = penalty.lambda(ConstraintKind::Volume) * f.volume_violation
            + penalty.lambda(ConstraintKind::Weight) * f.weight_violation
            + penalty.lambda(ConstraintKind::TimeWindow) * f.time_window_violation
            + penalty.lambda(ConstraintKind::Duration) * f.duration_violation
            + penalty.lambda(ConstraintKind::Accessibility) * f.accessibility_violation
            + penalty.lambda(ConstraintKind::HomeDepot) * f.home_depot_violation;

        truck.fixed_cost
            + truck.distance_cost * walk.distance
            + truck.time_cost * walk.duration
            + penalty_cost
            + walk.overflow_cost
            + walk.route_failure_cost
    }

    fn with_insertion(&self, pos: usize, point: PointIdx) -> Tour {
        let mut clone = self.clone();
        clone.insert(pos, point);
        clone
    }

    fn with_removal(&self, pos: usize) -> Tour {
        let mut clone = self.clone();
        clone.remove(pos);
        clone
    }

    pub fn best_container_insertion(
        &self,
        problem: &ProblemInstance,
        tracker: &ContainerTracker,
        penalty: &PenaltyController,
        container: PointIdx,
    ) -> (usize, f64) {
        self.ranked_container_insertions(problem, tracker, penalty, container)
            .into_iter()
            .next()
            .unwrap_or((self.points.len() - 1, f64::INFINITY))
    }

    fn ranked_container_insertions(
        &self,
        problem: &ProblemInstance,
        tracker: &ContainerTracker,
        penalty: &PenaltyController,
        container: PointIdx,
    ) -> Vec<(usize, f64)> {
        let base = self.cost(problem, tracker, penalty);
        self.insert_positions()
            .map(|pos| {
                let delta = self.with_insertion(pos, container).cost(problem, tracker, penalty) - base;
                (pos, delta)
            })
            .sorted_by(|a, b| a.1.total_cmp(&b.1))
            .collect()
    }

    pub fn container_insertion_regret(
        &self,
        problem: &ProblemInstance,
        tracker: &ContainerTracker,
        penalty: &PenaltyController,
        container: PointIdx,
        k: usize,
    ) -> Option<(usize, f64)> {
        let ranked = self.ranked_container_insertions(problem, tracker, penalty, container);
        let best = *ranked.first()?;
        let kth = *ranked.get(k.saturating_sub(1))?;
        Some((best.0, kth.1 - best.1))
    }

    pub fn worst_container_removal(
        &self,
        problem: &ProblemInstance,
        tracker: &ContainerTracker,
        penalty: &PenaltyController,
    ) -> Option<(usize, f64)> {
        let base = self.cost(problem, tracker, penalty);
        self.container_positions(problem)
            .into_iter()
            .map(|pos| {
                let saving = base - self.with_removal(pos).cost(problem, tracker, penalty);
                (pos, saving)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    pub fn best_dump_insertion(
        &self,
        problem: &ProblemInstance,
        tracker: &ContainerTracker,
        penalty: &PenaltyController,
        dump: PointIdx,
    ) -> (usize, f64) {
        let base = self.cost(problem, tracker, penalty);
        self.insert_positions()
            .map(|pos| {
                let delta = self.with_insertion(pos, dump).cost(problem, tracker, penalty) - base;
                (pos, delta)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap_or((self.points.len() - 1, f64::INFINITY))
    }

    pub fn worst_dump_removal(
        &self,
        problem: &ProblemInstance,
        tracker: &ContainerTracker,
        penalty: &PenaltyController,
    ) -> Option<(usize, f64)> {
        let base = self.cost(problem, tracker, penalty);
        self.dump_positions(problem)
            .into_iter()
            .map(|pos| {
                let saving = base - self.with_removal(pos).cost(problem, tracker, penalty);
                (pos, saving)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    pub fn dump_insertion_regret(
        &self,
        problem: &ProblemInstance,
        tracker: &ContainerTracker,
        penalty: &PenaltyController,
        dump: PointIdx,
        k: usize,
    ) -> Option<(usize, f64)> {
        let base = self.cost(problem, tracker, penalty);
        let mut ranked: Vec<(usize, f64)> = self
            .insert_positions()
            .map(|pos| {
                let delta = self.with_insertion(pos, dump).cost(problem, tracker, penalty) - base;
                (pos, delta)
            })
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
        let best = *ranked.first()?;
        let kth = *ranked.get(k.saturating_sub(1))?;
        Some((best.0, kth.1 - best.1))
    }

    /// First-improvement swap-based 2-opt pass over interior positions,
    /// repeated to a fixed point (§4.3).
    pub fn local_search(
        &mut self,
        problem: &ProblemInstance,
        tracker: &ContainerTracker,
        penalty: &PenaltyController,
    ) {
        loop {
            let mut improved = false;
            let interior: Vec<usize> = self.interior_positions().collect();
            'scan: for (ii, &i) in interior.iter().enumerate() {
                for &j in &interior[ii + 1..] {
                    let current = self.cost(problem, tracker, penalty);
                    self.points.swap(i, j);
                    let candidate = self.cost(problem, tracker, penalty);
                    if candidate < current {
                        improved = true;
                        break 'scan;
                    }
                    self.points.swap(i, j);
                }
            }
            if !improved {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PenaltyParams;
    use crate::domain::testutil::sample_irp_instance;

    fn setup(n: usize, horizon: usize, demand: f64) -> (ProblemInstance, ContainerTracker, PenaltyController) {
        let problem = sample_irp_instance(n, horizon, demand);
        let tracker = ContainerTracker::init(&problem).unwrap();
        let penalty = PenaltyController::new(PenaltyParams::default());
        (problem, tracker, penalty)
    }

    #[test]
    fn empty_tour_has_two_sentinels() {
        let (problem, _tracker, _penalty) = setup(3, 3, 10.0);
        let origin = problem.starting_points[0];
        let tour = Tour::new(0, TruckIdx(0), origin, origin);
        assert_eq!(tour.len(), 2);
        assert!(tour.is_empty());
    }

    #[test]
    fn insert_then_remove_round_trips() {
        let (problem, _tracker, _penalty) = setup(3, 3, 10.0);
        let origin = problem.starting_points[0];
        let mut tour = Tour::new(0, TruckIdx(0), origin, origin);
        let container = problem.containers[0];
        tour.insert(1, container);
        assert_eq!(tour.len(), 3);
        let removed = tour.remove(1);
        assert_eq!(removed, container);
        assert_eq!(tour.len(), 2);
    }

    #[test]
    fn cost_is_nonnegative_for_feasible_empty_tour() {
        let (problem, tracker, penalty) = setup(3, 3, 0.0);
        let origin = problem.starting_points[0];
        let tour = Tour::new(0, TruckIdx(0), origin, origin);
        assert!(tour.cost(&problem, &tracker, &penalty) >= 0.0);
    }

    #[test]
    fn best_container_insertion_picks_lowest_delta_position() {
        let (problem, tracker, penalty) = setup(3, 3, 10.0);
        let origin = problem.starting_points[0];
        let mut tour = Tour::new(0, TruckIdx(0), origin, origin);
        tour.insert(1, problem.containers[1]);
        let (pos, delta) = tour.best_container_insertion(&problem, &tracker, &penalty, problem.containers[0]);
        assert!(pos >= 1 && pos < tour.len() + 1);
        assert!(delta.is_finite());
    }

    #[test]
    fn worst_container_removal_returns_a_nonnegative_saving_when_container_present() {
        let (problem, tracker, penalty) = setup(3, 3, 50.0);
        let origin = problem.starting_points[0];
        let mut tour = Tour::new(0, TruckIdx(0), origin, origin);
        tour.insert(1, problem.containers[0]);
        let (_pos, saving) = tour.worst_container_removal(&problem, &tracker, &penalty).unwrap();
        assert!(saving.is_finite());
    }

    #[test]
    fn local_search_never_increases_cost() {
        let (problem, tracker, penalty) = setup(3, 3, 10.0);
        let origin = problem.starting_points[0];
        let mut tour = Tour::new(0, TruckIdx(0), origin, origin);
        for &c in &problem.containers {
            tour.insert(1, c);
        }
        let before = tour.cost(&problem, &tracker, &penalty);
        tour.local_search(&problem, &tracker, &penalty);
        let after = tour.cost(&problem, &tracker, &penalty);
        assert!(after <= before + 1e-9);
    }
}
