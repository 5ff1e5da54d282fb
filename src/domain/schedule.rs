//! Schedule (§4.4): the full collection of tours for a run, plus the
//! shared container tracker. Exposes the destroy/repair operator
//! catalogue's shared primitives (random-sized neighborhood draws, cost
//! aggregation); the operator catalogue itself lives in `crate::operators`
//! so that destroy/repair tables can be swapped per variant (§6) without
//! widening this type.

use crate::domain::ids::{ContainerIdx, PointIdx, TruckIdx};
use crate::domain::penalty::{ConstraintKind, PenaltyController};
use crate::domain::problem::ProblemInstance;
use crate::domain::tour::Tour;
use crate::domain::tracker::ContainerTracker;
use crate::errors::EngineResult;
use crate::rng::EngineRng;

#[derive(Debug, Clone)]
pub struct Schedule {
    tours: Vec<Tour>,
    tracker: ContainerTracker,
}

impl Schedule {
    /// One tour per (day, available truck), every tour starting empty
    /// (sentinels only). Greedy container insertion (§4.7 step 1) happens
    /// afterward via the repair operator catalogue.
    pub fn new_empty(problem: &ProblemInstance) -> EngineResult<Self> {
        let tracker = ContainerTracker::init(problem)?;
        let mut tours = Vec::new();
        for day in 0..problem.horizon {
            for (ti, truck) in problem.trucks.iter().enumerate() {
                if !truck.is_available(day) {
                    continue;
                }
                let origin = if day == 0 {
                    truck.current_start
                } else {
                    truck.home
                };
                let destination = truck.home;
                tours.push(Tour::new(day, TruckIdx(ti), origin, destination));
            }
        }
        Ok(Schedule { tours, tracker })
    }

    pub fn tours(&self) -> &[Tour] {
        &self.tours
    }

    pub fn tours_mut(&mut self) -> &mut [Tour] {
        &mut self.tours
    }

    pub fn tour(&self, i: usize) -> &Tour {
        &self.tours[i]
    }

    pub fn tour_mut(&mut self, i: usize) -> &mut Tour {
        &mut self.tours[i]
    }

    pub fn tracker(&self) -> &ContainerTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut ContainerTracker {
        &mut self.tracker
    }

    pub fn tours_on_day(&self, day: usize) -> impl Iterator<Item = usize> + '_ {
        self.tours
            .iter()
            .enumerate()
            .filter(move |(_, t)| t.day() == day)
            .map(|(i, _)| i)
    }

    pub fn tour_of_truck_on_day(&self, truck: TruckIdx, day: usize) -> Option<usize> {
        self.tours
            .iter()
            .position(|t| t.truck() == truck && t.day() == day)
    }

    /// Inserts `container` at `pos` in tour `tour_index` and keeps the
    /// tracker in sync (§4.1 `update`'s sole-mutator contract).
    pub fn insert_container(
        &mut self,
        problem: &ProblemInstance,
        tour_index: usize,
        pos: usize,
        container: PointIdx,
    ) -> EngineResult<()> {
        let day = self.tours[tour_index].day();
        self.tours[tour_index].insert(pos, container);
        self.tracker.update(problem, container, day, true)
    }

    /// Removes the point at `pos` from tour `tour_index`, syncing the
    /// tracker if it was a container.
    pub fn remove_point(
        &mut self,
        problem: &ProblemInstance,
        tour_index: usize,
        pos: usize,
    ) -> EngineResult<PointIdx> {
        let day = self.tours[tour_index].day();
        let removed = self.tours[tour_index].remove(pos);
        self.tracker.update(problem, removed, day, false)?;
        Ok(removed)
    }

    /// First-improvement local search on every tour (§4.3, §4.7 step c).
    /// The tracker is only read, never mutated, by a within-tour swap, so
    /// one snapshot clone is shared across all tours in this call.
    pub fn local_search_all(&mut self, problem: &ProblemInstance, penalty: &PenaltyController) {
        let tracker_snapshot = self.tracker.clone();
        for tour in self.tours.iter_mut() {
            tour.local_search(problem, &tracker_snapshot, penalty);
        }
    }

    /// Semi-triangular neighborhood-size draw for a pool of size `n`
    /// (§4.4).
    pub fn neighborhood_size(&self, n: usize, rng: &mut EngineRng) -> usize {
        rng.semi_triangular_rho(n)
    }

    /// Schedule cost (§4.4): sum of tour costs plus the schedule-scoped
    /// terms. The distribution variant replaces backorder/container-
    /// violation with depot-inventory/container-negative-inventory
    /// violation and drops the overflow-cost term (already embedded per
    /// tour for the containers each tour visits; the remainder, here, is
    /// the background risk priced for container-days no tour covers).
    pub fn cost(&self, problem: &ProblemInstance, penalty: &PenaltyController) -> f64 {
        let tour_costs: f64 = self
            .tours
            .iter()
            .map(|t| t.cost(problem, &self.tracker, penalty))
            .sum();

        let n_containers = problem.containers.len();
        let holding_cost: f64 = (0..n_containers)
            .flat_map(|c| (0..problem.horizon).map(move |d| (ContainerIdx(c), d)))
            .map(|(c, d)| self.tracker.holding_cost(problem, c, d))
            .sum();

        if problem.variant.uses_distribution_tracker() {
            let backorder: f64 = (0..problem.horizon).map(|d| self.tracker.depot_violation(d)).sum();
            let container_violation: f64 = (0..n_containers)
                .flat_map(|c| (0..problem.horizon).map(move |d| (ContainerIdx(c), d)))
                .map(|(c, d)| self.tracker.violation(c, d))
                .sum();

            tour_costs
                + penalty.lambda(ConstraintKind::Backorder) * backorder
                + penalty.lambda(ConstraintKind::ContainerViolation) * container_violation
                + holding_cost
        } else {
            let container_violation: f64 = (0..n_containers)
                .flat_map(|c| (0..problem.horizon).map(move |d| (ContainerIdx(c), d)))
                .map(|(c, d)| self.tracker.violation(c, d))
                .sum();
            let background_overflow: f64 = (0..n_containers)
                .flat_map(|c| (0..problem.horizon).map(move |d| (ContainerIdx(c), d)))
                .filter(|&(c, d)| !self.tracker.visited(c, d))
                .map(|(c, d)| self.tracker.attributed_overflow_cost(c, d))
                .sum();

            tour_costs
                + penalty.lambda(ConstraintKind::Backorder) * container_violation
                + penalty.lambda(ConstraintKind::ContainerViolation) * container_violation
                + holding_cost
                + background_overflow
        }
    }

    /// True if every schedule- and tour-level soft constraint is feasible
    /// (zero violation), used to feed the penalty controller's
    /// per-segment feasibility fraction (§4.5).
    pub fn feasible_for(&self, kind: ConstraintKind, problem: &ProblemInstance) -> bool {
        match kind {
            ConstraintKind::Backorder | ConstraintKind::ContainerViolation => {
                let n_containers = problem.containers.len();
                (0..n_containers).all(|c| {
                    (0..problem.horizon).all(|d| self.tracker.violation(ContainerIdx(c), d) <= 0.0)
                })
            }
            _ => self
                .tours
                .iter()
                .all(|t| t.feasibility(problem, &self.tracker).is_feasible(kind)),
        }
    }
}
