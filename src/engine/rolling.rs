//! Rolling-horizon driver (§4.8): repeats the engine on sliding-window
//! truncations of a full-horizon instance, carrying forward per-container
//! load state and per-truck current starting points between rollovers.

use std::collections::HashMap;

use tracing::{info, info_span};

use crate::config::{EngineParams, PenaltyParams, RollingParams, SelectorParams};
use crate::domain::ids::PointIdx;
use crate::domain::penalty::PenaltyController;
use crate::domain::point::ContainerAttrs;
use crate::domain::problem::ProblemInstance;
use crate::domain::report::ScheduleRecord;
use crate::domain::tracker::TrackerPolicy;
use crate::engine::sa_alns;
use crate::errors::EngineResult;
use crate::external::forecast::{build_tail_tables, ForecastProvider};

/// Per-container/per-truck state carried across rollovers.
#[derive(Debug, Clone, Default)]
struct RollingState {
    most_recent_visit: HashMap<PointIdx, usize>,
    current_start: HashMap<usize, PointIdx>,
}

#[derive(Debug, Clone)]
pub struct RolloverRecord {
    pub rollover: usize,
    pub window_start: usize,
    pub window_len: usize,
    pub day0_cost: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone)]
pub struct RollingOutput {
    pub total_day0_cost: f64,
    pub rollovers: Vec<RolloverRecord>,
    /// Persisted-output record (§6) of the best schedule found in the last
    /// rollover's window. `None` only when no rollover ran at all.
    pub final_schedule: Option<ScheduleRecord>,
}

/// Sums `attrs.demand_volume[lo..hi]`, clamped to the array bounds (the
/// "replay reported demand increments" step of §4.8).
fn replay_demand_sum(demand: &[f64], lo: usize, hi: usize) -> f64 {
    if lo >= hi || lo >= demand.len() {
        return 0.0;
    }
    demand[lo..hi.min(demand.len())].iter().sum()
}

/// Initial volume/weight load at the start of rollover day `d`, replaying
/// actual demand increments since the container's most recent visit (or
/// from day 0 if never visited).
fn replay_initial_load(
    attrs: &ContainerAttrs,
    policy: TrackerPolicy,
    last_visit: Option<usize>,
    d: usize,
) -> (f64, f64) {
    let v_eff = attrs.effective_volume();
    let start_day = last_visit.map(|lv| lv + 1).unwrap_or(0);

    match policy {
        TrackerPolicy::Collection => {
            let base_vol = if last_visit.is_some() { 0.0 } else { attrs.initial_volume };
            let base_wt = if last_visit.is_some() { 0.0 } else { attrs.initial_weight };
            let vol = base_vol + replay_demand_sum(&attrs.demand_volume, start_day, d);
            let wt = base_wt + replay_demand_sum(&attrs.demand_weight, start_day, d);
            (vol.max(0.0), wt.max(0.0))
        }
        TrackerPolicy::Distribution => {
            let base_vol = if last_visit.is_some() { v_eff } else { attrs.initial_volume };
            let base_wt = if last_visit.is_some() {
                v_eff * attrs.flow_specific_weight
            } else {
                attrs.initial_weight
            };
            let vol = base_vol - replay_demand_sum(&attrs.demand_volume, start_day, d);
            let wt = base_wt - replay_demand_sum(&attrs.demand_weight, start_day, d);
            (vol, wt)
        }
    }
}

/// Builds the truncated, horizon-`h` instance for rollover starting at
/// absolute day `d` (§4.8 steps 1-3).
fn build_window_instance(
    full: &ProblemInstance,
    provider: &dyn ForecastProvider,
    state: &RollingState,
    d: usize,
    h: usize,
) -> EngineResult<ProblemInstance> {
    let policy = TrackerPolicy::for_variant(full.variant);
    let mut points = full.points.clone();

    for &cidx in &full.containers {
        let point = &mut points[cidx.0];
        let old_attrs = point.container().clone();
        let last_visit = state.most_recent_visit.get(&cidx).copied();
        let (init_vol, init_wt) = replay_initial_load(&old_attrs, policy, last_visit, d);

        let estimated_level = provider.forecast_level_demands(h, &point.id)?;
        let estimated_volume = estimated_level.clone();
        let estimated_weight: Vec<f64> = estimated_level
            .iter()
            .map(|&lv| lv * old_attrs.flow_specific_weight)
            .collect();

        let a = old_attrs.effective_volume();
        let tail_tables = build_tail_tables(provider, &point.id, h, a, &estimated_level)?;

        let new_attrs = ContainerAttrs {
            initial_volume: init_vol,
            initial_weight: init_wt,
            initial_level_pct: if a > 0.0 { (init_vol / a * 100.0).clamp(0.0, 100.0) } else { 0.0 },
            demand_level: estimated_level,
            demand_volume: estimated_volume,
            demand_weight: estimated_weight,
            tail_tables,
            ..old_attrs
        };
        point.container = Some(new_attrs);
    }

    let mut trucks = full.trucks.clone();
    for (ti, truck) in trucks.iter_mut().enumerate() {
        let window_end = (d + h).min(truck.availability.len());
        truck.availability = truck.availability[d..window_end].to_vec();
        truck.required_return_home = truck.required_return_home[d..window_end].to_vec();
        truck.current_start = state.current_start.get(&ti).copied().unwrap_or(truck.current_start);
    }

    Ok(ProblemInstance {
        points,
        trucks,
        distance_matrix: full.distance_matrix.clone(),
        horizon: h,
        containers: full.containers.clone(),
        dumps: full.dumps.clone(),
        starting_points: full.starting_points.clone(),
        cost_params: full.cost_params,
        variant: full.variant,
    })
}

/// Runs the full rolling-horizon schedule (§4.8): `rolling_params.rollovers`
/// windows of length `min(rolling_horizon_length, N - d)`, seeded
/// deterministically per rollover as `seed.wrapping_add(d)`.
pub fn run(
    full_problem: &ProblemInstance,
    provider: &dyn ForecastProvider,
    rolling_params: RollingParams,
    engine_params: EngineParams,
    penalty_params: PenaltyParams,
    selector_params: SelectorParams,
    seed: u64,
) -> EngineResult<RollingOutput> {
    let mut state = RollingState::default();
    let mut records = Vec::new();
    let mut total_day0_cost = 0.0;
    let mut final_schedule = None;

    for d in 0..rolling_params.rollovers {
        if d >= full_problem.horizon {
            break;
        }
        let h = rolling_params.rolling_horizon_length.min(full_problem.horizon - d);
        if h == 0 {
            break;
        }

        let span = info_span!("rollover", d, h);
        let _guard = span.enter();

        let window = build_window_instance(full_problem, provider, &state, d, h)?;
        let penalty_controller_seed = seed.wrapping_add(d as u64);
        let output = sa_alns::run(
            &window,
            engine_params,
            penalty_params,
            selector_params,
            penalty_controller_seed,
            || false,
        )?;

        let mut day0_cost = 0.0;
        for tour in output.best.tours() {
            if tour.day() != 0 {
                continue;
            }
            for &point in tour.points() {
                if let Some(cidx) = output.best.tracker().container_index_of(point) {
                    if output.best.tracker().visited(cidx, 0) {
                        state.most_recent_visit.insert(point, d);
                    }
                }
            }
            if !tour.is_empty() {
                let truck = tour.truck();
                state.current_start.insert(truck.0, tour.destination());
            }
            day0_cost += tour.cost(&window, output.best.tracker(), &crate::domain::penalty::PenaltyController::new(penalty_params));
        }

        info!(rollover = d, day0_cost, iterations = output.iterations, "rollover complete");

        total_day0_cost += day0_cost;
        records.push(RolloverRecord {
            rollover: d,
            window_start: d,
            window_len: h,
            day0_cost,
            iterations: output.iterations,
        });

        let penalty = PenaltyController::new(penalty_params);
        final_schedule = Some(ScheduleRecord::build(&output.best, &window, &penalty));
    }

    Ok(RollingOutput {
        total_day0_cost,
        rollovers: records,
        final_schedule,
    })
}
