//! Immutable parameter blocks threaded through construction.
//!
//! Per the Design Notes ("Global mutable state ... Replace with an
//! immutable parameter block threaded through construction; never read
//! process-global state from operators"), nothing here is a `static`; every
//! operator and engine component receives the relevant block by reference.

use std::env;

/// Soft-constraint pricing and overflow-cost weights carried by a problem
/// instance. Distinct from [`EngineParams`], which tunes the *search*
/// rather than the *objective*.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostParams {
    pub emergency_cost: f64,
    pub overflow_cost: f64,
    /// Multiplier applied to cumulative-load exceedances observed right
    /// before a dump visit, on days after the first (`day > 0`).
    pub route_failure_multiplier: f64,
    pub lambda_backorder: f64,
    pub lambda_container_violation: f64,
    /// Feasibility bound for the "duration" soft constraint, hours.
    pub max_tour_duration: f64,
}

impl Default for CostParams {
    fn default() -> Self {
        CostParams {
            emergency_cost: 500.0,
            overflow_cost: 50.0,
            route_failure_multiplier: 2.0,
            lambda_backorder: 100.0,
            lambda_container_violation: 100.0,
            max_tour_duration: 10.0,
        }
    }
}

/// Penalty-controller tuning: reaction speed and multiplier bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PenaltyParams {
    pub segment_length: usize,
    pub f_low: f64,
    pub f_high: f64,
    pub eta_up: f64,
    pub lambda_min: f64,
    pub lambda_max: f64,
    pub initial_lambda: f64,
}

impl Default for PenaltyParams {
    fn default() -> Self {
        PenaltyParams {
            segment_length: 100,
            f_low: 0.05,
            f_high: 0.20,
            eta_up: 1.2,
            lambda_min: 1.0,
            lambda_max: 10_000.0,
            initial_lambda: 50.0,
        }
    }
}

/// Adaptive-selector tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectorParams {
    /// Reaction rate `r` in `w_i <- (1-r)*w_i + r*(s_i/max(1,u_i))`.
    pub reaction_rate: f64,
    pub sigma_new_best: f64,
    pub sigma_better: f64,
    pub sigma_accepted_worse: f64,
    pub sigma_unused: f64,
}

impl Default for SelectorParams {
    fn default() -> Self {
        SelectorParams {
            reaction_rate: 0.3,
            sigma_new_best: 33.0,
            sigma_better: 9.0,
            sigma_accepted_worse: 1.0,
            sigma_unused: 0.0,
        }
    }
}

/// SA-ALNS outer-loop tuning. `initial_temperature` is not a knob here: the
/// engine computes it from the initial solution's cost so that a 5%
/// worsening is accepted with probability 0.5 at the start of the run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineParams {
    pub cooling_factor: f64,
    pub min_temperature: f64,
    pub iteration_budget: usize,
    pub segment_length: usize,
    pub reheat_factor: f64,
    pub reheat_trigger_segments: usize,
    pub local_search_enabled: bool,
}

impl Default for EngineParams {
    fn default() -> Self {
        EngineParams {
            cooling_factor: 0.9975,
            min_temperature: 1e-3,
            iteration_budget: 20_000,
            segment_length: 100,
            reheat_factor: 1.5,
            reheat_trigger_segments: 5,
            local_search_enabled: true,
        }
    }
}

/// Rolling-horizon orchestration tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingParams {
    pub rolling_horizon_length: usize,
    pub rollovers: usize,
}

/// Process-boundary configuration: what to run, not how the objective is
/// priced. Loaded from `.env` / environment variables the way the
/// teacher's `dotenv::dotenv().ok()` + `std::env::var` calls work.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub benchmark_path: Option<String>,
    pub variant: String,
    pub seed: u64,
    pub database_url: String,
}

impl RunConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let benchmark_path = env::var("IRP_ALNS_BENCHMARK_PATH").ok();
        let variant = env::var("IRP_ALNS_VARIANT").unwrap_or_else(|_| "irp".to_string());
        let seed = env::var("IRP_ALNS_SEED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(64);
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:irp_alns.sqlite".to_string());

        RunConfig {
            benchmark_path,
            variant,
            seed,
            database_url,
        }
    }
}
