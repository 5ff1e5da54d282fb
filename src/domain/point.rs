use crate::domain::ids::{PointIdx, TruckIdx};

/// Precomputed unconditional/conditional tail-probability tables for one
/// container, built once from the forecast provider (§4.2, §6).
///
/// `u_zero[d]` and `c_zero[d][h]` are indexed by day `d` (`1..=horizon`,
/// slot 0 unused) respectively by `h = d - k` (also `1..=horizon`, slot 0
/// unused); `c_start[d]` likewise. All entries must be finite in `[0,1]`;
/// a `NaN` anywhere is an input-invalid error per §4.2/§7.
#[derive(Debug, Clone, PartialEq)]
pub struct TailProbabilityTables {
    pub u_start: f64,
    pub u_zero: Vec<f64>,
    pub c_start: Vec<f64>,
    pub c_zero: Vec<Vec<f64>>,
}

impl TailProbabilityTables {
    pub fn new(horizon: usize) -> Self {
        TailProbabilityTables {
            u_start: 0.0,
            u_zero: vec![0.0; horizon + 1],
            c_start: vec![0.0; horizon + 1],
            c_zero: vec![vec![0.0; horizon + 1]; horizon + 1],
        }
    }

    /// Checks the consistency invariant referenced in §4.2: no `NaN`
    /// anywhere, and all probabilities in `[0,1]`.
    pub fn is_consistent(&self) -> bool {
        let in_range = |x: f64| x.is_finite() && (0.0..=1.0).contains(&x);
        in_range(self.u_start)
            && self.u_zero.iter().all(|&x| in_range(x))
            && self.c_start.iter().all(|&x| in_range(x))
            && self.c_zero.iter().all(|row| row.iter().all(|&x| in_range(x)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContainerAttrs {
    /// Nominal volume `V`.
    pub nominal_volume: f64,
    /// Usable fraction of `V` for routing feasibility, `V_eff = policy_fraction * V`.
    pub policy_fraction: f64,
    pub flow_specific_weight: f64,
    /// Percent in `[0,100]`.
    pub initial_level_pct: f64,
    pub initial_volume: f64,
    pub initial_weight: f64,
    /// Per-day forecast demand, length == horizon.
    pub demand_level: Vec<f64>,
    pub demand_volume: Vec<f64>,
    pub demand_weight: Vec<f64>,
    pub holding_cost: f64,
    pub shortage_cost: f64,
    pub closest_dump: PointIdx,
    pub dump_round_trip_distance: f64,
    pub tail_tables: TailProbabilityTables,
    /// Gaussian demand-error standard deviation from the forecast
    /// provider's `errorSigma(flowId, clientId)`, resolved once at load
    /// time (§6).
    pub error_sigma: f64,
}

impl ContainerAttrs {
    pub fn effective_volume(&self) -> f64 {
        self.policy_fraction * self.nominal_volume
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    StartingPoint,
    Container,
    Dump,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub id: String,
    pub dindex: usize,
    pub coords: (f64, f64),
    pub service_duration: f64,
    pub tw_lower: f64,
    pub tw_upper: f64,
    /// `None` means every truck may service this point.
    pub accessible_trucks: Option<Vec<TruckIdx>>,
    pub kind: PointKind,
    pub container: Option<ContainerAttrs>,
}

impl Point {
    pub fn is_accessible_by(&self, truck: TruckIdx) -> bool {
        match &self.accessible_trucks {
            None => true,
            Some(allowed) => allowed.contains(&truck),
        }
    }

    pub fn container(&self) -> &ContainerAttrs {
        self.container
            .as_ref()
            .expect("container attrs accessed on a non-container point")
    }

    pub fn is_container(&self) -> bool {
        self.kind == PointKind::Container
    }

    pub fn is_dump(&self) -> bool {
        self.kind == PointKind::Dump
    }

    pub fn is_starting_point(&self) -> bool {
        self.kind == PointKind::StartingPoint
    }
}
