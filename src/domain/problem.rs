use crate::config::CostParams;
use crate::domain::ids::{PointIdx, TruckIdx};
use crate::domain::point::{Point, PointKind};
use crate::domain::truck::Truck;
use crate::errors::{EngineError, EngineResult};

/// Which variant's semantics the engine/operator tables are configured
/// for (§9 "Polymorphic Schedule/Tour variants"): one concrete engine,
/// selected operator tables and tracker policy per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemVariant {
    Irp,
    IrpD,
    Vrp,
    Tsp,
}

impl ProblemVariant {
    pub fn uses_distribution_tracker(self) -> bool {
        matches!(self, ProblemVariant::IrpD)
    }
}

/// Immutable problem instance (§3 "Problem Data"). Built once, shared
/// read-only across concurrent engine runs (§5).
#[derive(Debug, Clone)]
pub struct ProblemInstance {
    pub points: Vec<Point>,
    pub trucks: Vec<Truck>,
    pub distance_matrix: Vec<Vec<f64>>,
    pub horizon: usize,
    pub containers: Vec<PointIdx>,
    pub dumps: Vec<PointIdx>,
    pub starting_points: Vec<PointIdx>,
    pub cost_params: CostParams,
    pub variant: ProblemVariant,
}

impl ProblemInstance {
    pub fn point(&self, idx: PointIdx) -> &Point {
        &self.points[idx.0]
    }

    pub fn truck(&self, idx: TruckIdx) -> &Truck {
        &self.trucks[idx.0]
    }

    pub fn distance(&self, from: PointIdx, to: PointIdx) -> f64 {
        let a = self.point(from).dindex;
        let b = self.point(to).dindex;
        self.distance_matrix[a][b]
    }

    /// Validates the invariants in §3 and §7 ("Input invalid"). Fatal if
    /// violated: the engine refuses to start.
    pub fn validate(&self) -> EngineResult<()> {
        if self.trucks.is_empty() {
            return Err(EngineError::InputInvalid("no trucks in instance".into()));
        }
        if self.containers.is_empty() {
            return Err(EngineError::InputInvalid(
                "no containers in instance".into(),
            ));
        }

        for &cidx in &self.containers {
            let point = self.point(cidx);
            let attrs = point.container();
            if !(0.0..=100.0).contains(&attrs.initial_level_pct) {
                return Err(EngineError::InputInvalid(format!(
                    "container {} initial level {} out of [0,100]",
                    point.id, attrs.initial_level_pct
                )));
            }
            if attrs.effective_volume() > attrs.nominal_volume + 1e-9 {
                return Err(EngineError::InputInvalid(format!(
                    "container {} V_eff exceeds V",
                    point.id
                )));
            }
            for (name, arr) in [
                ("demand_level", &attrs.demand_level),
                ("demand_volume", &attrs.demand_volume),
                ("demand_weight", &attrs.demand_weight),
            ] {
                if arr.len() != self.horizon {
                    return Err(EngineError::InputInvalid(format!(
                        "container {} {} length {} != horizon {}",
                        point.id,
                        name,
                        arr.len(),
                        self.horizon
                    )));
                }
                if arr.iter().any(|&v| v == -404.0) {
                    return Err(EngineError::InputInvalid(format!(
                        "container {} {} contains forecast sentinel -404",
                        point.id, name
                    )));
                }
            }
            if !attrs.tail_tables.is_consistent() {
                return Err(EngineError::InputInvalid(format!(
                    "container {} has inconsistent tail-probability tables",
                    point.id
                )));
            }
        }

        for truck in &self.trucks {
            if !truck.is_valid(self.horizon) {
                return Err(EngineError::InputInvalid(format!(
                    "truck {} has invalid flexible-start or day-vector configuration",
                    truck.id
                )));
            }
        }

        Ok(())
    }

    pub fn point_kind(&self, idx: PointIdx) -> PointKind {
        self.point(idx).kind
    }
}
