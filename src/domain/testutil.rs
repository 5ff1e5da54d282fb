//! Test-only instance builders shared across unit tests.
#![cfg(test)]

use crate::config::CostParams;
use crate::domain::ids::{PointIdx, TruckIdx};
use crate::domain::point::{ContainerAttrs, Point, PointKind, TailProbabilityTables};
use crate::domain::problem::{ProblemInstance, ProblemVariant};
use crate::domain::truck::Truck;

/// A single starting point + single dump + `n_containers` containers laid
/// out on a unit grid, `horizon` days, uniform demand `demand_per_day` per
/// container, one truck with ample capacity.
pub fn sample_irp_instance(
    n_containers: usize,
    horizon: usize,
    demand_per_day: f64,
) -> ProblemInstance {
    let total_points = 2 + n_containers; // starting point, dump, containers
    let mut distance_matrix = vec![vec![0.0; total_points]; total_points];
    for i in 0..total_points {
        for j in 0..total_points {
            distance_matrix[i][j] = (i as f64 - j as f64).abs();
        }
    }

    let mut points = Vec::with_capacity(total_points);
    points.push(Point {
        id: "origin".to_string(),
        dindex: 0,
        coords: (0.0, 0.0),
        service_duration: 0.0,
        tw_lower: 0.0,
        tw_upper: 24.0,
        accessible_trucks: None,
        kind: PointKind::StartingPoint,
        container: None,
    });
    points.push(Point {
        id: "dump".to_string(),
        dindex: 1,
        coords: (1.0, 0.0),
        service_duration: 0.1,
        tw_lower: 0.0,
        tw_upper: 24.0,
        accessible_trucks: None,
        kind: PointKind::Dump,
        container: None,
    });

    let mut containers = Vec::with_capacity(n_containers);
    for i in 0..n_containers {
        let dindex = 2 + i;
        let tables = TailProbabilityTables::new(horizon);
        points.push(Point {
            id: format!("container-{i}"),
            dindex,
            coords: (2.0 + i as f64, 0.0),
            service_duration: 0.1,
            tw_lower: 0.0,
            tw_upper: 24.0,
            accessible_trucks: None,
            kind: PointKind::Container,
            container: Some(ContainerAttrs {
                nominal_volume: 1000.0,
                policy_fraction: 1.0,
                flow_specific_weight: 1.0,
                initial_level_pct: 0.0,
                initial_volume: 0.0,
                initial_weight: 0.0,
                demand_level: vec![0.0; horizon],
                demand_volume: vec![demand_per_day; horizon],
                demand_weight: vec![demand_per_day; horizon],
                holding_cost: 0.1,
                shortage_cost: 1.0,
                closest_dump: PointIdx(1),
                dump_round_trip_distance: 2.0,
                tail_tables: tables,
                error_sigma: 0.0,
            }),
        });
        containers.push(PointIdx(dindex));
    }

    let truck = Truck {
        id: "truck-0".to_string(),
        capacity_volume: 3000.0,
        capacity_weight: 3000.0,
        speed: 1.0,
        fixed_cost: 0.0,
        distance_cost: 1.0,
        time_cost: 0.0,
        home: PointIdx(0),
        current_start: PointIdx(0),
        flexible_starts: vec![PointIdx(0)],
        availability: vec![true; horizon],
        required_return_home: vec![true; horizon],
    };

    ProblemInstance {
        points,
        trucks: vec![truck],
        distance_matrix,
        horizon,
        containers,
        dumps: vec![PointIdx(1)],
        starting_points: vec![PointIdx(0)],
        cost_params: CostParams::default(),
        variant: ProblemVariant::Irp,
    }
}

#[allow(dead_code)]
pub fn truck_idx(i: usize) -> TruckIdx {
    TruckIdx(i)
}
