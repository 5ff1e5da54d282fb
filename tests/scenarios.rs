//! End-to-end scenarios from the testable-properties list: builds a small
//! instance by hand through the public API (the way the CLI binary does)
//! and drives the engine over it, rather than exercising any one module in
//! isolation.

use irp_alns::config::{CostParams, EngineParams, PenaltyParams, RollingParams, SelectorParams};
use irp_alns::domain::ids::{PointIdx, TruckIdx};
use irp_alns::domain::penalty::{ConstraintKind, PenaltyController};
use irp_alns::domain::point::{ContainerAttrs, Point, PointKind, TailProbabilityTables};
use irp_alns::domain::problem::{ProblemInstance, ProblemVariant};
use irp_alns::domain::truck::Truck;
use irp_alns::engine::sa_alns;
use irp_alns::external::forecast::StaticForecastProvider;

fn grid_distance_matrix(n: usize) -> Vec<Vec<f64>> {
    let mut m = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..n {
            m[i][j] = (i as f64 - j as f64).abs();
        }
    }
    m
}

fn container_point(id: &str, dindex: usize, demand: f64, volume: f64, horizon: usize) -> Point {
    Point {
        id: id.to_string(),
        dindex,
        coords: (dindex as f64, 0.0),
        service_duration: 0.0,
        tw_lower: 0.0,
        tw_upper: 24.0,
        accessible_trucks: None,
        kind: PointKind::Container,
        container: Some(ContainerAttrs {
            nominal_volume: volume,
            policy_fraction: 1.0,
            flow_specific_weight: 1.0,
            initial_level_pct: 95.0,
            initial_volume: 0.95 * volume,
            initial_weight: 0.95 * volume,
            demand_level: vec![demand; horizon],
            demand_volume: vec![demand; horizon],
            demand_weight: vec![demand; horizon],
            holding_cost: 0.0,
            shortage_cost: 1.0,
            closest_dump: PointIdx(1),
            dump_round_trip_distance: 2.0,
            tail_tables: TailProbabilityTables::new(horizon),
            error_sigma: 0.0,
        }),
    }
}

/// Scenario 1: one starting point, one dump, three containers at initial
/// level 95, uniform demand, a single truck. Expect a single day-0 tour
/// through all three containers and the dump, total distance 8, feasible.
#[test]
fn scenario_1_three_container_single_tour() {
    let horizon = 3;
    let points = vec![
        Point {
            id: "origin".into(),
            dindex: 0,
            coords: (0.0, 0.0),
            service_duration: 0.0,
            tw_lower: 0.0,
            tw_upper: 24.0,
            accessible_trucks: None,
            kind: PointKind::StartingPoint,
            container: None,
        },
        Point {
            id: "dump".into(),
            dindex: 1,
            coords: (1.0, 0.0),
            service_duration: 0.0,
            tw_lower: 0.0,
            tw_upper: 24.0,
            accessible_trucks: None,
            kind: PointKind::Dump,
            container: None,
        },
        container_point("container-0", 2, 10.0, 1000.0, horizon),
        container_point("container-1", 3, 10.0, 1000.0, horizon),
        container_point("container-2", 4, 10.0, 1000.0, horizon),
    ];

    let truck = Truck {
        id: "truck-0".into(),
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

    let problem = ProblemInstance {
        points,
        trucks: vec![truck],
        distance_matrix: grid_distance_matrix(5),
        horizon,
        containers: vec![PointIdx(2), PointIdx(3), PointIdx(4)],
        dumps: vec![PointIdx(1)],
        starting_points: vec![PointIdx(0)],
        cost_params: CostParams::default(),
        variant: ProblemVariant::Irp,
    };
    problem.validate().unwrap();

    let mut engine_params = EngineParams::default();
    engine_params.iteration_budget = 500;
    engine_params.segment_length = 50;

    let output = sa_alns::run(
        &problem,
        engine_params,
        PenaltyParams::default(),
        SelectorParams::default(),
        7,
        || false,
    )
    .unwrap();

    assert!(
        (output.best_cost - 8.0).abs() < 1e-6,
        "expected total distance 8, got {}",
        output.best_cost
    );
    for kind in ConstraintKind::ALL {
        assert!(output.best.feasible_for(kind, &problem), "expected no {kind:?} violations");
    }

    let day0_tours: Vec<_> = output.best.tours().iter().filter(|t| t.day() == 0).collect();
    assert!(!day0_tours.is_empty());
    let visited_all = [PointIdx(2), PointIdx(3), PointIdx(4)].iter().all(|&c| {
        day0_tours.iter().any(|t| t.points().contains(&c))
    });
    assert!(visited_all, "expected all three containers visited on day 0");

    for &c in &[PointIdx(2), PointIdx(3), PointIdx(4)] {
        let cidx = output.best.tracker().container_index_of(c).unwrap();
        assert_eq!(
            output.best.tracker().attributed_overflow_cost(cidx, 0),
            0.0,
            "expected zero attributed overflow cost for {c:?} on day 0 after collection"
        );
    }
}

/// Scenario 2: container 2 has volume 10 L and demand 20 L/day, so day-0
/// starts in violation; the engine's best solution should have zero
/// container violation after repair inserts it into a tour.
#[test]
fn scenario_2_violation_resolved_by_repair() {
    let horizon = 3;
    let mut points = vec![
        Point {
            id: "origin".into(),
            dindex: 0,
            coords: (0.0, 0.0),
            service_duration: 0.0,
            tw_lower: 0.0,
            tw_upper: 24.0,
            accessible_trucks: None,
            kind: PointKind::StartingPoint,
            container: None,
        },
        Point {
            id: "dump".into(),
            dindex: 1,
            coords: (1.0, 0.0),
            service_duration: 0.0,
            tw_lower: 0.0,
            tw_upper: 24.0,
            accessible_trucks: None,
            kind: PointKind::Dump,
            container: None,
        },
        container_point("container-0", 2, 10.0, 1000.0, horizon),
        container_point("container-1", 3, 20.0, 10.0, horizon),
        container_point("container-2", 4, 10.0, 1000.0, horizon),
    ];
    points[3].container.as_mut().unwrap().initial_level_pct = 95.0;
    points[3].container.as_mut().unwrap().initial_volume = 9.5;
    points[3].container.as_mut().unwrap().initial_weight = 9.5;

    let truck = Truck {
        id: "truck-0".into(),
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

    let problem = ProblemInstance {
        points,
        trucks: vec![truck],
        distance_matrix: grid_distance_matrix(5),
        horizon,
        containers: vec![PointIdx(2), PointIdx(3), PointIdx(4)],
        dumps: vec![PointIdx(1)],
        starting_points: vec![PointIdx(0)],
        cost_params: CostParams::default(),
        variant: ProblemVariant::Irp,
    };
    problem.validate().unwrap();

    let mut engine_params = EngineParams::default();
    engine_params.iteration_budget = 500;
    engine_params.segment_length = 50;

    let output = sa_alns::run(
        &problem,
        engine_params,
        PenaltyParams::default(),
        SelectorParams::default(),
        11,
        || false,
    )
    .unwrap();

    assert!(output.best.feasible_for(ConstraintKind::ContainerViolation, &problem));
    assert!(output.best.feasible_for(ConstraintKind::Backorder, &problem));
}

/// Scenario 3: a container restricted to truck_1, but only truck_2 is
/// available on day 0. Any repair leaves accessibility violated and the
/// best day-0 solution must stay empty for that container.
#[test]
fn scenario_3_accessibility_violation_cannot_be_repaired() {
    let horizon = 2;
    let mut container = container_point("container-0", 2, 10.0, 1000.0, horizon);
    container.accessible_trucks = Some(vec![TruckIdx(0)]);

    let points = vec![
        Point {
            id: "origin".into(),
            dindex: 0,
            coords: (0.0, 0.0),
            service_duration: 0.0,
            tw_lower: 0.0,
            tw_upper: 24.0,
            accessible_trucks: None,
            kind: PointKind::StartingPoint,
            container: None,
        },
        Point {
            id: "dump".into(),
            dindex: 1,
            coords: (1.0, 0.0),
            service_duration: 0.0,
            tw_lower: 0.0,
            tw_upper: 24.0,
            accessible_trucks: None,
            kind: PointKind::Dump,
            container: None,
        },
        container,
    ];

    let truck_1 = Truck {
        id: "truck-1".into(),
        capacity_volume: 3000.0,
        capacity_weight: 3000.0,
        speed: 1.0,
        fixed_cost: 0.0,
        distance_cost: 1.0,
        time_cost: 0.0,
        home: PointIdx(0),
        current_start: PointIdx(0),
        flexible_starts: vec![PointIdx(0)],
        availability: vec![false; horizon],
        required_return_home: vec![true; horizon],
    };
    let truck_2 = Truck {
        id: "truck-2".into(),
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

    let problem = ProblemInstance {
        points,
        trucks: vec![truck_1, truck_2],
        distance_matrix: grid_distance_matrix(3),
        horizon,
        containers: vec![PointIdx(2)],
        dumps: vec![PointIdx(1)],
        starting_points: vec![PointIdx(0)],
        cost_params: CostParams::default(),
        variant: ProblemVariant::Irp,
    };
    problem.validate().unwrap();

    let mut engine_params = EngineParams::default();
    engine_params.iteration_budget = 300;
    engine_params.segment_length = 30;

    let output = sa_alns::run(
        &problem,
        engine_params,
        PenaltyParams::default(),
        SelectorParams::default(),
        3,
        || false,
    )
    .unwrap();

    let day0_has_container = output
        .best
        .tours()
        .iter()
        .filter(|t| t.day() == 0)
        .any(|t| t.points().contains(&PointIdx(2)));
    assert!(!day0_has_container, "container-0 cannot be served on day 0 by any available, accessible truck");
}

/// Scenario 4: the same seed must reproduce the same best cost.
#[test]
fn scenario_4_deterministic_replay() {
    let horizon = 4;
    let points = vec![
        Point {
            id: "origin".into(),
            dindex: 0,
            coords: (0.0, 0.0),
            service_duration: 0.0,
            tw_lower: 0.0,
            tw_upper: 24.0,
            accessible_trucks: None,
            kind: PointKind::StartingPoint,
            container: None,
        },
        Point {
            id: "dump".into(),
            dindex: 1,
            coords: (1.0, 0.0),
            service_duration: 0.0,
            tw_lower: 0.0,
            tw_upper: 24.0,
            accessible_trucks: None,
            kind: PointKind::Dump,
            container: None,
        },
        container_point("container-0", 2, 7.0, 500.0, horizon),
        container_point("container-1", 3, 12.0, 500.0, horizon),
    ];
    let truck = Truck {
        id: "truck-0".into(),
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
    let problem = ProblemInstance {
        points,
        trucks: vec![truck],
        distance_matrix: grid_distance_matrix(4),
        horizon,
        containers: vec![PointIdx(2), PointIdx(3)],
        dumps: vec![PointIdx(1)],
        starting_points: vec![PointIdx(0)],
        cost_params: CostParams::default(),
        variant: ProblemVariant::Irp,
    };
    problem.validate().unwrap();

    let mut engine_params = EngineParams::default();
    engine_params.iteration_budget = 1000;
    engine_params.segment_length = 50;

    let run_once = || {
        sa_alns::run(
            &problem,
            engine_params,
            PenaltyParams::default(),
            SelectorParams::default(),
            42,
            || false,
        )
        .unwrap()
    };

    let first = run_once();
    let second = run_once();
    assert_eq!(first.best_cost, second.best_cost);
    assert_eq!(first.iterations, second.iterations);
}

/// Scenario 6: rolling horizon with exactly-reported demand should reach a
/// finite total day-0 cost and run no more rollovers than the horizon
/// allows.
#[test]
fn scenario_6_rolling_horizon_runs_to_completion() {
    let horizon = 14;
    let mut points = vec![
        Point {
            id: "origin".into(),
            dindex: 0,
            coords: (0.0, 0.0),
            service_duration: 0.0,
            tw_lower: 0.0,
            tw_upper: 24.0,
            accessible_trucks: None,
            kind: PointKind::StartingPoint,
            container: None,
        },
        Point {
            id: "dump".into(),
            dindex: 1,
            coords: (1.0, 0.0),
            service_duration: 0.0,
            tw_lower: 0.0,
            tw_upper: 24.0,
            accessible_trucks: None,
            kind: PointKind::Dump,
            container: None,
        },
    ];
    let mut provider = StaticForecastProvider::new();
    let mut container_idxs = Vec::new();
    for i in 0..5 {
        let id = format!("container-{i}");
        provider = provider.with_container(id.clone(), 2.0, 5.0, vec![5.0; horizon]);
        points.push(container_point(&id, 2 + i, 5.0, 500.0, horizon));
        container_idxs.push(PointIdx(2 + i));
    }

    let truck = Truck {
        id: "truck-0".into(),
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

    let problem = ProblemInstance {
        points,
        trucks: vec![truck],
        distance_matrix: grid_distance_matrix(7),
        horizon,
        containers: container_idxs,
        dumps: vec![PointIdx(1)],
        starting_points: vec![PointIdx(0)],
        cost_params: CostParams::default(),
        variant: ProblemVariant::Irp,
    };
    problem.validate().unwrap();

    let mut engine_params = EngineParams::default();
    engine_params.iteration_budget = 200;
    engine_params.segment_length = 20;
    let rolling_params = RollingParams {
        rolling_horizon_length: 7,
        rollovers: 14,
    };

    let output = irp_alns::engine::rolling::run(
        &problem,
        &provider,
        rolling_params,
        engine_params,
        PenaltyParams::default(),
        SelectorParams::default(),
        5,
    )
    .unwrap();

    assert!(output.rollovers.len() <= 14);
    assert!(output.total_day0_cost.is_finite());
    assert!(output.final_schedule.is_some());
}

/// Idempotence: a reinitialized penalty controller over the same
/// observation sequence lands on the same lambdas as recording it live.
#[test]
fn penalty_controller_is_deterministic_given_the_same_observations() {
    let params = PenaltyParams::default();
    let mut a = PenaltyController::new(params);
    let mut b = PenaltyController::new(params);

    for i in 0..250 {
        let feasible = i % 3 != 0;
        a.record(ConstraintKind::Volume, feasible);
        b.record(ConstraintKind::Volume, feasible);
        if i % params.segment_length == params.segment_length - 1 {
            a.step();
            b.step();
        }
    }

    assert_eq!(a.lambda(ConstraintKind::Volume), b.lambda(ConstraintKind::Volume));
}
