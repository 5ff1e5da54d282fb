//! CLI entry point: takes an optional benchmark path and variant tag from
//! `std::env::args`, builds a `RunConfig`, and drives the rolling-horizon
//! engine, printing progress with `tracing` spans and a `colored` summary
//! the way `vrp-solver.rs`/`search::run` did for the tabu-search engine.

use std::env;
use std::fs;

use colored::*;
use csv::Writer;
use tracing::{info, span, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use irp_alns::config::{EngineParams, PenaltyParams, RollingParams, RunConfig, SelectorParams};
use irp_alns::domain::ids::PointIdx;
use irp_alns::domain::point::{ContainerAttrs, Point, PointKind, TailProbabilityTables};
use irp_alns::domain::problem::{ProblemInstance, ProblemVariant};
use irp_alns::domain::truck::Truck;
use irp_alns::engine::rolling;
use irp_alns::external::forecast::{build_tail_tables, StaticForecastProvider};
use irp_alns::external::loader::{parse_benchmark_lines, BenchmarkFlavor};

fn parse_variant(tag: &str) -> ProblemVariant {
    match tag {
        "irp-d" | "irpd" => ProblemVariant::IrpD,
        "vrp" => ProblemVariant::Vrp,
        "tsp" => ProblemVariant::Tsp,
        _ => ProblemVariant::Irp,
    }
}

/// Generates a small demo instance on a unit grid. The benchmark/relational
/// loaders (§6) are interfaces the engine does not observe through; this
/// CLI exercises the benchmark parser for its side-effect logging only and
/// always runs the engine itself on a freshly generated instance.
fn demo_instance(variant: ProblemVariant, n_containers: usize, horizon: usize) -> (ProblemInstance, StaticForecastProvider) {
    let total_points = 2 + n_containers;
    let mut distance_matrix = vec![vec![0.0; total_points]; total_points];
    for i in 0..total_points {
        for j in 0..total_points {
            distance_matrix[i][j] = (i as f64 - j as f64).abs();
        }
    }

    let mut points = Vec::with_capacity(total_points);
    points.push(Point {
        id: "depot".to_string(),
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
        service_duration: 0.2,
        tw_lower: 0.0,
        tw_upper: 24.0,
        accessible_trucks: None,
        kind: PointKind::Dump,
        container: None,
    });

    let mut provider = StaticForecastProvider::new();
    let mut containers = Vec::with_capacity(n_containers);
    for i in 0..n_containers {
        let id = format!("container-{i}");
        let dindex = 2 + i;
        let demand = 8.0 + (i as f64 % 3.0) * 2.0;
        provider = provider.with_container(id.clone(), 3.0, 20.0, vec![demand; horizon]);

        points.push(Point {
            id: id.clone(),
            dindex,
            coords: (2.0 + i as f64, 0.0),
            service_duration: 0.1,
            tw_lower: 0.0,
            tw_upper: 24.0,
            accessible_trucks: None,
            kind: PointKind::Container,
            container: Some(ContainerAttrs {
                nominal_volume: 1000.0,
                policy_fraction: 0.9,
                flow_specific_weight: 1.0,
                initial_level_pct: 20.0,
                initial_volume: 200.0,
                initial_weight: 200.0,
                demand_level: vec![demand; horizon],
                demand_volume: vec![demand; horizon],
                demand_weight: vec![demand; horizon],
                holding_cost: 0.05,
                shortage_cost: 5.0,
                closest_dump: PointIdx(1),
                dump_round_trip_distance: 2.0,
                tail_tables: TailProbabilityTables::new(horizon),
                error_sigma: 3.0,
            }),
        });
        containers.push(PointIdx(dindex));
    }

    for (cidx, &container) in containers.iter().enumerate() {
        let attrs = points[container.0].container().clone();
        let a = attrs.effective_volume();
        let tail = build_tail_tables(&provider, &points[container.0].id, horizon, a, &attrs.demand_level)
            .unwrap_or_else(|_| TailProbabilityTables::new(horizon));
        points[container.0].container.as_mut().unwrap().tail_tables = tail;
        let _ = cidx;
    }

    let n_trucks = match variant {
        ProblemVariant::Tsp => 1,
        _ => 2,
    };
    let trucks = (0..n_trucks)
        .map(|i| Truck {
            id: format!("truck-{i}"),
            capacity_volume: 5000.0,
            capacity_weight: 5000.0,
            speed: 40.0,
            fixed_cost: 10.0,
            distance_cost: 1.0,
            time_cost: 0.5,
            home: PointIdx(0),
            current_start: PointIdx(0),
            flexible_starts: vec![PointIdx(0)],
            availability: vec![true; horizon],
            required_return_home: vec![true; horizon],
        })
        .collect();

    let problem = ProblemInstance {
        points,
        trucks,
        distance_matrix,
        horizon,
        containers,
        dumps: vec![PointIdx(1)],
        starting_points: vec![PointIdx(0)],
        cost_params: Default::default(),
        variant,
    };

    (problem, provider)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(
            fmt::layer()
                .with_span_events(fmt::format::FmtSpan::NEW | fmt::format::FmtSpan::CLOSE)
                .pretty(),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut run_config = RunConfig::from_env();
    if let Some(path) = args.get(1) {
        run_config.benchmark_path = Some(path.clone());
    }
    if let Some(tag) = args.get(2) {
        run_config.variant = tag.clone();
    }

    let variant = parse_variant(&run_config.variant);
    info!(variant = %run_config.variant, seed = run_config.seed, "starting irp-alns-solver");

    if let Some(path) = &run_config.benchmark_path {
        let span = span!(Level::INFO, "benchmark_load");
        let _guard = span.enter();
        match fs::read_to_string(path) {
            Ok(text) => match parse_benchmark_lines(BenchmarkFlavor::Christofides, &text) {
                Ok(records) => info!(
                    count = records.len(),
                    "parsed benchmark records (informational; engine still runs on the generated demo instance)"
                ),
                Err(e) => warn!(error = %e, "failed to parse benchmark file"),
            },
            Err(e) => warn!(error = %e, "failed to read benchmark file"),
        }
    }

    let (problem, provider) = demo_instance(variant, 8, 10);

    let engine_params = EngineParams::default();
    let penalty_params = PenaltyParams::default();
    let selector_params = SelectorParams::default();
    let rolling_params = RollingParams {
        rolling_horizon_length: 5,
        rollovers: 4,
    };

    {
        let setup_span = span!(Level::INFO, "setup");
        let _guard = setup_span.enter();
        info!(
            containers = problem.containers.len(),
            trucks = problem.trucks.len(),
            horizon = problem.horizon,
            "problem instance ready"
        );
    }

    let output = rolling::run(
        &problem,
        &provider,
        rolling_params,
        engine_params,
        penalty_params,
        selector_params,
        run_config.seed,
    )?;

    info!(
        total_day0_cost = output.total_day0_cost,
        rollovers = output.rollovers.len(),
        "rolling horizon complete"
    );

    println!("{}", "=== Rolling-Horizon Summary ===".bold().green());
    let mut writer = Writer::from_path("rolling_horizon_history.csv")?;
    writer.write_record(["rollover", "window_start", "window_len", "day0_cost", "iterations"])?;
    for record in &output.rollovers {
        println!(
            "{} {:>3}  window=[{:>3},{:>3})  day0_cost={:>10.2}  iterations={}",
            "rollover".cyan(),
            record.rollover,
            record.window_start,
            record.window_start + record.window_len,
            record.day0_cost,
            record.iterations
        );
        writer.write_record(&[
            record.rollover.to_string(),
            record.window_start.to_string(),
            record.window_len.to_string(),
            format!("{:.4}", record.day0_cost),
            record.iterations.to_string(),
        ])?;
    }
    writer.flush()?;
    println!("{} {:.2}", "total day-0 cost:".bold(), output.total_day0_cost);

    if let Some(record) = &output.final_schedule {
        let json = serde_json::to_string_pretty(record)?;
        fs::write("best_schedule.json", json)?;
        println!("{}", "wrote best_schedule.json".dimmed());
    }

    Ok(())
}
