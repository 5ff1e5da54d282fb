//! Problem-data loaders (§6): a benchmark text-file reader with four
//! recognized flavors, and a relational `sqlx` skeleton. Neither is on
//! the engine's hot path; the engine only ever sees a `ProblemInstance`.

use std::error::Error;
use std::str::FromStr;

use dotenv::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use tracing::{info, warn};

use crate::errors::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchmarkFlavor {
    Christofides,
    Golden,
    CordeauDesrosiers,
    SolomonStyleVrp,
}

impl FromStr for BenchmarkFlavor {
    type Err = EngineError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "christofides" => Ok(BenchmarkFlavor::Christofides),
            "golden" => Ok(BenchmarkFlavor::Golden),
            "cordeau-desrosiers" | "cordeaudesrosiers" => Ok(BenchmarkFlavor::CordeauDesrosiers),
            "solomon" | "solomon-vrp" => Ok(BenchmarkFlavor::SolomonStyleVrp),
            other => Err(EngineError::InputInvalid(format!(
                "unrecognized benchmarkType tag: {other}"
            ))),
        }
    }
}

impl BenchmarkFlavor {
    /// Euclidean distances are integer-rounded for the two historically
    /// integer-coordinate formats; the VRP-with-dummy-horizon formats use
    /// a single-day (`horizon = 1`) instance.
    pub fn rounds_distances(self) -> bool {
        matches!(self, BenchmarkFlavor::Christofides | BenchmarkFlavor::Golden)
    }

    pub fn dummy_horizon(self) -> Option<usize> {
        match self {
            BenchmarkFlavor::SolomonStyleVrp => Some(1),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkRecord {
    pub id: String,
    pub coords: (f64, f64),
    pub demand: f64,
}

/// Whitespace-delimited benchmark line parser, tolerant of an optional
/// header line the way `read_customer_postals_from_csv` tolerates an
/// optional CSV header: the first line is skipped only if it does not
/// start with a token parseable as this flavor's id.
pub fn parse_benchmark_lines(flavor: BenchmarkFlavor, text: &str) -> EngineResult<Vec<BenchmarkRecord>> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let mut records = Vec::new();

    let first = lines.next();
    let mut pending = first;
    if let Some(line) = first {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 3 || tokens[1].parse::<f64>().is_err() {
            warn!("skipping non-numeric header line: {line}");
            pending = None;
        }
    }

    let rest = pending.into_iter().chain(lines);
    for line in rest {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 3 {
            return Err(EngineError::InputInvalid(format!(
                "benchmark line has fewer than 3 fields: {line}"
            )));
        }
        let x: f64 = tokens[1]
            .parse()
            .map_err(|_| EngineError::InputInvalid(format!("non-numeric x in line: {line}")))?;
        let y: f64 = tokens[2]
            .parse()
            .map_err(|_| EngineError::InputInvalid(format!("non-numeric y in line: {line}")))?;
        let (x, y) = if flavor.rounds_distances() {
            (x.round(), y.round())
        } else {
            (x, y)
        };
        let demand = tokens.get(3).and_then(|t| t.parse().ok()).unwrap_or(0.0);
        records.push(BenchmarkRecord {
            id: tokens[0].to_string(),
            coords: (x, y),
            demand,
        });
    }

    Ok(records)
}

/// Relational problem-data source, mirroring `database/sqlx.rs`'s
/// connect-and-migrate pattern. Out of scope for the core engine (§6);
/// exercised by one integration test against an in-memory database.
pub async fn connect(database_url: &str) -> Result<SqlitePool, Box<dyn Error>> {
    dotenv().ok();
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await?;
    info!("connected to relational problem-data source at {database_url}");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS containers (
            id TEXT PRIMARY KEY,
            nominal_volume REAL NOT NULL,
            policy_fraction REAL NOT NULL,
            initial_level_pct REAL NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await?;

    Ok(pool)
}

pub async fn container_count(pool: &SqlitePool) -> Result<i64, Box<dyn Error>> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM containers")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}
