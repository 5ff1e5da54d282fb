//! Forecast provider (§6): the out-of-scope collaborator that supplies
//! per-container demand forecasts and tail-probability tables. Only the
//! numeric interface in `ForecastProvider` is consumed by Problem Data and
//! the rolling-horizon driver; how the numbers are produced is someone
//! else's concern.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, trace};

use crate::domain::point::TailProbabilityTables;
use crate::errors::{EngineError, EngineResult};

const FORECAST_SENTINEL: f64 = -404.0;

pub trait ForecastProvider {
    fn error_sigma(&self, container_id: &str) -> f64;
    fn init_level(&self, container_id: &str) -> EngineResult<f64>;
    fn forecast_level_demands(&self, horizon: usize, container_id: &str) -> EngineResult<Vec<f64>>;
    /// Pr(X >= a), X ~ N(0, sigma^2).
    fn unconditional_probability(&self, container_id: &str, a: f64) -> f64;
    /// Pr(X + Y >= a - d_h | X < a), X ~ N(0, (h-k)*sigma^2), Y ~ N(0, sigma^2).
    fn conditional_probability(
        &self,
        container_id: &str,
        a: f64,
        d_h: f64,
        h_minus_k: usize,
    ) -> f64;
}

fn check_sentinel(id: &str, values: &[f64]) -> EngineResult<()> {
    if values.iter().any(|&v| v == FORECAST_SENTINEL) {
        return Err(EngineError::InputInvalid(format!(
            "container {id} forecast array contains sentinel -404"
        )));
    }
    Ok(())
}

/// Survival function of the standard normal, `Pr(Z >= z)`, via the
/// Abramowitz-Stegun rational approximation to `erfc` (accurate to ~1e-7,
/// plenty for a heuristic's soft-constraint pricing).
fn standard_normal_sf(z: f64) -> f64 {
    0.5 * erfc(z / std::f64::consts::SQRT_2)
}

fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let tau = t
        * (-z * z - 1.26551223
            + t * (1.00002368
                + t * (0.37409196
                    + t * (0.09678418
                        + t * (-0.18628806
                            + t * (0.27886807
                                + t * (-1.13520398
                                    + t * (1.48851587
                                        + t * (-0.82215223 + t * 0.17087277)))))))))
        .exp();
    if x >= 0.0 {
        tau
    } else {
        2.0 - tau
    }
}

/// Builds the tail-probability tables for one container (§4.2) from a
/// provider's numeric interface, given its demand-error sigma, horizon,
/// and fixed overflow threshold `a` (the container's effective volume).
pub fn build_tail_tables(
    provider: &dyn ForecastProvider,
    container_id: &str,
    horizon: usize,
    a: f64,
    demand_level: &[f64],
) -> EngineResult<TailProbabilityTables> {
    check_sentinel(container_id, demand_level)?;

    let mut tables = TailProbabilityTables::new(horizon);
    tables.u_start = provider.unconditional_probability(container_id, a);
    for day in 1..=horizon {
        tables.u_zero[day] = provider.unconditional_probability(container_id, a);
        tables.c_start[day] = provider.conditional_probability(container_id, a, 0.0, day);
        for h_minus_k in 1..=day {
            let d_h: f64 = demand_level
                .get(day.saturating_sub(h_minus_k)..day)
                .map(|slice| slice.iter().sum())
                .unwrap_or(0.0);
            tables.c_zero[day][h_minus_k] =
                provider.conditional_probability(container_id, a, d_h, h_minus_k);
        }
    }
    if !tables.is_consistent() {
        return Err(EngineError::InputInvalid(format!(
            "container {container_id} produced inconsistent tail-probability tables"
        )));
    }
    Ok(tables)
}

/// In-memory provider used by unit/integration tests and by small
/// benchmark-driven runs: every quantity is held directly rather than
/// fetched, with the rolling variant's "sigma as a constant" shortcut from
/// §6 baked in as the sole source of randomness.
#[derive(Debug, Clone, Default)]
pub struct StaticForecastProvider {
    sigma: HashMap<String, f64>,
    init_level: HashMap<String, f64>,
    demands: HashMap<String, Vec<f64>>,
}

impl StaticForecastProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(
        mut self,
        container_id: impl Into<String>,
        sigma: f64,
        init_level: f64,
        demands: Vec<f64>,
    ) -> Self {
        let id = container_id.into();
        self.sigma.insert(id.clone(), sigma);
        self.init_level.insert(id.clone(), init_level);
        self.demands.insert(id, demands);
        self
    }
}

impl ForecastProvider for StaticForecastProvider {
    fn error_sigma(&self, container_id: &str) -> f64 {
        self.sigma.get(container_id).copied().unwrap_or(0.0)
    }

    fn init_level(&self, container_id: &str) -> EngineResult<f64> {
        self.init_level
            .get(container_id)
            .copied()
            .ok_or_else(|| EngineError::InputInvalid(format!("no init level for {container_id}")))
    }

    fn forecast_level_demands(&self, horizon: usize, container_id: &str) -> EngineResult<Vec<f64>> {
        let demands = self
            .demands
            .get(container_id)
            .ok_or_else(|| EngineError::InputInvalid(format!("no demands for {container_id}")))?;
        check_sentinel(container_id, demands)?;
        let mut out = demands.clone();
        out.resize(horizon, *demands.last().unwrap_or(&0.0));
        Ok(out)
    }

    fn unconditional_probability(&self, container_id: &str, a: f64) -> f64 {
        let sigma = self.error_sigma(container_id);
        if sigma <= 0.0 {
            return 0.0;
        }
        standard_normal_sf(a / sigma)
    }

    fn conditional_probability(
        &self,
        container_id: &str,
        a: f64,
        d_h: f64,
        h_minus_k: usize,
    ) -> f64 {
        let sigma = self.error_sigma(container_id);
        if sigma <= 0.0 || h_minus_k == 0 {
            return 0.0;
        }
        let combined_sigma = sigma * (h_minus_k as f64).sqrt();
        standard_normal_sf((a - d_h) / combined_sigma)
    }
}

#[derive(Debug, Deserialize)]
struct RemoteForecastResponse {
    error_sigma: f64,
    init_level: f64,
    demands: Vec<f64>,
}

/// Fetches tables from a remote numeric service, one request per
/// container batched through `join_all` the way the teacher's
/// `create_dm_google` batches distance-matrix cells.
pub struct HttpForecastProvider {
    client: Arc<Client>,
    base_url: String,
    cache: HashMap<String, RemoteForecastResponse>,
}

impl HttpForecastProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpForecastProvider {
            client: Arc::new(Client::new()),
            base_url: base_url.into(),
            cache: HashMap::new(),
        }
    }

    pub async fn prefetch(&mut self, container_ids: &[String]) -> EngineResult<()> {
        let tasks = container_ids.iter().cloned().map(|id| {
            let client = Arc::clone(&self.client);
            let url = format!("{}/containers/{}/forecast", self.base_url, id);
            async move {
                trace!("fetching forecast for {id} from {url}");
                let resp = client.get(&url).send().await;
                (id, resp)
            }
        });

        let results = join_all(tasks).await;
        for (id, resp) in results {
            match resp {
                Ok(r) if r.status().is_success() => match r.json::<RemoteForecastResponse>().await {
                    Ok(parsed) => {
                        debug!("forecast fetched for {id}");
                        self.cache.insert(id, parsed);
                    }
                    Err(e) => error!("forecast response for {id} failed to parse: {e}"),
                },
                Ok(r) => error!("forecast fetch for {id} returned HTTP {}", r.status()),
                Err(e) => error!("forecast fetch for {id} failed: {e}"),
            }
        }
        Ok(())
    }
}

impl ForecastProvider for HttpForecastProvider {
    fn error_sigma(&self, container_id: &str) -> f64 {
        self.cache.get(container_id).map(|r| r.error_sigma).unwrap_or(0.0)
    }

    fn init_level(&self, container_id: &str) -> EngineResult<f64> {
        self.cache
            .get(container_id)
            .map(|r| r.init_level)
            .ok_or_else(|| EngineError::InputInvalid(format!("forecast not prefetched for {container_id}")))
    }

    fn forecast_level_demands(&self, horizon: usize, container_id: &str) -> EngineResult<Vec<f64>> {
        let entry = self
            .cache
            .get(container_id)
            .ok_or_else(|| EngineError::InputInvalid(format!("forecast not prefetched for {container_id}")))?;
        check_sentinel(container_id, &entry.demands)?;
        let mut out = entry.demands.clone();
        out.resize(horizon, *out.last().unwrap_or(&0.0));
        Ok(out)
    }

    fn unconditional_probability(&self, container_id: &str, a: f64) -> f64 {
        let sigma = self.error_sigma(container_id);
        if sigma <= 0.0 {
            return 0.0;
        }
        standard_normal_sf(a / sigma)
    }

    fn conditional_probability(
        &self,
        container_id: &str,
        a: f64,
        d_h: f64,
        h_minus_k: usize,
    ) -> f64 {
        let sigma = self.error_sigma(container_id);
        if sigma <= 0.0 || h_minus_k == 0 {
            return 0.0;
        }
        let combined_sigma = sigma * (h_minus_k as f64).sqrt();
        standard_normal_sf((a - d_h) / combined_sigma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconditional_probability_is_monotone_decreasing_in_a() {
        let provider = StaticForecastProvider::new().with_container(
            "c0",
            5.0,
            50.0,
            vec![10.0; 7],
        );
        let low = provider.unconditional_probability("c0", 1.0);
        let high = provider.unconditional_probability("c0", 10.0);
        assert!(low > high);
    }

    #[test]
    fn zero_sigma_gives_zero_probability() {
        let provider = StaticForecastProvider::new().with_container("c0", 0.0, 50.0, vec![10.0; 7]);
        assert_eq!(provider.unconditional_probability("c0", 5.0), 0.0);
    }

    #[test]
    fn build_tail_tables_rejects_sentinel_demand() {
        let provider = StaticForecastProvider::new().with_container(
            "c0",
            5.0,
            50.0,
            vec![10.0, -404.0, 10.0],
        );
        let demands = provider.forecast_level_demands(3, "c0");
        assert!(demands.is_err());
    }

    #[test]
    fn build_tail_tables_produces_consistent_tables() {
        let provider = StaticForecastProvider::new().with_container(
            "c0",
            5.0,
            50.0,
            vec![10.0; 7],
        );
        let demands = provider.forecast_level_demands(7, "c0").unwrap();
        let tables = build_tail_tables(&provider, "c0", 7, 30.0, &demands).unwrap();
        assert!(tables.is_consistent());
    }
}
