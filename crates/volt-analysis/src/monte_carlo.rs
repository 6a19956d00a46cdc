//! Seeded Monte Carlo over unit price and operating cost.
//!
//! Each run draws independent uniform multipliers for price and costs,
//! re-projects the full cash-flow series and records its NPV. The same seed
//! always produces the same summary.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use volt_core::{
    require_non_negative, to_decimal, to_f64, Approximation, CalcError, EngineDefaults,
};
use volt_finance::returns::npv;
use volt_finance::scenario::shock_inputs;
use volt_finance::{InputShock, Projection, ProjectionInputs};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    pub runs: u32,
    pub seed: u64,
    /// Price multiplier is drawn from 1 +/- spread/100.
    pub price_spread_percent: Decimal,
    /// Cost multiplier is drawn from 1 +/- spread/100.
    pub cost_spread_percent: Decimal,
    pub discount_rate_percent: Decimal,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self::from_defaults(&EngineDefaults::default())
    }
}

impl MonteCarloConfig {
    pub fn from_defaults(defaults: &EngineDefaults) -> Self {
        Self {
            runs: defaults.monte_carlo_runs,
            seed: defaults.monte_carlo_seed,
            price_spread_percent: Decimal::from(20),
            cost_spread_percent: Decimal::from(20),
            discount_rate_percent: defaults.discount_rate_percent,
        }
    }

    fn validate(&self) -> Result<(), CalcError> {
        if self.runs == 0 {
            return Err(CalcError::invalid("runs", "must be >= 1"));
        }
        for (field, spread) in [
            ("price_spread_percent", self.price_spread_percent),
            ("cost_spread_percent", self.cost_spread_percent),
        ] {
            require_non_negative(field, spread)?;
            if spread >= Decimal::ONE_HUNDRED {
                return Err(CalcError::invalid(field, "must be < 100"));
            }
        }
        Ok(())
    }
}

/// NPV distribution statistics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloSummary {
    pub runs: u32,
    pub seed: u64,
    pub mean_npv: Decimal,
    pub p5_npv: Decimal,
    pub p50_npv: Decimal,
    pub p95_npv: Decimal,
    /// Share of runs with NPV < 0, in [0, 1].
    pub probability_of_loss: Decimal,
    pub approximation: Approximation,
}

fn draw(
    rng: &mut ChaCha8Rng,
    field: &'static str,
    spread_percent: Decimal,
) -> Result<Decimal, CalcError> {
    let spread = to_f64(field, spread_percent)? / 100.0;
    let u: f64 = rng.gen_range(-spread..=spread);
    Ok(to_decimal(field, 1.0 + u)?.round_dp(6))
}

/// Nearest-rank percentile of an ascending slice.
fn percentile(sorted: &[Decimal], pct: u32) -> Decimal {
    let n = sorted.len();
    let rank = (pct as usize * n).div_ceil(100).max(1);
    sorted[rank.min(n) - 1]
}

/// Run `config.runs` re-projections of `inputs` and summarize their NPVs.
pub fn simulate(
    inputs: &ProjectionInputs,
    config: &MonteCarloConfig,
) -> Result<MonteCarloSummary, CalcError> {
    config.validate()?;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut npvs = Vec::with_capacity(config.runs as usize);
    for _ in 0..config.runs {
        let shock = InputShock {
            price_multiplier: draw(&mut rng, "price_spread_percent", config.price_spread_percent)?,
            cost_multiplier: draw(&mut rng, "cost_spread_percent", config.cost_spread_percent)?,
        };
        let projection = Projection::new(shock_inputs(inputs, &shock)?)?;
        let series = projection.series()?;
        npvs.push(npv(
            &series,
            projection.initial_equity(),
            config.discount_rate_percent,
        )?);
    }

    let total = npvs
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
        .ok_or(CalcError::Overflow { field: "mean_npv" })?;
    let runs = Decimal::from(config.runs);
    let losses = npvs.iter().filter(|v| **v < Decimal::ZERO).count();
    npvs.sort();

    let summary = MonteCarloSummary {
        runs: config.runs,
        seed: config.seed,
        mean_npv: total / runs,
        p5_npv: percentile(&npvs, 5),
        p50_npv: percentile(&npvs, 50),
        p95_npv: percentile(&npvs, 95),
        probability_of_loss: Decimal::from(losses as u64) / runs,
        approximation: Approximation::SampledDistribution,
    };
    debug!(
        runs = summary.runs,
        seed = summary.seed,
        mean = %summary.mean_npv,
        p_loss = %summary.probability_of_loss,
        "monte carlo complete"
    );
    Ok(summary)
}
