//! Conservative / base / optimistic variants of a baseline result.
//!
//! [`project`] scales the baseline's ROI and NPV by a per-scenario multiplier.
//! That is a shortcut: a genuine scenario re-runs the whole projection with
//! shocked inputs, which [`reproject`] does.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use volt_core::{require_non_negative, Approximation, CalcError, Derived, ReturnMetrics};

use crate::cashflow::{Projection, ProjectionInputs};
use crate::mul;
use crate::returns::analyze;

/// Scenario name to output multiplier.
pub type ShockTable = BTreeMap<String, Decimal>;

/// Results keyed by scenario name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub results: BTreeMap<String, ReturnMetrics>,
    /// Set when results were scaled rather than re-projected.
    pub approximation: Option<Approximation>,
}

/// Multipliers on the inputs of a re-projected scenario.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputShock {
    pub price_multiplier: Decimal,
    pub cost_multiplier: Decimal,
}

impl InputShock {
    pub fn identity() -> Self {
        Self {
            price_multiplier: Decimal::ONE,
            cost_multiplier: Decimal::ONE,
        }
    }
}

/// conservative x0.8, base x1.0, optimistic x1.2.
pub fn standard_shocks() -> ShockTable {
    BTreeMap::from([
        ("conservative".to_string(), Decimal::new(8, 1)),
        ("base".to_string(), Decimal::ONE),
        ("optimistic".to_string(), Decimal::new(12, 1)),
    ])
}

/// Price shocked by the same factors as [`standard_shocks`], costs moving the
/// opposite way.
pub fn standard_input_shocks() -> BTreeMap<String, InputShock> {
    BTreeMap::from([
        (
            "conservative".to_string(),
            InputShock {
                price_multiplier: Decimal::new(8, 1),
                cost_multiplier: Decimal::new(12, 1),
            },
        ),
        ("base".to_string(), InputShock::identity()),
        (
            "optimistic".to_string(),
            InputShock {
                price_multiplier: Decimal::new(12, 1),
                cost_multiplier: Decimal::new(8, 1),
            },
        ),
    ])
}

/// Scale ROI and NPV of `baseline` by each multiplier. Other fields are copied.
pub fn project(baseline: &ReturnMetrics, shocks: &ShockTable) -> Result<ScenarioSet, CalcError> {
    let mut results = BTreeMap::new();
    for (name, &multiplier) in shocks {
        let mut scaled = baseline.clone();
        scaled.npv = mul("scenario_npv", baseline.npv, multiplier)?;
        scaled.roi_percent = match baseline.roi_percent.value() {
            Some(&roi) => Derived::Value(mul("scenario_roi", roi, multiplier)?),
            None => Derived::NotApplicable,
        };
        debug!(scenario = %name, %multiplier, npv = %scaled.npv, "scaled scenario");
        results.insert(name.clone(), scaled);
    }
    Ok(ScenarioSet {
        results,
        approximation: Some(Approximation::ScenarioScaling),
    })
}

/// Apply an input shock: unit price and first-year operating costs scaled.
pub fn shock_inputs(
    inputs: &ProjectionInputs,
    shock: &InputShock,
) -> Result<ProjectionInputs, CalcError> {
    require_non_negative("price_multiplier", shock.price_multiplier)?;
    require_non_negative("cost_multiplier", shock.cost_multiplier)?;
    let mut shocked = inputs.clone();
    shocked.energy.unit_price =
        mul("shock_price", inputs.energy.unit_price, shock.price_multiplier)?;
    shocked.costs.annual_amount =
        mul("shock_costs", inputs.costs.annual_amount, shock.cost_multiplier)?;
    Ok(shocked)
}

/// Re-run the full projection for each shocked input set.
pub fn reproject(
    inputs: &ProjectionInputs,
    shocks: &BTreeMap<String, InputShock>,
    discount_rate_percent: Decimal,
) -> Result<ScenarioSet, CalcError> {
    let mut results = BTreeMap::new();
    for (name, shock) in shocks {
        let projection = Projection::new(shock_inputs(inputs, shock)?)?;
        let metrics = analyze(&projection, discount_rate_percent)?;
        debug!(scenario = %name, npv = %metrics.npv, "re-projected scenario");
        results.insert(name.clone(), metrics);
    }
    Ok(ScenarioSet {
        results,
        approximation: None,
    })
}
