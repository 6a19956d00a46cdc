//! Energy revenue for generation and hosting assets.

use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use tracing::debug;
use volt_core::{
    percent_to_fraction, require_growth_rate, validate_costs, validate_energy, CalcError,
    EnergyAssumptions, OperatingCosts, RevenueMode,
};

use crate::{mul, sub};

const KW_PER_MW: i64 = 1000;

/// First-year energy figures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnualEnergy {
    /// Energy sold in kWh.
    pub kwh: Decimal,
    /// Gross revenue in USD.
    pub revenue: Decimal,
    /// Purchased power in USD; zero for generation.
    pub energy_cost: Decimal,
}

impl AnnualEnergy {
    /// Revenue minus purchased power.
    pub fn margin(&self) -> Decimal {
        self.revenue - self.energy_cost
    }

    /// Same figures with price escalation applied for the given year.
    pub fn escalated(&self, escalation_percent: Decimal, year: u32) -> Result<Self, CalcError> {
        let factor = escalation_factor(escalation_percent, year)?;
        Ok(Self {
            kwh: self.kwh,
            revenue: mul("escalated_revenue", self.revenue, factor)?,
            energy_cost: mul("escalated_energy_cost", self.energy_cost, factor)?,
        })
    }
}

/// Project first-year revenue.
///
/// Generation: capacity_mw * unit_price * hours * capacity_factor.
/// Hosting: kWh = capacity_mw * 1000 * utilization/100 * hours; revenue is
/// kWh at the hosting rate and cost is kWh at the purchase rate.
pub fn project_annual_revenue(energy: &EnergyAssumptions) -> Result<AnnualEnergy, CalcError> {
    validate_energy(energy)?;
    let hours = Decimal::from(energy.hours_per_year);
    let out = match energy.mode {
        RevenueMode::Generation => {
            let mwh = mul("generation_mwh", energy.capacity_mw, hours)?;
            let mwh = mul("generation_mwh", mwh, energy.capacity_factor)?;
            AnnualEnergy {
                kwh: mul("generation_kwh", mwh, Decimal::from(KW_PER_MW))?,
                revenue: mul("generation_revenue", mwh, energy.unit_price)?,
                energy_cost: Decimal::ZERO,
            }
        }
        RevenueMode::Hosting => {
            let kwh = hosted_kwh(energy)?;
            AnnualEnergy {
                kwh,
                revenue: mul("hosting_revenue", kwh, energy.unit_price)?,
                energy_cost: mul("hosting_energy_cost", kwh, energy.purchase_rate_per_kwh)?,
            }
        }
    };
    debug!(mode = ?energy.mode, revenue = %out.revenue, energy_cost = %out.energy_cost, "annual energy");
    Ok(out)
}

/// Revenue per unit of `unit_price` in the first year.
///
/// Revenue is linear in price, so this is the slope used by break-even solves.
pub fn price_sensitivity(energy: &EnergyAssumptions) -> Result<Decimal, CalcError> {
    validate_energy(energy)?;
    let hours = Decimal::from(energy.hours_per_year);
    match energy.mode {
        RevenueMode::Generation => {
            let mwh = mul("price_sensitivity", energy.capacity_mw, hours)?;
            mul("price_sensitivity", mwh, energy.capacity_factor)
        }
        RevenueMode::Hosting => hosted_kwh(energy),
    }
}

fn hosted_kwh(energy: &EnergyAssumptions) -> Result<Decimal, CalcError> {
    let kw = mul("hosted_kwh", energy.capacity_mw, Decimal::from(KW_PER_MW))?;
    let kw = mul(
        "hosted_kwh",
        kw,
        percent_to_fraction(energy.utilization_percent),
    )?;
    mul("hosted_kwh", kw, Decimal::from(energy.hours_per_year))
}

/// Compounding factor (1 + pct/100)^(year - 1) for a 1-based year.
pub fn escalation_factor(percent: Decimal, year: u32) -> Result<Decimal, CalcError> {
    require_growth_rate("escalation_percent", percent)?;
    if year == 0 {
        return Err(CalcError::invalid("year", "years are 1-based"));
    }
    (Decimal::ONE + percent_to_fraction(percent))
        .checked_powu(u64::from(year - 1))
        .ok_or(CalcError::Overflow {
            field: "escalation_factor",
        })
}

/// Escalate a first-year amount to the given year.
pub fn escalate(base: Decimal, percent: Decimal, year: u32) -> Result<Decimal, CalcError> {
    mul("escalate", base, escalation_factor(percent, year)?)
}

/// Operating costs for the given year, inflated at their own rate.
pub fn escalated_costs(costs: &OperatingCosts, year: u32) -> Result<Decimal, CalcError> {
    validate_costs(costs)?;
    escalate(costs.annual_amount, costs.inflation_percent, year)
}

/// First-year hosting margin: revenue minus purchased power.
pub fn hosting_margin(energy: &EnergyAssumptions) -> Result<Decimal, CalcError> {
    if energy.mode != RevenueMode::Hosting {
        return Err(CalcError::invalid("mode", "hosting margin needs hosting mode"));
    }
    let annual = project_annual_revenue(energy)?;
    sub("hosting_margin", annual.revenue, annual.energy_cost)
}
