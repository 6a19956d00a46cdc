//! Multi-year cash-flow projection.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use volt_core::{
    percent_to_fraction, require_percent, validate_costs, validate_horizon, validate_loan,
    CalcError, CashFlowYear, EnergyAssumptions, LoanTerms, OperatingCosts,
};

use crate::amortization::monthly_payment;
use crate::revenue::{escalated_costs, project_annual_revenue, AnnualEnergy};
use crate::{add, mul, sub};

/// Everything a projection is computed from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectionInputs {
    /// Purchase price, rate and term. The financed amount is the price less
    /// the down payment.
    pub loan: LoanTerms,
    /// Equity share of the purchase price, [0, 100].
    pub down_payment_percent: Decimal,
    pub energy: EnergyAssumptions,
    pub costs: OperatingCosts,
    pub horizon_years: u32,
}

/// Validated projection with its year-independent figures precomputed.
///
/// Iterating is cheap and always yields the same series for the same inputs.
#[derive(Clone, Debug)]
pub struct Projection {
    inputs: ProjectionInputs,
    initial_equity: Decimal,
    financed: Decimal,
    monthly_payment: Decimal,
    base_energy: AnnualEnergy,
}

impl Projection {
    pub fn new(inputs: ProjectionInputs) -> Result<Self, CalcError> {
        validate_loan(&inputs.loan)?;
        require_percent("down_payment_percent", inputs.down_payment_percent)?;
        validate_costs(&inputs.costs)?;
        validate_horizon(inputs.horizon_years)?;

        let initial_equity = mul(
            "initial_equity",
            inputs.loan.principal,
            percent_to_fraction(inputs.down_payment_percent),
        )?;
        let financed = sub("financed", inputs.loan.principal, initial_equity)?;
        let monthly_payment = monthly_payment(
            financed,
            inputs.loan.annual_rate_percent,
            inputs.loan.term_years,
        )?;
        let base_energy = project_annual_revenue(&inputs.energy)?;
        debug!(
            %initial_equity,
            %financed,
            %monthly_payment,
            horizon = inputs.horizon_years,
            "projection ready"
        );
        Ok(Self {
            inputs,
            initial_equity,
            financed,
            monthly_payment,
            base_energy,
        })
    }

    pub fn inputs(&self) -> &ProjectionInputs {
        &self.inputs
    }

    pub fn initial_equity(&self) -> Decimal {
        self.initial_equity
    }

    pub fn financed_amount(&self) -> Decimal {
        self.financed
    }

    pub fn monthly_payment(&self) -> Decimal {
        self.monthly_payment
    }

    pub fn base_energy(&self) -> &AnnualEnergy {
        &self.base_energy
    }

    pub fn energy(&self) -> &EnergyAssumptions {
        &self.inputs.energy
    }

    /// Loan payments made in the given year; zero after the term ends.
    pub fn debt_service(&self, year: u32) -> Result<Decimal, CalcError> {
        if year == 0 || year > self.inputs.loan.term_years {
            return Ok(Decimal::ZERO);
        }
        mul("debt_service", self.monthly_payment, Decimal::from(12))
    }

    /// Escalated energy figures and operating costs for the given year.
    pub fn year_figures(&self, year: u32) -> Result<(AnnualEnergy, Decimal), CalcError> {
        let energy = self
            .base_energy
            .escalated(self.inputs.energy.escalation_percent, year)?;
        let opex = escalated_costs(&self.inputs.costs, year)?;
        Ok((energy, opex))
    }

    /// Lazy iterator over the series, starting at year 1.
    pub fn iter(&self) -> CashFlowIter<'_> {
        CashFlowIter {
            projection: self,
            next_year: 1,
            cumulative: -self.initial_equity,
            done: false,
        }
    }

    /// Collect the full series.
    pub fn series(&self) -> Result<Vec<CashFlowYear>, CalcError> {
        self.iter().collect()
    }
}

/// Yields one [`CashFlowYear`] per horizon year. Stops after the first error.
#[derive(Clone, Debug)]
pub struct CashFlowIter<'a> {
    projection: &'a Projection,
    next_year: u32,
    cumulative: Decimal,
    done: bool,
}

impl CashFlowIter<'_> {
    fn step(&mut self, year: u32) -> Result<CashFlowYear, CalcError> {
        let (energy, opex) = self.projection.year_figures(year)?;
        let debt_service = self.projection.debt_service(year)?;
        let costs = add("year_costs", energy.energy_cost, opex)?;
        let period = sub("period_cash_flow", energy.revenue, costs)?;
        let period = sub("period_cash_flow", period, debt_service)?;
        self.cumulative = add("cumulative_cash_flow", self.cumulative, period)?;
        Ok(CashFlowYear {
            year,
            revenue: energy.revenue,
            costs,
            debt_service,
            period_cash_flow: period,
            cumulative_cash_flow: self.cumulative,
        })
    }
}

impl Iterator for CashFlowIter<'_> {
    type Item = Result<CashFlowYear, CalcError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.next_year > self.projection.inputs.horizon_years {
            return None;
        }
        let year = self.next_year;
        self.next_year += 1;
        let item = self.step(year);
        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        let left = (self.projection.inputs.horizon_years + 1).saturating_sub(self.next_year);
        (0, Some(left as usize))
    }
}

/// Build the cash-flow series for the given inputs.
pub fn project(
    loan: LoanTerms,
    down_payment_percent: Decimal,
    energy: EnergyAssumptions,
    costs: OperatingCosts,
    horizon_years: u32,
) -> Result<Vec<CashFlowYear>, CalcError> {
    Projection::new(ProjectionInputs {
        loan,
        down_payment_percent,
        energy,
        costs,
        horizon_years,
    })?
    .series()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;
    use volt_core::RevenueMode;

    pub(crate) fn listing_inputs() -> ProjectionInputs {
        ProjectionInputs {
            loan: LoanTerms {
                principal: Decimal::from(5_000_000),
                annual_rate_percent: Decimal::new(45, 1),
                term_years: 20,
            },
            down_payment_percent: Decimal::from(20),
            energy: EnergyAssumptions {
                mode: RevenueMode::Generation,
                capacity_mw: Decimal::from(50),
                utilization_percent: Decimal::ONE_HUNDRED,
                unit_price: Decimal::from(75),
                purchase_rate_per_kwh: Decimal::ZERO,
                escalation_percent: Decimal::from(2),
                capacity_factor: Decimal::new(25, 2),
                hours_per_year: 8760,
            },
            costs: OperatingCosts {
                annual_amount: Decimal::from(50_000),
                inflation_percent: Decimal::from(3),
            },
            horizon_years: 25,
        }
    }

    #[test]
    fn listing_example_equity_and_payment() {
        let p = Projection::new(listing_inputs()).unwrap();
        assert_eq!(p.initial_equity(), Decimal::from(1_000_000));
        assert_eq!(p.financed_amount(), Decimal::from(4_000_000));
        assert_eq!(p.monthly_payment().round_dp(2), Decimal::new(2_530_598, 2));
    }

    #[test]
    fn first_year_cash_flow() {
        let p = Projection::new(listing_inputs()).unwrap();
        let y1 = p.iter().next().unwrap().unwrap();
        assert_eq!(y1.year, 1);
        assert_eq!(y1.revenue, Decimal::from(8_212_500));
        assert_eq!(y1.costs, Decimal::from(50_000));
        assert_eq!(y1.debt_service, p.monthly_payment() * Decimal::from(12));
        assert_eq!(
            y1.period_cash_flow,
            y1.revenue - y1.costs - y1.debt_service
        );
        assert_eq!(
            y1.cumulative_cash_flow,
            y1.period_cash_flow - Decimal::from(1_000_000)
        );
    }

    #[test]
    fn debt_service_stops_after_term() {
        let series = Projection::new(listing_inputs()).unwrap().series().unwrap();
        assert_eq!(series.len(), 25);
        assert!(series[19].debt_service > Decimal::ZERO);
        assert_eq!(series[20].debt_service, Decimal::ZERO);
        assert!(series[20].period_cash_flow > series[19].period_cash_flow);
    }

    #[test]
    fn iteration_is_restartable() {
        let p = Projection::new(listing_inputs()).unwrap();
        let a = p.series().unwrap();
        let b: Vec<_> = p.iter().collect::<Result<_, _>>().unwrap();
        assert_eq!(a, b);
        let again = project(
            listing_inputs().loan,
            Decimal::from(20),
            listing_inputs().energy,
            listing_inputs().costs,
            25,
        )
        .unwrap();
        assert_eq!(a, again);
    }

    #[test]
    fn hosting_costs_include_purchased_power() {
        let mut inputs = listing_inputs();
        inputs.energy.mode = RevenueMode::Hosting;
        inputs.energy.capacity_mw = Decimal::from(10);
        inputs.energy.utilization_percent = Decimal::from(80);
        inputs.energy.unit_price = Decimal::new(7, 2);
        inputs.energy.purchase_rate_per_kwh = Decimal::new(4, 2);
        inputs.energy.escalation_percent = Decimal::ZERO;
        let y1 = Projection::new(inputs).unwrap().iter().next().unwrap().unwrap();
        assert_eq!(y1.revenue, Decimal::from(4_905_600));
        assert_eq!(y1.costs, Decimal::from(2_803_200 + 50_000));
    }

    #[test]
    fn invalid_inputs_fail_before_iterating() {
        let mut inputs = listing_inputs();
        inputs.horizon_years = 0;
        assert!(Projection::new(inputs).is_err());
        let mut inputs = listing_inputs();
        inputs.down_payment_percent = Decimal::from(120);
        assert!(Projection::new(inputs).is_err());
        let mut inputs = listing_inputs();
        inputs.costs.annual_amount = Decimal::from(-5);
        assert!(Projection::new(inputs).is_err());
    }

    #[test]
    fn full_equity_purchase_has_no_debt() {
        let mut inputs = listing_inputs();
        inputs.down_payment_percent = Decimal::ONE_HUNDRED;
        let series = Projection::new(inputs).unwrap().series().unwrap();
        assert!(series.iter().all(|y| y.debt_service.is_zero()));
    }

    #[test]
    fn inputs_load_from_yaml_with_defaults() {
        let yaml = r#"
loan:
  principal: 5000000
  annual_rate_percent: 4.5
  term_years: 20
down_payment_percent: 20
energy:
  mode: generation
  capacity_mw: 50
  unit_price: 75
  escalation_percent: 2
costs:
  annual_amount: 50000
  inflation_percent: 3
horizon_years: 25
"#;
        let parsed: ProjectionInputs = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed, listing_inputs());
    }

    proptest! {
        #[test]
        fn cumulative_is_running_sum(
            price in 1_000_000i64..50_000_000,
            down in 0i64..=100,
            mw in 1i64..200,
            unit in 10i64..200,
            esc in -5i64..10,
            horizon in 1u32..=50,
        ) {
            let mut inputs = listing_inputs();
            inputs.loan.principal = Decimal::from(price);
            inputs.down_payment_percent = Decimal::from(down);
            inputs.energy.capacity_mw = Decimal::from(mw);
            inputs.energy.unit_price = Decimal::from(unit);
            inputs.energy.escalation_percent = Decimal::from(esc);
            inputs.horizon_years = horizon;
            let p = Projection::new(inputs).unwrap();
            let series = p.series().unwrap();
            prop_assert_eq!(series.len(), horizon as usize);
            let mut running = -p.initial_equity();
            for (i, y) in series.iter().enumerate() {
                prop_assert_eq!(y.year, i as u32 + 1);
                running += y.period_cash_flow;
                prop_assert_eq!(y.cumulative_cash_flow, running);
            }
        }
    }
}
