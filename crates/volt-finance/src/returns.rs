//! Return metrics derived from a cash-flow series.

use rust_decimal::Decimal;
use tracing::{debug, warn};
use volt_core::{
    percent_to_fraction, require_percent, Approximation, CalcError, CashFlowYear, Derived,
    Payback, ReturnMetrics,
};

use crate::cashflow::Projection;
use crate::irr::equity_irr;
use crate::revenue::{escalation_factor, price_sensitivity};
use crate::{add, mul, sub};

/// ((sum of period cash flows) - equity) / equity * 100.
pub fn roi_percent(series: &[CashFlowYear], initial_equity: Decimal) -> Derived<Decimal> {
    if initial_equity.is_zero() {
        return Derived::NotApplicable;
    }
    let total: Option<Decimal> = series
        .iter()
        .try_fold(Decimal::ZERO, |acc, y| acc.checked_add(y.period_cash_flow));
    total
        .and_then(|t| t.checked_sub(initial_equity))
        .and_then(|gain| gain.checked_div(initial_equity))
        .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
        .into()
}

/// Net present value: sum of cf[i] / (1 + d)^(i+1), minus the equity.
pub fn npv(
    series: &[CashFlowYear],
    initial_equity: Decimal,
    discount_rate_percent: Decimal,
) -> Result<Decimal, CalcError> {
    require_percent("discount_rate_percent", discount_rate_percent)?;
    let step = Decimal::ONE + percent_to_fraction(discount_rate_percent);
    let mut factor = Decimal::ONE;
    let mut total = Decimal::ZERO;
    for y in series {
        factor = mul("npv", factor, step)?;
        let pv = y
            .period_cash_flow
            .checked_div(factor)
            .ok_or(CalcError::Overflow { field: "npv" })?;
        total = add("npv", total, pv)?;
    }
    sub("npv", total, initial_equity)
}

/// First year whose cumulative cash is strictly positive.
pub fn payback(series: &[CashFlowYear]) -> Payback {
    series
        .iter()
        .find(|y| y.cumulative_cash_flow > Decimal::ZERO)
        .map(|y| Payback::Year(y.year))
        .unwrap_or(Payback::NotWithinHorizon)
}

/// Period cash flow as a share of revenue, in percent.
pub fn profit_margin_percent(year: &CashFlowYear) -> Derived<Decimal> {
    if year.revenue.is_zero() {
        warn!(year = year.year, "profit margin not applicable: zero revenue");
        return Derived::NotApplicable;
    }
    year.period_cash_flow
        .checked_div(year.revenue)
        .and_then(|m| m.checked_mul(Decimal::ONE_HUNDRED))
        .into()
}

/// Lowest (revenue - costs) / debt service over years that carry debt.
pub fn min_dscr(series: &[CashFlowYear]) -> Derived<Decimal> {
    let lowest = series
        .iter()
        .filter(|y| y.debt_service > Decimal::ZERO)
        .filter_map(|y| (y.revenue - y.costs).checked_div(y.debt_service))
        .min();
    if lowest.is_none() {
        warn!(years = series.len(), "dscr not applicable: no debt service");
    }
    lowest.into()
}

/// Unit price at which the given year's period cash flow is zero.
///
/// Revenue is linear in price, so the solve is closed-form:
/// price = (costs + debt service) / (revenue per unit price).
pub fn break_even_unit_price(
    projection: &Projection,
    year: u32,
) -> Result<Derived<Decimal>, CalcError> {
    let energy = projection.energy();
    let slope = mul(
        "break_even_unit_price",
        price_sensitivity(energy)?,
        escalation_factor(energy.escalation_percent, year)?,
    )?;
    if slope.is_zero() {
        warn!(year, "break-even price undefined: revenue does not depend on price");
        return Ok(Derived::NotApplicable);
    }
    let (annual, opex) = projection.year_figures(year)?;
    let needed = add("break_even_unit_price", annual.energy_cost, opex)?;
    let needed = add("break_even_unit_price", needed, projection.debt_service(year)?)?;
    Ok(needed.checked_div(slope).into())
}

/// Break-even price from a series year and the unit price it was built with.
///
/// Revenue is proportional to price, so
/// price = unit_price * (costs + debt service) / revenue.
pub fn break_even_from_year(year: &CashFlowYear, unit_price: Decimal) -> Derived<Decimal> {
    if year.revenue.is_zero() {
        warn!(year = year.year, "break-even price undefined: zero revenue");
        return Derived::NotApplicable;
    }
    year.costs
        .checked_add(year.debt_service)
        .and_then(|needed| needed.checked_mul(unit_price))
        .and_then(|v| v.checked_div(year.revenue))
        .into()
}

/// Metrics computable from the series alone.
///
/// The series does not carry the unit price, so `break_even_unit_price`
/// is left `NotApplicable`. Use [`break_even_from_year`] when the price is
/// known, or [`analyze`] when a projection is at hand.
pub fn summarize(
    series: &[CashFlowYear],
    initial_equity: Decimal,
    discount_rate_percent: Decimal,
) -> Result<ReturnMetrics, CalcError> {
    let metrics = ReturnMetrics {
        roi_percent: roi_percent(series, initial_equity),
        npv: npv(series, initial_equity, discount_rate_percent)?,
        payback: payback(series),
        break_even_unit_price: Derived::NotApplicable,
        profit_margin_percent: series
            .first()
            .map(profit_margin_percent)
            .unwrap_or(Derived::NotApplicable),
        irr_percent: equity_irr(initial_equity, series),
        min_dscr: min_dscr(series),
        approximations: Vec::new(),
    };
    if !metrics.roi_percent.is_applicable() {
        warn!("roi not applicable: zero initial equity");
    }
    debug!(
        npv = %metrics.npv,
        roi = %metrics.roi_percent,
        payback = %metrics.payback,
        "series summarized"
    );
    Ok(metrics)
}

/// Full metrics for a projection, including the year-1 break-even price.
pub fn analyze(
    projection: &Projection,
    discount_rate_percent: Decimal,
) -> Result<ReturnMetrics, CalcError> {
    let series = projection.series()?;
    let mut metrics = summarize(&series, projection.initial_equity(), discount_rate_percent)?;
    metrics.break_even_unit_price = break_even_unit_price(projection, 1)?;
    if metrics.break_even_unit_price.is_applicable() {
        metrics.approximations.push(Approximation::LinearBreakEven);
    }
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cashflow::tests::listing_inputs;
    use crate::cashflow::ProjectionInputs;
    use proptest::prelude::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn warnings_during(f: impl FnOnce()) -> String {
        let out = Captured::default();
        let writer = out.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = out.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    fn year(year: u32, revenue: i64, costs: i64, debt: i64, cumulative: i64) -> CashFlowYear {
        CashFlowYear {
            year,
            revenue: Decimal::from(revenue),
            costs: Decimal::from(costs),
            debt_service: Decimal::from(debt),
            period_cash_flow: Decimal::from(revenue - costs - debt),
            cumulative_cash_flow: Decimal::from(cumulative),
        }
    }

    #[test]
    fn roi_and_npv_of_flat_series() {
        // equity 1000, three years of +500
        let series = vec![
            year(1, 600, 100, 0, -500),
            year(2, 600, 100, 0, 0),
            year(3, 600, 100, 0, 500),
        ];
        let equity = Decimal::from(1000);
        assert_eq!(roi_percent(&series, equity), Derived::Value(Decimal::from(50)));
        let at_zero = npv(&series, equity, Decimal::ZERO).unwrap();
        assert_eq!(at_zero, Decimal::from(500));
        let at_ten = npv(&series, equity, Decimal::from(10)).unwrap();
        // 500 * 2.486852 - 1000
        assert_eq!(at_ten.round_dp(2), Decimal::new(24343, 2));
    }

    #[test]
    fn payback_is_first_strictly_positive_year() {
        let series = vec![
            year(1, 600, 100, 0, -500),
            year(2, 600, 100, 0, 0),
            year(3, 600, 100, 0, 500),
        ];
        assert_eq!(payback(&series), Payback::Year(3));
        assert_eq!(payback(&series[..2]), Payback::NotWithinHorizon);
    }

    #[test]
    fn zero_revenue_margin_is_not_applicable() {
        let y = year(1, 0, 100, 0, -100);
        assert_eq!(profit_margin_percent(&y), Derived::NotApplicable);
        let y = year(1, 1000, 250, 0, 0);
        assert_eq!(profit_margin_percent(&y), Derived::Value(Decimal::from(75)));
    }

    #[test]
    fn not_applicable_ratios_are_logged() {
        let logged = warnings_during(|| {
            assert_eq!(profit_margin_percent(&year(1, 0, 100, 0, -100)), Derived::NotApplicable);
            assert_eq!(min_dscr(&[year(1, 1000, 100, 0, 900)]), Derived::NotApplicable);
        });
        assert!(logged.contains("profit margin not applicable"), "{logged}");
        assert!(logged.contains("dscr not applicable"), "{logged}");

        let quiet = warnings_during(|| {
            assert!(min_dscr(&[year(1, 1000, 100, 400, 500)]).is_applicable());
        });
        assert!(quiet.is_empty(), "{quiet}");
    }

    #[test]
    fn zero_equity_roi_is_not_applicable() {
        let series = vec![year(1, 600, 100, 0, 500)];
        assert_eq!(roi_percent(&series, Decimal::ZERO), Derived::NotApplicable);
    }

    #[test]
    fn dscr_ignores_debt_free_years() {
        let series = vec![
            year(1, 1000, 200, 400, 0),
            year(2, 1000, 400, 400, 0),
            year(3, 1000, 900, 0, 0),
        ];
        assert_eq!(min_dscr(&series), Derived::Value(Decimal::new(15, 1)));
        assert_eq!(min_dscr(&series[2..]), Derived::NotApplicable);
    }

    #[test]
    fn listing_example_metrics() {
        let p = Projection::new(listing_inputs()).unwrap();
        let m = analyze(&p, Decimal::from(8)).unwrap();
        assert_eq!(m.payback, Payback::Year(1));
        assert!(m.npv > Decimal::ZERO);
        assert!(m.irr_percent.is_applicable());
        assert!(m.min_dscr.value().unwrap() > &Decimal::ONE);
        assert_eq!(m.approximations, vec![Approximation::LinearBreakEven]);
    }

    #[test]
    fn thin_equity_still_has_an_irr() {
        let base = analyze(&Projection::new(listing_inputs()).unwrap(), Decimal::from(8)).unwrap();
        let base_irr = *base.irr_percent.value().unwrap();
        for down in [10, 5] {
            let mut inputs = listing_inputs();
            inputs.down_payment_percent = Decimal::from(down);
            let m = analyze(&Projection::new(inputs).unwrap(), Decimal::from(8)).unwrap();
            let irr = *m.irr_percent.value().unwrap();
            assert!(irr > base_irr, "{down}% down: irr {irr}");
        }
    }

    #[test]
    fn break_even_price_zeroes_year_one() {
        let p = Projection::new(listing_inputs()).unwrap();
        let price = *break_even_unit_price(&p, 1).unwrap().value().unwrap();
        let mut at_break_even: ProjectionInputs = listing_inputs();
        at_break_even.energy.unit_price = price;
        let y1 = Projection::new(at_break_even)
            .unwrap()
            .iter()
            .next()
            .unwrap()
            .unwrap();
        assert!(y1.period_cash_flow.abs() < Decimal::new(1, 6));
    }

    #[test]
    fn series_break_even_matches_projection() {
        let inputs = listing_inputs();
        let p = Projection::new(inputs.clone()).unwrap();
        let series = p.series().unwrap();
        let from_series = break_even_from_year(&series[0], inputs.energy.unit_price);
        let solved = break_even_unit_price(&p, 1).unwrap();
        let diff = *from_series.value().unwrap() - *solved.value().unwrap();
        assert!(diff.abs() < Decimal::new(1, 9), "diff {diff}");
        assert_eq!(
            break_even_from_year(&year(1, 0, 100, 0, -100), Decimal::from(75)),
            Derived::NotApplicable
        );
    }

    #[test]
    fn break_even_without_capacity_is_not_applicable() {
        let mut inputs = listing_inputs();
        inputs.energy.capacity_mw = Decimal::ZERO;
        let p = Projection::new(inputs).unwrap();
        assert_eq!(break_even_unit_price(&p, 1).unwrap(), Derived::NotApplicable);
        let m = analyze(&p, Decimal::from(8)).unwrap();
        assert!(m.approximations.is_empty());
        assert_eq!(m.profit_margin_percent, Derived::NotApplicable);
        assert_eq!(m.payback, Payback::NotWithinHorizon);
    }

    proptest! {
        #[test]
        fn payback_is_minimal(flows in proptest::collection::vec(-1_000i64..1_000, 1..30), equity in 0i64..5_000) {
            let mut cumulative = -equity;
            let series: Vec<CashFlowYear> = flows
                .iter()
                .enumerate()
                .map(|(i, cf)| {
                    cumulative += cf;
                    CashFlowYear {
                        year: i as u32 + 1,
                        revenue: Decimal::from((*cf).max(0)),
                        costs: Decimal::ZERO,
                        debt_service: Decimal::ZERO,
                        period_cash_flow: Decimal::from(*cf),
                        cumulative_cash_flow: Decimal::from(cumulative),
                    }
                })
                .collect();
            match payback(&series) {
                Payback::Year(y) => {
                    prop_assert!(series[(y - 1) as usize].cumulative_cash_flow > Decimal::ZERO);
                    for earlier in &series[..(y - 1) as usize] {
                        prop_assert!(earlier.cumulative_cash_flow <= Decimal::ZERO);
                    }
                }
                Payback::NotWithinHorizon => {
                    prop_assert!(series.iter().all(|y| y.cumulative_cash_flow <= Decimal::ZERO));
                }
            }
        }
    }
}
