//! Internal rate of return by Newton-Raphson with a bisection fallback.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::warn;
use volt_core::{to_decimal, CashFlowYear, Derived};

const MAX_NEWTON_ITERATIONS: u32 = 100;
const MAX_BISECTION_ITERATIONS: u32 = 200;
const TOLERANCE: f64 = 1e-10;
const LOWER_BOUND: f64 = -0.99;
const INITIAL_UPPER_BOUND: f64 = 10.0;
/// 1,000,000% per period; past this a rate carries no information.
const MAX_UPPER_BOUND: f64 = 10_000.0;

/// IRR in percent of a flow series where index 0 is "now".
///
/// Not applicable when flows never change sign or no root is bracketed.
/// The bracket starts at [-99%, 1000%] and its upper end doubles while the
/// NPV keeps its sign, up to 1,000,000%.
pub fn irr(flows: &[Decimal]) -> Derived<Decimal> {
    let flows: Option<Vec<f64>> = flows.iter().map(|f| f.to_f64()).collect();
    let Some(flows) = flows else {
        return Derived::NotApplicable;
    };
    if flows.len() < 2 || !has_sign_change(&flows) {
        return Derived::NotApplicable;
    }
    let root = newton(&flows).or_else(|| bisect(&flows));
    match root.and_then(|r| to_decimal("irr", r * 100.0).ok()) {
        Some(pct) => Derived::Value(pct.round_dp(6)),
        None => {
            warn!(n = flows.len(), "irr did not converge");
            Derived::NotApplicable
        }
    }
}

/// Equity IRR: the initial equity outflow followed by each year's cash flow.
pub fn equity_irr(initial_equity: Decimal, series: &[CashFlowYear]) -> Derived<Decimal> {
    let mut flows = Vec::with_capacity(series.len() + 1);
    flows.push(-initial_equity);
    flows.extend(series.iter().map(|y| y.period_cash_flow));
    irr(&flows)
}

fn has_sign_change(flows: &[f64]) -> bool {
    flows.iter().any(|f| *f > 0.0) && flows.iter().any(|f| *f < 0.0)
}

fn npv_at(flows: &[f64], rate: f64) -> f64 {
    let base = 1.0 + rate;
    flows
        .iter()
        .enumerate()
        .map(|(t, cf)| cf / base.powi(t as i32))
        .sum()
}

fn npv_derivative(flows: &[f64], rate: f64) -> f64 {
    let base = 1.0 + rate;
    flows
        .iter()
        .enumerate()
        .skip(1)
        .map(|(t, cf)| -(t as f64) * cf / base.powi(t as i32 + 1))
        .sum()
}

fn newton(flows: &[f64]) -> Option<f64> {
    let mut rate = 0.1;
    for _ in 0..MAX_NEWTON_ITERATIONS {
        let value = npv_at(flows, rate);
        if value.abs() < TOLERANCE {
            return Some(rate);
        }
        let slope = npv_derivative(flows, rate);
        if slope == 0.0 || !slope.is_finite() {
            return None;
        }
        let next = rate - value / slope;
        if !next.is_finite() || next <= LOWER_BOUND || next > MAX_UPPER_BOUND {
            return None;
        }
        if (next - rate).abs() < TOLERANCE {
            return Some(next);
        }
        rate = next;
    }
    None
}

fn bisect(flows: &[f64]) -> Option<f64> {
    let mut lo = LOWER_BOUND;
    let mut f_lo = npv_at(flows, lo);
    let mut hi = INITIAL_UPPER_BOUND;
    let mut f_hi = npv_at(flows, hi);
    while f_lo * f_hi > 0.0 && hi < MAX_UPPER_BOUND {
        hi = (hi * 2.0).min(MAX_UPPER_BOUND);
        f_hi = npv_at(flows, hi);
    }
    if !(f_lo.is_finite() && f_hi.is_finite()) || f_lo * f_hi > 0.0 {
        return None;
    }
    for _ in 0..MAX_BISECTION_ITERATIONS {
        let mid = (lo + hi) / 2.0;
        let f_mid = npv_at(flows, mid);
        if f_mid.abs() < TOLERANCE || (hi - lo) / 2.0 < TOLERANCE {
            return Some(mid);
        }
        if f_mid * f_lo < 0.0 {
            hi = mid;
        } else {
            lo = mid;
            f_lo = f_mid;
        }
    }
    Some((lo + hi) / 2.0)
}
