//! Aggregate figures across held listings.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use volt_core::{require_non_negative, CalcError, Derived, ListingType, RiskScore};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub name: String,
    pub listing_type: ListingType,
    /// Capital put in, USD.
    pub invested: Decimal,
    pub current_value: Decimal,
    /// Net yearly income, USD.
    #[serde(default)]
    pub annual_income: Decimal,
    #[serde(default)]
    pub risk: Option<RiskScore>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub holdings: usize,
    pub total_invested: Decimal,
    pub total_current_value: Decimal,
    pub unrealized_gain: Decimal,
    pub unrealized_gain_percent: Derived<Decimal>,
    pub income_yield_percent: Derived<Decimal>,
    /// Share of invested capital per listing type, in percent.
    pub allocation_percent: BTreeMap<ListingType, Decimal>,
    /// Risk score weighted by invested capital over holdings that carry one.
    pub weighted_risk: Derived<Decimal>,
}

fn checked_sum<'a>(
    field: &'static str,
    mut values: impl Iterator<Item = &'a Decimal>,
) -> Result<Decimal, CalcError> {
    values
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
        .ok_or(CalcError::Overflow { field })
}

fn percent_of(part: Decimal, whole: Decimal) -> Derived<Decimal> {
    if whole.is_zero() {
        return Derived::NotApplicable;
    }
    part.checked_div(whole)
        .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
        .into()
}

pub fn summarize(holdings: &[Holding]) -> Result<PortfolioSummary, CalcError> {
    for h in holdings {
        require_non_negative("invested", h.invested)?;
        require_non_negative("current_value", h.current_value)?;
    }
    let total_invested = checked_sum("total_invested", holdings.iter().map(|h| &h.invested))?;
    let total_current_value =
        checked_sum("total_current_value", holdings.iter().map(|h| &h.current_value))?;
    let total_income = checked_sum("annual_income", holdings.iter().map(|h| &h.annual_income))?;
    let unrealized_gain = total_current_value
        .checked_sub(total_invested)
        .ok_or(CalcError::Overflow {
            field: "unrealized_gain",
        })?;

    let mut by_type: BTreeMap<ListingType, Decimal> = BTreeMap::new();
    for h in holdings {
        let slot = by_type.entry(h.listing_type).or_default();
        *slot = slot.checked_add(h.invested).ok_or(CalcError::Overflow {
            field: "allocation",
        })?;
    }
    let allocation_percent = by_type
        .into_iter()
        .filter_map(|(kind, amount)| {
            percent_of(amount, total_invested)
                .value()
                .map(|pct| (kind, *pct))
        })
        .collect();

    let mut risk_weight = Decimal::ZERO;
    let mut risk_total = Decimal::ZERO;
    for (h, risk) in holdings.iter().filter_map(|h| h.risk.map(|r| (h, r))) {
        risk_weight = risk_weight.checked_add(h.invested).ok_or(CalcError::Overflow {
            field: "weighted_risk",
        })?;
        risk_total = h
            .invested
            .checked_mul(risk.value)
            .and_then(|v| risk_total.checked_add(v))
            .ok_or(CalcError::Overflow {
                field: "weighted_risk",
            })?;
    }
    let weighted_risk: Derived<Decimal> = if risk_weight.is_zero() {
        Derived::NotApplicable
    } else {
        risk_total.checked_div(risk_weight).into()
    };

    let summary = PortfolioSummary {
        holdings: holdings.len(),
        total_invested,
        total_current_value,
        unrealized_gain,
        unrealized_gain_percent: percent_of(unrealized_gain, total_invested),
        income_yield_percent: percent_of(total_income, total_invested),
        allocation_percent,
        weighted_risk,
    };
    if !summary.unrealized_gain_percent.is_applicable() {
        warn!(holdings = summary.holdings, "portfolio ratios not applicable: nothing invested");
    }
    debug!(
        invested = %summary.total_invested,
        value = %summary.total_current_value,
        gain = %summary.unrealized_gain_percent,
        "portfolio summarized"
    );
    Ok(summary)
}
