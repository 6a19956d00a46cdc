#![deny(warnings)]

//! Finance models: loan amortization, energy revenue, cash-flow projection
//! and return metrics for VoltMarket listings.
//!
//! This crate provides validated, deterministic utilities for:
//! - Fixed-rate annuity payments and yearly amortization schedules
//! - Generation and hosting revenue with independent price/cost escalation
//! - Multi-year cash-flow series and cumulative cash position
//! - ROI, NPV, payback, break-even price, DSCR and equity IRR
//! - Scenario variants by baseline scaling or full re-projection

pub mod amortization;
pub mod cashflow;
pub mod irr;
pub mod returns;
pub mod revenue;
pub mod scenario;

pub use amortization::{annual_debt_service, monthly_payment, schedule, AmortizationYear};
pub use cashflow::{project, CashFlowIter, Projection, ProjectionInputs};
pub use returns::{analyze, summarize};
pub use revenue::{project_annual_revenue, AnnualEnergy};
pub use scenario::{InputShock, ScenarioSet, ShockTable};

use rust_decimal::Decimal;
use volt_core::CalcError;

pub(crate) fn mul(field: &'static str, a: Decimal, b: Decimal) -> Result<Decimal, CalcError> {
    a.checked_mul(b).ok_or(CalcError::Overflow { field })
}

pub(crate) fn add(field: &'static str, a: Decimal, b: Decimal) -> Result<Decimal, CalcError> {
    a.checked_add(b).ok_or(CalcError::Overflow { field })
}

pub(crate) fn sub(field: &'static str, a: Decimal, b: Decimal) -> Result<Decimal, CalcError> {
    a.checked_sub(b).ok_or(CalcError::Overflow { field })
}
