#![deny(warnings)]

//! Core value types and invariants for the VoltMarket calculation engine.
//!
//! Every record here is a plain immutable value: a calculation run builds
//! fresh inputs, derives fresh results and drops both on the next recompute.
//! Validation helpers reject bad inputs before any arithmetic happens and
//! name the offending field in the error.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

mod catalog;

pub use catalog::{equipment_catalog, find_equipment};

/// Longest projection horizon accepted, in years.
pub const MAX_HORIZON_YEARS: u32 = 50;
/// Longest loan term accepted, in years.
pub const MAX_TERM_YEARS: u32 = 100;

/// Errors produced while validating inputs or evaluating a formula.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalcError {
    /// An input is outside its valid domain.
    #[error("invalid input `{field}`: {reason}")]
    InvalidInput { field: &'static str, reason: String },
    /// A value was NaN/infinite or could not be converted.
    #[error("non-finite numeric value in `{field}`")]
    NonFinite { field: &'static str },
    /// A checked operation exceeded the decimal range.
    #[error("arithmetic overflow while computing `{field}`")]
    Overflow { field: &'static str },
}

impl CalcError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        CalcError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

/// A derived figure that may be undefined for the given inputs.
///
/// Ratios with a zero denominator are reported as `NotApplicable` instead of
/// leaking NaN or infinity into downstream formatting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Derived<T> {
    Value(T),
    NotApplicable,
}

impl<T> Derived<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Derived::Value(v) => Some(v),
            Derived::NotApplicable => None,
        }
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self, Derived::Value(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Derived<U> {
        match self {
            Derived::Value(v) => Derived::Value(f(v)),
            Derived::NotApplicable => Derived::NotApplicable,
        }
    }
}

impl<T> From<Option<T>> for Derived<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Derived::Value(v),
            None => Derived::NotApplicable,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Derived::Value(v) => write!(f, "{v}"),
            Derived::NotApplicable => write!(f, "N/A"),
        }
    }
}

/// Year in which cumulative cash first turns positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "year", rename_all = "snake_case")]
pub enum Payback {
    /// 1-based year index.
    Year(u32),
    /// Cumulative cash never turned positive within the horizon.
    NotWithinHorizon,
}

impl fmt::Display for Payback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payback::Year(y) => write!(f, "year {y}"),
            Payback::NotWithinHorizon => write!(f, "never"),
        }
    }
}

/// Marks an output that rests on a documented approximation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Approximation {
    /// Network hashrate estimated as difficulty * 2^32 / block time.
    NetworkHashrateEstimate,
    /// Break-even price solved in closed form from a price-linear revenue model.
    LinearBreakEven,
    /// Scenario produced by scaling a baseline rather than re-projecting.
    ScenarioScaling,
    /// Figures are statistics over a seeded random sample.
    SampledDistribution,
}

/// Business model of an energy asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenueMode {
    /// Sell generated power at a market price per MWh.
    Generation,
    /// Resell purchased power to hosted clients at a per-kWh markup.
    Hosting,
}

/// Marketplace listing category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingType {
    SiteSale,
    SiteLease,
    Hosting,
    Equipment,
}

impl ListingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingType::SiteSale => "site_sale",
            ListingType::SiteLease => "site_lease",
            ListingType::Hosting => "hosting",
            ListingType::Equipment => "equipment",
        }
    }
}

impl fmt::Display for ListingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingType {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "site_sale" | "sale" => Ok(ListingType::SiteSale),
            "site_lease" | "lease" => Ok(ListingType::SiteLease),
            "hosting" => Ok(ListingType::Hosting),
            "equipment" => Ok(ListingType::Equipment),
            other => Err(CalcError::invalid(
                "listing_type",
                format!("unknown listing type {other:?}"),
            )),
        }
    }
}

/// Fixed-rate loan financing an acquisition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    /// Purchase price financed, in USD (>= 0).
    pub principal: Decimal,
    /// Nominal annual rate in percent, [0, 100].
    pub annual_rate_percent: Decimal,
    /// Term in whole years, [1, 100].
    pub term_years: u32,
}

/// Revenue assumptions for a generation or hosting asset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnergyAssumptions {
    pub mode: RevenueMode,
    /// Nameplate capacity in MW (>= 0).
    pub capacity_mw: Decimal,
    /// Share of capacity sold to hosted clients, [0, 100]. Hosting only.
    #[serde(default = "default_utilization")]
    pub utilization_percent: Decimal,
    /// USD per MWh in generation mode, USD per kWh hosting rate in hosting mode.
    pub unit_price: Decimal,
    /// USD per kWh paid for purchased power. Hosting only.
    #[serde(default)]
    pub purchase_rate_per_kwh: Decimal,
    /// Annual price escalation in percent, (-100, 100].
    #[serde(default)]
    pub escalation_percent: Decimal,
    /// Fraction of nameplate output actually generated, [0, 1]. Generation only.
    #[serde(default = "default_capacity_factor")]
    pub capacity_factor: Decimal,
    #[serde(default = "default_hours_per_year")]
    pub hours_per_year: u32,
}

fn default_utilization() -> Decimal {
    Decimal::ONE_HUNDRED
}

fn default_capacity_factor() -> Decimal {
    Decimal::new(25, 2)
}

fn default_hours_per_year() -> u32 {
    8760
}

/// Recurring operating expenses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OperatingCosts {
    /// First-year amount in USD (>= 0).
    pub annual_amount: Decimal,
    /// Annual cost inflation in percent, (-100, 100].
    #[serde(default)]
    pub inflation_percent: Decimal,
}

/// One year of a projected cash-flow series.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowYear {
    /// 1-based year index.
    pub year: u32,
    /// Gross energy revenue for the year.
    pub revenue: Decimal,
    /// Purchased power plus operating costs.
    pub costs: Decimal,
    /// Loan payments made during the year.
    pub debt_service: Decimal,
    pub period_cash_flow: Decimal,
    /// Running sum seeded with the negative initial equity.
    pub cumulative_cash_flow: Decimal,
}

/// Headline return figures derived from a cash-flow series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReturnMetrics {
    pub roi_percent: Derived<Decimal>,
    pub npv: Decimal,
    pub payback: Payback,
    /// Year-1 unit price at which period cash flow is zero. `NotApplicable`
    /// when revenue does not depend on price, or when only a bare series was
    /// summarized and the unit price it was built with is unknown.
    pub break_even_unit_price: Derived<Decimal>,
    pub profit_margin_percent: Derived<Decimal>,
    pub irr_percent: Derived<Decimal>,
    /// Minimum debt service coverage ratio across loan years.
    pub min_dscr: Derived<Decimal>,
    pub approximations: Vec<Approximation>,
}

/// Qualitative risk bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskBucket {
    Low,
    Medium,
    High,
}

impl RiskBucket {
    /// Bucket thresholds: > 7 High, > 4 Medium, else Low.
    pub fn from_value(value: Decimal) -> Self {
        if value > Decimal::from(7) {
            RiskBucket::High
        } else if value > Decimal::from(4) {
            RiskBucket::Medium
        } else {
            RiskBucket::Low
        }
    }
}

impl fmt::Display for RiskBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskBucket::Low => "Low",
            RiskBucket::Medium => "Medium",
            RiskBucket::High => "High",
        };
        f.write_str(s)
    }
}

/// Risk score in [1.0, 10.0] with its bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskScore {
    pub value: Decimal,
    pub bucket: RiskBucket,
}

/// A mining machine from the reference catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MiningEquipmentSpec {
    pub model: String,
    /// Hashrate in TH/s (> 0).
    pub hashrate_ths: f64,
    /// Wall power in W (> 0).
    pub power_watts: f64,
    /// Street price in USD (>= 0).
    pub price_usd: Decimal,
}

/// Live market inputs supplied by the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub coin_price_usd: Decimal,
    pub network_difficulty: f64,
    pub energy_rate_per_kwh: Decimal,
    pub as_of: DateTime<Utc>,
}

/// Engine-wide defaults, overridable from a scenario file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineDefaults {
    pub discount_rate_percent: Decimal,
    pub hours_per_year: u32,
    pub generation_capacity_factor: Decimal,
    pub block_time_seconds: u32,
    pub block_reward_coins: f64,
    pub maintenance_cost_daily_usd: Decimal,
    pub monte_carlo_runs: u32,
    pub monte_carlo_seed: u64,
}

impl Default for EngineDefaults {
    fn default() -> Self {
        Self {
            discount_rate_percent: Decimal::from(8),
            hours_per_year: default_hours_per_year(),
            generation_capacity_factor: default_capacity_factor(),
            block_time_seconds: 600,
            block_reward_coins: 3.125,
            maintenance_cost_daily_usd: Decimal::ZERO,
            monte_carlo_runs: 1000,
            monte_carlo_seed: 42,
        }
    }
}

/// Reject negative values.
pub fn require_non_negative(field: &'static str, value: Decimal) -> Result<Decimal, CalcError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(CalcError::invalid(field, format!("must be >= 0, got {value}")));
    }
    Ok(value)
}

/// Reject values outside [0, 100].
pub fn require_percent(field: &'static str, value: Decimal) -> Result<Decimal, CalcError> {
    require_non_negative(field, value)?;
    if value > Decimal::ONE_HUNDRED {
        return Err(CalcError::invalid(field, format!("must be <= 100, got {value}")));
    }
    Ok(value)
}

/// Reject growth rates outside (-100, 100].
pub fn require_growth_rate(field: &'static str, value: Decimal) -> Result<Decimal, CalcError> {
    if value <= -Decimal::ONE_HUNDRED || value > Decimal::ONE_HUNDRED {
        return Err(CalcError::invalid(
            field,
            format!("must be within (-100, 100], got {value}"),
        ));
    }
    Ok(value)
}

/// Reject NaN, infinities and values <= 0.
pub fn require_positive_f64(field: &'static str, value: f64) -> Result<f64, CalcError> {
    if !value.is_finite() {
        return Err(CalcError::NonFinite { field });
    }
    if value <= 0.0 {
        return Err(CalcError::invalid(field, format!("must be > 0, got {value}")));
    }
    Ok(value)
}

pub fn to_decimal(field: &'static str, value: f64) -> Result<Decimal, CalcError> {
    if !value.is_finite() {
        return Err(CalcError::NonFinite { field });
    }
    Decimal::from_f64(value).ok_or(CalcError::NonFinite { field })
}

pub fn to_f64(field: &'static str, value: Decimal) -> Result<f64, CalcError> {
    value
        .to_f64()
        .filter(|v| v.is_finite())
        .ok_or(CalcError::NonFinite { field })
}

/// Convert a percentage to a fraction: 4.5 -> 0.045.
pub fn percent_to_fraction(percent: Decimal) -> Decimal {
    percent / Decimal::ONE_HUNDRED
}

/// Validate loan terms.
pub fn validate_loan(loan: &LoanTerms) -> Result<(), CalcError> {
    require_non_negative("principal", loan.principal)?;
    require_percent("annual_rate_percent", loan.annual_rate_percent)?;
    if loan.term_years == 0 {
        return Err(CalcError::invalid("term_years", "must be >= 1"));
    }
    if loan.term_years > MAX_TERM_YEARS {
        return Err(CalcError::invalid(
            "term_years",
            format!("must be <= {MAX_TERM_YEARS}"),
        ));
    }
    Ok(())
}

/// Validate revenue assumptions.
pub fn validate_energy(energy: &EnergyAssumptions) -> Result<(), CalcError> {
    require_non_negative("capacity_mw", energy.capacity_mw)?;
    require_percent("utilization_percent", energy.utilization_percent)?;
    require_non_negative("unit_price", energy.unit_price)?;
    require_non_negative("purchase_rate_per_kwh", energy.purchase_rate_per_kwh)?;
    require_growth_rate("escalation_percent", energy.escalation_percent)?;
    require_non_negative("capacity_factor", energy.capacity_factor)?;
    if energy.capacity_factor > Decimal::ONE {
        return Err(CalcError::invalid("capacity_factor", "must be <= 1"));
    }
    if energy.hours_per_year == 0 || energy.hours_per_year > 8784 {
        return Err(CalcError::invalid(
            "hours_per_year",
            "must be within [1, 8784]",
        ));
    }
    Ok(())
}

/// Validate operating costs.
pub fn validate_costs(costs: &OperatingCosts) -> Result<(), CalcError> {
    require_non_negative("annual_amount", costs.annual_amount)?;
    require_growth_rate("inflation_percent", costs.inflation_percent)?;
    Ok(())
}

/// Validate a projection horizon.
pub fn validate_horizon(horizon_years: u32) -> Result<(), CalcError> {
    if horizon_years == 0 || horizon_years > MAX_HORIZON_YEARS {
        return Err(CalcError::invalid(
            "horizon_years",
            format!("must be within [1, {MAX_HORIZON_YEARS}]"),
        ));
    }
    Ok(())
}

/// Validate an equipment spec.
pub fn validate_equipment(spec: &MiningEquipmentSpec) -> Result<(), CalcError> {
    if spec.model.trim().is_empty() {
        return Err(CalcError::invalid("model", "must not be empty"));
    }
    require_positive_f64("hashrate_ths", spec.hashrate_ths)?;
    require_positive_f64("power_watts", spec.power_watts)?;
    require_non_negative("price_usd", spec.price_usd)?;
    Ok(())
}

/// Validate a market snapshot.
pub fn validate_snapshot(snapshot: &MarketSnapshot) -> Result<(), CalcError> {
    require_non_negative("coin_price_usd", snapshot.coin_price_usd)?;
    require_positive_f64("network_difficulty", snapshot.network_difficulty)?;
    require_non_negative("energy_rate_per_kwh", snapshot.energy_rate_per_kwh)?;
    Ok(())
}
