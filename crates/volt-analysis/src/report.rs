//! Investment reports: one shared base record and a tagged per-asset result.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use volt_core::{
    Approximation, CalcError, CashFlowYear, Derived, EngineDefaults, MarketSnapshot,
    MiningEquipmentSpec, ReturnMetrics, RevenueMode, RiskScore,
};
use volt_finance::revenue::hosting_margin;
use volt_finance::{analyze, Projection, ProjectionInputs};
use volt_mining::{compute_daily, equipment_payback_days, DailyMining, MiningInputs, PeriodMining};
use volt_risk::{estimate, ListingFacts};

const DAYS_PER_MONTH: u32 = 30;
const DAYS_PER_YEAR: u32 = 365;

/// Fields every report carries regardless of asset kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportBase {
    pub name: String,
    /// Union of approximations used anywhere in the report, sorted.
    pub approximations: Vec<Approximation>,
    /// Present when listing facts were supplied.
    pub risk: Option<RiskScore>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultKind {
    Generation {
        series: Vec<CashFlowYear>,
        metrics: ReturnMetrics,
    },
    Hosting {
        series: Vec<CashFlowYear>,
        metrics: ReturnMetrics,
        /// First-year revenue less purchased power.
        annual_margin: Decimal,
    },
    Mining {
        daily: DailyMining,
        monthly: PeriodMining,
        yearly: PeriodMining,
        payback_days: Derived<Decimal>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvestmentReport {
    #[serde(flatten)]
    pub base: ReportBase,
    pub result: ResultKind,
}

impl InvestmentReport {
    /// Return metrics of a generation or hosting report.
    pub fn metrics(&self) -> Option<&ReturnMetrics> {
        match &self.result {
            ResultKind::Generation { metrics, .. } | ResultKind::Hosting { metrics, .. } => {
                Some(metrics)
            }
            ResultKind::Mining { .. } => None,
        }
    }
}

fn merged(mut approximations: Vec<Approximation>) -> Vec<Approximation> {
    approximations.sort();
    approximations.dedup();
    approximations
}

fn score(
    facts: Option<&ListingFacts>,
    roi: Derived<Decimal>,
) -> Result<Option<RiskScore>, CalcError> {
    facts
        .map(|f| estimate(f.capacity_mw, f.listing_type, f.asking_price, f.market_value, roi))
        .transpose()
}

/// Project a generation or hosting asset and tag the result by mode.
pub fn analyze_project(
    name: &str,
    inputs: &ProjectionInputs,
    listing: Option<&ListingFacts>,
    defaults: &EngineDefaults,
) -> Result<InvestmentReport, CalcError> {
    let projection = Projection::new(inputs.clone())?;
    let series = projection.series()?;
    let metrics = analyze(&projection, defaults.discount_rate_percent)?;
    let risk = score(listing, metrics.roi_percent)?;
    let base = ReportBase {
        name: name.to_string(),
        approximations: merged(metrics.approximations.clone()),
        risk,
    };
    let result = match inputs.energy.mode {
        RevenueMode::Generation => ResultKind::Generation { series, metrics },
        RevenueMode::Hosting => ResultKind::Hosting {
            annual_margin: hosting_margin(&inputs.energy)?,
            series,
            metrics,
        },
    };
    info!(report = name, mode = ?inputs.energy.mode, "project analyzed");
    Ok(InvestmentReport { base, result })
}

/// Daily, monthly and yearly economics of one machine.
///
/// Risk, when listing facts are given, uses the first-year profit over the
/// machine price as ROI.
pub fn analyze_mining(
    name: &str,
    spec: &MiningEquipmentSpec,
    snapshot: &MarketSnapshot,
    listing: Option<&ListingFacts>,
    defaults: &EngineDefaults,
) -> Result<InvestmentReport, CalcError> {
    let inputs = MiningInputs::from_snapshot(spec, snapshot, defaults)?;
    let daily = compute_daily(&inputs)?;
    let monthly = daily.over_days(DAYS_PER_MONTH)?;
    let yearly = daily.over_days(DAYS_PER_YEAR)?;
    let payback_days = equipment_payback_days(spec.price_usd, daily.daily_profit_usd);
    let roi: Derived<Decimal> = if spec.price_usd.is_zero() {
        warn!(model = %spec.model, "mining roi not applicable: zero equipment price");
        Derived::NotApplicable
    } else {
        yearly
            .profit_usd
            .checked_div(spec.price_usd)
            .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
            .into()
    };
    debug!(model = %spec.model, %roi, %payback_days, "mining figures");
    let base = ReportBase {
        name: name.to_string(),
        approximations: merged(daily.approximations.clone()),
        risk: score(listing, roi)?,
    };
    info!(report = name, model = %spec.model, "mining analyzed");
    Ok(InvestmentReport {
        base,
        result: ResultKind::Mining {
            daily,
            monthly,
            yearly,
            payback_days,
        },
    })
}
