#![deny(warnings)]

//! Heuristic listing risk score and due-diligence findings.
//!
//! The score is an additive heuristic starting at 5.0. Weights and thresholds
//! are fixed:
//! - capacity > 100 MW: -1.0; capacity < 10 MW: +1.5
//! - hosting listing: +0.5; equipment listing: +1.0
//! - asking/market ratio > 1.2: +1.0; ratio < 0.8: -0.5
//! - ROI > 15%: -0.5; ROI < 5%: +1.0
//!
//! The sum is clamped to [1.0, 10.0].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use volt_core::{
    require_non_negative, CalcError, Derived, ListingType, Payback, ReturnMetrics, RiskBucket,
    RiskScore,
};

const MIN_SCORE: Decimal = Decimal::ONE;
const MAX_SCORE: Decimal = Decimal::TEN;

/// asking / market value; undefined when the market value is zero.
pub fn price_to_value(asking_price: Decimal, market_value: Decimal) -> Derived<Decimal> {
    if market_value.is_zero() {
        warn!(%asking_price, "price-to-value not applicable: zero market value");
        return Derived::NotApplicable;
    }
    asking_price.checked_div(market_value).into()
}

/// Score a listing. A `NotApplicable` ROI or market value contributes nothing.
pub fn estimate(
    capacity_mw: Decimal,
    listing_type: ListingType,
    asking_price: Decimal,
    market_value: Decimal,
    roi_percent: Derived<Decimal>,
) -> Result<RiskScore, CalcError> {
    require_non_negative("capacity_mw", capacity_mw)?;
    require_non_negative("asking_price", asking_price)?;
    require_non_negative("market_value", market_value)?;

    let mut score = Decimal::from(5);
    if capacity_mw > Decimal::ONE_HUNDRED {
        score -= Decimal::ONE;
    } else if capacity_mw < Decimal::TEN {
        score += Decimal::new(15, 1);
    }

    match listing_type {
        ListingType::Hosting => score += Decimal::new(5, 1),
        ListingType::Equipment => score += Decimal::ONE,
        ListingType::SiteSale | ListingType::SiteLease => {}
    }

    if let Some(&ratio) = price_to_value(asking_price, market_value).value() {
        if ratio > Decimal::new(12, 1) {
            score += Decimal::ONE;
        } else if ratio < Decimal::new(8, 1) {
            score -= Decimal::new(5, 1);
        }
    }

    if let Some(&roi) = roi_percent.value() {
        if roi > Decimal::from(15) {
            score -= Decimal::new(5, 1);
        } else if roi < Decimal::from(5) {
            score += Decimal::ONE;
        }
    }

    let value = score.clamp(MIN_SCORE, MAX_SCORE);
    let bucket = RiskBucket::from_value(value);
    debug!(%capacity_mw, %listing_type, %value, %bucket, "risk estimated");
    Ok(RiskScore { value, bucket })
}

/// How serious a finding is. Orders Info < Warning < Critical.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Proceed,
    ProceedWithCaution,
    Avoid,
}

/// Listing facts the return metrics do not carry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListingFacts {
    pub capacity_mw: Decimal,
    pub listing_type: ListingType,
    pub asking_price: Decimal,
    pub market_value: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DueDiligenceReport {
    pub risk: RiskScore,
    pub price_to_value: Derived<Decimal>,
    /// Most severe first.
    pub findings: Vec<Finding>,
    pub recommendation: Recommendation,
}

const LONG_PAYBACK_YEARS: u32 = 10;

fn min_comfortable_dscr() -> Decimal {
    Decimal::new(125, 2)
}

/// Combine the risk score with the projection's return metrics.
pub fn due_diligence(
    facts: &ListingFacts,
    metrics: &ReturnMetrics,
) -> Result<DueDiligenceReport, CalcError> {
    let risk = estimate(
        facts.capacity_mw,
        facts.listing_type,
        facts.asking_price,
        facts.market_value,
        metrics.roi_percent,
    )?;
    let ratio = price_to_value(facts.asking_price, facts.market_value);
    let mut findings = Vec::new();
    let mut note = |severity, message: String| findings.push(Finding { severity, message });

    match risk.bucket {
        RiskBucket::High => note(
            Severity::Critical,
            format!("risk score {} is in the high band", risk.value),
        ),
        RiskBucket::Medium => note(
            Severity::Warning,
            format!("risk score {} is in the medium band", risk.value),
        ),
        RiskBucket::Low => {}
    }

    match ratio.value() {
        Some(&r) if r > Decimal::new(12, 1) => note(
            Severity::Warning,
            format!("asking price is {}x market value", r.round_dp(2)),
        ),
        Some(&r) if r < Decimal::new(8, 1) => note(
            Severity::Info,
            format!("asking price is {}x market value", r.round_dp(2)),
        ),
        Some(_) => {}
        None => note(Severity::Info, "no market value to compare against".to_string()),
    }

    if metrics.npv < Decimal::ZERO {
        note(
            Severity::Critical,
            format!("net present value is negative ({})", metrics.npv.round_dp(2)),
        );
    }

    match metrics.payback {
        Payback::NotWithinHorizon => note(
            Severity::Critical,
            "equity is not paid back within the horizon".to_string(),
        ),
        Payback::Year(y) if y > LONG_PAYBACK_YEARS => {
            note(Severity::Warning, format!("payback takes {y} years"))
        }
        Payback::Year(_) => {}
    }

    if let Some(&dscr) = metrics.min_dscr.value() {
        if dscr < Decimal::ONE {
            note(
                Severity::Critical,
                format!(
                    "operating cash does not cover debt service (DSCR {})",
                    dscr.round_dp(2)
                ),
            );
        } else if dscr < min_comfortable_dscr() {
            note(
                Severity::Warning,
                format!("thin debt service coverage (DSCR {})", dscr.round_dp(2)),
            );
        }
    }

    if !metrics.roi_percent.is_applicable() {
        note(Severity::Info, "ROI undefined without equity".to_string());
    }

    findings.sort_by(|a, b| b.severity.cmp(&a.severity));
    let recommendation = match findings.first().map(|f| f.severity) {
        Some(Severity::Critical) => Recommendation::Avoid,
        Some(Severity::Warning) => Recommendation::ProceedWithCaution,
        Some(Severity::Info) | None => Recommendation::Proceed,
    };
    debug!(findings = findings.len(), ?recommendation, "due diligence complete");
    Ok(DueDiligenceReport {
        risk,
        price_to_value: ratio,
        findings,
        recommendation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn score(capacity: i64, kind: ListingType, asking: i64, market: i64, roi: i64) -> Decimal {
        estimate(d(capacity), kind, d(asking), d(market), Derived::Value(d(roi)))
            .unwrap()
            .value
    }

    #[test]
    fn neutral_listing_scores_base() {
        let s = estimate(d(50), ListingType::SiteSale, d(100), d(100), Derived::Value(d(10)))
            .unwrap();
        assert_eq!(s.value, Decimal::from(5));
        assert_eq!(s.bucket, RiskBucket::Medium);
    }

    #[test]
    fn small_overpriced_equipment_is_high_risk() {
        // 5 + 1.5 + 1 + 1 + 1
        let s = estimate(d(5), ListingType::Equipment, d(150), d(100), Derived::Value(d(2)))
            .unwrap();
        assert_eq!(s.value, Decimal::new(95, 1));
        assert_eq!(s.bucket, RiskBucket::High);
    }

    #[test]
    fn large_discounted_site_is_low_risk() {
        // 5 - 1 - 0.5 - 0.5
        assert_eq!(score(200, ListingType::SiteLease, 50, 100, 20), d(3));
        assert_eq!(RiskBucket::from_value(d(3)), RiskBucket::Low);
    }

    #[test]
    fn thresholds_are_strict() {
        // capacity exactly 100 or 10, ratio exactly 1.2, roi exactly 15 or 5: no adjustment
        assert_eq!(score(100, ListingType::SiteSale, 120, 100, 15), d(5));
        assert_eq!(score(10, ListingType::SiteSale, 80, 100, 5), d(5));
    }

    #[test]
    fn hosting_adds_half_point() {
        assert_eq!(score(50, ListingType::Hosting, 100, 100, 10), Decimal::new(55, 1));
    }

    #[test]
    fn missing_inputs_contribute_nothing() {
        let s = estimate(d(50), ListingType::SiteSale, d(100), d(0), Derived::NotApplicable).unwrap();
        assert_eq!(s.value, Decimal::from(5));
        assert!(estimate(d(-1), ListingType::SiteSale, d(1), d(1), Derived::NotApplicable).is_err());
    }

    fn healthy_metrics() -> ReturnMetrics {
        ReturnMetrics {
            roi_percent: Derived::Value(d(40)),
            npv: d(2_000_000),
            payback: Payback::Year(3),
            break_even_unit_price: Derived::Value(d(20)),
            profit_margin_percent: Derived::Value(d(60)),
            irr_percent: Derived::Value(d(25)),
            min_dscr: Derived::Value(d(3)),
            approximations: Vec::new(),
        }
    }

    fn facts() -> ListingFacts {
        ListingFacts {
            capacity_mw: d(150),
            listing_type: ListingType::SiteSale,
            asking_price: d(5_000_000),
            market_value: d(5_000_000),
        }
    }

    #[test]
    fn healthy_listing_proceeds() {
        let report = due_diligence(&facts(), &healthy_metrics()).unwrap();
        assert_eq!(report.risk.bucket, RiskBucket::Low);
        assert_eq!(report.price_to_value, Derived::Value(Decimal::ONE));
        assert!(report.findings.is_empty());
        assert_eq!(report.recommendation, Recommendation::Proceed);
    }

    #[test]
    fn thin_coverage_needs_caution() {
        let mut m = healthy_metrics();
        m.min_dscr = Derived::Value(Decimal::new(11, 1));
        let report = due_diligence(&facts(), &m).unwrap();
        assert_eq!(report.recommendation, Recommendation::ProceedWithCaution);
    }

    #[test]
    fn losing_listing_is_avoided_and_findings_are_ordered() {
        let mut m = healthy_metrics();
        m.npv = d(-10);
        m.payback = Payback::NotWithinHorizon;
        let mut f = facts();
        f.market_value = Decimal::ZERO;
        let report = due_diligence(&f, &m).unwrap();
        assert_eq!(report.recommendation, Recommendation::Avoid);
        assert_eq!(report.price_to_value, Derived::NotApplicable);
        let severities: Vec<_> = report.findings.iter().map(|f| f.severity).collect();
        let mut sorted = severities.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(severities, sorted);
        assert_eq!(severities.last(), Some(&Severity::Info));
    }

    proptest! {
        #[test]
        fn score_is_clamped_and_bucketed(
            capacity in 0i64..1_000,
            asking in 0i64..10_000,
            market in 0i64..10_000,
            roi in -200i64..200,
            kind in 0usize..4,
        ) {
            let listing = [
                ListingType::SiteSale,
                ListingType::SiteLease,
                ListingType::Hosting,
                ListingType::Equipment,
            ][kind];
            let roi = Derived::Value(d(roi));
            let s = estimate(d(capacity), listing, d(asking), d(market), roi).unwrap();
            prop_assert!(s.value >= Decimal::ONE && s.value <= Decimal::TEN);
            prop_assert_eq!(s.bucket, RiskBucket::from_value(s.value));
        }
    }
}
