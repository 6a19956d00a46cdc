#![deny(warnings)]

//! Orchestration of the finance, mining and risk models into reports.

pub mod monte_carlo;
pub mod portfolio;
mod report;

pub use monte_carlo::{simulate, MonteCarloConfig, MonteCarloSummary};
pub use portfolio::{Holding, PortfolioSummary};
pub use report::{analyze_mining, analyze_project, InvestmentReport, ReportBase, ResultKind};

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use volt_core::{
        EnergyAssumptions, LoanTerms, MarketSnapshot, OperatingCosts, RevenueMode,
    };
    use volt_finance::ProjectionInputs;

    pub fn generation_site() -> ProjectionInputs {
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

    pub fn hosting_site() -> ProjectionInputs {
        let mut inputs = generation_site();
        inputs.energy.mode = RevenueMode::Hosting;
        inputs.energy.capacity_mw = Decimal::from(10);
        inputs.energy.utilization_percent = Decimal::from(80);
        inputs.energy.unit_price = Decimal::new(7, 2);
        inputs.energy.purchase_rate_per_kwh = Decimal::new(4, 2);
        inputs.energy.escalation_percent = Decimal::ZERO;
        inputs
    }

    pub fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            coin_price_usd: Decimal::from(95_000),
            network_difficulty: 106.9e12,
            energy_rate_per_kwh: Decimal::new(85, 3),
            as_of: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        }
    }
}
