//! Scenario file loading and evaluation.

use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;
use volt_analysis::portfolio::summarize;
use volt_analysis::{
    analyze_mining, analyze_project, simulate, Holding, InvestmentReport, MonteCarloConfig,
    MonteCarloSummary, PortfolioSummary,
};
use volt_core::{find_equipment, EngineDefaults, MarketSnapshot, MiningEquipmentSpec};
use volt_finance::scenario::{project, reproject, standard_input_shocks, standard_shocks};
use volt_finance::{ProjectionInputs, ScenarioSet, ShockTable};
use volt_risk::{due_diligence, DueDiligenceReport, ListingFacts};

#[derive(Debug, Deserialize)]
pub struct ProjectSection {
    pub name: String,
    pub inputs: ProjectionInputs,
}

/// A catalog model name or a full spec.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EquipmentRef {
    Catalog(String),
    Spec(MiningEquipmentSpec),
}

impl EquipmentRef {
    fn resolve(&self) -> Result<MiningEquipmentSpec> {
        match self {
            EquipmentRef::Catalog(model) => {
                find_equipment(model).ok_or_else(|| anyhow!("unknown equipment model {model:?}"))
            }
            EquipmentRef::Spec(spec) => Ok(spec.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MiningSection {
    pub name: String,
    pub equipment: EquipmentRef,
    pub market: MarketSnapshot,
}

/// Spread overrides; run count and seed come from `defaults`.
#[derive(Debug, Default, Deserialize)]
pub struct MonteCarloSection {
    pub price_spread_percent: Option<Decimal>,
    pub cost_spread_percent: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScenarioFile {
    #[serde(default)]
    pub defaults: EngineDefaults,
    pub project: Option<ProjectSection>,
    pub mining: Option<MiningSection>,
    pub risk: Option<ListingFacts>,
    pub scenarios: Option<ShockTable>,
    pub monte_carlo: Option<MonteCarloSection>,
    #[serde(default)]
    pub portfolio: Vec<Holding>,
}

impl ScenarioFile {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("parsing scenario YAML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_yaml(&text)
    }
}

/// Everything computed from one scenario file.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub project: Option<InvestmentReport>,
    pub due_diligence: Option<DueDiligenceReport>,
    pub scaled_scenarios: Option<ScenarioSet>,
    pub reprojected_scenarios: Option<ScenarioSet>,
    pub monte_carlo: Option<MonteCarloSummary>,
    pub mining: Option<InvestmentReport>,
    pub portfolio: Option<PortfolioSummary>,
}

pub fn run(file: &ScenarioFile) -> Result<RunReport> {
    let defaults = &file.defaults;
    let mut out = RunReport::default();

    if let Some(section) = &file.project {
        let report = analyze_project(&section.name, &section.inputs, file.risk.as_ref(), defaults)
            .with_context(|| format!("project {:?}", section.name))?;
        if let Some(metrics) = report.metrics() {
            if let Some(facts) = &file.risk {
                out.due_diligence = Some(due_diligence(facts, metrics)?);
            }
            let shocks = file.scenarios.clone().unwrap_or_else(standard_shocks);
            out.scaled_scenarios = Some(project(metrics, &shocks)?);
        }
        out.reprojected_scenarios = Some(reproject(
            &section.inputs,
            &standard_input_shocks(),
            defaults.discount_rate_percent,
        )?);
        if let Some(mc) = &file.monte_carlo {
            let mut config = MonteCarloConfig::from_defaults(defaults);
            if let Some(spread) = mc.price_spread_percent {
                config.price_spread_percent = spread;
            }
            if let Some(spread) = mc.cost_spread_percent {
                config.cost_spread_percent = spread;
            }
            out.monte_carlo = Some(simulate(&section.inputs, &config)?);
        }
        out.project = Some(report);
    }

    if let Some(section) = &file.mining {
        let spec = section.equipment.resolve()?;
        let report = analyze_mining(&section.name, &spec, &section.market, None, defaults)
            .with_context(|| format!("mining {:?}", section.name))?;
        out.mining = Some(report);
    }

    if !file.portfolio.is_empty() {
        out.portfolio = Some(summarize(&file.portfolio)?);
    }

    info!(
        project = out.project.is_some(),
        mining = out.mining.is_some(),
        portfolio = out.portfolio.is_some(),
        "scenario evaluated"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use volt_analysis::ResultKind;
    use volt_core::{Derived, RevenueMode};

    const BUNDLED: &str = include_str!("../../../scenarios/hosting_site.yaml");

    #[test]
    fn bundled_scenario_parses() {
        let file = ScenarioFile::from_yaml(BUNDLED).unwrap();
        assert_eq!(file.defaults.monte_carlo_runs, 500);
        // Unset keys keep engine defaults.
        assert_eq!(file.defaults.block_time_seconds, 600);
        let project = file.project.as_ref().unwrap();
        assert_eq!(project.inputs.energy.mode, RevenueMode::Hosting);
        assert_eq!(project.inputs.energy.hours_per_year, 8760);
        assert!(matches!(
            file.mining.as_ref().unwrap().equipment,
            EquipmentRef::Catalog(_)
        ));
        assert_eq!(file.portfolio.len(), 2);
        assert_eq!(file.scenarios.as_ref().unwrap().len(), 3);
    }

    #[test]
    fn bundled_scenario_runs() {
        let file = ScenarioFile::from_yaml(BUNDLED).unwrap();
        let report = run(&file).unwrap();
        let project = report.project.as_ref().unwrap();
        assert!(matches!(project.result, ResultKind::Hosting { .. }));
        assert!(project.base.risk.is_some());
        assert!(report.due_diligence.is_some());
        assert_eq!(report.scaled_scenarios.as_ref().unwrap().results.len(), 3);
        assert_eq!(report.monte_carlo.as_ref().unwrap().runs, 500);
        assert!(matches!(
            report.mining.as_ref().unwrap().result,
            ResultKind::Mining { .. }
        ));
        let portfolio = report.portfolio.as_ref().unwrap();
        assert_eq!(portfolio.total_invested, Decimal::from(1_500_000));
        assert!(matches!(portfolio.unrealized_gain_percent, Derived::Value(_)));
        assert!(serde_json::to_string(&report).is_ok());
    }

    #[test]
    fn unknown_equipment_is_an_error() {
        let yaml = r#"
mining:
  name: mystery
  equipment: Nonexistent 9000
  market:
    coin_price_usd: 50000
    network_difficulty: 1.0e14
    energy_rate_per_kwh: 0.05
    as_of: 2024-01-01T00:00:00Z
"#;
        let file = ScenarioFile::from_yaml(yaml).unwrap();
        assert!(run(&file).is_err());
    }

    #[test]
    fn explicit_spec_is_accepted() {
        let yaml = r#"
mining:
  name: custom
  equipment:
    model: Custom rig
    hashrate_ths: 100
    power_watts: 3000
    price_usd: 2000
  market:
    coin_price_usd: 50000
    network_difficulty: 1.0e14
    energy_rate_per_kwh: 0.05
    as_of: 2024-01-01T00:00:00Z
"#;
        let file = ScenarioFile::from_yaml(yaml).unwrap();
        let report = run(&file).unwrap();
        assert!(report.project.is_none());
        assert_eq!(report.mining.unwrap().base.name, "custom");
    }

    #[test]
    fn empty_file_runs_nothing() {
        let report = run(&ScenarioFile::default()).unwrap();
        assert!(report.project.is_none() && report.mining.is_none() && report.portfolio.is_none());
    }
}
