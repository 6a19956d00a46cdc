#![deny(warnings)]

//! Headless runner: evaluates a YAML scenario file and prints a summary.

mod scenario;

use anyhow::{bail, Result};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use volt_analysis::ResultKind;

use crate::scenario::{run, RunReport, ScenarioFile};

#[derive(Debug, Default)]
struct Args {
    scenario: Option<PathBuf>,
    json: bool,
    version: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--scenario" => args.scenario = it.next().map(PathBuf::from),
            "--json" => args.json = true,
            "--version" | "-V" => args.version = true,
            other => bail!("unknown argument {other:?}"),
        }
    }
    Ok(args)
}

fn usd(v: Decimal) -> String {
    format!("${}", v.round_dp(2))
}

fn print_summary(report: &RunReport) {
    if let Some(p) = &report.project {
        let kind = match &p.result {
            ResultKind::Generation { .. } => "generation",
            ResultKind::Hosting { .. } => "hosting",
            ResultKind::Mining { .. } => "mining",
        };
        println!("Project | {} ({kind})", p.base.name);
        if let Some(m) = p.metrics() {
            println!(
                "Returns | ROI: {}% | NPV: {} | IRR: {}% | payback: {} | min DSCR: {}",
                m.roi_percent.map(|v| v.round_dp(1)),
                usd(m.npv),
                m.irr_percent.map(|v| v.round_dp(2)),
                m.payback,
                m.min_dscr.map(|v| v.round_dp(2)),
            );
            println!(
                "Break-even | unit price: {} | first-year margin: {}%",
                m.break_even_unit_price.map(|v| v.round_dp(4)),
                m.profit_margin_percent.map(|v| v.round_dp(1)),
            );
        }
        if let ResultKind::Hosting { annual_margin, .. } = &p.result {
            println!("Hosting | annual margin: {}", usd(*annual_margin));
        }
        if let Some(risk) = &p.base.risk {
            println!("Risk | {} ({})", risk.value, risk.bucket);
        }
    }
    if let Some(dd) = &report.due_diligence {
        println!("Due diligence | {:?}", dd.recommendation);
        for f in &dd.findings {
            println!("  [{:?}] {}", f.severity, f.message);
        }
    }
    if let Some(set) = &report.scaled_scenarios {
        for (name, m) in &set.results {
            println!(
                "Scenario {name} (scaled) | NPV: {} | ROI: {}%",
                usd(m.npv),
                m.roi_percent.map(|v| v.round_dp(1))
            );
        }
    }
    if let Some(set) = &report.reprojected_scenarios {
        for (name, m) in &set.results {
            println!(
                "Scenario {name} (re-projected) | NPV: {} | payback: {}",
                usd(m.npv),
                m.payback
            );
        }
    }
    if let Some(mc) = &report.monte_carlo {
        println!(
            "Monte Carlo | runs: {} | seed: {} | mean NPV: {} | P5: {} | P50: {} | P95: {} | P(loss): {}",
            mc.runs,
            mc.seed,
            usd(mc.mean_npv),
            usd(mc.p5_npv),
            usd(mc.p50_npv),
            usd(mc.p95_npv),
            mc.probability_of_loss.round_dp(3),
        );
    }
    if let Some(m) = &report.mining {
        if let ResultKind::Mining {
            daily,
            yearly,
            payback_days,
            ..
        } = &m.result
        {
            println!(
                "Mining | {} | coin/day: {:.8} | revenue/day: {} | power/day: {} | profit/yr: {} | payback: {} days",
                m.base.name,
                daily.daily_coin,
                usd(daily.daily_revenue_usd),
                usd(daily.daily_power_cost_usd),
                usd(yearly.profit_usd),
                payback_days.map(|v| v.round_dp(0)),
            );
        }
    }
    if let Some(pf) = &report.portfolio {
        println!(
            "Portfolio | holdings: {} | invested: {} | value: {} | gain: {}% | yield: {}%",
            pf.holdings,
            usd(pf.total_invested),
            usd(pf.total_current_value),
            pf.unrealized_gain_percent.map(|v| v.round_dp(1)),
            pf.income_yield_percent.map(|v| v.round_dp(1)),
        );
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args()?;
    if args.version {
        println!(
            "volt-cli {} ({} {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_SHA"),
            env!("BUILD_DATE")
        );
        return Ok(());
    }
    let Some(path) = args.scenario else {
        bail!("usage: volt-cli --scenario <file.yaml> [--json]");
    };
    info!(scenario = %path.display(), json = args.json, "starting CLI");

    let file = ScenarioFile::load(&path)?;
    let report = run(&file)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}
