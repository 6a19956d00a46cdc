#![deny(warnings)]

//! Proof-of-work mining economics: expected daily yield, revenue, power cost
//! and break-even coin price for a single machine.
//!
//! Network hashrate is not observed directly. It is estimated from difficulty
//! as `difficulty * 2^32 / block_time`, and every result built on it carries
//! [`Approximation::NetworkHashrateEstimate`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use volt_core::{
    require_non_negative, require_positive_f64, to_decimal, validate_equipment,
    validate_snapshot, Approximation, CalcError, Derived, EngineDefaults, MarketSnapshot,
    MiningEquipmentSpec,
};

const HASHES_PER_TERAHASH: f64 = 1e12;
const DIFFICULTY_ONE_HASHES: f64 = 4_294_967_296.0; // 2^32
const SECONDS_PER_DAY: f64 = 86_400.0;
const HOURS_PER_DAY: i64 = 24;
const WATTS_PER_KW: i64 = 1000;

/// Inputs for one machine under one set of market conditions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MiningInputs {
    pub hashrate_ths: f64,
    pub power_watts: f64,
    pub network_difficulty: f64,
    pub block_reward_coins: f64,
    pub coin_price_usd: Decimal,
    pub energy_rate_per_kwh: Decimal,
    #[serde(default = "default_block_time")]
    pub block_time_seconds: u32,
    #[serde(default)]
    pub maintenance_cost_daily_usd: Decimal,
}

fn default_block_time() -> u32 {
    EngineDefaults::default().block_time_seconds
}

impl MiningInputs {
    /// Combine a catalog machine with live market data; block parameters and
    /// maintenance come from `defaults`.
    pub fn from_snapshot(
        spec: &MiningEquipmentSpec,
        snapshot: &MarketSnapshot,
        defaults: &EngineDefaults,
    ) -> Result<Self, CalcError> {
        validate_equipment(spec)?;
        validate_snapshot(snapshot)?;
        Ok(Self {
            hashrate_ths: spec.hashrate_ths,
            power_watts: spec.power_watts,
            network_difficulty: snapshot.network_difficulty,
            block_reward_coins: defaults.block_reward_coins,
            coin_price_usd: snapshot.coin_price_usd,
            energy_rate_per_kwh: snapshot.energy_rate_per_kwh,
            block_time_seconds: defaults.block_time_seconds,
            maintenance_cost_daily_usd: defaults.maintenance_cost_daily_usd,
        })
    }

    fn validate(&self) -> Result<(), CalcError> {
        require_non_negative_f64("hashrate_ths", self.hashrate_ths)?;
        require_non_negative_f64("power_watts", self.power_watts)?;
        require_positive_f64("network_difficulty", self.network_difficulty)?;
        require_non_negative_f64("block_reward_coins", self.block_reward_coins)?;
        require_non_negative("coin_price_usd", self.coin_price_usd)?;
        require_non_negative("energy_rate_per_kwh", self.energy_rate_per_kwh)?;
        require_non_negative("maintenance_cost_daily_usd", self.maintenance_cost_daily_usd)?;
        if self.block_time_seconds == 0 {
            return Err(CalcError::invalid("block_time_seconds", "must be > 0"));
        }
        Ok(())
    }
}

/// Expected economics for one day of operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyMining {
    pub daily_coin: f64,
    pub daily_revenue_usd: Decimal,
    pub daily_power_cost_usd: Decimal,
    pub daily_maintenance_usd: Decimal,
    pub daily_profit_usd: Decimal,
    /// Coin price at which revenue covers power; undefined at zero yield.
    pub break_even_coin_price_usd: Derived<Decimal>,
    pub approximations: Vec<Approximation>,
}

/// Daily figures scaled to a number of days.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodMining {
    pub days: u32,
    pub coin: f64,
    pub revenue_usd: Decimal,
    pub power_cost_usd: Decimal,
    pub maintenance_usd: Decimal,
    pub profit_usd: Decimal,
}

impl DailyMining {
    pub fn over_days(&self, days: u32) -> Result<PeriodMining, CalcError> {
        let n = Decimal::from(days);
        let scale = |field: &'static str, v: Decimal| {
            v.checked_mul(n).ok_or(CalcError::Overflow { field })
        };
        Ok(PeriodMining {
            days,
            coin: self.daily_coin * f64::from(days),
            revenue_usd: scale("period_revenue", self.daily_revenue_usd)?,
            power_cost_usd: scale("period_power_cost", self.daily_power_cost_usd)?,
            maintenance_usd: scale("period_maintenance", self.daily_maintenance_usd)?,
            profit_usd: scale("period_profit", self.daily_profit_usd)?,
        })
    }
}

/// Estimated network hashrate in H/s.
pub fn network_hashrate(difficulty: f64, block_time_seconds: u32) -> Result<f64, CalcError> {
    require_positive_f64("network_difficulty", difficulty)?;
    if block_time_seconds == 0 {
        return Err(CalcError::invalid("block_time_seconds", "must be > 0"));
    }
    let hashrate = difficulty * DIFFICULTY_ONE_HASHES / f64::from(block_time_seconds);
    if !hashrate.is_finite() {
        return Err(CalcError::NonFinite {
            field: "network_hashrate",
        });
    }
    Ok(hashrate)
}

/// Expected coins mined per day at the machine's share of network hashrate.
pub fn daily_coin_yield(inputs: &MiningInputs) -> Result<f64, CalcError> {
    let network = network_hashrate(inputs.network_difficulty, inputs.block_time_seconds)?;
    let share = inputs.hashrate_ths * HASHES_PER_TERAHASH / network;
    let blocks_per_day = SECONDS_PER_DAY / f64::from(inputs.block_time_seconds);
    let coin = share * inputs.block_reward_coins * blocks_per_day;
    if !coin.is_finite() {
        return Err(CalcError::NonFinite { field: "daily_coin" });
    }
    Ok(coin)
}

/// Power bill for 24 hours at the given draw: W / 1000 * 24 * rate.
pub fn daily_power_cost(
    power_watts: f64,
    energy_rate_per_kwh: Decimal,
) -> Result<Decimal, CalcError> {
    require_non_negative_f64("power_watts", power_watts)?;
    let kw = to_decimal("power_watts", power_watts)? / Decimal::from(WATTS_PER_KW);
    kw.checked_mul(Decimal::from(HOURS_PER_DAY))
        .and_then(|kwh| kwh.checked_mul(energy_rate_per_kwh))
        .ok_or(CalcError::Overflow {
            field: "daily_power_cost",
        })
}

/// Daily mining economics for one machine.
pub fn compute_daily(inputs: &MiningInputs) -> Result<DailyMining, CalcError> {
    inputs.validate()?;
    let daily_coin = daily_coin_yield(inputs)?;
    let coin = to_decimal("daily_coin", daily_coin)?;
    let daily_revenue_usd = coin
        .checked_mul(inputs.coin_price_usd)
        .ok_or(CalcError::Overflow {
            field: "daily_revenue",
        })?;
    let daily_power_cost_usd = daily_power_cost(inputs.power_watts, inputs.energy_rate_per_kwh)?;
    let daily_profit_usd = daily_revenue_usd
        .checked_sub(daily_power_cost_usd)
        .and_then(|p| p.checked_sub(inputs.maintenance_cost_daily_usd))
        .ok_or(CalcError::Overflow {
            field: "daily_profit",
        })?;
    let break_even_coin_price_usd: Derived<Decimal> = if coin.is_zero() {
        warn!(
            hashrate_ths = inputs.hashrate_ths,
            "break-even coin price undefined: zero daily yield"
        );
        Derived::NotApplicable
    } else {
        daily_power_cost_usd.checked_div(coin).into()
    };
    debug!(
        daily_coin,
        revenue = %daily_revenue_usd,
        power = %daily_power_cost_usd,
        profit = %daily_profit_usd,
        "daily mining computed"
    );
    Ok(DailyMining {
        daily_coin,
        daily_revenue_usd,
        daily_power_cost_usd,
        daily_maintenance_usd: inputs.maintenance_cost_daily_usd,
        daily_profit_usd,
        break_even_coin_price_usd,
        approximations: vec![Approximation::NetworkHashrateEstimate],
    })
}

/// Days of profit needed to recover the machine price.
pub fn equipment_payback_days(price_usd: Decimal, daily_profit_usd: Decimal) -> Derived<Decimal> {
    if daily_profit_usd <= Decimal::ZERO {
        warn!(%price_usd, %daily_profit_usd, "equipment never pays back");
        return Derived::NotApplicable;
    }
    price_usd.checked_div(daily_profit_usd).into()
}

fn require_non_negative_f64(field: &'static str, value: f64) -> Result<f64, CalcError> {
    if !value.is_finite() {
        return Err(CalcError::NonFinite { field });
    }
    if value < 0.0 {
        return Err(CalcError::invalid(field, format!("must be >= 0, got {value}")));
    }
    Ok(value)
}
