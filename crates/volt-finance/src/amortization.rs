//! Fixed-rate annuity loans.

use rust_decimal::{Decimal, MathematicalOps};
use serde::{Deserialize, Serialize};
use tracing::debug;
use volt_core::{validate_loan, CalcError, LoanTerms};

use crate::{mul, sub};

const MONTHS_PER_YEAR: u32 = 12;

/// Level monthly payment for a fixed-rate loan.
///
/// monthly_rate = rate / 100 / 12, n = years * 12;
/// payment = P * r / (1 - (1+r)^-n), or P / n when r == 0.
///
/// The discount factor (1+r)^-n only shrinks, so long terms at high rates
/// converge on the interest-only payment P * r instead of overflowing.
///
/// ```
/// use rust_decimal::Decimal;
/// use volt_finance::monthly_payment;
///
/// let p = monthly_payment(Decimal::from(1200), Decimal::ZERO, 1).unwrap();
/// assert_eq!(p, Decimal::from(100));
/// ```
pub fn monthly_payment(
    principal: Decimal,
    annual_rate_percent: Decimal,
    term_years: u32,
) -> Result<Decimal, CalcError> {
    validate_loan(&LoanTerms {
        principal,
        annual_rate_percent,
        term_years,
    })?;
    if principal.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let n = term_years * MONTHS_PER_YEAR;
    let monthly_rate = monthly_rate(annual_rate_percent);
    if monthly_rate.is_zero() {
        return Ok(principal / Decimal::from(n));
    }
    let discount = Decimal::ONE
        .checked_div(Decimal::ONE + monthly_rate)
        .and_then(|d| d.checked_powu(u64::from(n)))
        .ok_or(CalcError::Overflow {
            field: "monthly_payment",
        })?;
    let paid_down = sub("monthly_payment", Decimal::ONE, discount)?;
    if paid_down.is_zero() {
        // Rate below Decimal resolution.
        return Ok(principal / Decimal::from(n));
    }
    let factor = monthly_rate
        .checked_div(paid_down)
        .ok_or(CalcError::Overflow {
            field: "monthly_payment",
        })?;
    let payment = mul("monthly_payment", principal, factor)?;
    debug!(%principal, %annual_rate_percent, term_years, %payment, "monthly payment");
    Ok(payment)
}

/// Twelve monthly payments.
pub fn annual_debt_service(loan: &LoanTerms) -> Result<Decimal, CalcError> {
    let payment = monthly_payment(loan.principal, loan.annual_rate_percent, loan.term_years)?;
    mul("annual_debt_service", payment, Decimal::from(MONTHS_PER_YEAR))
}

/// Interest/principal split of one loan year.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmortizationYear {
    pub year: u32,
    pub payment: Decimal,
    pub interest: Decimal,
    pub principal: Decimal,
    pub remaining_balance: Decimal,
}

/// Yearly amortization schedule built from monthly compounding.
pub fn schedule(loan: &LoanTerms) -> Result<Vec<AmortizationYear>, CalcError> {
    let payment = monthly_payment(loan.principal, loan.annual_rate_percent, loan.term_years)?;
    let rate = monthly_rate(loan.annual_rate_percent);
    let mut balance = loan.principal;
    let mut years = Vec::with_capacity(loan.term_years as usize);
    for year in 1..=loan.term_years {
        let mut interest = Decimal::ZERO;
        let mut principal = Decimal::ZERO;
        for _ in 0..MONTHS_PER_YEAR {
            let month_interest = mul("schedule", balance, rate)?;
            let month_principal = sub("schedule", payment, month_interest)?;
            interest += month_interest;
            principal += month_principal;
            balance = sub("schedule", balance, month_principal)?;
        }
        years.push(AmortizationYear {
            year,
            payment: mul("schedule", payment, Decimal::from(MONTHS_PER_YEAR))?,
            interest,
            principal,
            remaining_balance: balance,
        });
    }
    Ok(years)
}

fn monthly_rate(annual_rate_percent: Decimal) -> Decimal {
    annual_rate_percent / Decimal::ONE_HUNDRED / Decimal::from(MONTHS_PER_YEAR)
}
