use log::{debug, trace, warn};
use rust_decimal::{Decimal, RoundingStrategy};
use std::{fmt, iter::FusedIterator, str::FromStr};

use crate::{LoanError, LoanResult};

/// Monetary amounts. Never f64.
pub type Money = Decimal;

/// Rates as decimal fractions (0.045 = 4.5%).
pub type Rate = Decimal;

/// Number of periods materialized by `first_year_schedule`.
pub const DEFAULT_SCHEDULE_PERIODS: u32 = 12;

const MONTHS_PER_YEAR: u32 = 12;
const MONEY_DP: u32 = 2;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PaymentRecord {
    pub index: u32,
    pub payment_amount: Money,
    pub interest_portion: Money,
    pub principal_portion: Money,
    pub balance_after: Money,
}

impl fmt::Display for PaymentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pmt number {}, payment ${}, interest paid ${}, principal paid ${}, ending balance ${}",
            self.index,
            self.payment_amount,
            self.interest_portion,
            self.principal_portion,
            self.balance_after
        )
    }
}

/// A fixed-rate, fully amortizing loan with monthly payments.
///
/// All derived values (monthly rate, payment count, the level payment and the
/// lifetime totals) are fixed at construction; the instance is read-only
/// afterwards.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LoanCalculator {
    principal: Money,
    annual_rate: Rate,
    term_years: u32,
    monthly_rate: Rate,
    total_payments: u32,
    monthly_payment: Money,
    total_interest: Money,
    total_cost: Money,
}

impl LoanCalculator {
    pub fn new(principal: Money, annual_rate: Rate, term_years: i32) -> LoanResult<Self> {
        if principal <= Decimal::ZERO {
            return Err(LoanError::invalid(
                "principal",
                format!("must be greater than zero, got {principal}"),
            ));
        }
        if annual_rate < Decimal::ZERO {
            return Err(LoanError::invalid(
                "annual_rate",
                format!("must not be negative, got {annual_rate}"),
            ));
        }
        let term_years = match u32::try_from(term_years) {
            Ok(years) if years >= 1 => years,
            _ => {
                return Err(LoanError::invalid(
                    "term_years",
                    format!("must be at least one year, got {term_years}"),
                ))
            }
        };
        let total_payments = term_years
            .checked_mul(MONTHS_PER_YEAR)
            .ok_or_else(|| LoanError::invalid("term_years", "too many payment periods"))?;

        let monthly_rate = annual_rate / Decimal::from(MONTHS_PER_YEAR);
        let monthly_payment = level_payment(principal, annual_rate, monthly_rate, total_payments)?;

        // every figure a schedule or total can produce is bounded by the total cost,
        // so if it holds cents the whole loan does
        let total_paid = monthly_payment
            .checked_mul(Decimal::from(total_payments))
            .ok_or_else(principal_out_of_range)?;
        let total_interest =
            checked_money(total_paid - principal).ok_or_else(principal_out_of_range)?;
        let total_cost = principal
            .checked_add(total_interest)
            .and_then(checked_money)
            .ok_or_else(principal_out_of_range)?;

        debug!(
            "loan principal {}, annual rate {}, {} payments at monthly rate {}, payment {}, total interest {}",
            principal, annual_rate, total_payments, monthly_rate, monthly_payment, total_interest
        );

        Ok(Self {
            principal,
            annual_rate,
            term_years,
            monthly_rate,
            total_payments,
            monthly_payment,
            total_interest,
            total_cost,
        })
    }

    /// Builds a calculator from decimal strings, keeping the exact digits given.
    pub fn parse(principal: &str, annual_rate: &str, term_years: i32) -> LoanResult<Self> {
        Self::new(
            parse_decimal("principal", principal)?,
            parse_decimal("annual_rate", annual_rate)?,
            term_years,
        )
    }

    pub fn principal(&self) -> Money {
        self.principal
    }

    pub fn annual_rate(&self) -> Rate {
        self.annual_rate
    }

    pub fn term_years(&self) -> u32 {
        self.term_years
    }

    pub fn monthly_rate(&self) -> Rate {
        self.monthly_rate
    }

    pub fn total_payments(&self) -> u32 {
        self.total_payments
    }

    /// The fixed payment due every period, rounded half-up to cents.
    pub fn compute_monthly_payment(&self) -> Money {
        self.monthly_payment
    }

    /// Walks the amortization recurrence for periods `1..=min(max_periods, total_payments)`.
    pub fn schedule(&self, max_periods: u32) -> AmortizationSchedule {
        AmortizationSchedule {
            payment: self.monthly_payment,
            monthly_rate: self.monthly_rate,
            balance: self.principal,
            next_index: 1,
            remaining: max_periods.min(self.total_payments),
        }
    }

    pub fn first_year_schedule(&self) -> AmortizationSchedule {
        self.schedule(DEFAULT_SCHEDULE_PERIODS)
    }

    pub fn full_schedule(&self) -> AmortizationSchedule {
        self.schedule(self.total_payments)
    }

    /// Interest over the whole life of the loan: every payment less the principal.
    pub fn total_interest_paid(&self) -> Money {
        self.total_interest
    }

    pub fn total_cost(&self) -> Money {
        self.total_cost
    }
}

/// Period-by-period amortization. Each record depends on the running balance
/// left by the previous one, so the sequence cannot be restarted or split.
#[derive(Clone, Debug)]
pub struct AmortizationSchedule {
    payment: Money,
    monthly_rate: Rate,
    // unrounded; only the emitted balance is rounded
    balance: Money,
    next_index: u32,
    remaining: u32,
}

impl Iterator for AmortizationSchedule {
    type Item = PaymentRecord;

    fn next(&mut self) -> Option<PaymentRecord> {
        if self.remaining == 0 {
            return None;
        }

        let interest = round_money(self.balance * self.monthly_rate);
        let principal = self.payment - interest;
        self.balance -= principal;

        let record = PaymentRecord {
            index: self.next_index,
            payment_amount: self.payment,
            interest_portion: interest,
            principal_portion: principal,
            balance_after: round_money(self.balance),
        };
        trace!(
            "pmt # {}, interest {}, principal {}, running balance {}",
            record.index,
            interest,
            principal,
            self.balance
        );

        self.next_index += 1;
        self.remaining -= 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for AmortizationSchedule {}

impl FusedIterator for AmortizationSchedule {}

/// Round half-up (away from zero) to exactly two decimal places.
///
/// Amounts whose magnitude leaves no room in the 96-bit mantissa for two
/// fractional digits (above roughly 7.9e26) keep fewer places; loans whose
/// totals reach that range are rejected by `LoanCalculator::new`.
pub fn round_money(amt: Money) -> Money {
    let mut rounded = amt.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_DP);
    rounded
}

/// `round_money`, or `None` when the amount cannot carry two decimal places.
fn checked_money(amt: Money) -> Option<Money> {
    Some(round_money(amt)).filter(|rounded| rounded.scale() == MONEY_DP)
}

fn principal_out_of_range() -> LoanError {
    LoanError::invalid("principal", "loan totals exceed the range representable in cents")
}

fn parse_decimal(field: &str, raw: &str) -> LoanResult<Decimal> {
    Decimal::from_str(raw.trim())
        .map_err(|e| LoanError::invalid(field, format!("'{raw}' is not a decimal number ({e})")))
}

/// (1 + rate)^n by exact decimal multiplication (square-and-multiply).
/// `None` when the result leaves the decimal range.
fn compound_factor(rate: Rate, n: u32) -> Option<Decimal> {
    let mut base = Decimal::ONE + rate;
    let mut exp = n;
    let mut result = Decimal::ONE;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result.checked_mul(base)?;
        }
        exp >>= 1;
        if exp > 0 {
            base = base.checked_mul(base)?;
        }
    }
    Some(result)
}

fn interest_free_payment(principal: Money, total_payments: u32) -> LoanResult<Money> {
    checked_money(principal / Decimal::from(total_payments)).ok_or_else(principal_out_of_range)
}

// payment = P * r * (1 + r)^n / ((1 + r)^n - 1), rounded to cents
fn level_payment(
    principal: Money,
    annual_rate: Rate,
    monthly_rate: Rate,
    total_payments: u32,
) -> LoanResult<Money> {
    if annual_rate.is_zero() {
        return interest_free_payment(principal, total_payments);
    }

    let annuity = match compound_factor(monthly_rate, total_payments) {
        Some(factor) => {
            let growth = factor - Decimal::ONE;
            if growth.is_zero() {
                warn!(
                    "annual rate {} does not compound at decimal precision over {} payments; amortizing interest-free",
                    annual_rate, total_payments
                );
                return interest_free_payment(principal, total_payments);
            }
            // factor / growth stays within [1, 1e28] for any non-zero growth
            factor
                .checked_div(growth)
                .and_then(|ratio| monthly_rate.checked_mul(ratio))
                .ok_or_else(principal_out_of_range)?
        }
        // (1 + r)^n past the decimal range: f / (f - 1) is 1 at 28 digits
        None => {
            debug!(
                "annual rate {} compounds past decimal range over {} payments; payment is interest only",
                annual_rate, total_payments
            );
            monthly_rate
        }
    };

    principal
        .checked_mul(annuity)
        .and_then(checked_money)
        .ok_or_else(principal_out_of_range)
}
