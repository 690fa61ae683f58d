use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::EngineLimits;
use crate::error::FinCalcError;
use crate::rates::{add_periods, periodic_rate};
use crate::time_value::annuity_payment;
use crate::types::*;
use crate::FinCalcResult;

/// Balances below this after a payment are treated as paid off.
const BALANCE_DUST: Decimal = dec!(0.000001);

/// Working scale for interest and scheduled payments. Keeps every sum in the
/// schedule exact so `principal + interest == payment` holds to the digit.
const MONEY_DP: u32 = 10;

/// How the scheduled (pre-extra) payment is determined
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum PaymentRule {
    /// Level payment from the annuity formula at the standard APR over the full term
    #[default]
    Annuity,
    /// Caller-supplied level payment
    Fixed { amount: Money },
    /// Percentage of each period's opening balance, rounded up to the cent
    PercentOfBalance { percent: Percent },
}

/// Cadence of a recurring extra payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtraPaymentFrequency {
    Monthly,
    Quarterly,
    Annually,
    OneTime,
}

impl ExtraPaymentFrequency {
    /// Loan periods between extra payments, None for a single payment.
    fn interval(self, periods_per_year: u32) -> Option<u32> {
        match self {
            ExtraPaymentFrequency::Monthly => Some((periods_per_year / 12).max(1)),
            ExtraPaymentFrequency::Quarterly => Some((periods_per_year / 4).max(1)),
            ExtraPaymentFrequency::Annually => Some(periods_per_year.max(1)),
            ExtraPaymentFrequency::OneTime => None,
        }
    }
}

fn first_period() -> u32 {
    1
}

/// Additional principal paid on top of the scheduled payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraPayment {
    pub amount: Money,
    pub frequency: ExtraPaymentFrequency,
    /// First period (1-based) the extra payment is made
    #[serde(default = "first_period")]
    pub start_period: u32,
}

/// Irregular one-off payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LumpSum {
    pub period: u32,
    pub amount: Money,
}

/// Alternate APR applied to the first `periods` periods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoWindow {
    pub apr: Percent,
    pub periods: u32,
}

/// Loan terms fed to the amortization engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSpec {
    pub principal: Money,
    /// Annual percentage rate (4.9 = 4.9%)
    pub apr: Percent,
    /// Contractual number of payments
    pub term_periods: u32,
    #[serde(default)]
    pub frequency: PaymentFrequency,
    #[serde(default)]
    pub payment: PaymentRule,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_payment: Option<ExtraPayment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lump_sums: Vec<LumpSum>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo: Option<PromoWindow>,
    /// Loan origination date; the first payment falls one period later
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}

impl LoanSpec {
    /// Plain monthly annuity loan.
    pub fn new(principal: Money, apr: Percent, term_periods: u32) -> Self {
        Self {
            principal,
            apr,
            term_periods,
            frequency: PaymentFrequency::Monthly,
            payment: PaymentRule::Annuity,
            extra_payment: None,
            lump_sums: Vec::new(),
            promo: None,
            start_date: None,
        }
    }

    fn has_extras(&self) -> bool {
        self.extra_payment
            .as_ref()
            .is_some_and(|e| e.amount > Decimal::ZERO)
            || self.lump_sums.iter().any(|l| l.amount > Decimal::ZERO)
    }
}

/// One row of the schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationEntry {
    pub period: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    /// Periodic rate applied this period
    pub rate: Rate,
    /// Total paid this period (scheduled + extra, clamped on the final period)
    pub payment: Money,
    /// Portion of `payment` above the scheduled payment
    pub extra_payment: Money,
    pub interest: Money,
    pub principal: Money,
    pub balance: Money,
    pub cumulative_interest: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationResult {
    /// Scheduled payment for the first period
    pub scheduled_payment: Money,
    pub periodic_rate: Rate,
    pub entries: Vec<AmortizationEntry>,
    pub total_interest: Money,
    pub total_paid: Money,
    pub total_extra_paid: Money,
    pub payoff_periods: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payoff_date: Option<NaiveDate>,
    /// Interest avoided relative to the same loan without extra payments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_saved: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub periods_saved: Option<u32>,
}

impl AmortizationResult {
    /// Cumulative amount paid at the end of each of the first `horizon`
    /// periods, flat once the loan is retired.
    pub fn cumulative_payments(&self, horizon: u32) -> Vec<Money> {
        let mut series = Vec::with_capacity(horizon as usize);
        let mut running = Decimal::ZERO;
        for period in 1..=horizon {
            if let Some(entry) = self.entries.get((period - 1) as usize) {
                running += entry.payment;
            }
            series.push(running);
        }
        series
    }

    /// Balance outstanding after `period` payments (0 once retired).
    pub fn balance_after(&self, period: u32, principal: Money) -> Money {
        if period == 0 {
            return principal;
        }
        self.entries
            .get((period - 1) as usize)
            .map(|e| e.balance)
            .unwrap_or(Decimal::ZERO)
    }
}

fn round_up_to_cent(amount: Money) -> Money {
    amount.round_dp_with_strategy(2, RoundingStrategy::ToPositiveInfinity)
}

fn validate(spec: &LoanSpec, limits: &EngineLimits) -> FinCalcResult<()> {
    limits.validate()?;
    if spec.principal <= Decimal::ZERO {
        return Err(FinCalcError::InvalidInput {
            field: "principal".into(),
            reason: "Principal must be positive".into(),
        });
    }
    if spec.apr < Decimal::ZERO {
        return Err(FinCalcError::InvalidInput {
            field: "apr".into(),
            reason: "APR cannot be negative".into(),
        });
    }
    if spec.term_periods == 0 {
        return Err(FinCalcError::InvalidInput {
            field: "term_periods".into(),
            reason: "Term must be at least 1 period".into(),
        });
    }
    match &spec.payment {
        PaymentRule::Annuity => {}
        PaymentRule::Fixed { amount } => {
            if *amount <= Decimal::ZERO {
                return Err(FinCalcError::InvalidInput {
                    field: "payment".into(),
                    reason: "Fixed payment must be positive".into(),
                });
            }
        }
        PaymentRule::PercentOfBalance { percent } => {
            if *percent <= Decimal::ZERO || *percent > dec!(100) {
                return Err(FinCalcError::InvalidInput {
                    field: "payment".into(),
                    reason: "Percent of balance must be in (0, 100]".into(),
                });
            }
        }
    }
    if let Some(extra) = &spec.extra_payment {
        if extra.amount < Decimal::ZERO {
            return Err(FinCalcError::InvalidInput {
                field: "extra_payment.amount".into(),
                reason: "Extra payment cannot be negative".into(),
            });
        }
        if extra.start_period == 0 {
            return Err(FinCalcError::InvalidInput {
                field: "extra_payment.start_period".into(),
                reason: "Periods are 1-based".into(),
            });
        }
    }
    for lump in &spec.lump_sums {
        if lump.amount < Decimal::ZERO || lump.period == 0 {
            return Err(FinCalcError::InvalidInput {
                field: "lump_sums".into(),
                reason: format!(
                    "Lump sum {} at period {} must be non-negative and 1-based",
                    lump.amount, lump.period
                ),
            });
        }
    }
    if let Some(promo) = &spec.promo {
        if promo.apr < Decimal::ZERO {
            return Err(FinCalcError::InvalidInput {
                field: "promo.apr".into(),
                reason: "Promotional APR cannot be negative".into(),
            });
        }
    }
    Ok(())
}

fn extra_due(spec: &LoanSpec, period: u32) -> Money {
    let mut extra = Decimal::ZERO;
    if let Some(e) = &spec.extra_payment {
        if period >= e.start_period {
            let due = match e.frequency.interval(spec.frequency.periods_per_year()) {
                Some(step) => (period - e.start_period) % step == 0,
                None => period == e.start_period,
            };
            if due {
                extra += e.amount;
            }
        }
    }
    extra += spec
        .lump_sums
        .iter()
        .filter(|l| l.period == period)
        .map(|l| l.amount)
        .sum::<Decimal>();
    extra
}

struct Run {
    entries: Vec<AmortizationEntry>,
    total_interest: Money,
    total_paid: Money,
    total_extra: Money,
}

fn run(
    spec: &LoanSpec,
    limits: &EngineLimits,
    standard_rate: Rate,
    promo_rate: Option<(Rate, u32)>,
    scheduled: Money,
    include_extras: bool,
) -> FinCalcResult<Run> {
    let mut entries = Vec::with_capacity(spec.term_periods.min(limits.max_periods) as usize);
    let mut balance = spec.principal;
    let mut total_interest = Decimal::ZERO;
    let mut total_paid = Decimal::ZERO;
    let mut total_extra = Decimal::ZERO;

    for period in 1..=limits.max_periods {
        let opening = balance;

        // Promo window is 0-based: active while period - 1 < window length
        let rate = match promo_rate {
            Some((r, len)) if period - 1 < len => r,
            _ => standard_rate,
        };
        let interest = (opening * rate).round_dp(MONEY_DP);

        let base = match &spec.payment {
            PaymentRule::PercentOfBalance { percent } => {
                round_up_to_cent(opening * *percent / dec!(100))
            }
            _ => scheduled,
        };
        let extra = if include_extras {
            extra_due(spec, period)
        } else {
            Decimal::ZERO
        };

        let amount_due = opening + interest;
        let (payment, principal) = if base + extra >= amount_due {
            // Final payment never pays more than balance + accrued interest
            balance = Decimal::ZERO;
            (amount_due, opening)
        } else {
            let paid = base + extra;
            let mut principal = paid - interest;
            if principal <= Decimal::ZERO {
                return Err(FinCalcError::NonConvergence {
                    function: "amortize".into(),
                    iterations: period,
                    last_delta: principal,
                });
            }
            balance = opening - principal;
            if balance < BALANCE_DUST {
                principal += balance;
                balance = Decimal::ZERO;
            }
            (principal + interest, principal)
        };

        let extra_paid = (payment - base).max(Decimal::ZERO);
        total_interest += interest;
        total_paid += payment;
        total_extra += extra_paid;

        let date = match spec.start_date {
            Some(start) => Some(add_periods(start, period, spec.frequency)?),
            None => None,
        };

        entries.push(AmortizationEntry {
            period,
            date,
            rate,
            payment,
            extra_payment: extra_paid,
            interest,
            principal,
            balance,
            cumulative_interest: total_interest,
        });

        if balance.is_zero() {
            return Ok(Run {
                entries,
                total_interest,
                total_paid,
                total_extra,
            });
        }
    }

    Err(FinCalcError::NonConvergence {
        function: "amortize".into(),
        iterations: limits.max_periods,
        last_delta: balance,
    })
}

/// Build the schedule without the output envelope. Recoverable issues are
/// appended to `warnings`.
pub(crate) fn build_schedule(
    spec: &LoanSpec,
    limits: &EngineLimits,
    warnings: &mut Vec<String>,
) -> FinCalcResult<AmortizationResult> {
    validate(spec, limits)?;

    let ppy = spec.frequency.periods_per_year();
    let standard_rate = periodic_rate(spec.apr, ppy)?;
    let promo_rate = match &spec.promo {
        Some(p) if p.periods > 0 => Some((periodic_rate(p.apr, ppy)?, p.periods)),
        _ => None,
    };

    let scheduled = match &spec.payment {
        PaymentRule::Annuity => {
            annuity_payment(spec.principal, standard_rate, spec.term_periods)?.round_dp(MONEY_DP)
        }
        PaymentRule::Fixed { amount } => *amount,
        PaymentRule::PercentOfBalance { percent } => {
            let opening_rate = promo_rate.map(|(r, _)| r).unwrap_or(standard_rate);
            let first = round_up_to_cent(spec.principal * *percent / dec!(100));
            if first <= spec.principal * opening_rate {
                warnings.push(format!(
                    "{percent}% of balance does not cover first-period interest"
                ));
            }
            first
        }
    };

    let outcome = run(spec, limits, standard_rate, promo_rate, scheduled, true);
    let result = match outcome {
        Ok(r) => r,
        Err(e) => {
            warn!(principal = %spec.principal, apr = %spec.apr, "loan does not amortize: {e}");
            return Err(e);
        }
    };

    let (interest_saved, periods_saved) = if spec.has_extras() {
        match run(spec, limits, standard_rate, promo_rate, scheduled, false) {
            Ok(baseline) => (
                Some(baseline.total_interest - result.total_interest),
                Some(
                    (baseline.entries.len() as u32).saturating_sub(result.entries.len() as u32),
                ),
            ),
            Err(_) => {
                warnings.push(
                    "Loan does not pay off without the extra payments; savings not computed"
                        .into(),
                );
                (None, None)
            }
        }
    } else {
        (None, None)
    };

    let payoff_periods = result.entries.len() as u32;
    let payoff_date = result.entries.last().and_then(|e| e.date);

    debug!(
        payoff_periods,
        total_interest = %result.total_interest,
        "amortization schedule built"
    );

    Ok(AmortizationResult {
        scheduled_payment: scheduled,
        periodic_rate: standard_rate,
        entries: result.entries,
        total_interest: result.total_interest,
        total_paid: result.total_paid,
        total_extra_paid: result.total_extra,
        payoff_periods,
        payoff_date,
        interest_saved,
        periods_saved,
    })
}

/// Build a period-by-period amortization schedule.
///
/// Terminates the first period the balance reaches zero. Returns
/// `NonConvergence` when a period's payment does not exceed its interest or
/// when the balance is still outstanding after `limits.max_periods` periods.
pub fn amortize(
    spec: &LoanSpec,
    limits: &EngineLimits,
) -> FinCalcResult<ComputationOutput<AmortizationResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let output = build_schedule(spec, limits, &mut warnings)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Fixed-payment amortization schedule",
        &serde_json::json!({
            "principal": spec.principal.to_string(),
            "apr": spec.apr.to_string(),
            "term_periods": spec.term_periods,
            "frequency": spec.frequency,
            "max_periods": limits.max_periods,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn limits() -> EngineLimits {
        EngineLimits::default()
    }

    #[test]
    fn test_auto_loan_reference() {
        let spec = LoanSpec::new(dec!(22500), dec!(4.9), 60);
        let out = amortize(&spec, &limits()).unwrap().result;
        assert!((out.scheduled_payment - dec!(423.57)).abs() < dec!(0.01));
        assert_eq!(out.payoff_periods, 60);
        assert!((out.total_interest - dec!(2920)).abs() < dec!(10));
        assert_eq!(out.entries.last().unwrap().balance, Decimal::ZERO);
    }

    #[test]
    fn test_zero_rate() {
        let spec = LoanSpec::new(dec!(1200), Decimal::ZERO, 12);
        let out = amortize(&spec, &limits()).unwrap().result;
        assert_eq!(out.scheduled_payment, dec!(100));
        assert_eq!(out.total_interest, Decimal::ZERO);
        assert_eq!(out.payoff_periods, 12);
    }

    #[test]
    fn test_rows_balance() {
        let spec = LoanSpec::new(dec!(10000), dec!(7.5), 36);
        let out = amortize(&spec, &limits()).unwrap().result;
        let mut prev = spec.principal;
        for e in &out.entries {
            assert_eq!(e.principal + e.interest, e.payment);
            assert!(e.balance <= prev);
            assert_eq!(e.balance, (prev - e.principal).max(Decimal::ZERO));
            prev = e.balance;
        }
    }

    #[test]
    fn test_payment_below_interest_does_not_converge() {
        let mut spec = LoanSpec::new(dec!(10000), dec!(12), 60);
        // First-period interest is exactly 100
        spec.payment = PaymentRule::Fixed { amount: dec!(100) };
        let err = amortize(&spec, &limits()).unwrap_err();
        assert!(err.is_non_convergence());
    }

    #[test]
    fn test_ceiling_reached() {
        let mut spec = LoanSpec::new(dec!(100000), dec!(6), 360);
        // Barely covers interest (500): needs far more than 600 periods
        spec.payment = PaymentRule::Fixed { amount: dec!(501) };
        match amortize(&spec, &limits()) {
            Err(FinCalcError::NonConvergence { iterations, .. }) => assert_eq!(iterations, 600),
            other => panic!("expected non-convergence, got {other:?}"),
        }
    }

    #[test]
    fn test_extra_payment_saves_interest() {
        let mut spec = LoanSpec::new(dec!(22500), dec!(4.9), 60);
        spec.extra_payment = Some(ExtraPayment {
            amount: dec!(100),
            frequency: ExtraPaymentFrequency::Monthly,
            start_period: 1,
        });
        let out = amortize(&spec, &limits()).unwrap().result;
        assert!(out.payoff_periods < 60);
        assert!(out.interest_saved.unwrap() > Decimal::ZERO);
        assert!(out.periods_saved.unwrap() > 0);
        assert!(out.total_extra_paid > Decimal::ZERO);
    }

    #[test]
    fn test_quarterly_extra_schedule() {
        let mut spec = LoanSpec::new(dec!(5000), dec!(6), 24);
        spec.extra_payment = Some(ExtraPayment {
            amount: dec!(50),
            frequency: ExtraPaymentFrequency::Quarterly,
            start_period: 2,
        });
        let out = amortize(&spec, &limits()).unwrap().result;
        assert_eq!(out.entries[0].extra_payment, Decimal::ZERO);
        assert_eq!(out.entries[1].extra_payment, dec!(50));
        assert_eq!(out.entries[2].extra_payment, Decimal::ZERO);
        assert_eq!(out.entries[4].extra_payment, dec!(50));
    }

    #[test]
    fn test_lump_sum_clamped_to_balance() {
        let mut spec = LoanSpec::new(dec!(1000), dec!(12), 12);
        spec.lump_sums = vec![LumpSum {
            period: 2,
            amount: dec!(5000),
        }];
        let out = amortize(&spec, &limits()).unwrap().result;
        assert_eq!(out.payoff_periods, 2);
        let last = out.entries.last().unwrap();
        assert_eq!(last.balance, Decimal::ZERO);
        assert_eq!(last.principal + last.interest, last.payment);
    }

    #[test]
    fn test_promo_window_rate_switch() {
        let mut spec = LoanSpec::new(dec!(6000), dec!(18), 24);
        spec.promo = Some(PromoWindow {
            apr: Decimal::ZERO,
            periods: 6,
        });
        let out = amortize(&spec, &limits()).unwrap().result;
        assert_eq!(out.entries[5].interest, Decimal::ZERO);
        assert_eq!(out.entries[6].rate, dec!(0.015));
        assert!(out.entries[6].interest > Decimal::ZERO);
    }

    #[test]
    fn test_percent_of_balance_rule() {
        let mut spec = LoanSpec::new(dec!(1000), dec!(12), 12);
        spec.payment = PaymentRule::PercentOfBalance { percent: dec!(10) };
        let out = amortize(&spec, &limits()).unwrap().result;
        assert_eq!(out.entries[0].payment, dec!(100));
        assert!(out.entries[1].payment < dec!(100));
        assert_eq!(out.entries.last().unwrap().balance, Decimal::ZERO);
    }

    #[test]
    fn test_payoff_date() {
        let mut spec = LoanSpec::new(dec!(1200), Decimal::ZERO, 12);
        spec.start_date = NaiveDate::from_ymd_opt(2025, 1, 15);
        let out = amortize(&spec, &limits()).unwrap().result;
        assert_eq!(out.entries[0].date, NaiveDate::from_ymd_opt(2025, 2, 15));
        assert_eq!(out.payoff_date, NaiveDate::from_ymd_opt(2026, 1, 15));
    }

    #[test]
    fn test_invalid_inputs() {
        let mut spec = LoanSpec::new(dec!(-1), dec!(5), 12);
        assert!(amortize(&spec, &limits()).is_err());
        spec.principal = dec!(1000);
        spec.apr = dec!(-1);
        assert!(amortize(&spec, &limits()).is_err());
        spec.apr = dec!(5);
        spec.term_periods = 0;
        assert!(amortize(&spec, &limits()).is_err());
    }

    #[test]
    fn test_cumulative_payments_flat_after_payoff() {
        let spec = LoanSpec::new(dec!(1200), Decimal::ZERO, 12);
        let out = amortize(&spec, &limits()).unwrap().result;
        let series = out.cumulative_payments(15);
        assert_eq!(series.len(), 15);
        assert_eq!(series[11], dec!(1200));
        assert_eq!(series[14], dec!(1200));
    }
}
