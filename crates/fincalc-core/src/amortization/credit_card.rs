use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::schedule::{
    build_schedule, AmortizationResult, LoanSpec, PaymentRule, PromoWindow,
};
use crate::config::EngineLimits;
use crate::error::FinCalcError;
use crate::types::*;
use crate::FinCalcResult;

/// Issuer minimum-payment rule. The two modes are alternatives, never combined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MinimumPayment {
    /// Percentage of the statement balance, recomputed every month
    PercentOfBalance { percent: Percent },
    /// Flat minimum regardless of balance
    FixedAmount { amount: Money },
}

/// How the card holder intends to pay the balance down
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PayoffPlan {
    Minimum(MinimumPayment),
    FixedPayment { amount: Money },
    /// Solve for the level payment that clears the balance in `months`
    TargetMonths { months: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditCardInput {
    pub balance: Money,
    pub apr: Percent,
    pub plan: PayoffPlan,
    /// Introductory or balance-transfer rate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo: Option<PromoWindow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditCardPayoffOutput {
    pub first_payment: Money,
    pub months_to_payoff: u32,
    pub total_interest: Money,
    pub total_paid: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payoff_date: Option<NaiveDate>,
    pub schedule: AmortizationResult,
}

/// Month-by-month payoff of a revolving balance with no new charges.
pub fn calculate_payoff(
    input: &CreditCardInput,
    limits: &EngineLimits,
) -> FinCalcResult<ComputationOutput<CreditCardPayoffOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.balance <= Decimal::ZERO {
        return Err(FinCalcError::InvalidInput {
            field: "balance".into(),
            reason: "Balance must be positive".into(),
        });
    }

    // Revolving credit has no contractual term; the ceiling bounds the run
    let (payment, term_periods) = match &input.plan {
        PayoffPlan::Minimum(MinimumPayment::PercentOfBalance { percent }) => (
            PaymentRule::PercentOfBalance { percent: *percent },
            limits.max_periods,
        ),
        PayoffPlan::Minimum(MinimumPayment::FixedAmount { amount })
        | PayoffPlan::FixedPayment { amount } => {
            (PaymentRule::Fixed { amount: *amount }, limits.max_periods)
        }
        PayoffPlan::TargetMonths { months } => {
            if *months == 0 {
                return Err(FinCalcError::InvalidInput {
                    field: "plan.months".into(),
                    reason: "Target must be at least 1 month".into(),
                });
            }
            if input.promo.is_some() {
                warnings.push(
                    "Target payment is solved at the standard APR; the promotional window shortens the payoff"
                        .into(),
                );
            }
            (PaymentRule::Annuity, *months)
        }
    };

    let mut spec = LoanSpec::new(input.balance, input.apr, term_periods);
    spec.payment = payment;
    spec.promo = input.promo.clone();
    spec.start_date = input.start_date;

    let schedule = build_schedule(&spec, limits, &mut warnings)?;

    let first_payment = schedule
        .entries
        .first()
        .map(|e| e.payment)
        .unwrap_or(schedule.scheduled_payment);

    let output = CreditCardPayoffOutput {
        first_payment,
        months_to_payoff: schedule.payoff_periods,
        total_interest: schedule.total_interest,
        total_paid: schedule.total_paid,
        payoff_date: schedule.payoff_date,
        schedule,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Credit card payoff schedule",
        &serde_json::json!({
            "balance": input.balance.to_string(),
            "apr": input.apr.to_string(),
            "plan": input.plan,
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

    fn input(plan: PayoffPlan) -> CreditCardInput {
        CreditCardInput {
            balance: dec!(5000),
            apr: dec!(19.99),
            plan,
            promo: None,
            start_date: None,
        }
    }

    #[test]
    fn test_fixed_payment_payoff() {
        let out = calculate_payoff(
            &input(PayoffPlan::FixedPayment { amount: dec!(200) }),
            &EngineLimits::default(),
        )
        .unwrap()
        .result;
        assert_eq!(out.first_payment, dec!(200));
        assert!(out.months_to_payoff > 25 && out.months_to_payoff < 35);
        assert!(out.total_interest > Decimal::ZERO);
    }

    #[test]
    fn test_target_months() {
        let out = calculate_payoff(
            &input(PayoffPlan::TargetMonths { months: 24 }),
            &EngineLimits::default(),
        )
        .unwrap()
        .result;
        assert_eq!(out.months_to_payoff, 24);
    }

    #[test]
    fn test_minimum_below_interest() {
        // Monthly interest on 5,000 at 19.99% is ~83
        let result = calculate_payoff(
            &input(PayoffPlan::Minimum(MinimumPayment::FixedAmount { amount: dec!(50) })),
            &EngineLimits::default(),
        );
        assert!(result.unwrap_err().is_non_convergence());
    }

    #[test]
    fn test_percent_minimum_with_low_balance() {
        let mut inp = input(PayoffPlan::Minimum(MinimumPayment::PercentOfBalance {
            percent: dec!(25),
        }));
        inp.balance = dec!(400);
        let out = calculate_payoff(&inp, &EngineLimits::default())
            .unwrap()
            .result;
        assert_eq!(out.first_payment, dec!(100));
        assert_eq!(out.schedule.entries.last().unwrap().balance, Decimal::ZERO);
    }

    #[test]
    fn test_zero_promo_first_year() {
        let mut inp = input(PayoffPlan::FixedPayment { amount: dec!(500) });
        inp.promo = Some(PromoWindow {
            apr: Decimal::ZERO,
            periods: 12,
        });
        let out = calculate_payoff(&inp, &EngineLimits::default())
            .unwrap()
            .result;
        assert_eq!(out.months_to_payoff, 10);
        assert_eq!(out.total_interest, Decimal::ZERO);
    }
}
