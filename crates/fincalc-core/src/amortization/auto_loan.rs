use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::schedule::{
    build_schedule, AmortizationResult, ExtraPayment, ExtraPaymentFrequency, LoanSpec,
};
use crate::config::EngineLimits;
use crate::error::FinCalcError;
use crate::types::*;
use crate::FinCalcResult;

fn default_true() -> bool {
    true
}

/// Input for a vehicle purchase financed with an instalment loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoLoanInput {
    pub vehicle_price: Money,
    #[serde(default)]
    pub down_payment: Money,
    /// Value credited for the trade-in vehicle
    #[serde(default)]
    pub trade_in_value: Money,
    /// Amount still owed on the trade-in, rolled into the new loan
    #[serde(default)]
    pub trade_in_payoff: Money,
    #[serde(default)]
    pub sales_tax_rate: Percent,
    /// Title, registration and dealer fees
    #[serde(default)]
    pub fees: Money,
    /// Roll the fees into the loan rather than paying them up front
    #[serde(default = "default_true")]
    pub fees_financed: bool,
    /// Tax only the price net of the trade-in value
    #[serde(default = "default_true")]
    pub trade_in_tax_credit: bool,
    pub apr: Percent,
    pub term_months: u32,
    /// Additional principal paid every month
    #[serde(default)]
    pub extra_monthly_payment: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
}

/// Output of the auto loan calculation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoLoanOutput {
    pub amount_financed: Money,
    pub sales_tax: Money,
    /// Cash due at signing (down payment plus any fees not financed)
    pub upfront_payment: Money,
    pub monthly_payment: Money,
    pub total_interest: Money,
    pub total_of_payments: Money,
    /// Everything paid for the vehicle: up-front cash, net trade-in equity and loan payments
    pub total_cost: Money,
    pub payoff_months: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payoff_date: Option<NaiveDate>,
    pub schedule: AmortizationResult,
}

fn check_non_negative(field: &str, value: Money) -> FinCalcResult<()> {
    if value < Decimal::ZERO {
        return Err(FinCalcError::InvalidInput {
            field: field.into(),
            reason: "Cannot be negative".into(),
        });
    }
    Ok(())
}

/// Price the purchase, derive the amount financed and amortize it monthly.
pub fn calculate_auto_loan(
    input: &AutoLoanInput,
    limits: &EngineLimits,
) -> FinCalcResult<ComputationOutput<AutoLoanOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.vehicle_price <= Decimal::ZERO {
        return Err(FinCalcError::InvalidInput {
            field: "vehicle_price".into(),
            reason: "Vehicle price must be positive".into(),
        });
    }
    check_non_negative("down_payment", input.down_payment)?;
    check_non_negative("trade_in_value", input.trade_in_value)?;
    check_non_negative("trade_in_payoff", input.trade_in_payoff)?;
    check_non_negative("sales_tax_rate", input.sales_tax_rate)?;
    check_non_negative("fees", input.fees)?;
    check_non_negative("extra_monthly_payment", input.extra_monthly_payment)?;

    let taxable = if input.trade_in_tax_credit {
        (input.vehicle_price - input.trade_in_value).max(Decimal::ZERO)
    } else {
        input.vehicle_price
    };
    let sales_tax = taxable * input.sales_tax_rate / dec!(100);

    let financed_fees = if input.fees_financed {
        input.fees
    } else {
        Decimal::ZERO
    };
    let amount_financed = input.vehicle_price + sales_tax + financed_fees
        - input.down_payment
        - input.trade_in_value
        + input.trade_in_payoff;

    if amount_financed <= Decimal::ZERO {
        return Err(FinCalcError::InvalidInput {
            field: "down_payment".into(),
            reason: "Down payment and trade-in cover the purchase; nothing to finance".into(),
        });
    }

    if input.trade_in_payoff > input.trade_in_value {
        warnings.push(format!(
            "Negative equity of {} on the trade-in is rolled into the loan",
            input.trade_in_payoff - input.trade_in_value
        ));
    }

    let mut spec = LoanSpec::new(amount_financed, input.apr, input.term_months);
    spec.start_date = input.start_date;
    if input.extra_monthly_payment > Decimal::ZERO {
        spec.extra_payment = Some(ExtraPayment {
            amount: input.extra_monthly_payment,
            frequency: ExtraPaymentFrequency::Monthly,
            start_period: 1,
        });
    }

    let schedule = build_schedule(&spec, limits, &mut warnings)?;

    let upfront_payment = input.down_payment + (input.fees - financed_fees);
    let trade_in_equity = input.trade_in_value - input.trade_in_payoff;
    let total_cost = upfront_payment + trade_in_equity + schedule.total_paid;

    let output = AutoLoanOutput {
        amount_financed,
        sales_tax,
        upfront_payment,
        monthly_payment: schedule.scheduled_payment,
        total_interest: schedule.total_interest,
        total_of_payments: schedule.total_paid,
        total_cost,
        payoff_months: schedule.payoff_periods,
        payoff_date: schedule.payoff_date,
        schedule,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Auto loan: amount financed and monthly amortization",
        &serde_json::json!({
            "vehicle_price": input.vehicle_price.to_string(),
            "apr": input.apr.to_string(),
            "term_months": input.term_months,
            "sales_tax_rate": input.sales_tax_rate.to_string(),
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

    fn base_input() -> AutoLoanInput {
        AutoLoanInput {
            vehicle_price: dec!(30000),
            down_payment: dec!(5000),
            trade_in_value: dec!(3000),
            trade_in_payoff: Decimal::ZERO,
            sales_tax_rate: dec!(6),
            fees: dec!(500),
            fees_financed: true,
            trade_in_tax_credit: true,
            apr: dec!(4.9),
            term_months: 60,
            extra_monthly_payment: Decimal::ZERO,
            start_date: None,
        }
    }

    #[test]
    fn test_amount_financed() {
        let out = calculate_auto_loan(&base_input(), &EngineLimits::default())
            .unwrap()
            .result;
        // Tax = 6% of 27,000 = 1,620; financed = 30,000 + 1,620 + 500 - 5,000 - 3,000
        assert_eq!(out.sales_tax, dec!(1620));
        assert_eq!(out.amount_financed, dec!(24120));
        assert_eq!(out.payoff_months, 60);
    }

    #[test]
    fn test_no_trade_in_credit() {
        let mut input = base_input();
        input.trade_in_tax_credit = false;
        let out = calculate_auto_loan(&input, &EngineLimits::default())
            .unwrap()
            .result;
        assert_eq!(out.sales_tax, dec!(1800));
    }

    #[test]
    fn test_fees_paid_up_front() {
        let mut input = base_input();
        input.fees_financed = false;
        let out = calculate_auto_loan(&input, &EngineLimits::default())
            .unwrap()
            .result;
        assert_eq!(out.amount_financed, dec!(23620));
        assert_eq!(out.upfront_payment, dec!(5500));
    }

    #[test]
    fn test_negative_equity_warning() {
        let mut input = base_input();
        input.trade_in_payoff = dec!(4000);
        let result = calculate_auto_loan(&input, &EngineLimits::default()).unwrap();
        assert_eq!(result.result.amount_financed, dec!(28120));
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn test_nothing_to_finance() {
        let mut input = base_input();
        input.down_payment = dec!(40000);
        assert!(calculate_auto_loan(&input, &EngineLimits::default()).is_err());
    }
}
