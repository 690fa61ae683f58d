//! Display records for engine results.
//!
//! Everything here is a pure mapping from a result to strings ready for a
//! table or card; no computation beyond rounding happens in this module.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::amortization::schedule::AmortizationResult;
use crate::comparison::break_even::BreakEven;
use crate::comparison::cash_back::{CashBackChoice, CashBackOutput};
use crate::comparison::rent_vs_buy::{HousingChoice, RentVsBuyOutput};
use crate::comparison::scenario::{ComparisonResult, ScenarioLabel};
use crate::investment::returns::{InvestmentBreakEven, ReturnMetrics};
use crate::types::*;

const NOT_AVAILABLE: &str = "N/A";

// ---------------------------------------------------------------------------
// Formatters
// ---------------------------------------------------------------------------

/// Whole currency units with thousands separators: `-$1,234`.
pub fn format_currency(amount: Money, currency: &Currency) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().trunc().to_string();
    let sign = if rounded < Decimal::ZERO { "-" } else { "" };
    format!("{sign}{}{}", currency.symbol(), group_thousands(&digits))
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Fixed-decimal percentage: `format_percent(4.9, 2)` is `"4.90%"`.
pub fn format_percent(value: Percent, decimals: u32) -> String {
    let rounded = value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.prec$}%", prec = decimals as usize)
}

fn format_optional_percent(value: Option<Percent>, decimals: u32) -> String {
    value
        .map(|v| format_percent(v, decimals))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Month and year, e.g. `"Mar 2031"`.
pub fn format_payoff_date(date: NaiveDate) -> String {
    date.format("%b %Y").to_string()
}

/// `"4 years 7 months"`, dropping whichever part is zero.
pub fn format_duration(months: u32) -> String {
    let years = months / 12;
    let rest = months % 12;
    let plural = |n: u32, unit: &str| {
        if n == 1 {
            format!("1 {unit}")
        } else {
            format!("{n} {unit}s")
        }
    };
    match (years, rest) {
        (0, m) => plural(m, "month"),
        (y, 0) => plural(y, "year"),
        (y, m) => format!("{} {}", plural(y, "year"), plural(m, "month")),
    }
}

fn periods_as_months(periods: u32, frequency: PaymentFrequency) -> u32 {
    let ppy = frequency.periods_per_year() as u64;
    let months = (periods as u64 * 12 + ppy / 2) / ppy;
    u32::try_from(months).unwrap_or(u32::MAX)
}

fn format_loan_break_even(be: &BreakEven) -> String {
    match be {
        BreakEven::At { period } => format!("Period {period}"),
        BreakEven::NotWithinHorizon => "Not within horizon".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Summary records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSummary {
    pub payment: String,
    pub total_interest: String,
    pub total_paid: String,
    pub payoff_time: String,
    pub payoff_date: Option<String>,
    pub interest_saved: Option<String>,
    pub time_saved: Option<String>,
}

pub fn loan_summary(
    result: &AmortizationResult,
    frequency: PaymentFrequency,
    currency: &Currency,
) -> LoanSummary {
    let payment = result
        .entries
        .first()
        .map(|e| e.payment)
        .unwrap_or(result.scheduled_payment);
    LoanSummary {
        payment: format_currency(payment, currency),
        total_interest: format_currency(result.total_interest, currency),
        total_paid: format_currency(result.total_paid, currency),
        payoff_time: format_duration(periods_as_months(result.payoff_periods, frequency)),
        payoff_date: result.payoff_date.map(format_payoff_date),
        interest_saved: result.interest_saved.map(|v| format_currency(v, currency)),
        time_saved: result
            .periods_saved
            .map(|p| format_duration(periods_as_months(p, frequency))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentSummary {
    pub simple_roi: String,
    pub annualized_roi: String,
    pub npv: String,
    pub irr: String,
    pub mirr: String,
    pub cagr: String,
    pub break_even: String,
    pub real_roi: String,
    pub after_tax_roi: String,
    pub total_net_cash_flow: String,
}

pub fn investment_summary(metrics: &ReturnMetrics, currency: &Currency) -> InvestmentSummary {
    let break_even = match &metrics.break_even {
        InvestmentBreakEven::Reached { period } => format!(
            "{} periods",
            period.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        ),
        InvestmentBreakEven::NotReached { horizon } => {
            format!("Not reached in {horizon} periods")
        }
    };
    InvestmentSummary {
        simple_roi: format_percent(metrics.simple_roi, 2),
        annualized_roi: format_optional_percent(metrics.annualized_roi, 2),
        npv: format_currency(metrics.npv, currency),
        irr: format_optional_percent(metrics.irr, 2),
        mirr: format_optional_percent(metrics.mirr, 2),
        cagr: format_optional_percent(metrics.cagr, 2),
        break_even,
        real_roi: format_optional_percent(metrics.real_roi, 2),
        after_tax_roi: format_optional_percent(metrics.after_tax_roi, 2),
        total_net_cash_flow: format_currency(metrics.total_net_cash_flow, currency),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub payment_a: String,
    pub payment_b: String,
    pub total_paid_a: String,
    pub total_paid_b: String,
    pub break_even: String,
    pub cheaper_at_horizon: String,
    pub horizon_cost_difference: String,
}

pub fn comparison_summary(result: &ComparisonResult, currency: &Currency) -> ComparisonSummary {
    let cheaper = match result.cheaper_at_horizon {
        Some(ScenarioLabel::A) => "Scenario A",
        Some(ScenarioLabel::B) => "Scenario B",
        None => "Equal",
    };
    ComparisonSummary {
        payment_a: format_currency(result.scenario_a.scheduled_payment, currency),
        payment_b: format_currency(result.scenario_b.scheduled_payment, currency),
        total_paid_a: format_currency(result.scenario_a.total_paid, currency),
        total_paid_b: format_currency(result.scenario_b.total_paid, currency),
        break_even: format_loan_break_even(&result.break_even),
        cheaper_at_horizon: cheaper.to_string(),
        horizon_cost_difference: format_currency(result.horizon_cost_difference.abs(), currency),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentVsBuySummary {
    pub monthly_mortgage_payment: String,
    pub upfront_cash: String,
    pub break_even: String,
    pub final_advantage: String,
    pub recommendation: String,
}

pub fn rent_vs_buy_summary(output: &RentVsBuyOutput, currency: &Currency) -> RentVsBuySummary {
    let break_even = match output.break_even {
        BreakEven::At { period } => format!("Year {period}"),
        BreakEven::NotWithinHorizon => "Not within horizon".to_string(),
    };
    let recommendation = match output.better_option {
        HousingChoice::Buy => "Buy",
        HousingChoice::Rent => "Rent",
        HousingChoice::Equivalent => "Either",
    };
    RentVsBuySummary {
        monthly_mortgage_payment: format_currency(output.monthly_mortgage_payment, currency),
        upfront_cash: format_currency(output.upfront_cash, currency),
        break_even,
        final_advantage: format_currency(output.final_advantage.abs(), currency),
        recommendation: recommendation.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashBackSummary {
    pub cash_back_payment: String,
    pub low_apr_payment: String,
    pub cash_back_total_cost: String,
    pub low_apr_total_cost: String,
    pub better_option: String,
    pub savings: String,
    pub break_even_apr: String,
}

pub fn cash_back_summary(output: &CashBackOutput, currency: &Currency) -> CashBackSummary {
    let better_option = match output.better_option {
        CashBackChoice::CashBack => "Take the cash back",
        CashBackChoice::LowApr => "Take the low APR",
        CashBackChoice::Equivalent => "Either",
    };
    CashBackSummary {
        cash_back_payment: format_currency(output.cash_back.monthly_payment, currency),
        low_apr_payment: format_currency(output.low_apr.monthly_payment, currency),
        cash_back_total_cost: format_currency(output.cash_back.total_cost, currency),
        low_apr_total_cost: format_currency(output.low_apr.total_cost, currency),
        better_option: better_option.to_string(),
        savings: format_currency(output.savings, currency),
        break_even_apr: format_optional_percent(output.break_even_apr, 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(dec!(1234567.49), &Currency::USD), "$1,234,567");
        assert_eq!(format_currency(dec!(999.5), &Currency::GBP), "£1,000");
        assert_eq!(format_currency(dec!(-2914.36), &Currency::USD), "-$2,914");
        assert_eq!(format_currency(Decimal::ZERO, &Currency::EUR), "€0");
        assert_eq!(format_currency(dec!(100), &Currency::CHF), "CHF 100");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(dec!(4.9), 2), "4.90%");
        assert_eq!(format_percent(dec!(8.447177), 1), "8.4%");
        assert_eq!(format_percent(dec!(175), 0), "175%");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(55), "4 years 7 months");
        assert_eq!(format_duration(12), "1 year");
        assert_eq!(format_duration(13), "1 year 1 month");
        assert_eq!(format_duration(7), "7 months");
        assert_eq!(format_duration(0), "0 months");
    }

    #[test]
    fn test_format_payoff_date() {
        let date = NaiveDate::from_ymd_opt(2031, 3, 1).unwrap();
        assert_eq!(format_payoff_date(date), "Mar 2031");
    }

    #[test]
    fn test_periods_as_months() {
        assert_eq!(periods_as_months(26, PaymentFrequency::Biweekly), 12);
        assert_eq!(periods_as_months(8, PaymentFrequency::Quarterly), 24);
        assert_eq!(periods_as_months(60, PaymentFrequency::Monthly), 60);
    }
}
