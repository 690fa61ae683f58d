use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use fincalc_core::amortization::auto_loan::{calculate_auto_loan, AutoLoanInput};
use fincalc_core::summary::loan_summary;
use fincalc_core::PaymentFrequency;

use crate::commands::{missing, RunContext};
use crate::input;

/// Arguments for an auto loan
#[derive(Args)]
pub struct AutoLoanArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Vehicle price before tax
    #[arg(long)]
    pub price: Option<Decimal>,

    /// Cash down payment
    #[arg(long, default_value = "0")]
    pub down_payment: Decimal,

    /// Trade-in value
    #[arg(long, default_value = "0")]
    pub trade_in: Decimal,

    /// Amount still owed on the trade-in
    #[arg(long, default_value = "0")]
    pub trade_in_payoff: Decimal,

    /// Sales tax rate in percent
    #[arg(long, default_value = "0")]
    pub sales_tax: Decimal,

    /// Title, registration and dealer fees
    #[arg(long, default_value = "0")]
    pub fees: Decimal,

    /// Pay the fees at signing instead of financing them
    #[arg(long)]
    pub fees_upfront: bool,

    /// Annual percentage rate
    #[arg(long)]
    pub apr: Option<Decimal>,

    /// Loan term in months
    #[arg(long)]
    pub term: Option<u32>,

    /// Extra principal paid every month
    #[arg(long, default_value = "0")]
    pub extra: Decimal,

    /// Loan start date (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
}

pub fn run_auto_loan(args: AutoLoanArgs, ctx: &RunContext) -> Result<Value, Box<dyn std::error::Error>> {
    let loan_input: AutoLoanInput = match input::read_input(args.input.as_deref())? {
        Some(v) => v,
        None => AutoLoanInput {
            vehicle_price: args.price.ok_or_else(|| missing("price"))?,
            down_payment: args.down_payment,
            trade_in_value: args.trade_in,
            trade_in_payoff: args.trade_in_payoff,
            sales_tax_rate: args.sales_tax,
            fees: args.fees,
            fees_financed: !args.fees_upfront,
            trade_in_tax_credit: true,
            apr: args.apr.ok_or_else(|| missing("apr"))?,
            term_months: args.term.ok_or_else(|| missing("term"))?,
            extra_monthly_payment: args.extra,
            start_date: args.start_date,
        },
    };
    let output = calculate_auto_loan(&loan_input, &ctx.limits)?;
    ctx.render(&output, |result, currency| {
        loan_summary(&result.schedule, PaymentFrequency::Monthly, currency)
    })
}
