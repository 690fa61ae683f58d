use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use fincalc_core::amortization::credit_card::{
    calculate_payoff, CreditCardInput, MinimumPayment, PayoffPlan,
};
use fincalc_core::amortization::schedule::PromoWindow;
use fincalc_core::summary::loan_summary;
use fincalc_core::PaymentFrequency;

use crate::commands::{missing, RunContext};
use crate::input;

/// Arguments for a credit card payoff. Choose exactly one payment plan.
#[derive(Args)]
pub struct CreditCardArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Current statement balance
    #[arg(long)]
    pub balance: Option<Decimal>,

    /// Purchase APR
    #[arg(long)]
    pub apr: Option<Decimal>,

    /// Fixed monthly payment
    #[arg(long, group = "plan")]
    pub payment: Option<Decimal>,

    /// Minimum payment as a percent of the balance
    #[arg(long, group = "plan")]
    pub min_percent: Option<Decimal>,

    /// Flat minimum payment
    #[arg(long, group = "plan")]
    pub min_amount: Option<Decimal>,

    /// Pay the card off in this many months
    #[arg(long, group = "plan")]
    pub months: Option<u32>,

    /// Introductory APR
    #[arg(long, requires = "promo_months")]
    pub promo_apr: Option<Decimal>,

    /// Length of the introductory period in months
    #[arg(long, requires = "promo_apr")]
    pub promo_months: Option<u32>,

    /// Date of the current statement (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
}

fn plan_from_flags(args: &CreditCardArgs) -> Result<PayoffPlan, String> {
    if let Some(amount) = args.payment {
        Ok(PayoffPlan::FixedPayment { amount })
    } else if let Some(percent) = args.min_percent {
        Ok(PayoffPlan::Minimum(MinimumPayment::PercentOfBalance { percent }))
    } else if let Some(amount) = args.min_amount {
        Ok(PayoffPlan::Minimum(MinimumPayment::FixedAmount { amount }))
    } else if let Some(months) = args.months {
        Ok(PayoffPlan::TargetMonths { months })
    } else {
        Err("one of --payment, --min-percent, --min-amount or --months is required".into())
    }
}

pub fn run_credit_card(args: CreditCardArgs, ctx: &RunContext) -> Result<Value, Box<dyn std::error::Error>> {
    let card: CreditCardInput = match input::read_input(args.input.as_deref())? {
        Some(v) => v,
        None => CreditCardInput {
            balance: args.balance.ok_or_else(|| missing("balance"))?,
            apr: args.apr.ok_or_else(|| missing("apr"))?,
            plan: plan_from_flags(&args)?,
            promo: args
                .promo_apr
                .zip(args.promo_months)
                .map(|(apr, periods)| PromoWindow { apr, periods }),
            start_date: args.start_date,
        },
    };
    let output = calculate_payoff(&card, &ctx.limits)?;
    ctx.render(&output, |result, currency| {
        loan_summary(&result.schedule, PaymentFrequency::Monthly, currency)
    })
}
