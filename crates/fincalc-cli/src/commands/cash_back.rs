use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use fincalc_core::comparison::cash_back::{compare_cash_back, CashBackInput};
use fincalc_core::summary::cash_back_summary;

use crate::commands::{missing, RunContext};
use crate::input;

/// Arguments for a cash rebate vs. promotional APR comparison
#[derive(Args)]
pub struct CashBackArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long)]
    pub price: Option<Decimal>,

    #[arg(long, default_value = "0")]
    pub down_payment: Decimal,

    /// Cash rebate forgone by taking the promotional APR
    #[arg(long)]
    pub rebate: Option<Decimal>,

    /// APR that comes with the rebate
    #[arg(long)]
    pub standard_apr: Option<Decimal>,

    /// Promotional APR offered instead of the rebate
    #[arg(long)]
    pub promo_apr: Option<Decimal>,

    /// Loan term in months
    #[arg(long)]
    pub term: Option<u32>,
}

pub fn run_cash_back(args: CashBackArgs, ctx: &RunContext) -> Result<Value, Box<dyn std::error::Error>> {
    let offer: CashBackInput = match input::read_input(args.input.as_deref())? {
        Some(v) => v,
        None => CashBackInput {
            vehicle_price: args.price.ok_or_else(|| missing("price"))?,
            down_payment: args.down_payment,
            rebate: args.rebate.ok_or_else(|| missing("rebate"))?,
            standard_apr: args.standard_apr.ok_or_else(|| missing("standard-apr"))?,
            promo_apr: args.promo_apr.ok_or_else(|| missing("promo-apr"))?,
            term_months: args.term.ok_or_else(|| missing("term"))?,
        },
    };
    let output = compare_cash_back(&offer, &ctx.limits)?;
    ctx.render(&output, cash_back_summary)
}
