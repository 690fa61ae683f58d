use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use fincalc_core::comparison::rent_vs_buy::{compare_rent_vs_buy, RentVsBuyInput};
use fincalc_core::summary::rent_vs_buy_summary;

use crate::commands::{missing, RunContext};
use crate::input;

/// Arguments for the rent vs. buy projection. Percent flags take 3 for 3%.
#[derive(Args)]
pub struct RentVsBuyArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long)]
    pub home_price: Option<Decimal>,

    #[arg(long, default_value = "20")]
    pub down_payment_percent: Decimal,

    #[arg(long)]
    pub mortgage_apr: Option<Decimal>,

    #[arg(long, default_value = "30")]
    pub term_years: u32,

    #[arg(long, default_value = "3")]
    pub closing_cost_percent: Decimal,

    #[arg(long, default_value = "6")]
    pub selling_cost_percent: Decimal,

    #[arg(long, default_value = "1")]
    pub property_tax_percent: Decimal,

    #[arg(long, default_value = "0")]
    pub home_insurance: Decimal,

    #[arg(long, default_value = "1")]
    pub maintenance_percent: Decimal,

    #[arg(long, default_value = "0")]
    pub hoa: Decimal,

    #[arg(long, default_value = "3")]
    pub appreciation: Decimal,

    #[arg(long)]
    pub rent: Option<Decimal>,

    #[arg(long, default_value = "3")]
    pub rent_growth: Decimal,

    #[arg(long, default_value = "0")]
    pub renters_insurance: Decimal,

    /// Return on money not spent on housing
    #[arg(long, default_value = "6")]
    pub investment_return: Decimal,

    #[arg(long, default_value = "10")]
    pub years: u32,
}

pub fn run_rent_vs_buy(args: RentVsBuyArgs, ctx: &RunContext) -> Result<Value, Box<dyn std::error::Error>> {
    let housing: RentVsBuyInput = match input::read_input(args.input.as_deref())? {
        Some(v) => v,
        None => RentVsBuyInput {
            home_price: args.home_price.ok_or_else(|| missing("home-price"))?,
            down_payment_percent: args.down_payment_percent,
            mortgage_apr: args.mortgage_apr.ok_or_else(|| missing("mortgage-apr"))?,
            term_years: args.term_years,
            closing_cost_percent: args.closing_cost_percent,
            selling_cost_percent: args.selling_cost_percent,
            property_tax_percent: args.property_tax_percent,
            home_insurance_annual: args.home_insurance,
            maintenance_percent: args.maintenance_percent,
            hoa_monthly: args.hoa,
            appreciation_rate: args.appreciation,
            monthly_rent: args.rent.ok_or_else(|| missing("rent"))?,
            rent_growth_rate: args.rent_growth,
            renters_insurance_monthly: args.renters_insurance,
            investment_return_rate: args.investment_return,
            horizon_years: args.years,
        },
    };
    let output = compare_rent_vs_buy(&housing, &ctx.limits)?;
    ctx.render(&output, rent_vs_buy_summary)
}
