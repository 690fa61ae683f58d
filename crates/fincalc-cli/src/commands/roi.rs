use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use fincalc_core::investment::returns::{
    evaluate_investment, CashFlowSeries, PeriodFlow, RateParams,
};
use fincalc_core::summary::investment_summary;

use crate::commands::{missing, RunContext};
use crate::input;

/// Input document for `roi --input`
#[derive(Debug, Deserialize)]
pub struct RoiInput {
    pub series: CashFlowSeries,
    pub rates: RateParams,
}

/// Arguments for investment return analysis
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct RoiArgs {
    /// Path to JSON/YAML input with `series` and `rates`
    #[arg(long)]
    pub input: Option<String>,

    /// Initial outlay (positive)
    #[arg(long)]
    pub initial: Option<Decimal>,

    /// Comma-separated net cash flow per period, e.g. 20000,23000,-5000
    #[arg(long, value_delimiter = ',')]
    pub flows: Vec<Decimal>,

    /// Sale or residual value at the end
    #[arg(long, default_value = "0")]
    pub terminal: Decimal,

    #[arg(long, default_value = "1")]
    pub periods_per_year: u32,

    /// Annual discount rate for NPV, in percent
    #[arg(long, default_value = "8")]
    pub discount_rate: Decimal,

    /// MIRR finance rate (default: discount rate)
    #[arg(long)]
    pub finance_rate: Option<Decimal>,

    /// MIRR reinvestment rate (default: discount rate)
    #[arg(long)]
    pub reinvestment_rate: Option<Decimal>,

    /// Inflation rate for real ROI
    #[arg(long)]
    pub inflation: Option<Decimal>,

    /// Tax rate for after-tax ROI
    #[arg(long)]
    pub tax_rate: Option<Decimal>,
}

fn input_from_flags(args: &RoiArgs) -> Result<RoiInput, Box<dyn std::error::Error>> {
    if args.flows.is_empty() {
        return Err(missing("flows").into());
    }
    let flows = args
        .flows
        .iter()
        .map(|&net| {
            if net >= Decimal::ZERO {
                PeriodFlow::new(net, Decimal::ZERO)
            } else {
                PeriodFlow::new(Decimal::ZERO, -net)
            }
        })
        .collect();
    Ok(RoiInput {
        series: CashFlowSeries {
            initial_investment: args.initial.ok_or_else(|| missing("initial"))?,
            flows,
            net_of_depreciation: false,
            terminal_value: args.terminal,
            periods_per_year: args.periods_per_year,
        },
        rates: RateParams {
            discount_rate: args.discount_rate,
            finance_rate: args.finance_rate,
            reinvestment_rate: args.reinvestment_rate.unwrap_or(args.discount_rate),
            inflation_rate: args.inflation,
            tax_rate: args.tax_rate,
        },
    })
}

pub fn run_roi(args: RoiArgs, ctx: &RunContext) -> Result<Value, Box<dyn std::error::Error>> {
    let roi: RoiInput = match input::read_input(args.input.as_deref())? {
        Some(v) => v,
        None => input_from_flags(&args)?,
    };
    let output = evaluate_investment(&roi.series, &roi.rates, &ctx.limits)?;
    ctx.render(&output, investment_summary)
}
