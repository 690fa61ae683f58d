use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use fincalc_core::amortization::schedule::LoanSpec;
use fincalc_core::comparison::scenario::compare_scenarios;
use fincalc_core::summary::comparison_summary;

use crate::commands::{missing, RunContext};
use crate::input;

/// Two loans and the window to compare them over
#[derive(Debug, Deserialize)]
pub struct CompareInput {
    pub scenario_a: LoanSpec,
    pub scenario_b: LoanSpec,
    /// Defaults to the longer of the two terms
    #[serde(default)]
    pub horizon_periods: Option<u32>,
}

/// Arguments for a two-loan comparison
#[derive(Args)]
pub struct CompareArgs {
    /// Path to JSON/YAML input with `scenario_a`, `scenario_b` and optional `horizon_periods`
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long)]
    pub principal_a: Option<Decimal>,
    #[arg(long)]
    pub apr_a: Option<Decimal>,
    #[arg(long)]
    pub term_a: Option<u32>,

    #[arg(long)]
    pub principal_b: Option<Decimal>,
    #[arg(long)]
    pub apr_b: Option<Decimal>,
    #[arg(long)]
    pub term_b: Option<u32>,

    /// Periods to compare over (default: the longer term)
    #[arg(long)]
    pub horizon: Option<u32>,
}

pub fn run_compare(args: CompareArgs, ctx: &RunContext) -> Result<Value, Box<dyn std::error::Error>> {
    let compare: CompareInput = match input::read_input(args.input.as_deref())? {
        Some(v) => v,
        None => CompareInput {
            scenario_a: LoanSpec::new(
                args.principal_a.ok_or_else(|| missing("principal-a"))?,
                args.apr_a.ok_or_else(|| missing("apr-a"))?,
                args.term_a.ok_or_else(|| missing("term-a"))?,
            ),
            scenario_b: LoanSpec::new(
                args.principal_b.ok_or_else(|| missing("principal-b"))?,
                args.apr_b.ok_or_else(|| missing("apr-b"))?,
                args.term_b.ok_or_else(|| missing("term-b"))?,
            ),
            horizon_periods: args.horizon,
        },
    };

    let horizon = compare.horizon_periods.unwrap_or_else(|| {
        compare
            .scenario_a
            .term_periods
            .max(compare.scenario_b.term_periods)
    });
    let output = compare_scenarios(&compare.scenario_a, &compare.scenario_b, horizon, &ctx.limits)?;
    ctx.render(&output, comparison_summary)
}
