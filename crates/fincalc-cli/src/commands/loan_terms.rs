use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use fincalc_core::comparison::loan_terms::{
    compare_loan_terms, LoanTermOption, LoanTermsInput, LoanTermsOutput,
};
use fincalc_core::summary::format_currency;
use fincalc_core::Currency;

use crate::commands::{missing, RunContext};
use crate::input;

/// Arguments for a loan term comparison
#[derive(Args)]
pub struct LoanTermsArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long)]
    pub principal: Option<Decimal>,

    #[arg(long)]
    pub apr: Option<Decimal>,

    /// Comma-separated terms in months (default 36,48,60,72,84)
    #[arg(long, value_delimiter = ',')]
    pub terms: Vec<u32>,
}

fn summarize(output: &LoanTermsOutput, currency: &Currency) -> Vec<Value> {
    output
        .rows
        .iter()
        .map(|row| {
            serde_json::json!({
                "term_months": row.term_months,
                "apr": row.apr.to_string(),
                "monthly_payment": format_currency(row.monthly_payment, currency),
                "total_interest": format_currency(row.total_interest, currency),
                "total_cost": format_currency(row.total_cost, currency),
            })
        })
        .collect()
}

pub fn run_loan_terms(args: LoanTermsArgs, ctx: &RunContext) -> Result<Value, Box<dyn std::error::Error>> {
    let terms_input: LoanTermsInput = match input::read_input(args.input.as_deref())? {
        Some(v) => v,
        None => {
            let principal = args.principal.ok_or_else(|| missing("principal"))?;
            let apr = args.apr.ok_or_else(|| missing("apr"))?;
            if args.terms.is_empty() {
                LoanTermsInput::standard_ladder(principal, apr)
            } else {
                LoanTermsInput {
                    principal,
                    apr,
                    terms: args
                        .terms
                        .iter()
                        .map(|&term_months| LoanTermOption {
                            term_months,
                            apr: None,
                        })
                        .collect(),
                }
            }
        }
    };
    let output = compare_loan_terms(&terms_input, &ctx.limits)?;
    ctx.render(&output, summarize)
}
