use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use fincalc_core::amortization::schedule::{
    amortize, ExtraPayment, ExtraPaymentFrequency, LoanSpec, PaymentRule,
};
use fincalc_core::summary::loan_summary;
use fincalc_core::PaymentFrequency;

use crate::commands::{missing, RunContext};
use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FrequencyArg {
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    SemiAnnual,
    Annual,
}

impl From<FrequencyArg> for PaymentFrequency {
    fn from(f: FrequencyArg) -> Self {
        match f {
            FrequencyArg::Weekly => PaymentFrequency::Weekly,
            FrequencyArg::Biweekly => PaymentFrequency::Biweekly,
            FrequencyArg::Monthly => PaymentFrequency::Monthly,
            FrequencyArg::Quarterly => PaymentFrequency::Quarterly,
            FrequencyArg::SemiAnnual => PaymentFrequency::SemiAnnual,
            FrequencyArg::Annual => PaymentFrequency::Annual,
        }
    }
}

/// Arguments for an amortization schedule
#[derive(Args)]
pub struct AmortizeArgs {
    /// Path to a JSON/YAML loan spec (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Amount borrowed
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Annual percentage rate, e.g. 4.9
    #[arg(long)]
    pub apr: Option<Decimal>,

    /// Number of payments
    #[arg(long)]
    pub term: Option<u32>,

    /// Payment frequency
    #[arg(long, default_value = "monthly")]
    pub frequency: FrequencyArg,

    /// Pay this fixed amount instead of the annuity payment
    #[arg(long)]
    pub payment: Option<Decimal>,

    /// Extra principal paid every period
    #[arg(long)]
    pub extra: Option<Decimal>,

    /// Loan start date (YYYY-MM-DD); enables payment dates
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
}

fn spec_from_flags(args: &AmortizeArgs) -> Result<LoanSpec, Box<dyn std::error::Error>> {
    let mut spec = LoanSpec::new(
        args.principal.ok_or_else(|| missing("principal"))?,
        args.apr.ok_or_else(|| missing("apr"))?,
        args.term.ok_or_else(|| missing("term"))?,
    );
    spec.frequency = args.frequency.into();
    if let Some(amount) = args.payment {
        spec.payment = PaymentRule::Fixed { amount };
    }
    if let Some(amount) = args.extra {
        spec.extra_payment = Some(ExtraPayment {
            amount,
            frequency: ExtraPaymentFrequency::Monthly,
            start_period: 1,
        });
    }
    spec.start_date = args.start_date;
    Ok(spec)
}

pub fn run_amortize(args: AmortizeArgs, ctx: &RunContext) -> Result<Value, Box<dyn std::error::Error>> {
    let spec: LoanSpec = match input::read_input(args.input.as_deref())? {
        Some(spec) => spec,
        None => spec_from_flags(&args)?,
    };
    let output = amortize(&spec, &ctx.limits)?;
    ctx.render(&output, |result, currency| {
        loan_summary(result, spec.frequency, currency)
    })
}
