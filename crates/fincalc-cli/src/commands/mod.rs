pub mod amortize;
pub mod auto_loan;
pub mod cash_back;
pub mod compare;
pub mod credit_card;
pub mod loan_terms;
pub mod rent_vs_buy;
pub mod roi;

use serde::Serialize;
use serde_json::Value;

use fincalc_core::{ComputationOutput, Currency, EngineLimits};

use crate::input;

/// Settings shared by every subcommand
pub struct RunContext {
    pub limits: EngineLimits,
    pub summary: bool,
    pub currency: Currency,
}

impl RunContext {
    pub fn load(
        config: Option<&str>,
        summary: bool,
        currency: &str,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let limits: EngineLimits = match config {
            Some(path) => input::file::read_document(path)?,
            None => EngineLimits::default(),
        };
        limits.validate()?;
        Ok(Self {
            limits,
            summary,
            currency: parse_currency(currency),
        })
    }

    /// Serialize either the full envelope or, with `--summary`, the display record.
    pub fn render<T, S, F>(
        &self,
        output: &ComputationOutput<T>,
        summarize: F,
    ) -> Result<Value, Box<dyn std::error::Error>>
    where
        T: Serialize,
        S: Serialize,
        F: FnOnce(&T, &Currency) -> S,
    {
        if self.summary {
            let mut record = serde_json::to_value(summarize(&output.result, &self.currency))?;
            if let Value::Object(map) = &mut record {
                map.insert("warnings".into(), serde_json::to_value(&output.warnings)?);
            }
            Ok(record)
        } else {
            Ok(serde_json::to_value(output)?)
        }
    }
}

fn parse_currency(code: &str) -> Currency {
    match code.to_ascii_uppercase().as_str() {
        "GBP" => Currency::GBP,
        "USD" => Currency::USD,
        "EUR" => Currency::EUR,
        "CHF" => Currency::CHF,
        "JPY" => Currency::JPY,
        "CAD" => Currency::CAD,
        "AUD" => Currency::AUD,
        other => Currency::Other(format!("{other} ")),
    }
}

/// Error for a flag that is required when no input document is given.
pub(crate) fn missing(flag: &str) -> String {
    format!("--{flag} is required (or provide --input)")
}
