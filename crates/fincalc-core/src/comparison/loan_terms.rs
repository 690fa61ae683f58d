use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::schedule::{build_schedule, LoanSpec};
use crate::config::EngineLimits;
use crate::error::FinCalcError;
use crate::types::*;
use crate::FinCalcResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanTermOption {
    pub term_months: u32,
    /// Term-specific APR; falls back to the input APR
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apr: Option<Percent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanTermsInput {
    pub principal: Money,
    pub apr: Percent,
    pub terms: Vec<LoanTermOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanTermRow {
    pub term_months: u32,
    pub apr: Percent,
    pub monthly_payment: Money,
    pub total_interest: Money,
    pub total_cost: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanTermsOutput {
    pub rows: Vec<LoanTermRow>,
    pub lowest_payment_term: u32,
    pub lowest_interest_term: u32,
}

/// Evaluate the same principal across several terms side by side.
pub fn compare_loan_terms(
    input: &LoanTermsInput,
    limits: &EngineLimits,
) -> FinCalcResult<ComputationOutput<LoanTermsOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.terms.is_empty() {
        return Err(FinCalcError::InsufficientData(
            "At least one term option is required".into(),
        ));
    }

    let mut rows = Vec::with_capacity(input.terms.len());
    for option in &input.terms {
        let apr = option.apr.unwrap_or(input.apr);
        let spec = LoanSpec::new(input.principal, apr, option.term_months);
        let schedule = build_schedule(&spec, limits, &mut warnings)?;
        rows.push(LoanTermRow {
            term_months: option.term_months,
            apr,
            monthly_payment: schedule.scheduled_payment,
            total_interest: schedule.total_interest,
            total_cost: schedule.total_paid,
        });
    }

    let lowest_payment_term = rows
        .iter()
        .min_by(|a, b| a.monthly_payment.cmp(&b.monthly_payment))
        .map(|r| r.term_months)
        .unwrap_or_default();
    let lowest_interest_term = rows
        .iter()
        .min_by(|a, b| a.total_interest.cmp(&b.total_interest))
        .map(|r| r.term_months)
        .unwrap_or_default();

    let output = LoanTermsOutput {
        rows,
        lowest_payment_term,
        lowest_interest_term,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Loan term side-by-side comparison",
        &serde_json::json!({
            "principal": input.principal.to_string(),
            "apr": input.apr.to_string(),
            "terms": input.terms.iter().map(|t| t.term_months).collect::<Vec<_>>(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

impl LoanTermsInput {
    /// The usual 36/48/60/72/84-month ladder at a single APR.
    pub fn standard_ladder(principal: Money, apr: Percent) -> Self {
        Self {
            principal,
            apr,
            terms: [36, 48, 60, 72, 84]
                .into_iter()
                .map(|term_months| LoanTermOption {
                    term_months,
                    apr: None,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_longer_terms_trade_payment_for_interest() {
        let input = LoanTermsInput::standard_ladder(dec!(25000), dec!(5.9));
        let out = compare_loan_terms(&input, &EngineLimits::default())
            .unwrap()
            .result;
        assert_eq!(out.rows.len(), 5);
        for pair in out.rows.windows(2) {
            assert!(pair[1].monthly_payment < pair[0].monthly_payment);
            assert!(pair[1].total_interest > pair[0].total_interest);
        }
        assert_eq!(out.lowest_payment_term, 84);
        assert_eq!(out.lowest_interest_term, 36);
    }

    #[test]
    fn test_per_term_apr() {
        let input = LoanTermsInput {
            principal: dec!(10000),
            apr: dec!(5),
            terms: vec![
                LoanTermOption {
                    term_months: 36,
                    apr: Some(Decimal::ZERO),
                },
                LoanTermOption {
                    term_months: 60,
                    apr: None,
                },
            ],
        };
        let out = compare_loan_terms(&input, &EngineLimits::default())
            .unwrap()
            .result;
        assert_eq!(out.rows[0].total_interest, Decimal::ZERO);
        assert_eq!(out.rows[1].apr, dec!(5));
    }

    #[test]
    fn test_empty_terms() {
        let input = LoanTermsInput {
            principal: dec!(10000),
            apr: dec!(5),
            terms: vec![],
        };
        assert!(compare_loan_terms(&input, &EngineLimits::default()).is_err());
    }
}
