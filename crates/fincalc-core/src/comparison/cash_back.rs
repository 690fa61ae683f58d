use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::schedule::LoanSpec;
use crate::comparison::break_even::BreakEven;
use crate::comparison::scenario::run_comparison;
use crate::config::EngineLimits;
use crate::error::FinCalcError;
use crate::rates::periodic_rate;
use crate::time_value::annuity_payment;
use crate::types::*;
use crate::FinCalcResult;

/// Upper bound for the break-even APR search
const MAX_SEARCH_APR: Decimal = dec!(100);

/// Dealer offer: take a cash rebate with standard financing, or forgo it for a promotional APR
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashBackInput {
    pub vehicle_price: Money,
    #[serde(default)]
    pub down_payment: Money,
    pub rebate: Money,
    /// APR available when taking the rebate
    pub standard_apr: Percent,
    /// Promotional APR offered instead of the rebate
    pub promo_apr: Percent,
    pub term_months: u32,
}

/// One side of the offer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancingOption {
    pub amount_financed: Money,
    pub apr: Percent,
    pub monthly_payment: Money,
    pub total_interest: Money,
    /// Down payment plus every loan payment
    pub total_cost: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CashBackChoice {
    CashBack,
    LowApr,
    Equivalent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashBackOutput {
    pub cash_back: FinancingOption,
    pub low_apr: FinancingOption,
    pub better_option: CashBackChoice,
    pub savings: Money,
    /// Month at which the rebate's head start is used up by extra interest
    pub break_even: BreakEven,
    /// Standard APR at which both offers cost the same; None above 100%
    #[serde(skip_serializing_if = "Option::is_none")]
    pub break_even_apr: Option<Percent>,
}

fn option_from(
    spec: &LoanSpec,
    down_payment: Money,
    total_interest: Money,
    total_paid: Money,
    monthly_payment: Money,
) -> FinancingOption {
    FinancingOption {
        amount_financed: spec.principal,
        apr: spec.apr,
        monthly_payment,
        total_interest,
        total_cost: down_payment + total_paid,
    }
}

/// Total of payments on the rebate loan at `apr`, from the closed form.
fn rebate_loan_total(principal: Money, apr: Percent, term: u32) -> FinCalcResult<Money> {
    let rate = periodic_rate(apr, 12)?;
    Ok(annuity_payment(principal, rate, term)? * Decimal::from(term))
}

/// Bisection on the standard APR until the rebate loan costs as much as the promo loan.
fn solve_break_even_apr(
    rebate_principal: Money,
    target_total: Money,
    term: u32,
    limits: &EngineLimits,
) -> FinCalcResult<Option<Percent>> {
    let mut lo = Decimal::ZERO;
    let mut hi = MAX_SEARCH_APR;

    if rebate_loan_total(rebate_principal, lo, term)? > target_total {
        return Ok(Some(Decimal::ZERO));
    }
    if rebate_loan_total(rebate_principal, hi, term)? < target_total {
        return Ok(None);
    }

    for _ in 0..limits.bisection_max_iterations {
        let mid = (lo + hi) / dec!(2);
        let total = rebate_loan_total(rebate_principal, mid, term)?;
        if total < target_total {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < limits.irr_tolerance {
            return Ok(Some((lo + hi) / dec!(2)));
        }
    }

    Err(FinCalcError::NonConvergence {
        function: "break_even_apr".into(),
        iterations: limits.bisection_max_iterations,
        last_delta: hi - lo,
    })
}

/// Compare a cash rebate at the standard APR against a promotional APR without the rebate.
pub fn compare_cash_back(
    input: &CashBackInput,
    limits: &EngineLimits,
) -> FinCalcResult<ComputationOutput<CashBackOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.vehicle_price <= Decimal::ZERO {
        return Err(FinCalcError::InvalidInput {
            field: "vehicle_price".into(),
            reason: "Vehicle price must be positive".into(),
        });
    }
    if input.down_payment < Decimal::ZERO || input.rebate < Decimal::ZERO {
        return Err(FinCalcError::InvalidInput {
            field: "rebate".into(),
            reason: "Down payment and rebate cannot be negative".into(),
        });
    }
    let promo_principal = input.vehicle_price - input.down_payment;
    let rebate_principal = promo_principal - input.rebate;
    if rebate_principal <= Decimal::ZERO {
        return Err(FinCalcError::InvalidInput {
            field: "rebate".into(),
            reason: "Rebate and down payment cover the full price".into(),
        });
    }

    let rebate_spec = LoanSpec::new(rebate_principal, input.standard_apr, input.term_months);
    let promo_spec = LoanSpec::new(promo_principal, input.promo_apr, input.term_months);

    let comparison = run_comparison(
        &rebate_spec,
        &promo_spec,
        input.term_months,
        limits,
        &mut warnings,
    )?;

    let cash_back = option_from(
        &rebate_spec,
        input.down_payment,
        comparison.scenario_a.total_interest,
        comparison.scenario_a.total_paid,
        comparison.scenario_a.scheduled_payment,
    );
    let low_apr = option_from(
        &promo_spec,
        input.down_payment,
        comparison.scenario_b.total_interest,
        comparison.scenario_b.total_paid,
        comparison.scenario_b.scheduled_payment,
    );

    let diff = cash_back.total_cost - low_apr.total_cost;
    let better_option = if diff.abs() < dec!(0.005) {
        CashBackChoice::Equivalent
    } else if diff < Decimal::ZERO {
        CashBackChoice::CashBack
    } else {
        CashBackChoice::LowApr
    };

    let break_even_apr = match solve_break_even_apr(
        rebate_principal,
        comparison.scenario_b.total_paid,
        input.term_months,
        limits,
    ) {
        Ok(apr) => apr,
        Err(e) => {
            warnings.push(format!("Break-even APR not found: {e}"));
            None
        }
    };

    let output = CashBackOutput {
        cash_back,
        low_apr,
        better_option,
        savings: diff.abs(),
        break_even: comparison.break_even,
        break_even_apr,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Cash rebate vs. promotional APR",
        &serde_json::json!({
            "vehicle_price": input.vehicle_price.to_string(),
            "rebate": input.rebate.to_string(),
            "standard_apr": input.standard_apr.to_string(),
            "promo_apr": input.promo_apr.to_string(),
            "term_months": input.term_months,
        }),
        warnings,
        elapsed,
        output,
    ))
}
