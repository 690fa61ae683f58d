use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::amortization::schedule::{build_schedule, AmortizationResult, LoanSpec};
use crate::comparison::break_even::{find_break_even, BreakEven};
use crate::config::EngineLimits;
use crate::error::FinCalcError;
use crate::types::*;
use crate::FinCalcResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioLabel {
    A,
    B,
}

/// Both loans at the end of one period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonPoint {
    pub period: u32,
    pub cumulative_paid_a: Money,
    pub cumulative_paid_b: Money,
    pub balance_a: Money,
    pub balance_b: Money,
    /// Cost of clearing loan B minus the cost of clearing loan A at this
    /// period (payments so far plus outstanding balance). Positive means A is ahead.
    pub advantage_a: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub scenario_a: AmortizationResult,
    pub scenario_b: AmortizationResult,
    pub points: Vec<ComparisonPoint>,
    pub break_even: BreakEven,
    /// Cost to be debt-free under A minus the same under B, at the horizon
    pub horizon_cost_difference: Money,
    /// None when both cost the same at the horizon
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cheaper_at_horizon: Option<ScenarioLabel>,
}

/// Walk both schedules side by side over `horizon` periods.
pub(crate) fn run_comparison(
    a: &LoanSpec,
    b: &LoanSpec,
    horizon: u32,
    limits: &EngineLimits,
    warnings: &mut Vec<String>,
) -> FinCalcResult<ComparisonResult> {
    if horizon == 0 {
        return Err(FinCalcError::InvalidInput {
            field: "horizon_periods".into(),
            reason: "Horizon must be at least 1 period".into(),
        });
    }
    if horizon > limits.max_periods {
        return Err(FinCalcError::InvalidInput {
            field: "horizon_periods".into(),
            reason: format!(
                "Horizon of {horizon} periods exceeds the {}-period ceiling",
                limits.max_periods
            ),
        });
    }

    let scenario_a = build_schedule(a, limits, warnings)?;
    let scenario_b = build_schedule(b, limits, warnings)?;

    let paid_a = scenario_a.cumulative_payments(horizon);
    let paid_b = scenario_b.cumulative_payments(horizon);

    let mut exit_a = Vec::with_capacity(horizon as usize);
    let mut exit_b = Vec::with_capacity(horizon as usize);
    let mut points = Vec::with_capacity(horizon as usize);

    for period in 1..=horizon {
        let idx = (period - 1) as usize;
        let balance_a = scenario_a.balance_after(period, a.principal);
        let balance_b = scenario_b.balance_after(period, b.principal);
        let cost_a = paid_a[idx] + balance_a;
        let cost_b = paid_b[idx] + balance_b;
        exit_a.push(cost_a);
        exit_b.push(cost_b);
        points.push(ComparisonPoint {
            period,
            cumulative_paid_a: paid_a[idx],
            cumulative_paid_b: paid_b[idx],
            balance_a,
            balance_b,
            advantage_a: cost_b - cost_a,
        });
    }

    let break_even = find_break_even(&exit_a, &exit_b)?;
    let horizon_cost_difference = exit_a
        .last()
        .zip(exit_b.last())
        .map(|(x, y)| x - y)
        .unwrap_or(Decimal::ZERO);
    let cheaper_at_horizon = if horizon_cost_difference < Decimal::ZERO {
        Some(ScenarioLabel::A)
    } else if horizon_cost_difference > Decimal::ZERO {
        Some(ScenarioLabel::B)
    } else {
        None
    };

    debug!(horizon, ?break_even, "scenario comparison built");

    Ok(ComparisonResult {
        scenario_a,
        scenario_b,
        points,
        break_even,
        horizon_cost_difference,
        cheaper_at_horizon,
    })
}

/// Compare two loans period by period and locate where the cheaper one changes.
///
/// Each side's running cost is what it would take to be debt-free at that
/// period: payments made so far plus the outstanding balance.
pub fn compare_scenarios(
    a: &LoanSpec,
    b: &LoanSpec,
    horizon_periods: u32,
    limits: &EngineLimits,
) -> FinCalcResult<ComputationOutput<ComparisonResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let output = run_comparison(a, b, horizon_periods, limits, &mut warnings)?;

    if let BreakEven::NotWithinHorizon = output.break_even {
        warnings.push(format!("No break-even within {horizon_periods} periods"));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Two-scenario loan cost comparison",
        &serde_json::json!({
            "principal_a": a.principal.to_string(),
            "apr_a": a.apr.to_string(),
            "principal_b": b.principal.to_string(),
            "apr_b": b.apr.to_string(),
            "horizon_periods": horizon_periods,
        }),
        warnings,
        elapsed,
        output,
    ))
}
