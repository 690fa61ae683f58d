use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::EngineLimits;
use crate::error::FinCalcError;
use crate::rates::{from_percent, periodic_rate, periods_to_years, to_percent};
use crate::time_value::{irr, mirr, npv};
use crate::types::*;
use crate::FinCalcResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Cash in and out of the investment during one period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodFlow {
    #[serde(default)]
    pub inflow: Money,
    #[serde(default)]
    pub outflow: Money,
    /// Non-cash charge, only deducted when `net_of_depreciation` is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depreciation: Option<Money>,
}

impl PeriodFlow {
    pub fn new(inflow: Money, outflow: Money) -> Self {
        Self {
            inflow,
            outflow,
            depreciation: None,
        }
    }

    fn net(&self, net_of_depreciation: bool) -> Money {
        let depreciation = if net_of_depreciation {
            self.depreciation.unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        };
        self.inflow - self.outflow - depreciation
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowSeries {
    /// Outlay at time 0, as a positive amount
    pub initial_investment: Money,
    pub flows: Vec<PeriodFlow>,
    #[serde(default)]
    pub net_of_depreciation: bool,
    /// Sale or residual value received at the end of the last period
    #[serde(default)]
    pub terminal_value: Money,
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: u32,
}

fn default_periods_per_year() -> u32 {
    1
}

impl CashFlowSeries {
    /// Net flow per period after outflows (and depreciation when enabled)
    pub fn net_flows(&self) -> Vec<Money> {
        self.flows
            .iter()
            .map(|f| f.net(self.net_of_depreciation))
            .collect()
    }
}

/// Annual rates used to price the series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateParams {
    pub discount_rate: Percent,
    /// Cost of funding the outflows in MIRR; defaults to the discount rate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finance_rate: Option<Percent>,
    pub reinvestment_rate: Percent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inflation_rate: Option<Percent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<Percent>,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InvestmentBreakEven {
    /// Fractional period at which cumulative net flow first covers the outlay
    Reached { period: Decimal },
    /// Outlay not recovered by the end of the series
    NotReached { horizon: u32 },
}

impl InvestmentBreakEven {
    pub fn period(&self) -> Option<Decimal> {
        match self {
            InvestmentBreakEven::Reached { period } => Some(*period),
            InvestmentBreakEven::NotReached { .. } => None,
        }
    }
}

/// All return metrics, as percentages unless noted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnMetrics {
    pub simple_roi: Percent,
    pub annualized_roi: Option<Percent>,
    /// Currency amount at the discount rate
    pub npv: Money,
    pub irr: Option<Percent>,
    pub mirr: Option<Percent>,
    pub cagr: Option<Percent>,
    pub break_even: InvestmentBreakEven,
    pub real_roi: Option<Percent>,
    pub after_tax_roi: Option<Percent>,
    pub total_net_cash_flow: Money,
    pub years: Years,
}

// ---------------------------------------------------------------------------
// Individual metrics
// ---------------------------------------------------------------------------

fn check_initial(initial: Money) -> FinCalcResult<()> {
    if initial.is_zero() {
        return Err(FinCalcError::DivisionByZero {
            context: "return on a zero initial investment".into(),
        });
    }
    if initial < Decimal::ZERO {
        return Err(FinCalcError::InvalidInput {
            field: "initial_investment".into(),
            reason: "Enter the outlay as a positive amount".into(),
        });
    }
    Ok(())
}

/// `(sum(net) + terminal - initial) / initial * 100`
pub fn simple_roi(initial: Money, net_flows: &[Money], terminal: Money) -> FinCalcResult<Percent> {
    check_initial(initial)?;
    let total: Money = net_flows.iter().sum();
    Ok((total + terminal - initial) / initial * dec!(100))
}

/// `((end / start)^(1/years) - 1) * 100`, or None when undefined.
fn compound_annual(start: Money, end: Money, years: Years) -> Option<Percent> {
    if end <= Decimal::ZERO || years <= Decimal::ZERO {
        return None;
    }
    let ratio = end.checked_div(start)?;
    let exponent = Decimal::ONE.checked_div(years)?;
    let growth = ratio.checked_powd(exponent)?;
    Some(to_percent(growth - Decimal::ONE))
}

/// Annualized ROI from the terminal value alone; None when the terminal value
/// is not positive or the horizon is empty.
pub fn annualized_roi(initial: Money, terminal: Money, years: Years) -> FinCalcResult<Option<Percent>> {
    check_initial(initial)?;
    Ok(compound_annual(initial, terminal, years))
}

/// Compound annual growth of everything returned (flows plus terminal value).
pub fn cagr(
    initial: Money,
    net_flows: &[Money],
    terminal: Money,
    years: Years,
) -> FinCalcResult<Option<Percent>> {
    check_initial(initial)?;
    let total: Money = net_flows.iter().sum();
    Ok(compound_annual(initial, terminal + total, years))
}

/// Period at which cumulative net flow first offsets the outlay, interpolated
/// linearly inside the crossing period. The terminal value is not counted.
pub fn break_even_period(initial: Money, net_flows: &[Money]) -> FinCalcResult<InvestmentBreakEven> {
    check_initial(initial)?;
    let mut cumulative = -initial;
    for (i, net) in net_flows.iter().enumerate() {
        let before = cumulative;
        cumulative += net;
        if before < Decimal::ZERO && cumulative >= Decimal::ZERO {
            let fraction = if net.is_zero() {
                Decimal::ONE
            } else {
                -before / net
            };
            return Ok(InvestmentBreakEven::Reached {
                period: Decimal::from(i as u64) + fraction,
            });
        }
    }
    Ok(InvestmentBreakEven::NotReached {
        horizon: net_flows.len() as u32,
    })
}

/// Inflation-adjusted return (Fisher): `((1 + n) / (1 + i) - 1) * 100`
pub fn real_return(nominal: Percent, inflation: Percent) -> FinCalcResult<Percent> {
    let denominator = Decimal::ONE + from_percent(inflation);
    if denominator <= Decimal::ZERO {
        return Err(FinCalcError::InvalidInput {
            field: "inflation_rate".into(),
            reason: "Inflation must be greater than -100%".into(),
        });
    }
    Ok(to_percent((Decimal::ONE + from_percent(nominal)) / denominator - Decimal::ONE))
}

pub fn after_tax_return(roi: Percent, tax_rate: Percent) -> FinCalcResult<Percent> {
    if tax_rate < Decimal::ZERO || tax_rate > dec!(100) {
        return Err(FinCalcError::InvalidInput {
            field: "tax_rate".into(),
            reason: "Tax rate must be between 0% and 100%".into(),
        });
    }
    Ok(roi * (Decimal::ONE - from_percent(tax_rate)))
}

// ---------------------------------------------------------------------------
// Full evaluation
// ---------------------------------------------------------------------------

fn validate(series: &CashFlowSeries, rates: &RateParams, limits: &EngineLimits) -> FinCalcResult<()> {
    limits.validate()?;
    check_initial(series.initial_investment)?;
    if series.flows.is_empty() {
        return Err(FinCalcError::InsufficientData(
            "At least one period of cash flows is required".into(),
        ));
    }
    if series.periods_per_year == 0 {
        return Err(FinCalcError::InvalidInput {
            field: "periods_per_year".into(),
            reason: "Must be at least 1".into(),
        });
    }
    let finance_rate = rates.finance_rate.unwrap_or(rates.discount_rate);
    for (field, value) in [
        ("discount_rate", rates.discount_rate),
        ("finance_rate", finance_rate),
        ("reinvestment_rate", rates.reinvestment_rate),
    ] {
        if value <= dec!(-100) {
            return Err(FinCalcError::InvalidInput {
                field: field.into(),
                reason: "Rate must be greater than -100%".into(),
            });
        }
    }
    Ok(())
}

/// Compute every return metric for a cash-flow series.
///
/// Rates are annual; with `periods_per_year > 1` they are divided down to the
/// period and IRR/MIRR are scaled back up to a nominal annual figure. A
/// series without an IRR (no sign change, solver stalls) still reports the
/// other metrics, with IRR as None and a warning.
pub fn evaluate_investment(
    series: &CashFlowSeries,
    rates: &RateParams,
    limits: &EngineLimits,
) -> FinCalcResult<ComputationOutput<ReturnMetrics>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate(series, rates, limits)?;

    let initial = series.initial_investment;
    let terminal = series.terminal_value;
    let ppy = series.periods_per_year;
    let net = series.net_flows();
    let n = net.len() as u32;
    let years = periods_to_years(n, ppy)?;

    let mut flows = Vec::with_capacity(net.len() + 1);
    flows.push(-initial);
    flows.extend(net.iter().copied());
    if let Some(last) = flows.last_mut() {
        *last += terminal;
    }

    let discount = periodic_rate(rates.discount_rate, ppy)?;
    let finance = periodic_rate(rates.finance_rate.unwrap_or(rates.discount_rate), ppy)?;
    let reinvest = periodic_rate(rates.reinvestment_rate, ppy)?;
    let annualize = Decimal::from(ppy);

    let npv_value = npv(discount, &flows)?;

    let irr_value = match irr(&flows, limits) {
        Ok(r) => Some(to_percent(r * annualize)),
        Err(e) => {
            warn!(error = %e, "IRR undefined for series");
            warnings.push(format!("IRR not available: {e}"));
            None
        }
    };

    let mirr_value = match mirr(&flows, finance, reinvest) {
        Ok(r) => Some(to_percent(r * annualize)),
        Err(e) => {
            warn!(error = %e, "MIRR undefined for series");
            warnings.push(format!("MIRR not available: {e}"));
            None
        }
    };

    let roi = simple_roi(initial, &net, terminal)?;
    let annualized = annualized_roi(initial, terminal, years)?;
    let cagr_value = cagr(initial, &net, terminal, years)?;
    let break_even = break_even_period(initial, &net)?;

    let real_roi = match (rates.inflation_rate, annualized) {
        (Some(inflation), Some(nominal)) => Some(real_return(nominal, inflation)?),
        (Some(_), None) => {
            warnings.push("Real ROI needs an annualized ROI; terminal value is not positive".into());
            None
        }
        _ => None,
    };
    let after_tax_roi = rates
        .tax_rate
        .map(|tax| after_tax_return(roi, tax))
        .transpose()?;

    if let InvestmentBreakEven::NotReached { horizon } = break_even {
        warnings.push(format!(
            "Cash flows do not recover the initial investment within {horizon} periods"
        ));
    }

    let output = ReturnMetrics {
        simple_roi: roi,
        annualized_roi: annualized,
        npv: npv_value,
        irr: irr_value,
        mirr: mirr_value,
        cagr: cagr_value,
        break_even,
        real_roi,
        after_tax_roi,
        total_net_cash_flow: net.iter().sum(),
        years,
    };

    debug!(periods = n, roi = %output.simple_roi, "investment metrics computed");

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Investment return analysis (ROI, NPV, IRR, MIRR, CAGR)",
        &serde_json::json!({
            "initial_investment": initial.to_string(),
            "terminal_value": terminal.to_string(),
            "periods": n,
            "periods_per_year": ppy,
            "discount_rate": rates.discount_rate.to_string(),
            "reinvestment_rate": rates.reinvestment_rate.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn reference_series() -> CashFlowSeries {
        CashFlowSeries {
            initial_investment: dec!(100000),
            flows: vec![
                PeriodFlow::new(dec!(30000), dec!(10000)),
                PeriodFlow::new(dec!(35000), dec!(12000)),
                PeriodFlow::new(dec!(40000), dec!(15000)),
                PeriodFlow::new(dec!(45000), dec!(18000)),
                PeriodFlow::new(dec!(50000), dec!(20000)),
            ],
            net_of_depreciation: false,
            terminal_value: dec!(150000),
            periods_per_year: 1,
        }
    }

    fn rates() -> RateParams {
        RateParams {
            discount_rate: dec!(8),
            finance_rate: None,
            reinvestment_rate: dec!(8),
            inflation_rate: None,
            tax_rate: None,
        }
    }

    #[test]
    fn test_reference_series_simple_roi() {
        let out = evaluate_investment(&reference_series(), &rates(), &EngineLimits::default())
            .unwrap()
            .result;
        assert_eq!(out.simple_roi, dec!(175));
        assert_eq!(out.total_net_cash_flow, dec!(125000));
        assert_eq!(out.years, dec!(5));
    }

    #[test]
    fn test_reference_series_break_even() {
        let net = reference_series().net_flows();
        let be = break_even_period(dec!(100000), &net).unwrap();
        // -100k, -80k, -57k, -32k, -5k, then +30k covers the last 5k
        let period = be.period().unwrap();
        assert!((period - dec!(4.1666667)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_annualized_and_cagr() {
        let out = evaluate_investment(&reference_series(), &rates(), &EngineLimits::default())
            .unwrap()
            .result;
        // 1.5^(1/5) - 1
        assert!((out.annualized_roi.unwrap() - dec!(8.447)).abs() < dec!(0.01));
        // 2.75^(1/5) - 1
        assert!((out.cagr.unwrap() - dec!(22.42)).abs() < dec!(0.01));
    }

    #[test]
    fn test_single_period_irr() {
        let series = CashFlowSeries {
            initial_investment: dec!(1000),
            flows: vec![PeriodFlow::new(dec!(1100), Decimal::ZERO)],
            net_of_depreciation: false,
            terminal_value: Decimal::ZERO,
            periods_per_year: 1,
        };
        let out = evaluate_investment(&series, &rates(), &EngineLimits::default())
            .unwrap()
            .result;
        assert!((out.irr.unwrap() - dec!(10)).abs() < dec!(0.0001));
        assert!((out.mirr.unwrap() - dec!(10)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_irr_undefined_is_none_with_warning() {
        let series = CashFlowSeries {
            initial_investment: dec!(1000),
            flows: vec![PeriodFlow::new(Decimal::ZERO, dec!(100))],
            net_of_depreciation: false,
            terminal_value: Decimal::ZERO,
            periods_per_year: 1,
        };
        let out = evaluate_investment(&series, &rates(), &EngineLimits::default()).unwrap();
        assert!(out.result.irr.is_none());
        assert!(out.warnings.iter().any(|w| w.contains("IRR")));
        assert_eq!(
            out.result.break_even,
            InvestmentBreakEven::NotReached { horizon: 1 }
        );
    }

    #[test]
    fn test_break_even_exactly_at_horizon_is_reached() {
        let be = break_even_period(dec!(100), &[dec!(50), dec!(50)]).unwrap();
        assert_eq!(be, InvestmentBreakEven::Reached { period: dec!(2) });
    }

    #[test]
    fn test_depreciation_only_when_enabled() {
        let mut series = reference_series();
        series.flows[0].depreciation = Some(dec!(5000));
        assert_eq!(series.net_flows()[0], dec!(20000));
        series.net_of_depreciation = true;
        assert_eq!(series.net_flows()[0], dec!(15000));
    }

    #[test]
    fn test_real_and_after_tax() {
        assert_eq!(after_tax_return(dec!(175), dec!(20)).unwrap(), dec!(140));
        let real = real_return(dec!(10), dec!(3)).unwrap();
        assert!((real - dec!(6.796)).abs() < dec!(0.001));
    }

    #[test]
    fn test_zero_initial_is_division_by_zero() {
        let err = simple_roi(Decimal::ZERO, &[dec!(10)], Decimal::ZERO).unwrap_err();
        assert!(matches!(err, FinCalcError::DivisionByZero { .. }));
        let err = simple_roi(dec!(-5), &[dec!(10)], Decimal::ZERO).unwrap_err();
        assert!(matches!(err, FinCalcError::InvalidInput { .. }));
    }

    #[test]
    fn test_non_positive_terminal_has_no_annualized_roi() {
        assert_eq!(annualized_roi(dec!(100), Decimal::ZERO, dec!(5)).unwrap(), None);
        assert_eq!(annualized_roi(dec!(100), dec!(150), Decimal::ZERO).unwrap(), None);
    }
}
