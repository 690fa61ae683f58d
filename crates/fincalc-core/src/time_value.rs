use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::config::EngineLimits;
use crate::error::FinCalcError;
use crate::rates::growth_factor;
use crate::types::{Money, Rate};
use crate::FinCalcResult;

const MIN_SOLVER_RATE: Decimal = dec!(-0.99);
const MAX_SOLVER_RATE: Decimal = dec!(10);
/// NPV at an accepted IRR, relative to the total absolute cash flow
const RESIDUAL_TOLERANCE: Decimal = dec!(0.000001);

/// Net Present Value of a series of cash flows (index 0 is undiscounted)
pub fn npv(rate: Rate, cash_flows: &[Money]) -> FinCalcResult<Money> {
    if rate <= dec!(-1) {
        return Err(FinCalcError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount
                .checked_mul(one_plus_r)
                .ok_or_else(|| FinCalcError::InvalidInput {
                    field: "rate".into(),
                    reason: format!("Discount factor overflows at period {t}"),
                })?;
        }
        if discount.is_zero() {
            return Err(FinCalcError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result += cf / discount;
    }

    Ok(result)
}

/// NPV and dNPV/dr at `rate`, or None when the powers leave Decimal range.
fn npv_and_derivative(rate: Rate, cash_flows: &[Money]) -> Option<(Decimal, Decimal)> {
    let v = Decimal::ONE.checked_div(Decimal::ONE + rate)?;
    let mut value = Decimal::ZERO;
    let mut slope = Decimal::ZERO;
    let mut v_t = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        let v_next = v_t.checked_mul(v)?;
        value = value.checked_add(cf.checked_mul(v_t)?)?;
        if t > 0 {
            let term = Decimal::from(t as i64).checked_mul(*cf)?.checked_mul(v_next)?;
            slope = slope.checked_sub(term)?;
        }
        v_t = v_next;
    }

    Some((value, slope))
}

/// Internal Rate of Return using Newton-Raphson.
///
/// Seeded at `limits.irr_guess`; stops when successive guesses differ by less
/// than `limits.irr_tolerance` and NPV at the final guess is effectively zero.
/// Roots outside [-99%, 1000%] per period are not reported. Cash flows whose sign changes more than once
/// can have several roots or none, in which case this reports
/// `NonConvergence` rather than an arbitrary value.
pub fn irr(cash_flows: &[Money], limits: &EngineLimits) -> FinCalcResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(FinCalcError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }
    let has_positive = cash_flows.iter().any(|cf| *cf > Decimal::ZERO);
    let has_negative = cash_flows.iter().any(|cf| *cf < Decimal::ZERO);
    if !has_positive || !has_negative {
        return Err(FinCalcError::NonConvergence {
            function: "IRR".into(),
            iterations: 0,
            last_delta: Decimal::ZERO,
        });
    }

    let scale: Decimal = cash_flows.iter().map(|cf| cf.abs()).sum();
    let mut rate = limits.irr_guess;
    let mut last_delta = Decimal::ZERO;

    for i in 0..limits.irr_max_iterations {
        let Some((npv_val, dnpv)) = npv_and_derivative(rate, cash_flows) else {
            return Err(FinCalcError::NonConvergence {
                function: "IRR".into(),
                iterations: i,
                last_delta,
            });
        };

        if dnpv.abs() < dec!(0.0000000001) {
            return Err(FinCalcError::NonConvergence {
                function: "IRR".into(),
                iterations: i,
                last_delta: npv_val,
            });
        }

        let next = (rate - npv_val / dnpv).clamp(MIN_SOLVER_RATE, MAX_SOLVER_RATE);
        last_delta = next - rate;
        if last_delta.abs() < limits.irr_tolerance {
            // A guess pinned at a solver bound is not a root
            if next == MIN_SOLVER_RATE || next == MAX_SOLVER_RATE {
                return Err(FinCalcError::NonConvergence {
                    function: "IRR".into(),
                    iterations: i + 1,
                    last_delta: npv_val,
                });
            }
            return match npv_and_derivative(next, cash_flows) {
                Some((residual, _)) if residual.abs() <= scale * RESIDUAL_TOLERANCE => Ok(next),
                Some((residual, _)) => Err(FinCalcError::NonConvergence {
                    function: "IRR".into(),
                    iterations: i + 1,
                    last_delta: residual,
                }),
                None => Err(FinCalcError::NonConvergence {
                    function: "IRR".into(),
                    iterations: i + 1,
                    last_delta,
                }),
            };
        }
        rate = next;
    }

    Err(FinCalcError::NonConvergence {
        function: "IRR".into(),
        iterations: limits.irr_max_iterations,
        last_delta,
    })
}

/// Modified IRR.
///
/// Positive flows are compounded forward to the last period at
/// `reinvest_rate`; negative flows are discounted back to period 0 at
/// `finance_rate`.
pub fn mirr(cash_flows: &[Money], finance_rate: Rate, reinvest_rate: Rate) -> FinCalcResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(FinCalcError::InsufficientData(
            "MIRR requires at least 2 cash flows".into(),
        ));
    }
    if finance_rate <= dec!(-1) || reinvest_rate <= dec!(-1) {
        return Err(FinCalcError::InvalidInput {
            field: "finance_rate".into(),
            reason: "Finance and reinvestment rates must be greater than -100%".into(),
        });
    }

    let n = cash_flows.len() - 1;
    let mut fv_positive = Decimal::ZERO;
    let mut pv_negative = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        if *cf > Decimal::ZERO {
            fv_positive += cf * growth_factor(reinvest_rate, Decimal::from((n - t) as i64))?;
        } else if *cf < Decimal::ZERO {
            pv_negative += cf / growth_factor(finance_rate, Decimal::from(t as i64))?;
        }
    }

    if pv_negative.is_zero() {
        return Err(FinCalcError::DivisionByZero {
            context: "MIRR requires at least one negative cash flow".into(),
        });
    }
    if fv_positive.is_zero() {
        return Err(FinCalcError::InsufficientData(
            "MIRR requires at least one positive cash flow".into(),
        ));
    }

    let ratio = fv_positive / -pv_negative;
    let exponent = Decimal::ONE / Decimal::from(n as i64);
    let root = ratio
        .checked_powd(exponent)
        .ok_or_else(|| FinCalcError::NonConvergence {
            function: "MIRR".into(),
            iterations: 0,
            last_delta: ratio,
        })?;
    Ok(root - Decimal::ONE)
}

/// Present Value, spreadsheet sign convention
pub fn pv(rate: Rate, nper: u32, payment: Money, future_value: Money) -> FinCalcResult<Money> {
    if rate.is_zero() {
        return Ok(-(payment * Decimal::from(nper) + future_value));
    }

    let factor = growth_factor(rate, Decimal::from(nper))?;
    if factor.is_zero() {
        return Err(FinCalcError::DivisionByZero {
            context: "PV factor".into(),
        });
    }

    let annuity_factor = (Decimal::ONE - Decimal::ONE / factor) / rate;
    Ok(-(payment * annuity_factor + future_value / factor))
}

/// Future Value, spreadsheet sign convention
pub fn fv(rate: Rate, nper: u32, payment: Money, present_value: Money) -> FinCalcResult<Money> {
    if rate.is_zero() {
        return Ok(-(present_value + payment * Decimal::from(nper)));
    }

    let factor = growth_factor(rate, Decimal::from(nper))?;
    let annuity_factor = (factor - Decimal::ONE) / rate;
    let grown = present_value
        .checked_mul(factor)
        .zip(payment.checked_mul(annuity_factor))
        .and_then(|(a, b)| a.checked_add(b))
        .ok_or_else(|| FinCalcError::InvalidInput {
            field: "rate".into(),
            reason: format!("Future value over {nper} periods is not representable"),
        })?;
    Ok(-grown)
}

/// Payment (PMT), spreadsheet sign convention
pub fn pmt(rate: Rate, nper: u32, present_value: Money, future_value: Money) -> FinCalcResult<Money> {
    if nper == 0 {
        return Err(FinCalcError::InvalidInput {
            field: "nper".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }

    if rate.is_zero() {
        return Ok(-(present_value + future_value) / Decimal::from(nper));
    }

    let factor = growth_factor(rate, Decimal::from(nper))?;
    let annuity_factor = (factor - Decimal::ONE) / rate;

    if annuity_factor.is_zero() {
        return Err(FinCalcError::DivisionByZero {
            context: "PMT annuity factor".into(),
        });
    }

    Ok(-(present_value * factor + future_value) / annuity_factor)
}

/// Level payment that retires `principal` in `periods` payments:
/// `P r (1+r)^n / ((1+r)^n - 1)`, or `P / n` when the rate is zero.
pub fn annuity_payment(principal: Money, rate: Rate, periods: u32) -> FinCalcResult<Money> {
    Ok(-pmt(rate, periods, principal, Decimal::ZERO)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // NPV at 10%: -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(1.0));
    }

    #[test]
    fn test_npv_zero_rate() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50), dec!(50)];
        let result = npv(dec!(0.0), &cfs).unwrap();
        assert_eq!(result, dec!(50));
    }

    #[test]
    fn test_irr_single_period() {
        let cfs = vec![dec!(-1000), dec!(1100)];
        let result = irr(&cfs, &EngineLimits::default()).unwrap();
        assert!((result - dec!(0.10)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_irr_level_flows() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let result = irr(&cfs, &EngineLimits::default()).unwrap();
        // IRR should be ~9.7%
        assert!((result - dec!(0.097)).abs() < dec!(0.01));
    }

    #[test]
    fn test_irr_no_sign_change() {
        let cfs = vec![dec!(100), dec!(100)];
        let err = irr(&cfs, &EngineLimits::default()).unwrap_err();
        assert!(err.is_non_convergence());
    }

    #[test]
    fn test_irr_root_below_solver_floor() {
        // True IRR is -99.9%; the solver must not report its -99% floor
        let cfs = vec![dec!(-1000), dec!(1)];
        let err = irr(&cfs, &EngineLimits::default()).unwrap_err();
        assert!(err.is_non_convergence());
    }

    #[test]
    fn test_irr_root_above_solver_ceiling() {
        // True IRR is 9900%
        let cfs = vec![dec!(-1), dec!(100)];
        let err = irr(&cfs, &EngineLimits::default()).unwrap_err();
        assert!(err.is_non_convergence());
    }

    #[test]
    fn test_irr_npv_is_zero_at_root() {
        let cfs = vec![dec!(-5000), dec!(1200), dec!(-300), dec!(2500), dec!(2600)];
        let rate = irr(&cfs, &EngineLimits::default()).unwrap();
        assert!(npv(rate, &cfs).unwrap().abs() < dec!(0.01));
    }

    #[test]
    fn test_pv_annuity() {
        // 100 per period for 3 periods at 10%: 100 * (1 - 1.1^-3) / 0.1 = 248.685
        let result = pv(dec!(0.10), 3, dec!(100), Decimal::ZERO).unwrap();
        assert!((result - dec!(-248.685)).abs() < dec!(0.001));
    }

    #[test]
    fn test_pv_zero_rate() {
        let result = pv(Decimal::ZERO, 4, dec!(-50), dec!(-100)).unwrap();
        assert_eq!(result, dec!(300));
    }

    #[test]
    fn test_fv_lump_and_annuity() {
        // -(1000 * 1.05^2 + 100 * 2.05) = -1307.5
        let result = fv(dec!(0.05), 2, dec!(100), dec!(1000)).unwrap();
        assert!((result - dec!(-1307.5)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_fv_reverses_pv() {
        let present = pv(dec!(0.04), 10, Decimal::ZERO, dec!(5000)).unwrap();
        let future = fv(dec!(0.04), 10, Decimal::ZERO, present).unwrap();
        assert!((future - dec!(5000)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_mirr_unequal_rates_with_interim_outflow() {
        // FV+ at 10%: 500 * 1.1^2 + 900 = 1505
        // PV- at 5%:  1000 + 200 / 1.05^2 = 1181.4059
        // (1505 / 1181.4059)^(1/3) - 1 = 8.4041%
        let cfs = vec![dec!(-1000), dec!(500), dec!(-200), dec!(900)];
        let result = mirr(&cfs, dec!(0.05), dec!(0.10)).unwrap();
        assert!((result - dec!(0.084041)).abs() < dec!(0.000001));

        // Discounting the outflow at the reinvestment rate would differ
        let swapped = mirr(&cfs, dec!(0.10), dec!(0.10)).unwrap();
        assert!((swapped - result).abs() > dec!(0.0005));
    }

    #[test]
    fn test_mirr_equal_rates_single_period() {
        // One period: MIRR collapses to 1100/1000 - 1
        let cfs = vec![dec!(-1000), dec!(1100)];
        let result = mirr(&cfs, dec!(0.05), dec!(0.08)).unwrap();
        assert!((result - dec!(0.10)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_mirr_reinvestment() {
        // FV+ = 600*1.1 + 600 = 1260; PV- = 1000 => (1.26)^(1/2) - 1 ≈ 12.25%
        let cfs = vec![dec!(-1000), dec!(600), dec!(600)];
        let result = mirr(&cfs, dec!(0.10), dec!(0.10)).unwrap();
        assert!((result - dec!(0.1225)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_annuity_payment_zero_rate() {
        let p = annuity_payment(dec!(1200), Decimal::ZERO, 12).unwrap();
        assert_eq!(p, dec!(100));
    }

    #[test]
    fn test_annuity_payment_auto_loan() {
        let r = dec!(4.9) / dec!(1200);
        let p = annuity_payment(dec!(22500), r, 60).unwrap();
        assert!((p - dec!(423.57)).abs() < dec!(0.01));
    }
}
