use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::FinCalcError;
use crate::types::Rate;
use crate::FinCalcResult;

/// Iteration bounds shared by every engine.
///
/// Passed explicitly into each calculation so two callers with different
/// limits never interfere. Missing fields in a config file fall back to the
/// defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineLimits {
    /// Hard ceiling on amortization periods (600 = 50 years of monthly payments)
    pub max_periods: u32,
    /// Newton-Raphson iteration cap for IRR
    pub irr_max_iterations: u32,
    /// IRR stops once successive guesses differ by less than this
    pub irr_tolerance: Decimal,
    /// IRR seed rate as a decimal fraction
    pub irr_guess: Rate,
    /// Iteration cap for bisection searches (break-even APR)
    pub bisection_max_iterations: u32,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_periods: 600,
            irr_max_iterations: 1000,
            irr_tolerance: dec!(0.0000001),
            irr_guess: dec!(0.10),
            bisection_max_iterations: 100,
        }
    }
}

impl EngineLimits {
    pub fn validate(&self) -> FinCalcResult<()> {
        if self.max_periods == 0 {
            return Err(FinCalcError::InvalidInput {
                field: "max_periods".into(),
                reason: "Iteration ceiling must be at least 1 period".into(),
            });
        }
        if self.irr_max_iterations == 0 {
            return Err(FinCalcError::InvalidInput {
                field: "irr_max_iterations".into(),
                reason: "IRR iteration cap must be at least 1".into(),
            });
        }
        if self.bisection_max_iterations == 0 {
            return Err(FinCalcError::InvalidInput {
                field: "bisection_max_iterations".into(),
                reason: "Bisection iteration cap must be at least 1".into(),
            });
        }
        if self.irr_tolerance <= Decimal::ZERO {
            return Err(FinCalcError::InvalidInput {
                field: "irr_tolerance".into(),
                reason: "Tolerance must be positive".into(),
            });
        }
        if self.irr_guess <= dec!(-1) {
            return Err(FinCalcError::InvalidInput {
                field: "irr_guess".into(),
                reason: "Seed rate must be greater than -100%".into(),
            });
        }
        Ok(())
    }
}
