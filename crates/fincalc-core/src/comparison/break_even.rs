use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::FinCalcError;
use crate::types::Money;
use crate::FinCalcResult;

/// Outcome of a crossing search between two series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakEven {
    /// 1-based index of the first period where the leader changes
    At { period: u32 },
    /// No crossing inside the series; nothing is extrapolated
    NotWithinHorizon,
}

impl BreakEven {
    pub fn period(&self) -> Option<u32> {
        match self {
            BreakEven::At { period } => Some(*period),
            BreakEven::NotWithinHorizon => None,
        }
    }
}

/// First index where `a[t] - b[t]` leaves the sign of its first non-zero value.
///
/// Reaching exactly zero after a non-zero start counts as breaking even. Two
/// identical series never break even.
pub fn find_break_even(a: &[Money], b: &[Money]) -> FinCalcResult<BreakEven> {
    if a.len() != b.len() {
        return Err(FinCalcError::InvalidInput {
            field: "series".into(),
            reason: format!("Series lengths differ ({} vs {})", a.len(), b.len()),
        });
    }

    let mut initial: Option<bool> = None;
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        let diff = x - y;
        match initial {
            None => {
                if !diff.is_zero() {
                    initial = Some(diff > Decimal::ZERO);
                }
            }
            Some(positive) => {
                let flipped = if positive {
                    diff <= Decimal::ZERO
                } else {
                    diff >= Decimal::ZERO
                };
                if flipped {
                    return Ok(BreakEven::At {
                        period: (i + 1) as u32,
                    });
                }
            }
        }
    }

    Ok(BreakEven::NotWithinHorizon)
}
