use chrono::{Days, Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::FinCalcError;
use crate::types::{Money, PaymentFrequency, Percent, Rate, Years};
use crate::FinCalcResult;

/// Periodic rate from an annual percentage: `apr / 100 / periods_per_year`.
pub fn periodic_rate(apr: Percent, periods_per_year: u32) -> FinCalcResult<Rate> {
    if periods_per_year == 0 {
        return Err(FinCalcError::InvalidInput {
            field: "periods_per_year".into(),
            reason: "Must be at least 1".into(),
        });
    }
    Ok(apr / dec!(100) / Decimal::from(periods_per_year))
}

/// Percentage to decimal fraction.
pub fn from_percent(pct: Percent) -> Rate {
    pct / dec!(100)
}

/// Decimal fraction to percentage.
pub fn to_percent(rate: Rate) -> Percent {
    rate * dec!(100)
}

/// `(1 + rate)^periods`. Fractional periods are allowed.
pub fn growth_factor(rate: Rate, periods: Decimal) -> FinCalcResult<Decimal> {
    if periods.is_zero() {
        return Ok(Decimal::ONE);
    }
    (Decimal::ONE + rate)
        .checked_powd(periods)
        .ok_or_else(|| FinCalcError::InvalidInput {
            field: "rate".into(),
            reason: format!("(1 + {rate})^{periods} is not representable"),
        })
}

/// `value * (1 + rate)^periods`
pub fn compound(value: Money, rate: Rate, periods: Decimal) -> FinCalcResult<Money> {
    value
        .checked_mul(growth_factor(rate, periods)?)
        .ok_or_else(|| FinCalcError::InvalidInput {
            field: "rate".into(),
            reason: format!("{value} compounded over {periods} periods is not representable"),
        })
}

pub fn periods_to_years(periods: u32, periods_per_year: u32) -> FinCalcResult<Years> {
    if periods_per_year == 0 {
        return Err(FinCalcError::InvalidInput {
            field: "periods_per_year".into(),
            reason: "Must be at least 1".into(),
        });
    }
    Ok(Decimal::from(periods) / Decimal::from(periods_per_year))
}

/// Calendar date `periods` payments after `start`.
pub fn add_periods(
    start: NaiveDate,
    periods: u32,
    frequency: PaymentFrequency,
) -> FinCalcResult<NaiveDate> {
    let shifted = match frequency {
        PaymentFrequency::Weekly => start.checked_add_days(Days::new(7 * periods as u64)),
        PaymentFrequency::Biweekly => start.checked_add_days(Days::new(14 * periods as u64)),
        PaymentFrequency::Monthly => start.checked_add_months(Months::new(periods)),
        PaymentFrequency::Quarterly => {
            start.checked_add_months(Months::new(periods.saturating_mul(3)))
        }
        PaymentFrequency::SemiAnnual => {
            start.checked_add_months(Months::new(periods.saturating_mul(6)))
        }
        PaymentFrequency::Annual => {
            start.checked_add_months(Months::new(periods.saturating_mul(12)))
        }
    };
    shifted.ok_or_else(|| {
        FinCalcError::DateError(format!("{start} + {periods} {frequency:?} periods is out of range"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_periodic_rate_monthly() {
        let r = periodic_rate(dec!(4.9), 12).unwrap();
        assert!((r - dec!(0.0040833)).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_periodic_rate_zero_periods() {
        assert!(periodic_rate(dec!(5), 0).is_err());
    }

    #[test]
    fn test_compound_integer_periods() {
        let v = compound(dec!(1000), dec!(0.10), dec!(2)).unwrap();
        assert_eq!(v.round_dp(6), dec!(1210));
    }

    #[test]
    fn test_compound_fractional_periods() {
        // 1.21^0.5 = 1.1
        let v = compound(dec!(100), dec!(0.21), dec!(0.5)).unwrap();
        assert!((v - dec!(110)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_compound_overflow_is_an_error() {
        // 11^25 fits in a Decimal, a billion times it does not
        let err = compound(dec!(1000000000), dec!(10), dec!(25)).unwrap_err();
        assert!(matches!(err, FinCalcError::InvalidInput { .. }));
    }

    #[test]
    fn test_add_periods_monthly_end_of_month() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let d = add_periods(start, 1, PaymentFrequency::Monthly).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn test_add_periods_biweekly() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let d = add_periods(start, 2, PaymentFrequency::Biweekly).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2024, 1, 29).unwrap());
    }

    #[test]
    fn test_periods_to_years() {
        assert_eq!(periods_to_years(60, 12).unwrap(), dec!(5));
    }
}
