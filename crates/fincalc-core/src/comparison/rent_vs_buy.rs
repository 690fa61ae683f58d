use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::amortization::schedule::{build_schedule, AmortizationResult, LoanSpec};
use crate::comparison::break_even::{find_break_even, BreakEven};
use crate::config::EngineLimits;
use crate::error::FinCalcError;
use crate::rates::{compound, from_percent};
use crate::types::*;
use crate::FinCalcResult;

/// Input for the rent vs. buy net-worth comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentVsBuyInput {
    pub home_price: Money,
    pub down_payment_percent: Percent,
    pub mortgage_apr: Percent,
    pub term_years: u32,
    #[serde(default)]
    pub closing_cost_percent: Percent,
    /// Agent and transfer costs on sale, as a percent of the sale price
    #[serde(default)]
    pub selling_cost_percent: Percent,
    /// Annual property tax as a percent of home value
    #[serde(default)]
    pub property_tax_percent: Percent,
    #[serde(default)]
    pub home_insurance_annual: Money,
    /// Annual upkeep as a percent of home value
    #[serde(default)]
    pub maintenance_percent: Percent,
    #[serde(default)]
    pub hoa_monthly: Money,
    pub appreciation_rate: Percent,
    pub monthly_rent: Money,
    pub rent_growth_rate: Percent,
    #[serde(default)]
    pub renters_insurance_monthly: Money,
    /// Return earned on cash not tied up in the home
    pub investment_return_rate: Percent,
    pub horizon_years: u32,
}

/// Year-end position of both households
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentVsBuyYear {
    pub year: u32,
    pub home_value: Money,
    pub mortgage_balance: Money,
    pub home_equity: Money,
    pub buyer_annual_cost: Money,
    pub renter_annual_cost: Money,
    pub buyer_cumulative_cost: Money,
    pub renter_cumulative_cost: Money,
    pub buyer_investments: Money,
    pub renter_investments: Money,
    pub buyer_net_worth: Money,
    pub renter_net_worth: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HousingChoice {
    Buy,
    Rent,
    Equivalent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentVsBuyOutput {
    pub monthly_mortgage_payment: Money,
    /// Down payment plus closing costs
    pub upfront_cash: Money,
    pub years: Vec<RentVsBuyYear>,
    /// First year the household ahead on net worth changes
    pub break_even: BreakEven,
    /// Buyer net worth minus renter net worth at the horizon
    pub final_advantage: Money,
    pub better_option: HousingChoice,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mortgage: Option<AmortizationResult>,
}

/// Months spanned by `years`, bounded by the engine's period ceiling.
fn months_within_limit(years: u32, field: &str, limits: &EngineLimits) -> FinCalcResult<u32> {
    years
        .checked_mul(12)
        .filter(|months| *months <= limits.max_periods)
        .ok_or_else(|| FinCalcError::InvalidInput {
            field: field.into(),
            reason: format!(
                "{years} years exceeds the {}-month ceiling",
                limits.max_periods
            ),
        })
}

fn overflow(field: &str, year: u32) -> FinCalcError {
    FinCalcError::InvalidInput {
        field: field.into(),
        reason: format!("Value in year {year} is not representable"),
    }
}

fn validate(input: &RentVsBuyInput, limits: &EngineLimits) -> FinCalcResult<()> {
    limits.validate()?;
    if input.home_price <= Decimal::ZERO {
        return Err(FinCalcError::InvalidInput {
            field: "home_price".into(),
            reason: "Home price must be positive".into(),
        });
    }
    if input.down_payment_percent < Decimal::ZERO || input.down_payment_percent > dec!(100) {
        return Err(FinCalcError::InvalidInput {
            field: "down_payment_percent".into(),
            reason: "Down payment must be between 0% and 100%".into(),
        });
    }
    if input.term_years == 0 || input.horizon_years == 0 {
        return Err(FinCalcError::InvalidInput {
            field: "horizon_years".into(),
            reason: "Mortgage term and horizon must be at least 1 year".into(),
        });
    }
    months_within_limit(input.term_years, "term_years", limits)?;
    months_within_limit(input.horizon_years, "horizon_years", limits)?;
    let non_negative = [
        ("mortgage_apr", input.mortgage_apr),
        ("closing_cost_percent", input.closing_cost_percent),
        ("selling_cost_percent", input.selling_cost_percent),
        ("property_tax_percent", input.property_tax_percent),
        ("home_insurance_annual", input.home_insurance_annual),
        ("maintenance_percent", input.maintenance_percent),
        ("hoa_monthly", input.hoa_monthly),
        ("monthly_rent", input.monthly_rent),
        ("renters_insurance_monthly", input.renters_insurance_monthly),
    ];
    for (field, value) in non_negative {
        if value < Decimal::ZERO {
            return Err(FinCalcError::InvalidInput {
                field: field.into(),
                reason: "Cannot be negative".into(),
            });
        }
    }
    for (field, value) in [
        ("appreciation_rate", input.appreciation_rate),
        ("rent_growth_rate", input.rent_growth_rate),
        ("investment_return_rate", input.investment_return_rate),
    ] {
        if value <= dec!(-100) {
            return Err(FinCalcError::InvalidInput {
                field: field.into(),
                reason: "Growth rate must be greater than -100%".into(),
            });
        }
    }
    Ok(())
}

/// Project both households' net worth year by year.
///
/// Whichever household spends less in a year invests the difference at the
/// investment return; the renter also invests the buyer's up-front cash.
pub fn compare_rent_vs_buy(
    input: &RentVsBuyInput,
    limits: &EngineLimits,
) -> FinCalcResult<ComputationOutput<RentVsBuyOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate(input, limits)?;

    let down_payment = input.home_price * input.down_payment_percent / dec!(100);
    let closing_costs = input.home_price * input.closing_cost_percent / dec!(100);
    let upfront_cash = down_payment + closing_costs;
    let principal = input.home_price - down_payment;

    let mortgage = if principal > Decimal::ZERO {
        let term_months = months_within_limit(input.term_years, "term_years", limits)?;
        let spec = LoanSpec::new(principal, input.mortgage_apr, term_months);
        Some(build_schedule(&spec, limits, &mut warnings)?)
    } else {
        None
    };

    let appreciation = from_percent(input.appreciation_rate);
    let rent_growth = from_percent(input.rent_growth_rate);
    let investment_growth = Decimal::ONE + from_percent(input.investment_return_rate);
    let selling_factor = Decimal::ONE - from_percent(input.selling_cost_percent);
    let upkeep_rate =
        from_percent(input.property_tax_percent) + from_percent(input.maintenance_percent);
    let fixed_ownership_costs = input.home_insurance_annual + input.hoa_monthly * dec!(12);

    let mut buyer_investments = Decimal::ZERO;
    let mut renter_investments = upfront_cash;
    let mut buyer_cumulative = upfront_cash;
    let mut renter_cumulative = Decimal::ZERO;

    let mut years = Vec::with_capacity(input.horizon_years as usize);
    let mut buyer_series = Vec::with_capacity(input.horizon_years as usize);
    let mut renter_series = Vec::with_capacity(input.horizon_years as usize);

    for year in 1..=input.horizon_years {
        let elapsed_years = Decimal::from(year - 1);
        let value_start = compound(input.home_price, appreciation, elapsed_years)?;
        let value_end = compound(input.home_price, appreciation, Decimal::from(year))?;

        let first_month = (year - 1) * 12;
        let (mortgage_paid, balance_end) = match &mortgage {
            Some(m) => {
                let paid: Money = m
                    .entries
                    .iter()
                    .skip(first_month as usize)
                    .take(12)
                    .map(|e| e.payment)
                    .sum();
                (paid, m.balance_after(year * 12, principal))
            }
            None => (Decimal::ZERO, Decimal::ZERO),
        };

        let ownership_costs = value_start
            .checked_mul(upkeep_rate)
            .and_then(|c| c.checked_add(fixed_ownership_costs))
            .ok_or_else(|| overflow("appreciation_rate", year))?;
        let buyer_annual_cost = mortgage_paid
            .checked_add(ownership_costs)
            .ok_or_else(|| overflow("appreciation_rate", year))?;

        let rent = compound(input.monthly_rent, rent_growth, elapsed_years)?;
        let renter_annual_cost = rent
            .checked_add(input.renters_insurance_monthly)
            .and_then(|r| r.checked_mul(dec!(12)))
            .ok_or_else(|| overflow("rent_growth_rate", year))?;

        buyer_investments = buyer_investments
            .checked_mul(investment_growth)
            .ok_or_else(|| overflow("investment_return_rate", year))?;
        renter_investments = renter_investments
            .checked_mul(investment_growth)
            .ok_or_else(|| overflow("investment_return_rate", year))?;
        if buyer_annual_cost > renter_annual_cost {
            renter_investments = renter_investments
                .checked_add(buyer_annual_cost - renter_annual_cost)
                .ok_or_else(|| overflow("investment_return_rate", year))?;
        } else {
            buyer_investments = buyer_investments
                .checked_add(renter_annual_cost - buyer_annual_cost)
                .ok_or_else(|| overflow("investment_return_rate", year))?;
        }

        buyer_cumulative = buyer_cumulative
            .checked_add(buyer_annual_cost)
            .ok_or_else(|| overflow("buyer_cumulative_cost", year))?;
        renter_cumulative = renter_cumulative
            .checked_add(renter_annual_cost)
            .ok_or_else(|| overflow("renter_cumulative_cost", year))?;

        let buyer_net_worth = (value_end * selling_factor - balance_end)
            .checked_add(buyer_investments)
            .ok_or_else(|| overflow("investment_return_rate", year))?;
        let renter_net_worth = renter_investments;
        buyer_series.push(buyer_net_worth);
        renter_series.push(renter_net_worth);

        years.push(RentVsBuyYear {
            year,
            home_value: value_end,
            mortgage_balance: balance_end,
            home_equity: value_end - balance_end,
            buyer_annual_cost,
            renter_annual_cost,
            buyer_cumulative_cost: buyer_cumulative,
            renter_cumulative_cost: renter_cumulative,
            buyer_investments,
            renter_investments,
            buyer_net_worth,
            renter_net_worth,
        });
    }

    let break_even = find_break_even(&buyer_series, &renter_series)?;
    let final_advantage = years
        .last()
        .map(|y| y.buyer_net_worth - y.renter_net_worth)
        .unwrap_or(Decimal::ZERO);
    let better_option = if final_advantage.abs() < dec!(0.5) {
        HousingChoice::Equivalent
    } else if final_advantage > Decimal::ZERO {
        HousingChoice::Buy
    } else {
        HousingChoice::Rent
    };

    if input.horizon_years < input.term_years && break_even == BreakEven::NotWithinHorizon {
        warnings.push(format!(
            "Horizon of {} years ends before the {}-year mortgage is repaid",
            input.horizon_years, input.term_years
        ));
    }

    let output = RentVsBuyOutput {
        monthly_mortgage_payment: mortgage
            .as_ref()
            .map(|m| m.scheduled_payment)
            .unwrap_or(Decimal::ZERO),
        upfront_cash,
        years,
        break_even,
        final_advantage,
        better_option,
        mortgage,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Rent vs. buy net-worth projection",
        &serde_json::json!({
            "home_price": input.home_price.to_string(),
            "down_payment_percent": input.down_payment_percent.to_string(),
            "mortgage_apr": input.mortgage_apr.to_string(),
            "monthly_rent": input.monthly_rent.to_string(),
            "horizon_years": input.horizon_years,
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

    pub(crate) fn base_input() -> RentVsBuyInput {
        RentVsBuyInput {
            home_price: dec!(400000),
            down_payment_percent: dec!(20),
            mortgage_apr: dec!(6.5),
            term_years: 30,
            closing_cost_percent: dec!(3),
            selling_cost_percent: dec!(6),
            property_tax_percent: dec!(1.2),
            home_insurance_annual: dec!(1500),
            maintenance_percent: dec!(1),
            hoa_monthly: Decimal::ZERO,
            appreciation_rate: dec!(3),
            monthly_rent: dec!(2500),
            rent_growth_rate: dec!(3),
            renters_insurance_monthly: Decimal::ZERO,
            investment_return_rate: dec!(6),
            horizon_years: 30,
        }
    }

    #[test]
    fn test_buying_overtakes_renting() {
        let out = compare_rent_vs_buy(&base_input(), &EngineLimits::default())
            .unwrap()
            .result;
        assert!((out.monthly_mortgage_payment - dec!(2022.62)).abs() < dec!(0.01));
        assert_eq!(out.upfront_cash, dec!(92000));
        assert!(out.years[0].renter_net_worth > out.years[0].buyer_net_worth);
        assert_eq!(out.break_even, BreakEven::At { period: 6 });
        assert_eq!(out.better_option, HousingChoice::Buy);
        assert_eq!(out.years.last().unwrap().mortgage_balance, Decimal::ZERO);
    }

    #[test]
    fn test_cheap_rent_favours_renting() {
        let mut input = base_input();
        input.monthly_rent = dec!(1500);
        input.horizon_years = 10;
        let out = compare_rent_vs_buy(&input, &EngineLimits::default())
            .unwrap()
            .result;
        assert_eq!(out.break_even, BreakEven::NotWithinHorizon);
        assert_eq!(out.better_option, HousingChoice::Rent);
        assert!(out.final_advantage < Decimal::ZERO);
    }

    #[test]
    fn test_all_cash_purchase() {
        let mut input = base_input();
        input.down_payment_percent = dec!(100);
        let out = compare_rent_vs_buy(&input, &EngineLimits::default())
            .unwrap()
            .result;
        assert!(out.mortgage.is_none());
        assert_eq!(out.monthly_mortgage_payment, Decimal::ZERO);
    }

    #[test]
    fn test_runaway_investment_growth_is_an_error() {
        let mut input = base_input();
        input.investment_return_rate = dec!(1000);
        let err = compare_rent_vs_buy(&input, &EngineLimits::default()).unwrap_err();
        assert!(matches!(err, FinCalcError::InvalidInput { ref field, .. } if field == "investment_return_rate"));
    }

    #[test]
    fn test_runaway_appreciation_is_an_error() {
        let mut input = base_input();
        input.appreciation_rate = dec!(1000);
        let err = compare_rent_vs_buy(&input, &EngineLimits::default()).unwrap_err();
        assert!(matches!(err, FinCalcError::InvalidInput { .. }));
    }

    #[test]
    fn test_horizon_beyond_period_ceiling_rejected() {
        let mut input = base_input();
        input.horizon_years = 100;
        let err = compare_rent_vs_buy(&input, &EngineLimits::default()).unwrap_err();
        assert!(matches!(err, FinCalcError::InvalidInput { ref field, .. } if field == "horizon_years"));

        input.horizon_years = u32::MAX;
        assert!(compare_rent_vs_buy(&input, &EngineLimits::default()).is_err());
    }

    #[test]
    fn test_term_overflowing_months_rejected() {
        let mut input = base_input();
        input.term_years = u32::MAX / 6;
        let err = compare_rent_vs_buy(&input, &EngineLimits::default()).unwrap_err();
        assert!(matches!(err, FinCalcError::InvalidInput { ref field, .. } if field == "term_years"));
    }

    #[test]
    fn test_invalid_down_payment() {
        let mut input = base_input();
        input.down_payment_percent = dec!(120);
        assert!(compare_rent_vs_buy(&input, &EngineLimits::default()).is_err());
    }
}
