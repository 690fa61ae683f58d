use napi::Result as NapiResult;
use napi_derive::napi;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use fincalc_core::amortization::schedule::{AmortizationResult, LoanSpec};
use fincalc_core::comparison::cash_back::CashBackOutput;
use fincalc_core::comparison::rent_vs_buy::RentVsBuyOutput;
use fincalc_core::comparison::scenario::ComparisonResult;
use fincalc_core::investment::returns::{CashFlowSeries, RateParams, ReturnMetrics};
use fincalc_core::{Currency, EngineLimits, Money, PaymentFrequency};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse<T: DeserializeOwned>(json: &str) -> NapiResult<T> {
    serde_json::from_str(json).map_err(to_napi_error)
}

/// Engine limits from an optional JSON string; omitted fields keep their defaults.
fn limits(limits_json: Option<String>) -> NapiResult<EngineLimits> {
    let limits = match limits_json {
        Some(json) => parse::<EngineLimits>(&json)?,
        None => EngineLimits::default(),
    };
    limits.validate().map_err(to_napi_error)?;
    Ok(limits)
}

fn to_json<T: Serialize>(value: &T) -> NapiResult<String> {
    serde_json::to_string(value).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Amortization
// ---------------------------------------------------------------------------

#[napi]
pub fn amortize(input_json: String, limits_json: Option<String>) -> NapiResult<String> {
    let spec: LoanSpec = parse(&input_json)?;
    let output = fincalc_core::amortization::schedule::amortize(&spec, &limits(limits_json)?)
        .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn auto_loan(input_json: String, limits_json: Option<String>) -> NapiResult<String> {
    let input: fincalc_core::amortization::auto_loan::AutoLoanInput = parse(&input_json)?;
    let output =
        fincalc_core::amortization::auto_loan::calculate_auto_loan(&input, &limits(limits_json)?)
            .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn credit_card_payoff(input_json: String, limits_json: Option<String>) -> NapiResult<String> {
    let input: fincalc_core::amortization::credit_card::CreditCardInput = parse(&input_json)?;
    let output =
        fincalc_core::amortization::credit_card::calculate_payoff(&input, &limits(limits_json)?)
            .map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct CompareInput {
    scenario_a: LoanSpec,
    scenario_b: LoanSpec,
    horizon_periods: u32,
}

#[napi]
pub fn compare_scenarios(input_json: String, limits_json: Option<String>) -> NapiResult<String> {
    let input: CompareInput = parse(&input_json)?;
    let output = fincalc_core::comparison::scenario::compare_scenarios(
        &input.scenario_a,
        &input.scenario_b,
        input.horizon_periods,
        &limits(limits_json)?,
    )
    .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn cash_back(input_json: String, limits_json: Option<String>) -> NapiResult<String> {
    let input: fincalc_core::comparison::cash_back::CashBackInput = parse(&input_json)?;
    let output =
        fincalc_core::comparison::cash_back::compare_cash_back(&input, &limits(limits_json)?)
            .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn rent_vs_buy(input_json: String, limits_json: Option<String>) -> NapiResult<String> {
    let input: fincalc_core::comparison::rent_vs_buy::RentVsBuyInput = parse(&input_json)?;
    let output =
        fincalc_core::comparison::rent_vs_buy::compare_rent_vs_buy(&input, &limits(limits_json)?)
            .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn loan_terms(input_json: String, limits_json: Option<String>) -> NapiResult<String> {
    let input: fincalc_core::comparison::loan_terms::LoanTermsInput = parse(&input_json)?;
    let output =
        fincalc_core::comparison::loan_terms::compare_loan_terms(&input, &limits(limits_json)?)
            .map_err(to_napi_error)?;
    to_json(&output)
}

#[napi]
pub fn find_break_even(input_json: String) -> NapiResult<String> {
    #[derive(Deserialize)]
    struct Series {
        a: Vec<Money>,
        b: Vec<Money>,
    }
    let series: Series = parse(&input_json)?;
    let be = fincalc_core::comparison::break_even::find_break_even(&series.a, &series.b)
        .map_err(to_napi_error)?;
    to_json(&be)
}

// ---------------------------------------------------------------------------
// Investment
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct InvestmentInput {
    series: CashFlowSeries,
    rates: RateParams,
}

#[napi]
pub fn evaluate_investment(input_json: String, limits_json: Option<String>) -> NapiResult<String> {
    let input: InvestmentInput = parse(&input_json)?;
    let output = fincalc_core::investment::returns::evaluate_investment(
        &input.series,
        &input.rates,
        &limits(limits_json)?,
    )
    .map_err(to_napi_error)?;
    to_json(&output)
}

// ---------------------------------------------------------------------------
// Summaries (take the `result` field of the matching engine output)
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SummaryRequest<T> {
    result: T,
    #[serde(default)]
    currency: Currency,
    #[serde(default)]
    frequency: PaymentFrequency,
}

#[napi]
pub fn loan_summary(input_json: String) -> NapiResult<String> {
    let req: SummaryRequest<AmortizationResult> = parse(&input_json)?;
    to_json(&fincalc_core::summary::loan_summary(
        &req.result,
        req.frequency,
        &req.currency,
    ))
}

#[napi]
pub fn investment_summary(input_json: String) -> NapiResult<String> {
    let req: SummaryRequest<ReturnMetrics> = parse(&input_json)?;
    to_json(&fincalc_core::summary::investment_summary(
        &req.result,
        &req.currency,
    ))
}

#[napi]
pub fn comparison_summary(input_json: String) -> NapiResult<String> {
    let req: SummaryRequest<ComparisonResult> = parse(&input_json)?;
    to_json(&fincalc_core::summary::comparison_summary(
        &req.result,
        &req.currency,
    ))
}

#[napi]
pub fn cash_back_summary(input_json: String) -> NapiResult<String> {
    let req: SummaryRequest<CashBackOutput> = parse(&input_json)?;
    to_json(&fincalc_core::summary::cash_back_summary(
        &req.result,
        &req.currency,
    ))
}

#[napi]
pub fn rent_vs_buy_summary(input_json: String) -> NapiResult<String> {
    let req: SummaryRequest<RentVsBuyOutput> = parse(&input_json)?;
    to_json(&fincalc_core::summary::rent_vs_buy_summary(
        &req.result,
        &req.currency,
    ))
}
