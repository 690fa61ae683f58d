use chrono::NaiveDate;
use fincalc_core::amortization::auto_loan::{calculate_auto_loan, AutoLoanInput};
use fincalc_core::amortization::credit_card::{
    calculate_payoff, CreditCardInput, MinimumPayment, PayoffPlan,
};
use fincalc_core::amortization::schedule::{
    amortize, ExtraPayment, ExtraPaymentFrequency, LoanSpec, LumpSum, PaymentRule,
};
use fincalc_core::{EngineLimits, FinCalcError, PaymentFrequency};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Amortization schedule
// ===========================================================================

fn car_loan() -> LoanSpec {
    // $22,500 at 4.9% over five years
    LoanSpec::new(dec!(22500), dec!(4.9), 60)
}

#[test]
fn test_reference_car_loan() {
    let out = amortize(&car_loan(), &EngineLimits::default()).unwrap();
    let r = &out.result;

    assert!((r.scheduled_payment - dec!(423.57)).abs() < dec!(0.01));
    assert!((r.total_interest - dec!(2920)).abs() < dec!(10));
    assert_eq!(r.payoff_periods, 60);
    assert_eq!(r.entries.last().unwrap().balance, Decimal::ZERO);
    assert!(out.warnings.is_empty());
}

#[test]
fn test_schedule_sums_are_consistent() {
    let r = amortize(&car_loan(), &EngineLimits::default())
        .unwrap()
        .result;

    let principal_paid: Decimal = r.entries.iter().map(|e| e.principal).sum();
    let interest_paid: Decimal = r.entries.iter().map(|e| e.interest).sum();
    assert_eq!(principal_paid, dec!(22500));
    assert_eq!(interest_paid, r.total_interest);
    assert_eq!(r.total_paid, principal_paid + interest_paid);

    // Balances never increase
    for pair in r.entries.windows(2) {
        assert!(pair[1].balance <= pair[0].balance);
    }
}

#[test]
fn test_zero_rate_splits_principal_evenly() {
    let spec = LoanSpec::new(dec!(12000), Decimal::ZERO, 24);
    let r = amortize(&spec, &EngineLimits::default()).unwrap().result;
    assert_eq!(r.scheduled_payment, dec!(500));
    assert_eq!(r.total_interest, Decimal::ZERO);
    assert_eq!(r.payoff_periods, 24);
}

#[test]
fn test_amortize_is_idempotent() {
    let limits = EngineLimits::default();
    let first = amortize(&car_loan(), &limits).unwrap().result;
    let second = amortize(&car_loan(), &limits).unwrap().result;
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}

#[test]
fn test_extra_payments_shorten_the_loan() {
    let mut spec = car_loan();
    spec.extra_payment = Some(ExtraPayment {
        amount: dec!(100),
        frequency: ExtraPaymentFrequency::Monthly,
        start_period: 1,
    });
    let r = amortize(&spec, &EngineLimits::default()).unwrap().result;

    assert!(r.payoff_periods < 60);
    assert!(r.interest_saved.unwrap() > Decimal::ZERO);
    assert_eq!(r.periods_saved.unwrap(), 60 - r.payoff_periods);
    assert_eq!(r.entries[0].extra_payment, dec!(100));
}

#[test]
fn test_lump_sum_applied_once() {
    let mut spec = car_loan();
    spec.lump_sums = vec![LumpSum {
        period: 12,
        amount: dec!(5000),
    }];
    let r = amortize(&spec, &EngineLimits::default()).unwrap().result;
    assert_eq!(r.entries[11].extra_payment, dec!(5000));
    assert_eq!(r.entries[12].extra_payment, Decimal::ZERO);
    assert_eq!(r.total_extra_paid, dec!(5000));
}

#[test]
fn test_payment_below_interest_does_not_converge() {
    let mut spec = LoanSpec::new(dec!(10000), dec!(12), 60);
    // Monthly interest is exactly 100
    spec.payment = PaymentRule::Fixed { amount: dec!(100) };
    let err = amortize(&spec, &EngineLimits::default()).unwrap_err();
    assert!(err.is_non_convergence());
}

#[test]
fn test_period_ceiling() {
    let mut spec = LoanSpec::new(dec!(10000), dec!(6), 12);
    spec.payment = PaymentRule::Fixed { amount: dec!(60) };
    let limits = EngineLimits {
        max_periods: 24,
        ..EngineLimits::default()
    };
    match amortize(&spec, &limits).unwrap_err() {
        FinCalcError::NonConvergence { iterations, .. } => assert_eq!(iterations, 24),
        other => panic!("expected NonConvergence, got {other}"),
    }
}

#[test]
fn test_invalid_inputs_rejected() {
    let limits = EngineLimits::default();
    for spec in [
        LoanSpec::new(dec!(-1), dec!(5), 12),
        LoanSpec::new(dec!(1000), dec!(-5), 12),
        LoanSpec::new(dec!(1000), dec!(5), 0),
    ] {
        assert!(matches!(
            amortize(&spec, &limits).unwrap_err(),
            FinCalcError::InvalidInput { .. }
        ));
    }
}

#[test]
fn test_dates_follow_frequency() {
    let mut spec = LoanSpec::new(dec!(5200), Decimal::ZERO, 52);
    spec.frequency = PaymentFrequency::Weekly;
    spec.start_date = NaiveDate::from_ymd_opt(2025, 1, 6);
    let r = amortize(&spec, &EngineLimits::default()).unwrap().result;
    assert_eq!(r.entries[0].date, NaiveDate::from_ymd_opt(2025, 1, 13));
    assert_eq!(r.payoff_date, NaiveDate::from_ymd_opt(2026, 1, 5));
}

// ===========================================================================
// Auto loan
// ===========================================================================

#[test]
fn test_auto_loan_matches_plain_schedule() {
    let input = AutoLoanInput {
        vehicle_price: dec!(25000),
        down_payment: dec!(2500),
        trade_in_value: Decimal::ZERO,
        trade_in_payoff: Decimal::ZERO,
        sales_tax_rate: Decimal::ZERO,
        fees: Decimal::ZERO,
        fees_financed: true,
        trade_in_tax_credit: true,
        apr: dec!(4.9),
        term_months: 60,
        extra_monthly_payment: Decimal::ZERO,
        start_date: None,
    };
    let auto = calculate_auto_loan(&input, &EngineLimits::default())
        .unwrap()
        .result;
    let plain = amortize(&car_loan(), &EngineLimits::default())
        .unwrap()
        .result;

    assert_eq!(auto.amount_financed, dec!(22500));
    assert_eq!(auto.monthly_payment, plain.scheduled_payment);
    assert_eq!(auto.total_interest, plain.total_interest);
}

// ===========================================================================
// Credit card payoff
// ===========================================================================

#[test]
fn test_higher_payment_pays_less_interest() {
    let limits = EngineLimits::default();
    let card = |amount| CreditCardInput {
        balance: dec!(8000),
        apr: dec!(22.9),
        plan: PayoffPlan::FixedPayment { amount },
        promo: None,
        start_date: None,
    };
    let low = calculate_payoff(&card(dec!(250)), &limits).unwrap().result;
    let high = calculate_payoff(&card(dec!(500)), &limits).unwrap().result;
    assert!(high.months_to_payoff < low.months_to_payoff);
    assert!(high.total_interest < low.total_interest);
}

#[test]
fn test_percent_minimum_payment_declines() {
    let input = CreditCardInput {
        balance: dec!(3000),
        apr: dec!(18),
        plan: PayoffPlan::Minimum(MinimumPayment::PercentOfBalance { percent: dec!(5) }),
        promo: None,
        start_date: None,
    };
    let out = calculate_payoff(&input, &EngineLimits::default())
        .unwrap()
        .result;
    let entries = &out.schedule.entries;
    assert_eq!(out.first_payment, dec!(150));
    assert!(entries[1].payment < entries[0].payment);
    assert_eq!(entries.last().unwrap().balance, Decimal::ZERO);
}
