pub mod returns;

pub use returns::{
    after_tax_return, annualized_roi, break_even_period, cagr, evaluate_investment, real_return,
    simple_roi, CashFlowSeries, InvestmentBreakEven, PeriodFlow, RateParams, ReturnMetrics,
};
