pub mod auto_loan;
pub mod credit_card;
pub mod schedule;

pub use schedule::{amortize, AmortizationEntry, AmortizationResult, LoanSpec, PaymentRule};
