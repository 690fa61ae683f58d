pub mod break_even;
pub mod cash_back;
pub mod loan_terms;
pub mod rent_vs_buy;
pub mod scenario;

pub use break_even::{find_break_even, BreakEven};
pub use scenario::{compare_scenarios, ComparisonResult};
