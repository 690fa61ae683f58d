pub mod config;
pub mod error;
pub mod rates;
pub mod time_value;
pub mod types;

#[cfg(feature = "amortization")]
pub mod amortization;

#[cfg(feature = "comparison")]
pub mod comparison;

#[cfg(feature = "investment")]
pub mod investment;

#[cfg(feature = "summary")]
pub mod summary;

pub use config::EngineLimits;
pub use error::FinCalcError;
pub use types::*;

/// Standard result type for all fincalc operations
pub type FinCalcResult<T> = Result<T, FinCalcError>;
