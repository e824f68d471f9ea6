pub mod error;
pub mod loan;

pub use error::LoanError;
pub use loan::{
    round_money, AmortizationSchedule, LoanCalculator, Money, PaymentRecord, Rate,
    DEFAULT_SCHEDULE_PERIODS,
};

/// Result type for loan construction.
pub type LoanResult<T> = Result<T, LoanError>;
