pub mod allocation;
pub mod comparator;
pub mod error;
pub mod installment;
pub mod lifecycle;
pub mod money;
pub mod replay;
pub mod status;
pub mod transaction;
pub mod types;

pub use error::LoanLedgerError;
pub use types::*;

/// Standard result type for all loan-ledger operations
pub type LoanLedgerResult<T> = Result<T, LoanLedgerError>;
