use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoanLedgerError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Unknown loan status code: {0}")]
    UnknownStatusCode(i32),

    #[error("Currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch { expected: String, found: String },

    #[error("Event {event} requires a current loan status")]
    MissingStatus { event: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for LoanLedgerError {
    fn from(e: serde_json::Error) -> Self {
        LoanLedgerError::SerializationError(e.to_string())
    }
}
