//! Loan account status enumeration.
//!
//! Integer codes are persisted externally and must never be renumbered.

use serde::{Deserialize, Serialize};

use crate::error::LoanLedgerError;
use crate::LoanLedgerResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    SubmittedAndPendingApproval,
    Approved,
    Active,
    TransferInProgress,
    TransferOnHold,
    WithdrawnByClient,
    Rejected,
    ClosedObligationsMet,
    ClosedWrittenOff,
    ClosedRescheduleOutstandingAmount,
    Overpaid,
}

impl LoanStatus {
    pub const fn code(&self) -> i32 {
        match self {
            LoanStatus::SubmittedAndPendingApproval => 100,
            LoanStatus::Approved => 200,
            LoanStatus::Active => 300,
            LoanStatus::TransferInProgress => 303,
            LoanStatus::TransferOnHold => 304,
            LoanStatus::WithdrawnByClient => 400,
            LoanStatus::Rejected => 500,
            LoanStatus::ClosedObligationsMet => 600,
            LoanStatus::ClosedWrittenOff => 601,
            LoanStatus::ClosedRescheduleOutstandingAmount => 602,
            LoanStatus::Overpaid => 700,
        }
    }

    /// Resolve a persisted code against the registered status set.
    pub fn from_code(code: i32) -> LoanLedgerResult<Self> {
        match code {
            100 => Ok(LoanStatus::SubmittedAndPendingApproval),
            200 => Ok(LoanStatus::Approved),
            300 => Ok(LoanStatus::Active),
            303 => Ok(LoanStatus::TransferInProgress),
            304 => Ok(LoanStatus::TransferOnHold),
            400 => Ok(LoanStatus::WithdrawnByClient),
            500 => Ok(LoanStatus::Rejected),
            600 => Ok(LoanStatus::ClosedObligationsMet),
            601 => Ok(LoanStatus::ClosedWrittenOff),
            602 => Ok(LoanStatus::ClosedRescheduleOutstandingAmount),
            700 => Ok(LoanStatus::Overpaid),
            _ => Err(LoanLedgerError::UnknownStatusCode(code)),
        }
    }

    pub fn all() -> [LoanStatus; 11] {
        [
            LoanStatus::SubmittedAndPendingApproval,
            LoanStatus::Approved,
            LoanStatus::Active,
            LoanStatus::TransferInProgress,
            LoanStatus::TransferOnHold,
            LoanStatus::WithdrawnByClient,
            LoanStatus::Rejected,
            LoanStatus::ClosedObligationsMet,
            LoanStatus::ClosedWrittenOff,
            LoanStatus::ClosedRescheduleOutstandingAmount,
            LoanStatus::Overpaid,
        ]
    }

    pub fn is_submitted_and_pending_approval(&self) -> bool {
        matches!(self, LoanStatus::SubmittedAndPendingApproval)
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, LoanStatus::Approved)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, LoanStatus::Active)
    }

    pub fn is_overpaid(&self) -> bool {
        matches!(self, LoanStatus::Overpaid)
    }

    pub fn is_closed_obligations_met(&self) -> bool {
        matches!(self, LoanStatus::ClosedObligationsMet)
    }

    pub fn is_closed_written_off(&self) -> bool {
        matches!(self, LoanStatus::ClosedWrittenOff)
    }

    /// Terminal states: any closed variant, withdrawn, or rejected.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            LoanStatus::ClosedObligationsMet
                | LoanStatus::ClosedWrittenOff
                | LoanStatus::ClosedRescheduleOutstandingAmount
                | LoanStatus::WithdrawnByClient
                | LoanStatus::Rejected
        )
    }

    pub fn is_transfer_in_progress(&self) -> bool {
        matches!(self, LoanStatus::TransferInProgress)
    }

    pub fn is_transfer_on_hold(&self) -> bool {
        matches!(self, LoanStatus::TransferOnHold)
    }
}
