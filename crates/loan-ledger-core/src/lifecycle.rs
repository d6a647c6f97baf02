//! Loan lifecycle state machine.
//!
//! A pure lookup from (event, current status) to the next status. An event
//! whose allowed-from set does not contain the current status is a no-op:
//! the status comes back unchanged with `applied == false`, and the caller
//! decides whether to reject the business operation. The machine itself
//! never errors on an illegal transition.

use serde::{Deserialize, Serialize};

use crate::error::LoanLedgerError;
use crate::status::LoanStatus;
use crate::LoanLedgerResult;

/// Business triggers recognised by the state machine. Events carry no
/// payload; they only say that a kind of thing happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanEvent {
    Created,
    Rejected,
    Approved,
    Withdrawn,
    Disbursed,
    ApprovalUndo,
    DisbursalUndo,
    RepaymentOrWaiver,
    ChargePayment,
    RepaidInFull,
    WriteOffOutstanding,
    WriteOffUndo,
    Reschedule,
    InterestRebateOwed,
    Overpayment,
    Closed,
}

/// Outcome of a transition attempt. `status` preserves the historical no-op
/// value (unchanged input on an illegal transition); `applied` makes the
/// no-op detectable without comparing statuses at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub status: LoanStatus,
    pub applied: bool,
}

/// Map an event against the current status. `from` may be `None` only for
/// [`LoanEvent::Created`].
pub fn transition(event: LoanEvent, from: Option<LoanStatus>) -> LoanLedgerResult<Transition> {
    if event == LoanEvent::Created {
        return match from {
            // Creation on an already-created loan changes nothing.
            Some(status) => Ok(Transition {
                status,
                applied: false,
            }),
            None => Ok(Transition {
                status: state_of(100)?,
                applied: true,
            }),
        };
    }

    let from = from.ok_or_else(|| LoanLedgerError::MissingStatus {
        event: format!("{event:?}"),
    })?;

    match event {
        LoanEvent::Created => unreachable!("handled above"),
        LoanEvent::Rejected => step(from, &[LoanStatus::SubmittedAndPendingApproval], 500),
        LoanEvent::Approved => step(from, &[LoanStatus::SubmittedAndPendingApproval], 200),
        LoanEvent::Withdrawn => step(from, &[LoanStatus::SubmittedAndPendingApproval], 400),
        LoanEvent::Disbursed => step(from, &[LoanStatus::Approved], 300),
        LoanEvent::ApprovalUndo => step(from, &[LoanStatus::Approved], 100),
        LoanEvent::DisbursalUndo => step(from, &[LoanStatus::Active], 200),
        LoanEvent::RepaymentOrWaiver | LoanEvent::ChargePayment => step(
            from,
            &[
                LoanStatus::Active,
                LoanStatus::ClosedObligationsMet,
                LoanStatus::Overpaid,
            ],
            300,
        ),
        LoanEvent::RepaidInFull => {
            step(from, &[LoanStatus::Active, LoanStatus::Overpaid], 600)
        }
        LoanEvent::WriteOffOutstanding => step(from, &[LoanStatus::Active], 601),
        LoanEvent::Reschedule => step(from, &[LoanStatus::Active], 602),
        // Self-transition kept for symmetry and audit trails.
        LoanEvent::InterestRebateOwed => step(from, &[LoanStatus::ClosedObligationsMet], 600),
        LoanEvent::Overpayment => step(
            from,
            &[LoanStatus::ClosedObligationsMet, LoanStatus::Active],
            700,
        ),
        LoanEvent::Closed | LoanEvent::WriteOffUndo => Ok(Transition {
            status: from,
            applied: false,
        }),
    }
}

fn step(from: LoanStatus, allowed: &[LoanStatus], target_code: i32) -> LoanLedgerResult<Transition> {
    if allowed.contains(&from) {
        Ok(Transition {
            status: state_of(target_code)?,
            applied: true,
        })
    } else {
        Ok(Transition {
            status: from,
            applied: false,
        })
    }
}

/// Resolve a target code against the registered status set, guarding
/// against drift between the transition table and the enumeration.
fn state_of(code: i32) -> LoanLedgerResult<LoanStatus> {
    LoanStatus::from_code(code)
}
