//! Deterministic replay of a loan's transaction history.
//!
//! Establishes the total replay order, walks each transaction through the
//! allocation layer, and feeds the resulting business events to the
//! lifecycle state machine. The whole pass is a synchronous in-memory
//! computation: it either completes or fails atomically, and the caller
//! discards the installment set on failure rather than persisting a
//! half-applied state.

use std::collections::BTreeSet;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::allocation::{
    allocate_charges_waiver, allocate_interest_waiver, allocate_refund, allocate_repayment,
    apply_write_off, AllocationPolicy, WriteOffSummary,
};
use crate::comparator::sort_for_replay;
use crate::error::LoanLedgerError;
use crate::installment::RepaymentScheduleInstallment;
use crate::lifecycle::{transition, LoanEvent};
use crate::money::Money;
use crate::status::LoanStatus;
use crate::transaction::{
    TransactionProcessingResult, TransactionRecord, TransactionToInstallmentMapping,
    TransactionType,
};
use crate::types::{with_metadata, ComputationOutput, Currency};
use crate::LoanLedgerResult;

/// One state-machine step taken during replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayTransition {
    pub event: LoanEvent,
    pub status: LoanStatus,
    pub applied: bool,
}

/// Aggregate result of replaying a history against a schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayOutcome {
    pub final_status: LoanStatus,
    pub transitions: Vec<ReplayTransition>,
    pub mappings: Vec<TransactionToInstallmentMapping>,
    pub write_offs: Vec<WriteOffSummary>,
    /// Cumulative overpayment residue across the whole history.
    pub result: TransactionProcessingResult,
}

/// Replay a transaction history against a loan's installment schedule.
///
/// Derived ledger fields are cleared first, so the outcome depends only on
/// the schedule's charged amounts, the history, and the policy. Replaying
/// the same inputs always yields the same outcome.
pub fn replay_transactions(
    policy: AllocationPolicy,
    starting_status: LoanStatus,
    transactions: &[TransactionRecord],
    installments: &mut [RepaymentScheduleInstallment],
    currency: &Currency,
) -> LoanLedgerResult<ComputationOutput<ReplayOutcome>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_inputs(transactions, installments)?;

    for installment in installments.iter_mut() {
        installment.reset_derived_components();
    }

    let mut sorted = transactions.to_vec();
    sort_for_replay(&mut sorted);

    let mut status = starting_status;
    let mut transitions: Vec<ReplayTransition> = Vec::new();
    let mut mappings: Vec<TransactionToInstallmentMapping> = Vec::new();
    let mut write_offs: Vec<WriteOffSummary> = Vec::new();
    let mut cumulative_overpayment = Money::zero(currency);

    for tx in &sorted {
        match tx.transaction_type {
            TransactionType::Repayment => {
                apply_event(
                    LoanEvent::RepaymentOrWaiver,
                    &mut status,
                    &mut transitions,
                    &mut warnings,
                )?;
                let (tx_mappings, result) =
                    allocate_repayment(policy, tx, installments, currency);
                mappings.extend(tx_mappings);
                cumulative_overpayment = cumulative_overpayment
                    .plus(&Money::of(currency, result.overpayment()));
            }
            TransactionType::ChargePayment => {
                apply_event(
                    LoanEvent::ChargePayment,
                    &mut status,
                    &mut transitions,
                    &mut warnings,
                )?;
                let (tx_mappings, result) =
                    allocate_repayment(policy, tx, installments, currency);
                mappings.extend(tx_mappings);
                cumulative_overpayment = cumulative_overpayment
                    .plus(&Money::of(currency, result.overpayment()));
            }
            TransactionType::WaiveInterest => {
                apply_event(
                    LoanEvent::RepaymentOrWaiver,
                    &mut status,
                    &mut transitions,
                    &mut warnings,
                )?;
                let (tx_mappings, result) =
                    allocate_interest_waiver(tx, installments, currency);
                mappings.extend(tx_mappings);
                if result.is_over_payment() {
                    warnings.push(format!(
                        "Interest waiver {} exceeds outstanding interest by {}",
                        tx.id,
                        result.overpayment()
                    ));
                }
            }
            TransactionType::WaiveCharges => {
                apply_event(
                    LoanEvent::RepaymentOrWaiver,
                    &mut status,
                    &mut transitions,
                    &mut warnings,
                )?;
                let (tx_mappings, result) =
                    allocate_charges_waiver(tx, installments, currency);
                mappings.extend(tx_mappings);
                if result.is_over_payment() {
                    warnings.push(format!(
                        "Charges waiver {} exceeds outstanding charges by {}",
                        tx.id,
                        result.overpayment()
                    ));
                }
            }
            TransactionType::WriteOff => {
                apply_event(
                    LoanEvent::WriteOffOutstanding,
                    &mut status,
                    &mut transitions,
                    &mut warnings,
                )?;
                let summary = apply_write_off(tx.transaction_date, installments, currency);
                if summary.total().is_zero() {
                    warnings.push(format!(
                        "Write-off {} found no outstanding amounts to extinguish",
                        tx.id
                    ));
                }
                write_offs.push(summary);
            }
            TransactionType::AccrualPosting => {
                // Income postings order the replay but move no ledger money;
                // accrued amounts are maintained by the schedule collaborator.
            }
            TransactionType::Refund => {
                // Refunds return the overpayment residue first; only the
                // remainder unwinds payments already applied to the ledger.
                let refund = Money::of(currency, tx.amount);
                let from_residue = if refund.is_greater_than(&cumulative_overpayment) {
                    cumulative_overpayment.clone()
                } else {
                    refund.clone()
                };
                cumulative_overpayment = cumulative_overpayment.minus(&from_residue);
                let remainder = refund.minus(&from_residue);
                if remainder.is_greater_than_zero() {
                    let ledger_refund = TransactionRecord {
                        amount: remainder.amount(),
                        ..tx.clone()
                    };
                    let (tx_mappings, result) =
                        allocate_refund(&ledger_refund, installments, currency);
                    mappings.extend(tx_mappings);
                    if result.is_over_payment() {
                        warnings.push(format!(
                            "Refund {} exceeds amounts paid in by {}",
                            tx.id,
                            result.overpayment()
                        ));
                    }
                }
            }
        }
    }

    let all_obligations_met = installments.iter().all(|i| i.is_obligations_met());

    if all_obligations_met && cumulative_overpayment.is_greater_than_zero() {
        apply_event(
            LoanEvent::Overpayment,
            &mut status,
            &mut transitions,
            &mut warnings,
        )?;
    } else if all_obligations_met && (status.is_active() || status.is_overpaid()) {
        apply_event(
            LoanEvent::RepaidInFull,
            &mut status,
            &mut transitions,
            &mut warnings,
        )?;
    }

    let outcome = ReplayOutcome {
        final_status: status,
        transitions,
        mappings,
        write_offs,
        result: TransactionProcessingResult::new(cumulative_overpayment.amount()),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Deterministic replay of loan transaction history",
        &serde_json::json!({
            "allocation_policy": policy.code(),
            "currency": currency.code.as_str(),
            "starting_status": starting_status.code(),
            "transaction_count": transactions.len(),
            "installment_count": installments.len(),
        }),
        warnings,
        elapsed,
        outcome,
    ))
}

/// Drive one event through the state machine, recording the step and
/// surfacing an illegal (no-op) transition as a warning for the caller.
fn apply_event(
    event: LoanEvent,
    status: &mut LoanStatus,
    transitions: &mut Vec<ReplayTransition>,
    warnings: &mut Vec<String>,
) -> LoanLedgerResult<()> {
    let outcome = transition(event, Some(*status))?;
    if !outcome.applied {
        warnings.push(format!(
            "Event {event:?} is not legal from status {:?}; status left unchanged",
            *status
        ));
    }
    transitions.push(ReplayTransition {
        event,
        status: outcome.status,
        applied: outcome.applied,
    });
    *status = outcome.status;
    Ok(())
}

fn validate_inputs(
    transactions: &[TransactionRecord],
    installments: &[RepaymentScheduleInstallment],
) -> LoanLedgerResult<()> {
    for tx in transactions {
        if tx.amount.is_sign_negative() {
            return Err(LoanLedgerError::InvalidInput {
                field: format!("transactions[{}].amount", tx.id),
                reason: "transaction amounts must be non-negative".to_string(),
            });
        }
    }

    let mut seen: BTreeSet<u32> = BTreeSet::new();
    for installment in installments {
        if !seen.insert(installment.installment_number()) {
            return Err(LoanLedgerError::InvalidInput {
                field: "installments".to_string(),
                reason: format!(
                    "duplicate installment number {}",
                    installment.installment_number()
                ),
            });
        }
    }

    Ok(())
}
