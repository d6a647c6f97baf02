//! Total replay order over transactions.
//!
//! Reprocessing a loan's history must yield identical ledger state on every
//! run, so the order has to be total: no two distinct transactions may
//! compare equal.

use std::cmp::Ordering;

use crate::transaction::TransactionRecord;

/// Compare two transactions for deterministic replay:
/// 1. transaction date ascending;
/// 2. creation timestamp ascending (untimestamped rows sort after
///    timestamped ones on the same date);
/// 3. income postings (accruals) before non-income postings;
/// 4. waivers before non-waivers, reached only when creation timestamps
///    were equal or unavailable;
/// 5. id ascending as the final tie-break, guaranteeing totality.
pub fn replay_order(a: &TransactionRecord, b: &TransactionRecord) -> Ordering {
    a.transaction_date
        .cmp(&b.transaction_date)
        .then_with(|| compare_created_at(a, b))
        .then_with(|| income_posting_first(a, b))
        .then_with(|| waiver_first(a, b))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort a transaction history into replay order.
pub fn sort_for_replay(transactions: &mut [TransactionRecord]) {
    transactions.sort_by(replay_order);
}

fn compare_created_at(a: &TransactionRecord, b: &TransactionRecord) -> Ordering {
    match (a.created_at, b.created_at) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn income_posting_first(a: &TransactionRecord, b: &TransactionRecord) -> Ordering {
    // true sorts before false
    b.transaction_type
        .is_income_posting()
        .cmp(&a.transaction_type.is_income_posting())
}

fn waiver_first(a: &TransactionRecord, b: &TransactionRecord) -> Ordering {
    b.transaction_type
        .is_waiver()
        .cmp(&a.transaction_type.is_waiver())
}
