//! Transaction records, per-installment mappings, and processing results.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Closed set of monetary transaction kinds replayed against a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Repayment,
    ChargePayment,
    WaiveInterest,
    WaiveCharges,
    WriteOff,
    /// Fee/interest accrual posting. Moves no ledger money; relevant to
    /// replay ordering only.
    AccrualPosting,
    Refund,
}

impl TransactionType {
    pub fn is_income_posting(&self) -> bool {
        matches!(self, TransactionType::AccrualPosting)
    }

    pub fn is_waiver(&self) -> bool {
        matches!(self, TransactionType::WaiveInterest | TransactionType::WaiveCharges)
    }
}

/// One historical transaction as consumed for replay: date, creation
/// timestamp, amount, and classification. Persistence framing is an
/// external concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: u64,
    pub transaction_type: TransactionType,
    pub transaction_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
    pub amount: Decimal,
}

impl TransactionRecord {
    pub fn new(
        id: u64,
        transaction_type: TransactionType,
        transaction_date: NaiveDate,
        amount: Decimal,
    ) -> Self {
        TransactionRecord {
            id,
            transaction_type,
            transaction_date,
            created_at: None,
            amount,
        }
    }

    pub fn with_created_at(mut self, created_at: NaiveDateTime) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// Join record: the per-component portions of one transaction absorbed by
/// one installment. `amount` is always the sum of the four portions; the
/// constructor is the only way to build one, so the invariant holds by
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionToInstallmentMapping {
    pub transaction_id: u64,
    pub installment_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    principal_portion: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interest_portion: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fee_charges_portion: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    penalty_charges_portion: Option<Decimal>,
    amount: Decimal,
}

fn none_if_zero(value: Decimal) -> Option<Decimal> {
    if value.is_zero() {
        None
    } else {
        Some(value)
    }
}

impl TransactionToInstallmentMapping {
    pub fn new(
        transaction_id: u64,
        installment_number: u32,
        principal: &Money,
        interest: &Money,
        fee_charges: &Money,
        penalty_charges: &Money,
    ) -> Self {
        let amount = principal
            .plus(interest)
            .plus(fee_charges)
            .plus(penalty_charges)
            .amount();
        TransactionToInstallmentMapping {
            transaction_id,
            installment_number,
            principal_portion: none_if_zero(principal.amount()),
            interest_portion: none_if_zero(interest.amount()),
            fee_charges_portion: none_if_zero(fee_charges.amount()),
            penalty_charges_portion: none_if_zero(penalty_charges.amount()),
            amount,
        }
    }

    pub fn principal_portion(&self) -> Decimal {
        self.principal_portion.unwrap_or(Decimal::ZERO)
    }

    pub fn interest_portion(&self) -> Decimal {
        self.interest_portion.unwrap_or(Decimal::ZERO)
    }

    pub fn fee_charges_portion(&self) -> Decimal {
        self.fee_charges_portion.unwrap_or(Decimal::ZERO)
    }

    pub fn penalty_charges_portion(&self) -> Decimal {
        self.penalty_charges_portion.unwrap_or(Decimal::ZERO)
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn is_empty(&self) -> bool {
        self.amount.is_zero()
    }
}

/// Output of one allocation pass over a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionProcessingResult {
    overpayment: Decimal,
    over_payment: bool,
}

impl TransactionProcessingResult {
    /// The flag is derived from the residue: true iff strictly positive.
    pub fn new(overpayment: Decimal) -> Self {
        TransactionProcessingResult {
            overpayment,
            over_payment: overpayment > Decimal::ZERO,
        }
    }

    pub fn overpayment(&self) -> Decimal {
        self.overpayment
    }

    pub fn is_over_payment(&self) -> bool {
        self.over_payment
    }
}
