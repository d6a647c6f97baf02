//! Repayment-schedule installment ledger.
//!
//! One ledger entry per scheduled due date, holding charged, paid, waived,
//! written-off, and accrued amounts per component (principal, interest,
//! fees, penalties). Every allocation, waiver, write-off, and reversal
//! flows through the operations here; each mutation recomputes whether the
//! installment's obligations are met.
//!
//! Monetary fields that reach exactly zero are normalized to `None` rather
//! than stored as zero. Downstream aggregation distinguishes "never
//! charged" from "charged then fully paid" through this convention, so it
//! must hold after every mutation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::Currency;

/// Monetary components of an installment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    Principal,
    Interest,
    Fee,
    Penalty,
}

/// A single scheduled installment of a loan. The loan exclusively owns its
/// ordered sequence of installments; installment numbers are unique within
/// a loan and transactions reference installments by number, never by
/// direct reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepaymentScheduleInstallment {
    installment_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    from_date: Option<NaiveDate>,
    due_date: NaiveDate,

    #[serde(skip_serializing_if = "Option::is_none")]
    principal: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interest_charged: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fee_charges_charged: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    penalty_charges_charged: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    principal_completed: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    principal_written_off: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    interest_paid: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interest_waived: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interest_written_off: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    fee_charges_paid: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fee_charges_waived: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fee_charges_written_off: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    penalty_charges_paid: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    penalty_charges_waived: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    penalty_charges_written_off: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    interest_accrued: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fee_accrued: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    penalty_accrued: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    total_paid_in_advance: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_paid_late: Option<Decimal>,

    obligations_met: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    obligations_met_on_date: Option<NaiveDate>,

    /// Marks installments injected by interest recalculation rather than the
    /// originally generated schedule.
    recalculated_interest_component: bool,
}

fn none_if_zero(value: Decimal) -> Option<Decimal> {
    if value.is_zero() {
        None
    } else {
        Some(value)
    }
}

impl RepaymentScheduleInstallment {
    pub fn new(
        installment_number: u32,
        from_date: Option<NaiveDate>,
        due_date: NaiveDate,
        principal: Decimal,
        interest: Decimal,
        fee_charges: Decimal,
        penalty_charges: Decimal,
    ) -> Self {
        RepaymentScheduleInstallment {
            installment_number,
            from_date,
            due_date,
            principal: none_if_zero(principal),
            interest_charged: none_if_zero(interest),
            fee_charges_charged: none_if_zero(fee_charges),
            penalty_charges_charged: none_if_zero(penalty_charges),
            principal_completed: None,
            principal_written_off: None,
            interest_paid: None,
            interest_waived: None,
            interest_written_off: None,
            fee_charges_paid: None,
            fee_charges_waived: None,
            fee_charges_written_off: None,
            penalty_charges_paid: None,
            penalty_charges_waived: None,
            penalty_charges_written_off: None,
            interest_accrued: None,
            fee_accrued: None,
            penalty_accrued: None,
            total_paid_in_advance: None,
            total_paid_late: None,
            obligations_met: false,
            obligations_met_on_date: None,
            recalculated_interest_component: false,
        }
    }

    pub fn installment_number(&self) -> u32 {
        self.installment_number
    }

    pub fn from_date(&self) -> Option<NaiveDate> {
        self.from_date
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn is_obligations_met(&self) -> bool {
        self.obligations_met
    }

    pub fn obligations_met_on_date(&self) -> Option<NaiveDate> {
        self.obligations_met_on_date
    }

    pub fn is_recalculated_interest_component(&self) -> bool {
        self.recalculated_interest_component
    }

    pub fn set_recalculated_interest_component(&mut self, recalculated: bool) {
        self.recalculated_interest_component = recalculated;
    }

    pub fn is_overdue_on(&self, date: NaiveDate) -> bool {
        self.due_date < date
    }

    fn is_in_advance(&self, transaction_date: NaiveDate) -> bool {
        transaction_date < self.due_date
    }

    fn is_late_payment(&self, transaction_date: NaiveDate) -> bool {
        transaction_date > self.due_date
    }

    // -----------------------------------------------------------------------
    // Charged / paid / waived / written-off getters (None reads as zero)
    // -----------------------------------------------------------------------

    pub fn charged(&self, component: Component, currency: &Currency) -> Money {
        let field = match component {
            Component::Principal => self.principal,
            Component::Interest => self.interest_charged,
            Component::Fee => self.fee_charges_charged,
            Component::Penalty => self.penalty_charges_charged,
        };
        Money::from_option(currency, field)
    }

    pub fn paid(&self, component: Component, currency: &Currency) -> Money {
        let field = match component {
            Component::Principal => self.principal_completed,
            Component::Interest => self.interest_paid,
            Component::Fee => self.fee_charges_paid,
            Component::Penalty => self.penalty_charges_paid,
        };
        Money::from_option(currency, field)
    }

    pub fn waived(&self, component: Component, currency: &Currency) -> Money {
        let field = match component {
            Component::Principal => None,
            Component::Interest => self.interest_waived,
            Component::Fee => self.fee_charges_waived,
            Component::Penalty => self.penalty_charges_waived,
        };
        Money::from_option(currency, field)
    }

    pub fn written_off(&self, component: Component, currency: &Currency) -> Money {
        let field = match component {
            Component::Principal => self.principal_written_off,
            Component::Interest => self.interest_written_off,
            Component::Fee => self.fee_charges_written_off,
            Component::Penalty => self.penalty_charges_written_off,
        };
        Money::from_option(currency, field)
    }

    pub fn accrued(&self, component: Component, currency: &Currency) -> Money {
        let field = match component {
            Component::Principal => None,
            Component::Interest => self.interest_accrued,
            Component::Fee => self.fee_accrued,
            Component::Penalty => self.penalty_accrued,
        };
        Money::from_option(currency, field)
    }

    /// outstanding = charged − (paid + waived + written off); never negative.
    pub fn outstanding(&self, component: Component, currency: &Currency) -> Money {
        let accounted_for = self
            .paid(component, currency)
            .plus(&self.waived(component, currency))
            .plus(&self.written_off(component, currency));
        self.charged(component, currency).minus(&accounted_for)
    }

    pub fn total_outstanding(&self, currency: &Currency) -> Money {
        self.outstanding(Component::Principal, currency)
            .plus(&self.outstanding(Component::Interest, currency))
            .plus(&self.outstanding(Component::Fee, currency))
            .plus(&self.outstanding(Component::Penalty, currency))
    }

    pub fn total_paid(&self, currency: &Currency) -> Money {
        self.paid(Component::Penalty, currency)
            .plus(&self.paid(Component::Fee, currency))
            .plus(&self.paid(Component::Interest, currency))
            .plus(&self.paid(Component::Principal, currency))
    }

    /// Total originally charged across all components.
    pub fn total_due(&self, currency: &Currency) -> Money {
        self.charged(Component::Principal, currency)
            .plus(&self.charged(Component::Interest, currency))
            .plus(&self.charged(Component::Fee, currency))
            .plus(&self.charged(Component::Penalty, currency))
    }

    /// Accrued interest not yet paid, waived, or written off.
    pub fn accrued_interest_outstanding(&self, currency: &Currency) -> Money {
        let accounted_for = self
            .paid(Component::Interest, currency)
            .plus(&self.waived(Component::Interest, currency))
            .plus(&self.written_off(Component::Interest, currency));
        self.accrued(Component::Interest, currency).minus(&accounted_for)
    }

    pub fn is_principal_completed(&self, currency: &Currency) -> bool {
        self.outstanding(Component::Principal, currency).is_zero()
    }

    pub fn total_paid_in_advance(&self, currency: &Currency) -> Money {
        Money::from_option(currency, self.total_paid_in_advance)
    }

    pub fn total_paid_late(&self, currency: &Currency) -> Money {
        Money::from_option(currency, self.total_paid_late)
    }

    // -----------------------------------------------------------------------
    // Allocation operations
    // -----------------------------------------------------------------------

    /// Pay a component: allocates `min(remaining, outstanding)`, records it
    /// against the paid field, and returns the portion actually allocated so
    /// the caller can decrement its remaining transaction balance. Advance
    /// and late trackers are updated for every component except penalties.
    pub fn pay_component(
        &mut self,
        component: Component,
        transaction_date: NaiveDate,
        transaction_amount_remaining: &Money,
    ) -> Money {
        let currency = transaction_amount_remaining.currency().clone();
        let due = self.outstanding(component, &currency);

        let portion = if transaction_amount_remaining.is_greater_than_or_equal_to(&due) {
            due
        } else {
            transaction_amount_remaining.clone()
        };

        let updated = self.paid(component, &currency).plus(&portion);
        *self.paid_field_mut(component) = none_if_zero(updated.amount());

        self.check_obligations_met(transaction_date, &currency);

        if component != Component::Penalty {
            self.track_advance_and_late_totals(transaction_date, &currency, &portion);
        }

        portion
    }

    pub fn pay_principal_component(
        &mut self,
        transaction_date: NaiveDate,
        transaction_amount_remaining: &Money,
    ) -> Money {
        self.pay_component(Component::Principal, transaction_date, transaction_amount_remaining)
    }

    pub fn pay_interest_component(
        &mut self,
        transaction_date: NaiveDate,
        transaction_amount_remaining: &Money,
    ) -> Money {
        self.pay_component(Component::Interest, transaction_date, transaction_amount_remaining)
    }

    pub fn pay_fee_charges_component(
        &mut self,
        transaction_date: NaiveDate,
        transaction_amount_remaining: &Money,
    ) -> Money {
        self.pay_component(Component::Fee, transaction_date, transaction_amount_remaining)
    }

    pub fn pay_penalty_charges_component(
        &mut self,
        transaction_date: NaiveDate,
        transaction_amount_remaining: &Money,
    ) -> Money {
        self.pay_component(Component::Penalty, transaction_date, transaction_amount_remaining)
    }

    /// Waive interest up to outstanding. Principal is never waived.
    pub fn waive_interest_component(
        &mut self,
        transaction_date: NaiveDate,
        transaction_amount_remaining: &Money,
    ) -> Money {
        self.waive_component(Component::Interest, transaction_date, transaction_amount_remaining)
    }

    pub fn waive_fee_charges_component(
        &mut self,
        transaction_date: NaiveDate,
        transaction_amount_remaining: &Money,
    ) -> Money {
        self.waive_component(Component::Fee, transaction_date, transaction_amount_remaining)
    }

    pub fn waive_penalty_charges_component(
        &mut self,
        transaction_date: NaiveDate,
        transaction_amount_remaining: &Money,
    ) -> Money {
        self.waive_component(Component::Penalty, transaction_date, transaction_amount_remaining)
    }

    fn waive_component(
        &mut self,
        component: Component,
        transaction_date: NaiveDate,
        transaction_amount_remaining: &Money,
    ) -> Money {
        let currency = transaction_amount_remaining.currency().clone();
        if component == Component::Principal {
            return Money::zero(&currency);
        }

        let due = self.outstanding(component, &currency);
        let portion = if transaction_amount_remaining.is_greater_than_or_equal_to(&due) {
            due
        } else {
            transaction_amount_remaining.clone()
        };

        let updated = self.waived(component, &currency).plus(&portion);
        let field = match component {
            Component::Interest => &mut self.interest_waived,
            Component::Fee => &mut self.fee_charges_waived,
            Component::Penalty => &mut self.penalty_charges_waived,
            Component::Principal => unreachable!("principal is never waived"),
        };
        *field = none_if_zero(updated.amount());

        self.check_obligations_met(transaction_date, &currency);

        portion
    }

    /// Write off the full outstanding amount of a component. Write-offs are
    /// never partial; the entire residual obligation is extinguished.
    pub fn write_off_outstanding_component(
        &mut self,
        component: Component,
        transaction_date: NaiveDate,
        currency: &Currency,
    ) -> Money {
        let due = self.outstanding(component, currency);

        let updated = self.written_off(component, currency).plus(&due);
        *self.written_off_field_mut(component) = none_if_zero(updated.amount());

        self.check_obligations_met(transaction_date, currency);

        due
    }

    /// Exact inverse of [`Self::pay_component`]: deducts up to the
    /// currently-paid amount (clamped at zero) and symmetrically reduces the
    /// advance/late trackers. Used when a transaction is reversed or
    /// replayed out of order.
    pub fn unpay_component(
        &mut self,
        component: Component,
        transaction_date: NaiveDate,
        transaction_amount_remaining: &Money,
    ) -> Money {
        let currency = transaction_amount_remaining.currency().clone();
        let completed = self.paid(component, &currency);

        let portion = if transaction_amount_remaining.is_greater_than_or_equal_to(&completed) {
            completed
        } else {
            transaction_amount_remaining.clone()
        };

        let updated = self.paid(component, &currency).minus(&portion);
        *self.paid_field_mut(component) = none_if_zero(updated.amount());

        self.check_obligations_met(transaction_date, &currency);

        if component != Component::Penalty {
            self.reduce_advance_and_late_totals(transaction_date, &currency, &portion);
        }

        portion
    }

    // -----------------------------------------------------------------------
    // Schedule regeneration and accrual hooks
    // -----------------------------------------------------------------------

    /// Clears every derived field ahead of reprocessing the transaction
    /// history against a regenerated schedule. Charged amounts are kept.
    pub fn reset_derived_components(&mut self) {
        self.principal_completed = None;
        self.principal_written_off = None;
        self.interest_paid = None;
        self.interest_waived = None;
        self.interest_written_off = None;
        self.fee_charges_paid = None;
        self.fee_charges_waived = None;
        self.fee_charges_written_off = None;
        self.penalty_charges_paid = None;
        self.penalty_charges_waived = None;
        self.penalty_charges_written_off = None;
        self.total_paid_in_advance = None;
        self.total_paid_late = None;

        self.obligations_met = false;
        self.obligations_met_on_date = None;
    }

    pub fn reset_accrual_components(&mut self) {
        self.interest_accrued = None;
        self.fee_accrued = None;
        self.penalty_accrued = None;
    }

    /// Record accrual postings against this installment.
    pub fn update_accrual_portion(&mut self, interest: &Money, fee: &Money, penalty: &Money) {
        self.interest_accrued = none_if_zero(interest.amount());
        self.fee_accrued = none_if_zero(fee.amount());
        self.penalty_accrued = none_if_zero(penalty.amount());
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn paid_field_mut(&mut self, component: Component) -> &mut Option<Decimal> {
        match component {
            Component::Principal => &mut self.principal_completed,
            Component::Interest => &mut self.interest_paid,
            Component::Fee => &mut self.fee_charges_paid,
            Component::Penalty => &mut self.penalty_charges_paid,
        }
    }

    fn written_off_field_mut(&mut self, component: Component) -> &mut Option<Decimal> {
        match component {
            Component::Principal => &mut self.principal_written_off,
            Component::Interest => &mut self.interest_written_off,
            Component::Fee => &mut self.fee_charges_written_off,
            Component::Penalty => &mut self.penalty_charges_written_off,
        }
    }

    /// `obligations_met` is derived, never set independently.
    fn check_obligations_met(&mut self, transaction_date: NaiveDate, currency: &Currency) {
        self.obligations_met = self.total_outstanding(currency).is_zero();
        self.obligations_met_on_date = if self.obligations_met {
            Some(transaction_date)
        } else {
            None
        };
    }

    fn track_advance_and_late_totals(
        &mut self,
        transaction_date: NaiveDate,
        currency: &Currency,
        amount_paid: &Money,
    ) {
        if self.is_in_advance(transaction_date) {
            let updated = self.total_paid_in_advance(currency).plus(amount_paid);
            self.total_paid_in_advance = none_if_zero(updated.amount());
        } else if self.is_late_payment(transaction_date) {
            let updated = self.total_paid_late(currency).plus(amount_paid);
            self.total_paid_late = none_if_zero(updated.amount());
        }
    }

    fn reduce_advance_and_late_totals(
        &mut self,
        transaction_date: NaiveDate,
        currency: &Currency,
        amount_deducted: &Money,
    ) {
        if self.is_in_advance(transaction_date) {
            let tracked = self.total_paid_in_advance(currency);
            self.total_paid_in_advance = if tracked.is_greater_than(amount_deducted) {
                none_if_zero(tracked.minus(amount_deducted).amount())
            } else {
                None
            };
        } else if self.is_late_payment(transaction_date) {
            let tracked = self.total_paid_late(currency);
            self.total_paid_late = if tracked.is_greater_than(amount_deducted) {
                none_if_zero(tracked.minus(amount_deducted).amount())
            } else {
                None
            };
        }
    }
}
