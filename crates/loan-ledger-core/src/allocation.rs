//! Repayment allocation policies.
//!
//! A policy decides, per installment and per component, how a transaction
//! amount is absorbed by the schedule. The policy set is closed and
//! product-configured: a tagged variant dispatched through one interface,
//! not open-ended subclassing. All policies walk installments in ascending
//! installment-number order and differ only in the component order applied.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::installment::{Component, RepaymentScheduleInstallment};
use crate::money::Money;
use crate::transaction::{
    TransactionProcessingResult, TransactionRecord, TransactionToInstallmentMapping,
};
use crate::types::Currency;

/// Closed set of allocation orderings selectable per loan product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationPolicy {
    /// Canonical ordering: principal, interest, penalties, fees.
    #[default]
    PrincipalInterestPenaltyFees,
    /// Interest-led ordering within each installment.
    InterestPrincipalPenaltyFees,
    /// Component-major: clears interest across the whole schedule before
    /// any principal, then penalties, then fees.
    InterestAcrossScheduleFirst,
}

impl AllocationPolicy {
    /// Resolve a product-configured strategy code. Unknown or absent codes
    /// fall back to the canonical default.
    pub fn from_product_code(code: Option<&str>) -> Self {
        match code {
            Some("principal-interest-penalties-fees") => {
                AllocationPolicy::PrincipalInterestPenaltyFees
            }
            Some("interest-principal-penalties-fees") => {
                AllocationPolicy::InterestPrincipalPenaltyFees
            }
            Some("interest-first") => AllocationPolicy::InterestAcrossScheduleFirst,
            _ => AllocationPolicy::default(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AllocationPolicy::PrincipalInterestPenaltyFees => "principal-interest-penalties-fees",
            AllocationPolicy::InterestPrincipalPenaltyFees => "interest-principal-penalties-fees",
            AllocationPolicy::InterestAcrossScheduleFirst => "interest-first",
        }
    }

    fn component_order(&self) -> [Component; 4] {
        match self {
            AllocationPolicy::PrincipalInterestPenaltyFees => [
                Component::Principal,
                Component::Interest,
                Component::Penalty,
                Component::Fee,
            ],
            AllocationPolicy::InterestPrincipalPenaltyFees
            | AllocationPolicy::InterestAcrossScheduleFirst => [
                Component::Interest,
                Component::Principal,
                Component::Penalty,
                Component::Fee,
            ],
        }
    }

    fn is_component_major(&self) -> bool {
        matches!(self, AllocationPolicy::InterestAcrossScheduleFirst)
    }
}

fn component_index(component: Component) -> usize {
    match component {
        Component::Principal => 0,
        Component::Interest => 1,
        Component::Fee => 2,
        Component::Penalty => 3,
    }
}

fn ascending_order(installments: &[RepaymentScheduleInstallment]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..installments.len()).collect();
    order.sort_by_key(|&i| installments[i].installment_number());
    order
}

fn mappings_from_portions(
    transaction_id: u64,
    currency: &Currency,
    portions: BTreeMap<u32, [Decimal; 4]>,
) -> Vec<TransactionToInstallmentMapping> {
    portions
        .into_iter()
        .map(|(installment_number, p)| {
            TransactionToInstallmentMapping::new(
                transaction_id,
                installment_number,
                &Money::of(currency, p[0]),
                &Money::of(currency, p[1]),
                &Money::of(currency, p[2]),
                &Money::of(currency, p[3]),
            )
        })
        .filter(|mapping| !mapping.is_empty())
        .collect()
}

/// Allocate a repayment (or charge payment) across the schedule under the
/// given policy. Installments whose obligations are already met are
/// skipped; the walk stops once the amount is exhausted; any unconsumed
/// remainder is returned as overpayment residue. The sum of all mapped
/// portions plus the residue equals the transaction amount exactly.
pub fn allocate_repayment(
    policy: AllocationPolicy,
    transaction: &TransactionRecord,
    installments: &mut [RepaymentScheduleInstallment],
    currency: &Currency,
) -> (Vec<TransactionToInstallmentMapping>, TransactionProcessingResult) {
    let order = ascending_order(installments);
    let mut remaining = Money::of(currency, transaction.amount);
    let mut portions: BTreeMap<u32, [Decimal; 4]> = BTreeMap::new();

    if policy.is_component_major() {
        for component in policy.component_order() {
            if remaining.is_zero() {
                break;
            }
            for &i in &order {
                if remaining.is_zero() {
                    break;
                }
                let installment = &mut installments[i];
                if installment.is_obligations_met() {
                    continue;
                }
                let paid =
                    installment.pay_component(component, transaction.transaction_date, &remaining);
                if paid.is_zero() {
                    continue;
                }
                remaining = remaining.minus(&paid);
                portions.entry(installment.installment_number()).or_default()
                    [component_index(component)] += paid.amount();
            }
        }
    } else {
        for &i in &order {
            if remaining.is_zero() {
                break;
            }
            let installment = &mut installments[i];
            if installment.is_obligations_met() {
                continue;
            }
            for component in policy.component_order() {
                if remaining.is_zero() {
                    break;
                }
                let paid =
                    installment.pay_component(component, transaction.transaction_date, &remaining);
                if paid.is_zero() {
                    continue;
                }
                remaining = remaining.minus(&paid);
                portions.entry(installment.installment_number()).or_default()
                    [component_index(component)] += paid.amount();
            }
        }
    }

    let mappings = mappings_from_portions(transaction.id, currency, portions);
    (mappings, TransactionProcessingResult::new(remaining.amount()))
}

/// Allocate an interest waiver: walks the schedule waiving outstanding
/// interest until the waiver amount is exhausted.
pub fn allocate_interest_waiver(
    transaction: &TransactionRecord,
    installments: &mut [RepaymentScheduleInstallment],
    currency: &Currency,
) -> (Vec<TransactionToInstallmentMapping>, TransactionProcessingResult) {
    let order = ascending_order(installments);
    let mut remaining = Money::of(currency, transaction.amount);
    let mut portions: BTreeMap<u32, [Decimal; 4]> = BTreeMap::new();

    for &i in &order {
        if remaining.is_zero() {
            break;
        }
        let installment = &mut installments[i];
        if installment.is_obligations_met() {
            continue;
        }
        let waived =
            installment.waive_interest_component(transaction.transaction_date, &remaining);
        if waived.is_zero() {
            continue;
        }
        remaining = remaining.minus(&waived);
        portions.entry(installment.installment_number()).or_default()
            [component_index(Component::Interest)] += waived.amount();
    }

    let mappings = mappings_from_portions(transaction.id, currency, portions);
    (mappings, TransactionProcessingResult::new(remaining.amount()))
}

/// Allocate a charges waiver: penalties first, then fees, per installment.
pub fn allocate_charges_waiver(
    transaction: &TransactionRecord,
    installments: &mut [RepaymentScheduleInstallment],
    currency: &Currency,
) -> (Vec<TransactionToInstallmentMapping>, TransactionProcessingResult) {
    let order = ascending_order(installments);
    let mut remaining = Money::of(currency, transaction.amount);
    let mut portions: BTreeMap<u32, [Decimal; 4]> = BTreeMap::new();

    for &i in &order {
        if remaining.is_zero() {
            break;
        }
        let installment = &mut installments[i];
        if installment.is_obligations_met() {
            continue;
        }

        let penalty =
            installment.waive_penalty_charges_component(transaction.transaction_date, &remaining);
        if !penalty.is_zero() {
            remaining = remaining.minus(&penalty);
            portions.entry(installment.installment_number()).or_default()
                [component_index(Component::Penalty)] += penalty.amount();
        }
        if remaining.is_zero() {
            break;
        }

        let fee =
            installment.waive_fee_charges_component(transaction.transaction_date, &remaining);
        if !fee.is_zero() {
            remaining = remaining.minus(&fee);
            portions.entry(installment.installment_number()).or_default()
                [component_index(Component::Fee)] += fee.amount();
        }
    }

    let mappings = mappings_from_portions(transaction.id, currency, portions);
    (mappings, TransactionProcessingResult::new(remaining.amount()))
}

/// Per-component totals extinguished by a write-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOffSummary {
    pub principal: Decimal,
    pub interest: Decimal,
    pub fee_charges: Decimal,
    pub penalty_charges: Decimal,
}

impl WriteOffSummary {
    pub fn total(&self) -> Decimal {
        self.principal + self.interest + self.fee_charges + self.penalty_charges
    }
}

/// Write off the full outstanding amount of every component of every unmet
/// installment. Write-offs are never partial.
pub fn apply_write_off(
    transaction_date: NaiveDate,
    installments: &mut [RepaymentScheduleInstallment],
    currency: &Currency,
) -> WriteOffSummary {
    let mut summary = WriteOffSummary {
        principal: Decimal::ZERO,
        interest: Decimal::ZERO,
        fee_charges: Decimal::ZERO,
        penalty_charges: Decimal::ZERO,
    };

    for installment in installments.iter_mut() {
        if installment.is_obligations_met() {
            continue;
        }
        summary.principal += installment
            .write_off_outstanding_component(Component::Principal, transaction_date, currency)
            .amount();
        summary.interest += installment
            .write_off_outstanding_component(Component::Interest, transaction_date, currency)
            .amount();
        summary.fee_charges += installment
            .write_off_outstanding_component(Component::Fee, transaction_date, currency)
            .amount();
        summary.penalty_charges += installment
            .write_off_outstanding_component(Component::Penalty, transaction_date, currency)
            .amount();
    }

    summary
}

/// Undo a transaction's recorded allocations via the unpay operations, in
/// reverse installment order. Mappings that reference installments no
/// longer present in the schedule are skipped. Returns the total deducted.
pub fn reverse_allocation(
    mappings: &[TransactionToInstallmentMapping],
    transaction_date: NaiveDate,
    installments: &mut [RepaymentScheduleInstallment],
    currency: &Currency,
) -> Money {
    let mut total = Money::zero(currency);

    for mapping in mappings.iter().rev() {
        let Some(installment) = installments
            .iter_mut()
            .find(|i| i.installment_number() == mapping.installment_number)
        else {
            continue;
        };

        for (component, portion) in [
            (Component::Penalty, mapping.penalty_charges_portion()),
            (Component::Fee, mapping.fee_charges_portion()),
            (Component::Interest, mapping.interest_portion()),
            (Component::Principal, mapping.principal_portion()),
        ] {
            if portion.is_zero() {
                continue;
            }
            let deducted = installment.unpay_component(
                component,
                transaction_date,
                &Money::of(currency, portion),
            );
            total = total.plus(&deducted);
        }
    }

    total
}

/// Refund paid amounts back out of the schedule, latest installment first,
/// undoing components in the reverse of the canonical payment order.
/// Returns the portions deducted and the residue that could not be
/// refunded because it was never paid in.
pub fn allocate_refund(
    transaction: &TransactionRecord,
    installments: &mut [RepaymentScheduleInstallment],
    currency: &Currency,
) -> (Vec<TransactionToInstallmentMapping>, TransactionProcessingResult) {
    let mut order = ascending_order(installments);
    order.reverse();

    let mut remaining = Money::of(currency, transaction.amount);
    let mut portions: BTreeMap<u32, [Decimal; 4]> = BTreeMap::new();

    let mut reverse_order = AllocationPolicy::default().component_order();
    reverse_order.reverse();

    for &i in &order {
        if remaining.is_zero() {
            break;
        }
        let installment = &mut installments[i];
        for component in reverse_order {
            if remaining.is_zero() {
                break;
            }
            let deducted =
                installment.unpay_component(component, transaction.transaction_date, &remaining);
            if deducted.is_zero() {
                continue;
            }
            remaining = remaining.minus(&deducted);
            portions.entry(installment.installment_number()).or_default()
                [component_index(component)] += deducted.amount();
        }
    }

    let mappings = mappings_from_portions(transaction.id, currency, portions);
    (mappings, TransactionProcessingResult::new(remaining.amount()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionType;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// One installment: principal 100.00, interest 10.00, due 2024-02-01.
    fn single_installment() -> Vec<RepaymentScheduleInstallment> {
        vec![RepaymentScheduleInstallment::new(
            1,
            Some(date(2024, 1, 1)),
            date(2024, 2, 1),
            dec!(100.00),
            dec!(10.00),
            dec!(0),
            dec!(0),
        )]
    }

    /// Two installments, each principal 100.00 + interest 10.00.
    fn two_installments() -> Vec<RepaymentScheduleInstallment> {
        vec![
            RepaymentScheduleInstallment::new(
                1,
                Some(date(2024, 1, 1)),
                date(2024, 2, 1),
                dec!(100.00),
                dec!(10.00),
                dec!(0),
                dec!(0),
            ),
            RepaymentScheduleInstallment::new(
                2,
                Some(date(2024, 2, 1)),
                date(2024, 3, 1),
                dec!(100.00),
                dec!(10.00),
                dec!(0),
                dec!(0),
            ),
        ]
    }

    fn repayment(amount: Decimal) -> TransactionRecord {
        TransactionRecord::new(1, TransactionType::Repayment, date(2024, 2, 1), amount)
    }

    #[test]
    fn factory_resolves_known_codes_and_defaults_the_rest() {
        assert_eq!(
            AllocationPolicy::from_product_code(Some("interest-principal-penalties-fees")),
            AllocationPolicy::InterestPrincipalPenaltyFees
        );
        assert_eq!(
            AllocationPolicy::from_product_code(Some("interest-first")),
            AllocationPolicy::InterestAcrossScheduleFirst
        );
        assert_eq!(
            AllocationPolicy::from_product_code(Some("no-such-strategy")),
            AllocationPolicy::PrincipalInterestPenaltyFees
        );
        assert_eq!(
            AllocationPolicy::from_product_code(None),
            AllocationPolicy::PrincipalInterestPenaltyFees
        );
    }

    #[test]
    fn policy_codes_round_trip() {
        for policy in [
            AllocationPolicy::PrincipalInterestPenaltyFees,
            AllocationPolicy::InterestPrincipalPenaltyFees,
            AllocationPolicy::InterestAcrossScheduleFirst,
        ] {
            assert_eq!(AllocationPolicy::from_product_code(Some(policy.code())), policy);
        }
    }

    #[test]
    fn partial_payment_principal_first() {
        let usd = Currency::usd();
        let mut installments = single_installment();

        let (mappings, result) = allocate_repayment(
            AllocationPolicy::PrincipalInterestPenaltyFees,
            &repayment(dec!(50.00)),
            &mut installments,
            &usd,
        );

        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].principal_portion(), dec!(50.00));
        assert_eq!(mappings[0].interest_portion(), dec!(0));
        assert_eq!(
            installments[0].outstanding(Component::Principal, &usd).amount(),
            dec!(50.00)
        );
        assert!(!installments[0].is_obligations_met());
        assert!(!result.is_over_payment());
        assert_eq!(result.overpayment(), dec!(0));
    }

    #[test]
    fn exact_payment_meets_obligations_without_overpayment() {
        let usd = Currency::usd();
        let mut installments = single_installment();

        let (mappings, result) = allocate_repayment(
            AllocationPolicy::PrincipalInterestPenaltyFees,
            &repayment(dec!(110.00)),
            &mut installments,
            &usd,
        );

        assert_eq!(mappings[0].principal_portion(), dec!(100.00));
        assert_eq!(mappings[0].interest_portion(), dec!(10.00));
        assert!(installments[0].is_obligations_met());
        assert!(!result.is_over_payment());
        assert_eq!(result.overpayment(), dec!(0));
    }

    #[test]
    fn excess_payment_surfaces_as_overpayment_residue() {
        let usd = Currency::usd();
        let mut installments = single_installment();

        let (mappings, result) = allocate_repayment(
            AllocationPolicy::PrincipalInterestPenaltyFees,
            &repayment(dec!(150.00)),
            &mut installments,
            &usd,
        );

        assert!(installments[0].is_obligations_met());
        assert_eq!(mappings[0].amount(), dec!(110.00));
        assert!(result.is_over_payment());
        assert_eq!(result.overpayment(), dec!(40.00));
    }

    #[test]
    fn interest_led_ordering_pays_interest_before_principal() {
        let usd = Currency::usd();
        let mut installments = single_installment();

        let (mappings, _) = allocate_repayment(
            AllocationPolicy::InterestPrincipalPenaltyFees,
            &repayment(dec!(50.00)),
            &mut installments,
            &usd,
        );

        assert_eq!(mappings[0].interest_portion(), dec!(10.00));
        assert_eq!(mappings[0].principal_portion(), dec!(40.00));
    }

    #[test]
    fn component_major_policy_clears_interest_across_schedule_first() {
        let usd = Currency::usd();
        let mut installments = two_installments();

        // 25.00 covers interest of both installments (20.00) before any
        // principal of the first.
        let (mappings, result) = allocate_repayment(
            AllocationPolicy::InterestAcrossScheduleFirst,
            &repayment(dec!(25.00)),
            &mut installments,
            &usd,
        );

        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[0].interest_portion(), dec!(10.00));
        assert_eq!(mappings[1].interest_portion(), dec!(10.00));
        assert_eq!(mappings[0].principal_portion(), dec!(5.00));
        assert_eq!(mappings[1].principal_portion(), dec!(0));
        assert!(!result.is_over_payment());
    }

    #[test]
    fn fully_paid_installments_are_skipped() {
        let usd = Currency::usd();
        let mut installments = two_installments();

        allocate_repayment(
            AllocationPolicy::PrincipalInterestPenaltyFees,
            &repayment(dec!(110.00)),
            &mut installments,
            &usd,
        );
        assert!(installments[0].is_obligations_met());

        let second = TransactionRecord::new(
            2,
            TransactionType::Repayment,
            date(2024, 3, 1),
            dec!(30.00),
        );
        let (mappings, _) = allocate_repayment(
            AllocationPolicy::PrincipalInterestPenaltyFees,
            &second,
            &mut installments,
            &usd,
        );

        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].installment_number, 2);
    }

    #[test]
    fn allocation_conserves_the_transaction_amount() {
        let usd = Currency::usd();
        let mut installments = two_installments();
        let amount = dec!(173.40);

        let (mappings, result) = allocate_repayment(
            AllocationPolicy::InterestPrincipalPenaltyFees,
            &repayment(amount),
            &mut installments,
            &usd,
        );

        let allocated: Decimal = mappings.iter().map(|m| m.amount()).sum();
        assert_eq!(allocated + result.overpayment(), amount);
    }

    #[test]
    fn interest_waiver_walks_the_schedule() {
        let usd = Currency::usd();
        let mut installments = two_installments();
        let waiver = TransactionRecord::new(
            3,
            TransactionType::WaiveInterest,
            date(2024, 2, 1),
            dec!(15.00),
        );

        let (mappings, result) = allocate_interest_waiver(&waiver, &mut installments, &usd);

        assert_eq!(mappings[0].interest_portion(), dec!(10.00));
        assert_eq!(mappings[1].interest_portion(), dec!(5.00));
        assert_eq!(result.overpayment(), dec!(0));
        assert!(installments[0].paid(Component::Interest, &usd).is_zero());
        assert_eq!(
            installments[0].waived(Component::Interest, &usd).amount(),
            dec!(10.00)
        );
    }

    #[test]
    fn charges_waiver_takes_penalties_before_fees() {
        let usd = Currency::usd();
        let mut installments = vec![RepaymentScheduleInstallment::new(
            1,
            None,
            date(2024, 2, 1),
            dec!(0),
            dec!(0),
            dec!(12.00),
            dec!(8.00),
        )];
        let waiver = TransactionRecord::new(
            4,
            TransactionType::WaiveCharges,
            date(2024, 2, 1),
            dec!(10.00),
        );

        let (mappings, result) = allocate_charges_waiver(&waiver, &mut installments, &usd);

        assert_eq!(mappings[0].penalty_charges_portion(), dec!(8.00));
        assert_eq!(mappings[0].fee_charges_portion(), dec!(2.00));
        assert_eq!(result.overpayment(), dec!(0));
    }

    #[test]
    fn write_off_extinguishes_every_outstanding_component() {
        let usd = Currency::usd();
        let mut installments = two_installments();

        allocate_repayment(
            AllocationPolicy::PrincipalInterestPenaltyFees,
            &repayment(dec!(60.00)),
            &mut installments,
            &usd,
        );

        let summary = apply_write_off(date(2024, 4, 1), &mut installments, &usd);

        assert_eq!(summary.principal, dec!(140.00));
        assert_eq!(summary.interest, dec!(20.00));
        assert_eq!(summary.total(), dec!(160.00));
        for installment in &installments {
            assert!(installment.is_obligations_met());
        }
    }

    #[test]
    fn reverse_allocation_restores_prior_ledger_state() {
        let usd = Currency::usd();
        let mut installments = two_installments();
        let before = installments.clone();

        let tx = repayment(dec!(130.00));
        let (mappings, _) = allocate_repayment(
            AllocationPolicy::PrincipalInterestPenaltyFees,
            &tx,
            &mut installments,
            &usd,
        );

        let reversed =
            reverse_allocation(&mappings, tx.transaction_date, &mut installments, &usd);

        assert_eq!(reversed.amount(), dec!(130.00));
        for (after, before) in installments.iter().zip(before.iter()) {
            assert_eq!(after.total_paid(&usd), before.total_paid(&usd));
            assert_eq!(after.is_obligations_met(), before.is_obligations_met());
        }
    }

    #[test]
    fn refund_deducts_latest_installments_first() {
        let usd = Currency::usd();
        let mut installments = two_installments();

        allocate_repayment(
            AllocationPolicy::PrincipalInterestPenaltyFees,
            &repayment(dec!(220.00)),
            &mut installments,
            &usd,
        );
        assert!(installments[1].is_obligations_met());

        let refund = TransactionRecord::new(
            5,
            TransactionType::Refund,
            date(2024, 3, 15),
            dec!(30.00),
        );
        let (mappings, result) = allocate_refund(&refund, &mut installments, &usd);

        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].installment_number, 2);
        assert_eq!(result.overpayment(), dec!(0));
        assert!(!installments[1].is_obligations_met());
        assert!(installments[0].is_obligations_met());
    }
}
