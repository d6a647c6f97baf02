//! Property tests for the money-safety invariants of the allocation layer.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use loan_ledger_core::allocation::{allocate_repayment, AllocationPolicy};
use loan_ledger_core::comparator::sort_for_replay;
use loan_ledger_core::installment::{Component, RepaymentScheduleInstallment};
use loan_ledger_core::transaction::{TransactionRecord, TransactionType};
use loan_ledger_core::types::Currency;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Amounts in cents, converted to two-decimal values.
fn cents(value: u64) -> Decimal {
    Decimal::new(value as i64, 2)
}

fn policy_strategy() -> impl Strategy<Value = AllocationPolicy> {
    prop_oneof![
        Just(AllocationPolicy::PrincipalInterestPenaltyFees),
        Just(AllocationPolicy::InterestPrincipalPenaltyFees),
        Just(AllocationPolicy::InterestAcrossScheduleFirst),
    ]
}

fn schedule_strategy() -> impl Strategy<Value = Vec<RepaymentScheduleInstallment>> {
    prop::collection::vec(
        (0u64..500_000, 0u64..50_000, 0u64..10_000, 0u64..10_000),
        1..8,
    )
    .prop_map(|components| {
        components
            .into_iter()
            .enumerate()
            .map(|(i, (principal, interest, fee, penalty))| {
                RepaymentScheduleInstallment::new(
                    (i + 1) as u32,
                    None,
                    date(2024, 1, 1) + chrono::Days::new(30 * (i as u64 + 1)),
                    cents(principal),
                    cents(interest),
                    cents(fee),
                    cents(penalty),
                )
            })
            .collect()
    })
}

proptest! {
    /// Conservation: the sum of all component allocations plus the
    /// overpayment residue equals the transaction amount exactly.
    #[test]
    fn allocation_conserves_amount(
        policy in policy_strategy(),
        mut installments in schedule_strategy(),
        amount in 0u64..2_000_000,
    ) {
        let usd = Currency::usd();
        let tx = TransactionRecord::new(
            1,
            TransactionType::Repayment,
            date(2024, 3, 15),
            cents(amount),
        );

        let (mappings, result) = allocate_repayment(policy, &tx, &mut installments, &usd);

        let allocated: Decimal = mappings.iter().map(|m| m.amount()).sum();
        prop_assert_eq!(allocated + result.overpayment(), cents(amount));

        let component_sum: Decimal = mappings
            .iter()
            .map(|m| {
                m.principal_portion()
                    + m.interest_portion()
                    + m.fee_charges_portion()
                    + m.penalty_charges_portion()
            })
            .sum();
        prop_assert_eq!(component_sum, allocated);
    }

    /// No component's outstanding ever goes negative, and obligations-met
    /// agrees with total outstanding after any allocation.
    #[test]
    fn outstanding_is_never_negative(
        policy in policy_strategy(),
        mut installments in schedule_strategy(),
        amount in 0u64..2_000_000,
    ) {
        let usd = Currency::usd();
        let tx = TransactionRecord::new(
            1,
            TransactionType::Repayment,
            date(2024, 3, 15),
            cents(amount),
        );

        allocate_repayment(policy, &tx, &mut installments, &usd);

        for installment in &installments {
            for component in [
                Component::Principal,
                Component::Interest,
                Component::Fee,
                Component::Penalty,
            ] {
                prop_assert!(
                    installment.outstanding(component, &usd).amount() >= Decimal::ZERO
                );
            }
            prop_assert_eq!(
                installment.is_obligations_met(),
                installment.total_outstanding(&usd).is_zero()
            );
        }
    }

    /// Paying then unpaying the same amount restores the paid field.
    #[test]
    fn unpay_is_the_exact_inverse_of_pay(
        principal in 1u64..500_000,
        payment in 1u64..600_000,
    ) {
        let usd = Currency::usd();
        let mut installment = RepaymentScheduleInstallment::new(
            1,
            None,
            date(2024, 2, 1),
            cents(principal),
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
        );
        let when = date(2024, 1, 15);
        let amount = loan_ledger_core::money::Money::of(&usd, cents(payment));

        let before = installment.paid(Component::Principal, &usd);
        let paid = installment.pay_component(Component::Principal, when, &amount);
        installment.unpay_component(Component::Principal, when, &paid);

        prop_assert_eq!(installment.paid(Component::Principal, &usd), before);
        prop_assert!(installment.total_paid_in_advance(&usd).is_zero());
    }

    /// Sorting the same multiset of transactions twice yields identical
    /// sequences, whatever order they arrive in.
    #[test]
    fn replay_order_is_deterministic(seed in any::<u64>()) {
        let kinds = [
            TransactionType::Repayment,
            TransactionType::WaiveInterest,
            TransactionType::AccrualPosting,
            TransactionType::ChargePayment,
        ];

        let mut transactions: Vec<TransactionRecord> = (0..20u64)
            .map(|i| {
                let kind = kinds[((seed.wrapping_add(i)) % 4) as usize];
                TransactionRecord::new(
                    i,
                    kind,
                    date(2024, 1, 1) + chrono::Days::new(seed.wrapping_mul(i + 1) % 90),
                    cents(100),
                )
            })
            .collect();

        let mut reversed: Vec<TransactionRecord> = transactions.iter().rev().cloned().collect();

        sort_for_replay(&mut transactions);
        sort_for_replay(&mut reversed);

        prop_assert_eq!(transactions, reversed);
    }
}
