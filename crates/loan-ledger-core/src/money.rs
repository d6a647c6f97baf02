//! Currency-aware monetary value type.
//!
//! All ledger arithmetic routes through [`Money`] so that amounts are always
//! rounded to the owning currency's scale. A loan operates in exactly one
//! currency, so mixed-currency arithmetic is a programming error and is
//! caught with debug assertions; the `checked_*` variants are available at
//! boundaries where the single-currency invariant is not yet established.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::LoanLedgerError;
use crate::types::Currency;
use crate::LoanLedgerResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// Build a monetary amount, rounding to the currency scale with banker's
    /// rounding (midpoint-nearest-even, matching HALF_EVEN ledgers).
    pub fn of(currency: &Currency, amount: Decimal) -> Self {
        Money {
            amount: amount.round_dp_with_strategy(
                currency.digits_after_decimal,
                RoundingStrategy::MidpointNearestEven,
            ),
            currency: currency.clone(),
        }
    }

    pub fn zero(currency: &Currency) -> Self {
        Money::of(currency, Decimal::ZERO)
    }

    /// Unset ledger fields (`None`) are equivalent to zero.
    pub fn from_option(currency: &Currency, amount: Option<Decimal>) -> Self {
        Money::of(currency, amount.unwrap_or(Decimal::ZERO))
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn plus(&self, other: &Money) -> Money {
        debug_assert_eq!(self.currency, other.currency);
        Money::of(&self.currency, self.amount + other.amount)
    }

    pub fn minus(&self, other: &Money) -> Money {
        debug_assert_eq!(self.currency, other.currency);
        Money::of(&self.currency, self.amount - other.amount)
    }

    pub fn checked_plus(&self, other: &Money) -> LoanLedgerResult<Money> {
        self.require_same_currency(other)?;
        Ok(self.plus(other))
    }

    pub fn checked_minus(&self, other: &Money) -> LoanLedgerResult<Money> {
        self.require_same_currency(other)?;
        Ok(self.minus(other))
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn is_greater_than_zero(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn is_greater_than(&self, other: &Money) -> bool {
        debug_assert_eq!(self.currency, other.currency);
        self.amount > other.amount
    }

    pub fn is_greater_than_or_equal_to(&self, other: &Money) -> bool {
        debug_assert_eq!(self.currency, other.currency);
        self.amount >= other.amount
    }

    pub fn is_less_than(&self, other: &Money) -> bool {
        debug_assert_eq!(self.currency, other.currency);
        self.amount < other.amount
    }

    fn require_same_currency(&self, other: &Money) -> LoanLedgerResult<()> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(LoanLedgerError::CurrencyMismatch {
                expected: self.currency.code.as_str().to_string(),
                found: other.currency.code.as_str().to_string(),
            })
        }
    }
}
