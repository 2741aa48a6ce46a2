use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

pub const CURRENCY_CODE: &str = "INR";

//--------------------------------------       Money         ---------------------------------------------------------
/// An amount of money in the smallest currency unit (paise). All prices, order totals and ledger entries use this type
/// so that no floating point arithmetic ever touches a balance.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

// Operators saturate at the bounds of i64. Use the `checked_*` methods where an overflow must be reported.
macro_rules! money_ops {
    ($($op:ident::$f:ident, $assign:ident::$assign_f:ident => $sat:ident);+) => {$(
        impl $op for Money {
            type Output = Self;

            fn $f(self, rhs: Self) -> Self {
                Self(self.0.$sat(rhs.0))
            }
        }

        impl $assign for Money {
            fn $assign_f(&mut self, rhs: Self) {
                self.0 = self.0.$sat(rhs.0);
            }
        }
    )+};
}

money_ops!(Add::add, AddAssign::add_assign => saturating_add; Sub::sub, SubAssign::sub_assign => saturating_sub);

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0.saturating_mul(rhs))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in paise: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map(Self)
            .map_err(|_| MoneyConversionError(format!("Value {value} is too large to convert to Money")))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}₹{}.{:02}", abs / 100, abs % 100)
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub const fn from_rupees(rupees: i64) -> Self {
        Self(rupees * 100)
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_mul(self, rhs: i64) -> Option<Self> {
        self.0.checked_mul(rhs).map(Self)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(Money::from(1250).to_string(), "₹12.50");
        assert_eq!(Money::from(5).to_string(), "₹0.05");
        assert_eq!(Money::from(-199).to_string(), "-₹1.99");
        assert_eq!(Money::from_rupees(40).to_string(), "₹40.00");
    }

    #[test]
    fn arithmetic() {
        let a = Money::from(300);
        let b = Money::from(120);
        assert_eq!(a + b, Money::from(420));
        assert_eq!(a - b, Money::from(180));
        assert_eq!(b * 3, Money::from(360));
        assert_eq!(-a, Money::from(-300));
        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total, Money::from(540));
        let mut c = a;
        c -= b;
        assert_eq!(c, Money::from(180));
    }

    #[test]
    fn overflow_is_never_silent() {
        let price = Money::from(12_000);
        let huge = i64::MAX / 10_000;
        assert_eq!(price.checked_mul(huge), None);
        assert_eq!(price * huge, Money::from(i64::MAX));
        assert_eq!(Money::from(i64::MAX).checked_add(Money::from(1)), None);
        assert_eq!(Money::from(i64::MIN) - Money::from(1), Money::from(i64::MIN));
        assert_eq!(price.checked_mul(3), Some(Money::from(36_000)));
    }

    #[test]
    fn conversion() {
        assert_eq!(Money::try_from(42u64).unwrap(), Money::from(42));
        assert!(Money::try_from(u64::MAX).is_err());
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_string(&Money::from(999)).unwrap();
        assert_eq!(json, "999");
    }
}
