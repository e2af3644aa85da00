//! Money amounts in minor currency units.

use serde::{Deserialize, Serialize};

/// Basis points in one whole (100%).
pub const BASIS_POINTS: i64 = 10_000;

/// Largest amount accepted for a single price, fee or discount (₹1,000 crore).
pub const MAX_AMOUNT: Money = Money(1_000_000_000_000);

/// Money amount represented in paise to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a new Money amount from minor units (e.g., 1000 = ₹10.00).
    pub fn from_paise(paise: i64) -> Self {
        Self(paise)
    }

    /// Creates a new Money amount from whole rupees.
    pub fn from_rupees(rupees: i64) -> Self {
        Self(rupees * 100)
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in minor units.
    pub fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    pub fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise remaining after whole rupees.
    pub fn paise_part(&self) -> i64 {
        self.0.abs() % 100
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a quantity, saturating at the `i64` bounds.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money(self.0.saturating_mul(i64::from(quantity)))
    }

    /// Multiplies by a quantity, or `None` on overflow.
    pub fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(i64::from(quantity)).map(Money)
    }

    /// Adds two amounts, or `None` on overflow.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Returns `basis_points / 10000` of this amount, rounded half away from zero.
    pub fn percent_of(&self, basis_points: u32) -> Money {
        let scaled = i128::from(self.0) * i128::from(basis_points);
        let basis = i128::from(BASIS_POINTS);
        let half = basis / 2;
        let rounded = if scaled >= 0 {
            (scaled + half) / basis
        } else {
            (scaled - half) / basis
        };
        let clamped = if rounded > 0 { i64::MAX } else { i64::MIN };
        Money(i64::try_from(rounded).unwrap_or(clamped))
    }

    /// Returns true if the amount is within `0..=MAX_AMOUNT`.
    pub fn is_within_limit(&self) -> bool {
        (0..=MAX_AMOUNT.0).contains(&self.0)
    }

    /// Subtracts without going below zero.
    pub fn saturating_sub(&self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 < 0 {
            write!(f, "-₹{}.{:02}", self.rupees().abs(), self.paise_part())
        } else {
            write!(f, "₹{}.{:02}", self.rupees(), self.paise_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::ops::SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_paise() {
        let money = Money::from_paise(1234);
        assert_eq!(money.paise(), 1234);
        assert_eq!(money.rupees(), 12);
        assert_eq!(money.paise_part(), 34);
    }

    #[test]
    fn test_money_from_rupees() {
        assert_eq!(Money::from_rupees(50).paise(), 5000);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_paise(1234).to_string(), "₹12.34");
        assert_eq!(Money::from_paise(5).to_string(), "₹0.05");
        assert_eq!(Money::from_paise(-1234).to_string(), "-₹12.34");
    }

    #[test]
    fn test_percent_of_rounds_half_up() {
        // 18% of 999 paise = 179.82 -> 180
        assert_eq!(Money::from_paise(999).percent_of(1800).paise(), 180);
        // 5% of 10 paise = 0.5 -> 1
        assert_eq!(Money::from_paise(10).percent_of(500).paise(), 1);
        // 5% of 9 paise = 0.45 -> 0
        assert_eq!(Money::from_paise(9).percent_of(500).paise(), 0);
        assert_eq!(Money::from_paise(12_345).percent_of(10_000).paise(), 12_345);
    }

    #[test]
    fn test_saturating_sub_floors_at_zero() {
        let a = Money::from_paise(100);
        assert_eq!(a.saturating_sub(Money::from_paise(30)).paise(), 70);
        assert_eq!(a.saturating_sub(Money::from_paise(300)), Money::zero());
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 250, 5].into_iter().map(Money::from_paise).sum();
        assert_eq!(total.paise(), 355);
    }

    #[test]
    fn test_checked_arithmetic_reports_overflow() {
        let huge = Money::from_paise(i64::MAX / 2);
        assert_eq!(huge.checked_multiply(3), None);
        assert_eq!(huge.multiply(3).paise(), i64::MAX);
        assert_eq!(huge.checked_add(huge).map(|m| m.paise()), Some(i64::MAX - 1));
        assert_eq!(huge.checked_add(huge + Money::from_paise(2)), None);
        assert_eq!(Money::from_paise(7).checked_multiply(3), Some(Money::from_paise(21)));
    }

    #[test]
    fn test_percent_of_large_amounts_does_not_overflow() {
        let huge = Money::from_paise(i64::MAX / 2);
        assert_eq!(huge.percent_of(5_000).paise(), i64::MAX / 4 + 1);
        assert_eq!(huge.percent_of(20_000).paise(), i64::MAX - 1);
    }

    #[test]
    fn test_amount_limit() {
        assert!(Money::zero().is_within_limit());
        assert!(MAX_AMOUNT.is_within_limit());
        assert!(!(MAX_AMOUNT + Money::from_paise(1)).is_within_limit());
        assert!(!Money::from_paise(-1).is_within_limit());
    }

    #[test]
    fn test_money_arithmetic() {
        let mut m = Money::from_paise(1000);
        m += Money::from_paise(500);
        m -= Money::from_paise(200);
        assert_eq!(m.paise(), 1300);
        assert_eq!(m.multiply(3).paise(), 3900);
    }
}
