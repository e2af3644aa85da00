//! Discount coupons and their applicability rules.

use chrono::{DateTime, Utc};
use common::{CategoryId, CouponId, Money};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::optional_text;
use crate::error::{ValidationError, check_amount_limit};
use crate::order::PricedLine;

/// Reasons a coupon code cannot be applied to a cart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    #[error("Coupon {0} does not exist")]
    NotFound(String),

    #[error("Coupon is not active")]
    Inactive,

    #[error("Coupon is not valid yet")]
    NotYetValid,

    #[error("Coupon has expired")]
    Expired,

    #[error("Coupon usage limit has been reached")]
    UsageLimitReached,

    #[error("Coupon requires a minimum order of {minimum}, cart subtotal is {subtotal}")]
    MinimumNotMet { minimum: Money, subtotal: Money },

    #[error("Coupon does not apply to any item in the cart")]
    NotApplicable,
}

/// How a coupon reduces the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DiscountKind {
    /// Percentage of the eligible amount, in basis points (1000 = 10%).
    Percentage(u32),
    /// Flat amount off the eligible amount.
    Fixed(Money),
}

/// A stored coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub description: Option<String>,
    pub discount: DiscountKind,
    pub min_order_amount: Money,
    pub max_discount: Option<Money>,
    pub usage_limit: Option<u32>,
    pub used_count: u32,
    pub valid_from: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// Categories the coupon is restricted to; empty means every category.
    pub category_ids: Vec<CategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// Checks the coupon's own state (active flag, validity window, usage).
    pub fn check_usable(&self, now: DateTime<Utc>) -> Result<(), CouponError> {
        if !self.is_active {
            return Err(CouponError::Inactive);
        }
        if self.valid_from.is_some_and(|from| now < from) {
            return Err(CouponError::NotYetValid);
        }
        if self.expires_at.is_some_and(|until| now > until) {
            return Err(CouponError::Expired);
        }
        if self.usage_limit.is_some_and(|limit| self.used_count >= limit) {
            return Err(CouponError::UsageLimitReached);
        }
        Ok(())
    }

    /// Returns true if a line in `category` counts towards the discount.
    pub fn applies_to(&self, category: Option<CategoryId>) -> bool {
        self.category_ids.is_empty()
            || category.is_some_and(|c| self.category_ids.contains(&c))
    }

    /// Computes the discount this coupon grants on `lines`.
    ///
    /// The result never exceeds the cart subtotal.
    pub fn evaluate(&self, lines: &[PricedLine], now: DateTime<Utc>) -> Result<Money, CouponError> {
        self.check_usable(now)?;

        let subtotal: Money = lines.iter().map(PricedLine::line_total).sum();
        if subtotal < self.min_order_amount {
            return Err(CouponError::MinimumNotMet {
                minimum: self.min_order_amount,
                subtotal,
            });
        }

        let eligible: Money = lines
            .iter()
            .filter(|line| self.applies_to(line.category_id))
            .map(PricedLine::line_total)
            .sum();
        if !eligible.is_positive() {
            return Err(CouponError::NotApplicable);
        }

        let discount = match self.discount {
            DiscountKind::Percentage(bp) => {
                let raw = eligible.percent_of(bp);
                match self.max_discount {
                    Some(cap) => raw.min(cap),
                    None => raw,
                }
            }
            DiscountKind::Fixed(amount) => amount.min(eligible),
        };

        Ok(discount.min(subtotal))
    }
}

/// Normalises a coupon code as typed by a customer.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Input for creating or replacing a coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponDraft {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    pub discount: DiscountKind,
    #[serde(default)]
    pub min_order_amount: Money,
    #[serde(default)]
    pub max_discount: Option<Money>,
    #[serde(default)]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
}

fn default_true() -> bool {
    true
}

impl CouponDraft {
    pub fn new(code: impl Into<String>, discount: DiscountKind) -> Self {
        Self {
            code: code.into(),
            description: None,
            discount,
            min_order_amount: Money::zero(),
            max_discount: None,
            usage_limit: None,
            valid_from: None,
            expires_at: None,
            is_active: true,
            category_ids: Vec::new(),
        }
    }

    /// Validates the draft and normalises the code.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let code = normalize_code(&self.code);
        if code.is_empty() {
            return Err(ValidationError::new("code", "must not be empty"));
        }
        if code.len() > 32 {
            return Err(ValidationError::new("code", "must be at most 32 characters"));
        }
        if !code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::new(
                "code",
                "may only contain letters, digits, '-' and '_'",
            ));
        }

        match self.discount {
            DiscountKind::Percentage(bp) if bp == 0 || bp > 10_000 => {
                return Err(ValidationError::new(
                    "discount",
                    "percentage must be between 0.01% and 100%",
                ));
            }
            DiscountKind::Fixed(amount) if !amount.is_positive() => {
                return Err(ValidationError::new(
                    "discount",
                    "amount must be greater than zero",
                ));
            }
            _ => {}
        }
        if let DiscountKind::Fixed(amount) = self.discount {
            check_amount_limit("discount", amount)?;
        }
        check_amount_limit("min_order_amount", self.min_order_amount)?;
        if let Some(cap) = self.max_discount {
            check_amount_limit("max_discount", cap)?;
        }

        if self.min_order_amount.is_negative() {
            return Err(ValidationError::new(
                "min_order_amount",
                "must not be negative",
            ));
        }
        if self.max_discount.is_some_and(|cap| !cap.is_positive()) {
            return Err(ValidationError::new(
                "max_discount",
                "must be greater than zero",
            ));
        }
        if self.usage_limit == Some(0) {
            return Err(ValidationError::new(
                "usage_limit",
                "must be greater than zero",
            ));
        }
        if let (Some(from), Some(until)) = (self.valid_from, self.expires_at)
            && from >= until
        {
            return Err(ValidationError::new(
                "expires_at",
                "must be after valid_from",
            ));
        }

        let mut category_ids = self.category_ids;
        category_ids.sort();
        category_ids.dedup();

        Ok(Self {
            code,
            description: optional_text(self.description),
            category_ids,
            ..self
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use common::ProductId;

    fn coupon(discount: DiscountKind) -> Coupon {
        let now = Utc::now();
        Coupon {
            id: CouponId::new(1),
            code: "FEST10".to_string(),
            description: None,
            discount,
            min_order_amount: Money::zero(),
            max_discount: None,
            usage_limit: None,
            used_count: 0,
            valid_from: None,
            expires_at: None,
            is_active: true,
            category_ids: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    fn line(category: Option<i64>, unit: i64, qty: u32) -> PricedLine {
        PricedLine {
            product_id: ProductId::new(unit),
            sku: "SKU".to_string(),
            product_name: "Item".to_string(),
            category_id: category.map(CategoryId::new),
            unit_price: Money::from_paise(unit),
            quantity: qty,
        }
    }

    #[test]
    fn percentage_discount_on_whole_cart() {
        let c = coupon(DiscountKind::Percentage(1000));
        let d = c.evaluate(&[line(None, 10_000, 2)], Utc::now()).unwrap();
        assert_eq!(d.paise(), 2_000);
    }

    #[test]
    fn percentage_discount_respects_cap() {
        let mut c = coupon(DiscountKind::Percentage(5000));
        c.max_discount = Some(Money::from_paise(1_500));
        let d = c.evaluate(&[line(None, 10_000, 1)], Utc::now()).unwrap();
        assert_eq!(d.paise(), 1_500);
    }

    #[test]
    fn fixed_discount_limited_to_eligible_amount() {
        let mut c = coupon(DiscountKind::Fixed(Money::from_paise(5_000)));
        c.category_ids = vec![CategoryId::new(7)];
        let lines = [line(Some(7), 1_000, 2), line(Some(8), 50_000, 1)];
        let d = c.evaluate(&lines, Utc::now()).unwrap();
        assert_eq!(d.paise(), 2_000);
    }

    #[test]
    fn category_restriction_only_counts_matching_lines() {
        let mut c = coupon(DiscountKind::Percentage(2000));
        c.category_ids = vec![CategoryId::new(1)];
        let lines = [line(Some(1), 5_000, 1), line(Some(2), 5_000, 1), line(None, 5_000, 1)];
        assert_eq!(c.evaluate(&lines, Utc::now()).unwrap().paise(), 1_000);
    }

    #[test]
    fn no_matching_category_is_not_applicable() {
        let mut c = coupon(DiscountKind::Percentage(2000));
        c.category_ids = vec![CategoryId::new(99)];
        let err = c.evaluate(&[line(Some(1), 5_000, 1)], Utc::now()).unwrap_err();
        assert_eq!(err, CouponError::NotApplicable);
    }

    #[test]
    fn validity_window_is_enforced() {
        let now = Utc::now();
        let lines = [line(None, 5_000, 1)];

        let mut c = coupon(DiscountKind::Percentage(1000));
        c.valid_from = Some(now + Duration::days(1));
        assert_eq!(c.evaluate(&lines, now).unwrap_err(), CouponError::NotYetValid);

        let mut c = coupon(DiscountKind::Percentage(1000));
        c.expires_at = Some(now - Duration::seconds(1));
        assert_eq!(c.evaluate(&lines, now).unwrap_err(), CouponError::Expired);
    }

    #[test]
    fn usage_limit_is_enforced() {
        let mut c = coupon(DiscountKind::Percentage(1000));
        c.usage_limit = Some(3);
        c.used_count = 3;
        assert_eq!(
            c.evaluate(&[line(None, 5_000, 1)], Utc::now()).unwrap_err(),
            CouponError::UsageLimitReached
        );
    }

    #[test]
    fn minimum_order_is_enforced() {
        let mut c = coupon(DiscountKind::Fixed(Money::from_paise(100)));
        c.min_order_amount = Money::from_paise(10_000);
        let err = c.evaluate(&[line(None, 9_999, 1)], Utc::now()).unwrap_err();
        assert!(matches!(err, CouponError::MinimumNotMet { .. }));
    }

    #[test]
    fn inactive_coupon_is_rejected_first() {
        let mut c = coupon(DiscountKind::Percentage(1000));
        c.is_active = false;
        c.used_count = 10;
        c.usage_limit = Some(1);
        assert_eq!(c.evaluate(&[], Utc::now()).unwrap_err(), CouponError::Inactive);
    }

    #[test]
    fn draft_validation_normalizes_code() {
        let mut draft = CouponDraft::new(" diwali-25 ", DiscountKind::Percentage(2500));
        draft.category_ids = vec![CategoryId::new(3), CategoryId::new(1), CategoryId::new(3)];
        let draft = draft.validate().unwrap();
        assert_eq!(draft.code, "DIWALI-25");
        assert_eq!(draft.category_ids, vec![CategoryId::new(1), CategoryId::new(3)]);
    }

    #[test]
    fn draft_validation_rejects_bad_values() {
        let err = CouponDraft::new("X", DiscountKind::Percentage(0))
            .validate()
            .unwrap_err();
        assert_eq!(err.field, "discount");

        let err = CouponDraft::new("X", DiscountKind::Fixed(Money::zero()))
            .validate()
            .unwrap_err();
        assert_eq!(err.field, "discount");

        let err = CouponDraft::new("HAS SPACE", DiscountKind::Percentage(10))
            .validate()
            .unwrap_err();
        assert_eq!(err.field, "code");

        let now = Utc::now();
        let mut draft = CouponDraft::new("WINDOW", DiscountKind::Percentage(10));
        draft.valid_from = Some(now);
        draft.expires_at = Some(now);
        assert_eq!(draft.validate().unwrap_err().field, "expires_at");

        let huge = Money::from_paise(i64::MAX);
        let err = CouponDraft::new("BIG", DiscountKind::Fixed(huge))
            .validate()
            .unwrap_err();
        assert_eq!(err.field, "discount");

        let mut draft = CouponDraft::new("BIG", DiscountKind::Percentage(10));
        draft.max_discount = Some(huge);
        assert_eq!(draft.validate().unwrap_err().field, "max_discount");
    }

    #[test]
    fn discount_kind_json_shape() {
        let json = serde_json::to_value(DiscountKind::Percentage(1500)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "percentage", "value": 1500}));

        let kind: DiscountKind =
            serde_json::from_value(serde_json::json!({"type": "fixed", "value": 2500})).unwrap();
        assert_eq!(kind, DiscountKind::Fixed(Money::from_paise(2500)));
    }
}
