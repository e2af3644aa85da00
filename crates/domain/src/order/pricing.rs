//! Checkout pricing: cart lines to a priced quote.
//!
//! The same computation backs the checkout preview and the order
//! transaction, so a customer is charged what they were shown as long as
//! nothing changed in between.

use chrono::{DateTime, Utc};
use common::{CategoryId, CouponId, Money, ProductId};
use serde::{Deserialize, Serialize};

use super::OrderError;
use crate::catalog::Product;
use crate::coupon::Coupon;
use crate::settings::Settings;

/// A product and quantity as submitted from the client-side cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartLine {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Rejects empty carts and zero quantities, and merges repeated products.
///
/// Lines keep the order in which each product first appears.
pub fn merge_lines(lines: &[CartLine]) -> Result<Vec<CartLine>, OrderError> {
    if lines.is_empty() {
        return Err(OrderError::EmptyCart);
    }

    let mut merged: Vec<CartLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity == 0 {
            return Err(OrderError::InvalidQuantity {
                product_id: line.product_id,
                quantity: line.quantity,
            });
        }
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => merged.push(*line),
        }
    }
    Ok(merged)
}

/// A cart line resolved against the current catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub sku: String,
    pub product_name: String,
    pub category_id: Option<CategoryId>,
    pub unit_price: Money,
    pub quantity: u32,
}

impl PricedLine {
    /// Prices `quantity` units of `product`, checking it can be sold.
    pub fn for_product(product: &Product, quantity: u32) -> Result<Self, OrderError> {
        if !product.is_active {
            return Err(OrderError::ProductUnavailable {
                product_id: product.id,
                name: product.name.clone(),
            });
        }
        if product.stock_quantity < quantity {
            return Err(OrderError::InsufficientStock {
                product_id: product.id,
                name: product.name.clone(),
                requested: quantity,
                available: product.stock_quantity,
            });
        }

        Ok(Self {
            product_id: product.id,
            sku: product.sku.clone(),
            product_name: product.name.clone(),
            category_id: product.category_id,
            unit_price: product.effective_price(),
            quantity,
        })
    }

    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Sums the line totals, failing instead of overflowing.
pub fn cart_subtotal(lines: &[PricedLine]) -> Result<Money, OrderError> {
    lines.iter().try_fold(Money::zero(), |acc, line| {
        line.unit_price
            .checked_multiply(line.quantity)
            .and_then(|total| acc.checked_add(total))
            .ok_or(OrderError::AmountTooLarge)
    })
}

/// A fully priced cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub lines: Vec<PricedLine>,
    pub subtotal: Money,
    pub discount: Money,
    pub coupon_code: Option<String>,
    #[serde(skip)]
    pub coupon_id: Option<CouponId>,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
}

/// Prices a cart.
///
/// `total = subtotal - discount + tax + shipping`. Tax is charged on the
/// discounted amount, and the free-shipping threshold is compared against
/// the discounted amount as well.
pub fn quote(
    lines: Vec<PricedLine>,
    coupon: Option<&Coupon>,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<Quote, OrderError> {
    if lines.is_empty() {
        return Err(OrderError::EmptyCart);
    }

    let subtotal = cart_subtotal(&lines)?;
    if subtotal < settings.min_order_amount {
        return Err(OrderError::BelowMinimumOrder {
            minimum: settings.min_order_amount,
            subtotal,
        });
    }

    let (discount, coupon_code, coupon_id) = match coupon {
        Some(coupon) => (
            coupon.evaluate(&lines, now)?,
            Some(coupon.code.clone()),
            Some(coupon.id),
        ),
        None => (Money::zero(), None, None),
    };

    let taxable = subtotal.saturating_sub(discount);
    let tax = taxable.percent_of(settings.tax_rate_bp);
    let shipping = settings.shipping_for(taxable);
    let total = taxable
        .checked_add(tax)
        .and_then(|t| t.checked_add(shipping))
        .ok_or(OrderError::AmountTooLarge)?;

    Ok(Quote {
        lines,
        subtotal,
        discount,
        coupon_code,
        coupon_id,
        tax,
        shipping,
        total,
    })
}
