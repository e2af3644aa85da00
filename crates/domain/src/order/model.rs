use chrono::{DateTime, Utc};
use common::{CouponId, Money, OrderId, ProductId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CustomerInfo, OrderError, OrderStatus, PricedLine, Quote};

/// A purchased line, frozen at the price paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub sku: String,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub line_total: Money,
}

impl From<&PricedLine> for OrderItem {
    fn from(line: &PricedLine) -> Self {
        Self {
            product_id: line.product_id,
            sku: line.sku.clone(),
            product_name: line.product_name.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            line_total: line.line_total(),
        }
    }
}

/// An order ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_number: String,
    pub customer: CustomerInfo,
    pub items: Vec<OrderItem>,
    pub subtotal: Money,
    pub discount: Money,
    pub coupon_code: Option<String>,
    /// The coupon whose use this order counted, released again on cancel.
    pub coupon_id: Option<CouponId>,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn from_quote(
        customer: CustomerInfo,
        quote: &Quote,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            order_number: generate_order_number(now),
            customer,
            items: quote.lines.iter().map(OrderItem::from).collect(),
            subtotal: quote.subtotal,
            discount: quote.discount,
            coupon_code: quote.coupon_code.clone(),
            coupon_id: quote.coupon_id,
            tax: quote.tax,
            shipping: quote.shipping,
            total: quote.total,
            notes: notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            created_at: now,
        }
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer: CustomerInfo,
    pub items: Vec<OrderItem>,
    pub subtotal: Money,
    pub discount: Money,
    pub coupon_code: Option<String>,
    /// The coupon whose use this order counted, released again on cancel.
    pub coupon_id: Option<CouponId>,
    pub tax: Money,
    pub shipping: Money,
    pub total: Money,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds the stored form of a freshly inserted order.
    pub fn from_new(id: OrderId, new: NewOrder) -> Self {
        Self {
            id,
            order_number: new.order_number,
            customer: new.customer,
            items: new.items,
            subtotal: new.subtotal,
            discount: new.discount,
            coupon_code: new.coupon_code,
            coupon_id: new.coupon_id,
            tax: new.tax,
            shipping: new.shipping,
            total: new.total,
            status: OrderStatus::Pending,
            notes: new.notes,
            created_at: new.created_at,
            updated_at: new.created_at,
        }
    }

    /// Total number of units across all lines.
    pub fn unit_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Moves the order to `next`, enforcing the status machine.
    pub fn transition(&mut self, next: OrderStatus, now: DateTime<Utc>) -> Result<(), OrderError> {
        if !self.status.can_transition_to(next) {
            return Err(OrderError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}

/// Generates a customer-facing order number such as `ORD-20261018-3FA85F64`.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("ORD-{}-{suffix}", now.format("%Y%m%d"))
}
