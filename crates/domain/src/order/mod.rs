//! Orders, the order status machine and checkout pricing.

mod customer;
mod model;
mod pricing;
mod status;

pub use customer::CustomerInfo;
pub use model::{NewOrder, Order, OrderItem, generate_order_number};
pub use pricing::{CartLine, PricedLine, Quote, cart_subtotal, merge_lines, quote};
pub use status::OrderStatus;

use common::{Money, ProductId};
use thiserror::Error;

use crate::coupon::CouponError;
use crate::error::ValidationError;

/// Errors that can occur while placing or updating an order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The cart has no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// A cart line asked for zero units.
    #[error("Invalid quantity for product {product_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// A cart line refers to a product that does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The product exists but is not for sale.
    #[error("Product is not available: {name}")]
    ProductUnavailable { product_id: ProductId, name: String },

    /// Not enough stock to fill a line.
    #[error("Insufficient stock for {name}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        requested: u32,
        available: u32,
    },

    /// The cart adds up to more than an order can hold.
    #[error("Order amount is too large")]
    AmountTooLarge,

    /// The order subtotal is below the store minimum.
    #[error("Minimum order amount is {minimum}, cart subtotal is {subtotal}")]
    BelowMinimumOrder { minimum: Money, subtotal: Money },

    /// Customer details failed validation.
    #[error("Invalid customer details: {0}")]
    InvalidCustomer(#[from] ValidationError),

    /// The coupon could not be applied.
    #[error("Coupon rejected: {0}")]
    Coupon(#[from] CouponError),

    /// The requested status change is not allowed.
    #[error("Invalid status transition: cannot move order from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },
}
