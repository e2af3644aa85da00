//! Domain layer for the storefront.
//!
//! This crate holds the pure business rules, with no I/O:
//! - Catalog entities (categories, products) and their validation
//! - Coupons and the applicability rules that turn a code into a discount
//! - Store-wide settings (tax, shipping, minimum order)
//! - Orders, the order status machine and checkout pricing

pub mod catalog;
pub mod coupon;
pub mod error;
pub mod order;
pub mod settings;

pub use catalog::{Category, CategoryDraft, Product, ProductDraft, slugify};
pub use coupon::{Coupon, CouponDraft, CouponError, DiscountKind, normalize_code};
pub use error::ValidationError;
pub use order::{
    CartLine, CustomerInfo, NewOrder, Order, OrderError, OrderItem, OrderStatus, PricedLine,
    Quote, cart_subtotal, generate_order_number, merge_lines, quote,
};
pub use settings::{Settings, SettingsError, SettingsPatch};
