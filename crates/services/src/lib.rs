//! Application services for the storefront.
//!
//! Each service wraps a [`store::Store`] and applies the domain rules on top
//! of it. The order service owns the order transaction:
//! 1. Validate the customer and merge the cart lines
//! 2. Lock, price and take stock for every product
//! 3. Apply the coupon and count its use
//! 4. Price tax and shipping from the stored settings
//! 5. Insert the order with its items and commit
//!
//! Any failure drops the transaction, which rolls every step back.

pub mod catalog;
pub mod coupons;
pub mod error;
pub mod orders;
pub mod settings;

pub use catalog::CatalogService;
pub use coupons::{CouponCheck, CouponService};
pub use error::{Result, ServiceError};
pub use orders::{Dashboard, OrderService, PlaceOrder, StatusCount};
pub use settings::{PublicSettings, SettingsService};
