//! Shared value types for the storefront crates.

pub mod money;
pub mod page;
pub mod types;

pub use money::{MAX_AMOUNT, Money};
pub use page::{Page, PageRequest};
pub use types::{CategoryId, CouponId, OrderId, ProductId};
