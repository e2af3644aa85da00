use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CategoryId, CouponId, Money, OrderId, Page, ProductId};
use domain::{
    Category, CategoryDraft, Coupon, CouponDraft, NewOrder, Order, OrderStatus, Product,
    ProductDraft, Settings,
};
use serde::Serialize;

use crate::{OrderQuery, ProductQuery, Result};

/// Aggregate order figures for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrderStats {
    pub total_orders: u64,
    /// Sum of totals over orders that were not cancelled.
    pub revenue: Money,
    pub by_status: Vec<(OrderStatus, u64)>,
}

/// Core trait for storefront persistence.
///
/// All implementations must be thread-safe (Send + Sync). Writes that must
/// happen together go through [`Store::begin`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts a validated category.
    async fn create_category(&self, draft: CategoryDraft) -> Result<Category>;

    /// Replaces a category's fields.
    async fn update_category(&self, id: CategoryId, draft: CategoryDraft) -> Result<Category>;

    async fn delete_category(&self, id: CategoryId) -> Result<()>;

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>>;

    /// Lists categories ordered by `sort_order`, then name.
    async fn list_categories(&self, active_only: bool) -> Result<Vec<Category>>;

    async fn count_products_in_category(&self, id: CategoryId) -> Result<u64>;

    /// Inserts a validated product with zero sales.
    async fn create_product(&self, draft: ProductDraft) -> Result<Product>;

    /// Replaces a product's editable fields. The sales counter is kept.
    async fn update_product(&self, id: ProductId, draft: ProductDraft) -> Result<Product>;

    async fn delete_product(&self, id: ProductId) -> Result<()>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>>;

    /// Fetches the listed products; unknown ids are skipped.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>>;

    async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>>;

    /// Active products whose stock is at or below `threshold`, lowest first.
    async fn low_stock_products(&self, threshold: u32) -> Result<Vec<Product>>;

    async fn create_coupon(&self, draft: CouponDraft) -> Result<Coupon>;

    /// Replaces a coupon's definition. The usage counter is kept.
    async fn update_coupon(&self, id: CouponId, draft: CouponDraft) -> Result<Coupon>;

    async fn delete_coupon(&self, id: CouponId) -> Result<()>;

    async fn get_coupon(&self, id: CouponId) -> Result<Option<Coupon>>;

    /// Looks a coupon up by its normalised code.
    async fn get_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>>;

    async fn list_coupons(&self) -> Result<Vec<Coupon>>;

    async fn load_settings(&self) -> Result<Settings>;

    async fn save_settings(&self, settings: &Settings) -> Result<()>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    async fn get_order_by_number(&self, order_number: &str) -> Result<Option<Order>>;

    /// Lists orders newest first.
    async fn list_orders(&self, query: &OrderQuery) -> Result<Page<Order>>;

    async fn order_stats(&self) -> Result<OrderStats>;

    /// Starts a transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTx>>;
}

/// A unit of work over the store.
///
/// Rows read through the `*_for_update` methods stay locked until the
/// transaction ends. Dropping the transaction without calling
/// [`StoreTx::commit`] rolls back every write made through it.
#[async_trait]
pub trait StoreTx: Send {
    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<Product>>;

    /// Removes `quantity` units from stock and adds them to the sales counter.
    ///
    /// Fails with `StockUnderflow` rather than letting stock go negative.
    async fn take_stock(&mut self, id: ProductId, quantity: u32) -> Result<()>;

    /// Returns `quantity` units to stock and takes them off the sales counter.
    async fn restock(&mut self, id: ProductId, quantity: u32) -> Result<()>;

    async fn coupon_for_update(&mut self, code: &str) -> Result<Option<Coupon>>;

    async fn increment_coupon_usage(&mut self, id: CouponId) -> Result<()>;

    /// Gives back one use of the coupon, never going below zero.
    async fn release_coupon_usage(&mut self, id: CouponId) -> Result<()>;

    async fn settings(&mut self) -> Result<Settings>;

    /// Inserts an order and its items.
    async fn insert_order(&mut self, order: NewOrder) -> Result<Order>;

    async fn order_for_update(&mut self, id: OrderId) -> Result<Option<Order>>;

    async fn set_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Makes every write permanent.
    async fn commit(self: Box<Self>) -> Result<()>;
}
