use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CategoryId, CouponId, OrderId, Page, ProductId};
use domain::{
    Category, CategoryDraft, Coupon, CouponDraft, NewOrder, Order, OrderStatus, Product,
    ProductDraft, Settings,
};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use crate::{
    OrderQuery, ProductQuery, Result, StoreError,
    store::{OrderStats, Store, StoreTx},
};

#[derive(Debug, Clone, Default)]
struct Tables {
    categories: BTreeMap<CategoryId, Category>,
    products: BTreeMap<ProductId, Product>,
    coupons: BTreeMap<CouponId, Coupon>,
    settings: Settings,
    orders: BTreeMap<OrderId, Order>,
    next_category_id: i64,
    next_product_id: i64,
    next_coupon_id: i64,
    next_order_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl Tables {
    fn ensure_unique_category_slug(&self, slug: &str, except: Option<CategoryId>) -> Result<()> {
        if self
            .categories
            .values()
            .any(|c| c.slug == slug && Some(c.id) != except)
        {
            return Err(StoreError::Conflict(format!(
                "category slug '{slug}' already exists"
            )));
        }
        Ok(())
    }

    fn ensure_unique_product(&self, draft: &ProductDraft, except: Option<ProductId>) -> Result<()> {
        for p in self.products.values().filter(|p| Some(p.id) != except) {
            if p.sku == draft.sku {
                return Err(StoreError::Conflict(format!(
                    "product SKU '{}' already exists",
                    draft.sku
                )));
            }
            if p.slug == draft.slug() {
                return Err(StoreError::Conflict(format!(
                    "product slug '{}' already exists",
                    draft.slug()
                )));
            }
        }
        Ok(())
    }

    fn ensure_category_exists(&self, category_id: Option<CategoryId>) -> Result<()> {
        match category_id {
            Some(id) if !self.categories.contains_key(&id) => Err(StoreError::Conflict(format!(
                "category {id} does not exist"
            ))),
            _ => Ok(()),
        }
    }

    fn ensure_unique_coupon_code(&self, code: &str, except: Option<CouponId>) -> Result<()> {
        if self
            .coupons
            .values()
            .any(|c| c.code == code && Some(c.id) != except)
        {
            return Err(StoreError::Conflict(format!(
                "coupon code '{code}' already exists"
            )));
        }
        Ok(())
    }
}

fn paginate<T>(rows: Vec<T>, page: common::PageRequest) -> Page<T> {
    let total = rows.len() as u64;
    let items = rows
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect();
    Page::new(items, page, total)
}

/// In-memory store implementation for testing and local development.
///
/// Provides the same interface as the MySQL implementation. A transaction
/// holds the write lock for its whole lifetime and works on a copy of the
/// tables, which replaces the shared tables on commit.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_category(&self, draft: CategoryDraft) -> Result<Category> {
        let mut t = self.tables.write().await;
        t.ensure_unique_category_slug(draft.slug(), None)?;

        let now = Utc::now();
        let category = Category {
            id: CategoryId::new(next_id(&mut t.next_category_id)),
            slug: draft.slug().to_string(),
            name: draft.name,
            description: draft.description,
            is_active: draft.is_active,
            sort_order: draft.sort_order,
            created_at: now,
            updated_at: now,
        };
        t.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: CategoryId, draft: CategoryDraft) -> Result<Category> {
        let mut t = self.tables.write().await;
        t.ensure_unique_category_slug(draft.slug(), Some(id))?;

        let category = t
            .categories
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Category", id))?;
        category.slug = draft.slug().to_string();
        category.name = draft.name;
        category.description = draft.description;
        category.is_active = draft.is_active;
        category.sort_order = draft.sort_order;
        category.updated_at = Utc::now();
        Ok(category.clone())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<()> {
        let mut t = self.tables.write().await;
        if t.products.values().any(|p| p.category_id == Some(id)) {
            return Err(StoreError::Conflict(format!(
                "category {id} still has products"
            )));
        }
        t.categories
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("Category", id))
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn list_categories(&self, active_only: bool) -> Result<Vec<Category>> {
        let t = self.tables.read().await;
        let mut categories: Vec<_> = t
            .categories
            .values()
            .filter(|c| !active_only || c.is_active)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then(a.name.cmp(&b.name)));
        Ok(categories)
    }

    async fn count_products_in_category(&self, id: CategoryId) -> Result<u64> {
        let t = self.tables.read().await;
        Ok(t.products
            .values()
            .filter(|p| p.category_id == Some(id))
            .count() as u64)
    }

    async fn create_product(&self, draft: ProductDraft) -> Result<Product> {
        let mut t = self.tables.write().await;
        t.ensure_unique_product(&draft, None)?;
        t.ensure_category_exists(draft.category_id)?;

        let now = Utc::now();
        let product = Product {
            id: ProductId::new(next_id(&mut t.next_product_id)),
            slug: draft.slug().to_string(),
            sku: draft.sku,
            name: draft.name,
            description: draft.description,
            category_id: draft.category_id,
            price: draft.price,
            sale_price: draft.sale_price,
            stock_quantity: draft.stock_quantity,
            sales_count: 0,
            is_active: draft.is_active,
            is_featured: draft.is_featured,
            image_url: draft.image_url,
            created_at: now,
            updated_at: now,
        };
        t.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: ProductId, draft: ProductDraft) -> Result<Product> {
        let mut t = self.tables.write().await;
        t.ensure_unique_product(&draft, Some(id))?;
        t.ensure_category_exists(draft.category_id)?;

        let product = t
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Product", id))?;
        product.slug = draft.slug().to_string();
        product.sku = draft.sku;
        product.name = draft.name;
        product.description = draft.description;
        product.category_id = draft.category_id;
        product.price = draft.price;
        product.sale_price = draft.sale_price;
        product.stock_quantity = draft.stock_quantity;
        product.is_active = draft.is_active;
        product.is_featured = draft.is_featured;
        product.image_url = draft.image_url;
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let mut t = self.tables.write().await;
        t.products
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("Product", id))
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        let t = self.tables.read().await;
        Ok(t.products.values().find(|p| p.slug == slug).cloned())
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let t = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| t.products.get(id).cloned())
            .collect())
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>> {
        let t = self.tables.read().await;
        let needle = query.search.as_deref().map(str::to_lowercase);

        let mut products: Vec<_> = t
            .products
            .values()
            .filter(|p| {
                if query.active_only && !p.is_active {
                    return false;
                }
                if query.featured_only && !p.is_featured {
                    return false;
                }
                if let Some(category) = query.category_id
                    && p.category_id != Some(category)
                {
                    return false;
                }
                if let Some(ref needle) = needle
                    && !p.name.to_lowercase().contains(needle)
                    && !p.sku.to_lowercase().contains(needle)
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        Ok(paginate(products, query.page))
    }

    async fn low_stock_products(&self, threshold: u32) -> Result<Vec<Product>> {
        let t = self.tables.read().await;
        let mut products: Vec<_> = t
            .products
            .values()
            .filter(|p| p.is_active && p.is_low_stock(threshold))
            .cloned()
            .collect();
        products.sort_by(|a, b| {
            a.stock_quantity
                .cmp(&b.stock_quantity)
                .then(a.name.cmp(&b.name))
        });
        Ok(products)
    }

    async fn create_coupon(&self, draft: CouponDraft) -> Result<Coupon> {
        let mut t = self.tables.write().await;
        t.ensure_unique_coupon_code(&draft.code, None)?;

        let now = Utc::now();
        let coupon = Coupon {
            id: CouponId::new(next_id(&mut t.next_coupon_id)),
            code: draft.code,
            description: draft.description,
            discount: draft.discount,
            min_order_amount: draft.min_order_amount,
            max_discount: draft.max_discount,
            usage_limit: draft.usage_limit,
            used_count: 0,
            valid_from: draft.valid_from,
            expires_at: draft.expires_at,
            is_active: draft.is_active,
            category_ids: draft.category_ids,
            created_at: now,
            updated_at: now,
        };
        t.coupons.insert(coupon.id, coupon.clone());
        Ok(coupon)
    }

    async fn update_coupon(&self, id: CouponId, draft: CouponDraft) -> Result<Coupon> {
        let mut t = self.tables.write().await;
        t.ensure_unique_coupon_code(&draft.code, Some(id))?;

        let coupon = t
            .coupons
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Coupon", id))?;
        coupon.code = draft.code;
        coupon.description = draft.description;
        coupon.discount = draft.discount;
        coupon.min_order_amount = draft.min_order_amount;
        coupon.max_discount = draft.max_discount;
        coupon.usage_limit = draft.usage_limit;
        coupon.valid_from = draft.valid_from;
        coupon.expires_at = draft.expires_at;
        coupon.is_active = draft.is_active;
        coupon.category_ids = draft.category_ids;
        coupon.updated_at = Utc::now();
        Ok(coupon.clone())
    }

    async fn delete_coupon(&self, id: CouponId) -> Result<()> {
        let mut t = self.tables.write().await;
        t.coupons
            .remove(&id)
            .ok_or_else(|| StoreError::not_found("Coupon", id))?;
        for order in t.orders.values_mut() {
            if order.coupon_id == Some(id) {
                order.coupon_id = None;
            }
        }
        Ok(())
    }

    async fn get_coupon(&self, id: CouponId) -> Result<Option<Coupon>> {
        Ok(self.tables.read().await.coupons.get(&id).cloned())
    }

    async fn get_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        let t = self.tables.read().await;
        Ok(t.coupons.values().find(|c| c.code == code).cloned())
    }

    async fn list_coupons(&self) -> Result<Vec<Coupon>> {
        let t = self.tables.read().await;
        let mut coupons: Vec<_> = t.coupons.values().cloned().collect();
        coupons.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(coupons)
    }

    async fn load_settings(&self) -> Result<Settings> {
        Ok(self.tables.read().await.settings.clone())
    }

    async fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.tables.write().await.settings = settings.clone();
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn get_order_by_number(&self, order_number: &str) -> Result<Option<Order>> {
        let t = self.tables.read().await;
        Ok(t.orders
            .values()
            .find(|o| o.order_number == order_number)
            .cloned())
    }

    async fn list_orders(&self, query: &OrderQuery) -> Result<Page<Order>> {
        let t = self.tables.read().await;
        let needle = query.search.as_deref().map(str::to_lowercase);

        let mut orders: Vec<_> = t
            .orders
            .values()
            .filter(|o| {
                if let Some(status) = query.status
                    && o.status != status
                {
                    return false;
                }
                if let Some(ref needle) = needle
                    && !o.order_number.to_lowercase().contains(needle)
                    && !o.customer.phone.contains(needle.as_str())
                {
                    return false;
                }
                true
            })
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(paginate(orders, query.page))
    }

    async fn order_stats(&self) -> Result<OrderStats> {
        let t = self.tables.read().await;
        let mut stats = OrderStats {
            total_orders: t.orders.len() as u64,
            ..OrderStats::default()
        };

        for status in OrderStatus::ALL {
            let count = t.orders.values().filter(|o| o.status == status).count() as u64;
            if count > 0 {
                stats.by_status.push((status, count));
            }
        }
        stats.revenue = t
            .orders
            .values()
            .filter(|o| o.status.counts_as_revenue())
            .map(|o| o.total)
            .sum();

        Ok(stats)
    }

    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let guard = self.tables.clone().write_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTx { guard, working }))
    }
}

/// Transaction over an [`InMemoryStore`].
struct InMemoryTx {
    guard: OwnedRwLockWriteGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn take_stock(&mut self, id: ProductId, quantity: u32) -> Result<()> {
        let product = self
            .working
            .products
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Product", id))?;
        product.stock_quantity = product
            .stock_quantity
            .checked_sub(quantity)
            .ok_or(StoreError::StockUnderflow(id))?;
        product.sales_count = product.sales_count.saturating_add(quantity);
        product.updated_at = Utc::now();
        Ok(())
    }

    async fn restock(&mut self, id: ProductId, quantity: u32) -> Result<()> {
        // The product may have been deleted since the order was placed.
        if let Some(product) = self.working.products.get_mut(&id) {
            product.stock_quantity = product.stock_quantity.saturating_add(quantity);
            product.sales_count = product.sales_count.saturating_sub(quantity);
            product.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn coupon_for_update(&mut self, code: &str) -> Result<Option<Coupon>> {
        Ok(self
            .working
            .coupons
            .values()
            .find(|c| c.code == code)
            .cloned())
    }

    async fn increment_coupon_usage(&mut self, id: CouponId) -> Result<()> {
        let coupon = self
            .working
            .coupons
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Coupon", id))?;
        coupon.used_count = coupon.used_count.saturating_add(1);
        Ok(())
    }

    async fn release_coupon_usage(&mut self, id: CouponId) -> Result<()> {
        if let Some(coupon) = self.working.coupons.get_mut(&id) {
            coupon.used_count = coupon.used_count.saturating_sub(1);
        }
        Ok(())
    }

    async fn settings(&mut self) -> Result<Settings> {
        Ok(self.working.settings.clone())
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order> {
        if self
            .working
            .orders
            .values()
            .any(|o| o.order_number == order.order_number)
        {
            return Err(StoreError::Conflict(format!(
                "order number '{}' already exists",
                order.order_number
            )));
        }
        let id = OrderId::new(next_id(&mut self.working.next_order_id));
        let order = Order::from_new(id, order);
        self.working.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn order_for_update(&mut self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn set_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let order = self
            .working
            .orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("Order", id))?;
        order.status = status;
        order.updated_at = at;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
