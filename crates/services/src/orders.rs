//! Checkout and order management.

use std::time::Instant;

use chrono::Utc;
use common::{Money, OrderId, Page, PageRequest};
use domain::{
    CartLine, CouponError, CustomerInfo, NewOrder, Order, OrderError, OrderStatus, PricedLine,
    Quote, merge_lines, normalize_code,
};
use serde::{Deserialize, Serialize};
use store::{OrderQuery, Store, StoreError};

use crate::error::{Result, ServiceError};

/// A checkout request as submitted by the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub customer: CustomerInfo,
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: u64,
}

/// Figures for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub total_orders: u64,
    /// Sum of totals over orders that were not cancelled.
    pub revenue: Money,
    /// One entry per status, zero counts included.
    pub orders_by_status: Vec<StatusCount>,
    pub low_stock_count: usize,
    pub recent_orders: Vec<Order>,
}

const RECENT_ORDERS: u32 = 5;

/// Prices cart lines against the current catalog without locking anything.
pub(crate) async fn price_cart<S: Store>(store: &S, lines: &[CartLine]) -> Result<Vec<PricedLine>> {
    let lines = merge_lines(lines)?;
    let ids: Vec<_> = lines.iter().map(|l| l.product_id).collect();
    let products = store.get_products(&ids).await?;

    lines
        .iter()
        .map(|line| {
            let product = products
                .iter()
                .find(|p| p.id == line.product_id)
                .ok_or(OrderError::ProductNotFound(line.product_id))?;
            Ok(PricedLine::for_product(product, line.quantity)?)
        })
        .collect()
}

fn failure_reason(err: &ServiceError) -> &'static str {
    match err {
        ServiceError::Validation(_) => "validation",
        ServiceError::Coupon(_) | ServiceError::Order(OrderError::Coupon(_)) => "coupon",
        ServiceError::Order(OrderError::InsufficientStock { .. }) => "stock",
        ServiceError::Order(_) => "order",
        ServiceError::NotFound { .. } => "not_found",
        ServiceError::Conflict(_) => "conflict",
        ServiceError::Store(_) => "store",
    }
}

/// Order operations over a store.
#[derive(Clone)]
pub struct OrderService<S: Store> {
    store: S,
}

impl<S: Store> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Prices a cart the way [`OrderService::place_order`] would, without
    /// touching stock or coupon usage.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn quote(&self, lines: &[CartLine], coupon_code: Option<&str>) -> Result<Quote> {
        let priced = price_cart(&self.store, lines).await?;

        let coupon = match coupon_code.map(normalize_code).filter(|c| !c.is_empty()) {
            Some(code) => Some(
                self.store
                    .get_coupon_by_code(&code)
                    .await?
                    .ok_or(CouponError::NotFound(code))?,
            ),
            None => None,
        };
        let settings = self.store.load_settings().await?;

        Ok(domain::quote(priced, coupon.as_ref(), &settings, Utc::now())?)
    }

    /// Places an order in a single store transaction.
    ///
    /// Stock, sales counters, coupon usage and the order rows are written
    /// together or not at all.
    #[tracing::instrument(skip(self, request), fields(lines = request.items.len()))]
    pub async fn place_order(&self, request: PlaceOrder) -> Result<Order> {
        let started = Instant::now();
        let result = self.run_order_transaction(request).await;
        metrics::histogram!("order_placement_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(order) => {
                metrics::counter!("orders_placed_total").increment(1);
                tracing::info!(
                    order_number = %order.order_number,
                    total = %order.total,
                    units = order.unit_count(),
                    "order placed"
                );
            }
            Err(e) => {
                let reason = failure_reason(e);
                metrics::counter!("orders_failed_total", "reason" => reason).increment(1);
                tracing::warn!(error = %e, reason, "order placement failed");
            }
        }
        result
    }

    async fn run_order_transaction(&self, request: PlaceOrder) -> Result<Order> {
        let customer = request
            .customer
            .validate()
            .map_err(OrderError::InvalidCustomer)?;
        let lines = merge_lines(&request.items)?;
        let coupon_code = request
            .coupon_code
            .as_deref()
            .map(normalize_code)
            .filter(|c| !c.is_empty());
        let now = Utc::now();

        let mut tx = self.store.begin().await?;

        // Lock rows in id order so concurrent checkouts cannot deadlock.
        let mut lock_order: Vec<usize> = (0..lines.len()).collect();
        lock_order.sort_by_key(|&i| lines[i].product_id);

        let mut priced: Vec<Option<PricedLine>> = vec![None; lines.len()];
        for i in lock_order {
            let line = lines[i];
            let product = tx
                .product_for_update(line.product_id)
                .await?
                .ok_or(OrderError::ProductNotFound(line.product_id))?;
            let priced_line = PricedLine::for_product(&product, line.quantity)?;

            tx.take_stock(product.id, line.quantity)
                .await
                .map_err(|e| match e {
                    StoreError::StockUnderflow(_) => OrderError::InsufficientStock {
                        product_id: product.id,
                        name: product.name.clone(),
                        requested: line.quantity,
                        available: product.stock_quantity,
                    }
                    .into(),
                    other => ServiceError::from(other),
                })?;
            priced[i] = Some(priced_line);
        }
        let priced: Vec<PricedLine> = priced.into_iter().flatten().collect();

        let coupon = match coupon_code {
            Some(code) => Some(
                tx.coupon_for_update(&code)
                    .await?
                    .ok_or(CouponError::NotFound(code))?,
            ),
            None => None,
        };

        let settings = tx.settings().await?;
        let quote = domain::quote(priced, coupon.as_ref(), &settings, now)?;

        if let Some(ref coupon) = coupon {
            tx.increment_coupon_usage(coupon.id).await?;
        }

        let order = tx
            .insert_order(NewOrder::from_quote(customer, &quote, request.notes, now))
            .await?;
        tx.commit().await?;

        Ok(order)
    }

    pub async fn get(&self, id: OrderId) -> Result<Order> {
        self.store
            .get_order(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", id))
    }

    pub async fn get_by_number(&self, order_number: &str) -> Result<Order> {
        self.store
            .get_order_by_number(order_number.trim())
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", order_number))
    }

    pub async fn list(&self, query: &OrderQuery) -> Result<Page<Order>> {
        Ok(self.store.list_orders(query).await?)
    }

    /// Moves an order through the status machine.
    ///
    /// Cancelling puts the stock back and gives back the coupon use, in the
    /// same transaction as the status change.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(&self, id: OrderId, next: OrderStatus) -> Result<Order> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        let mut order = tx
            .order_for_update(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", id))?;
        let previous = order.status;
        order.transition(next, now)?;

        if next == OrderStatus::Cancelled {
            for item in &order.items {
                tx.restock(item.product_id, item.quantity).await?;
            }
            if let Some(coupon_id) = order.coupon_id {
                tx.release_coupon_usage(coupon_id).await?;
            }
        }

        tx.set_order_status(id, next, now).await?;
        tx.commit().await?;

        if next == OrderStatus::Cancelled {
            metrics::counter!("orders_cancelled_total").increment(1);
        }
        tracing::info!(
            order_number = %order.order_number,
            from = %previous,
            to = %next,
            "order status changed"
        );
        Ok(order)
    }

    #[tracing::instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<Dashboard> {
        let stats = self.store.order_stats().await?;
        let threshold = self.store.load_settings().await?.low_stock_threshold;
        let low_stock_count = self.store.low_stock_products(threshold).await?.len();
        let recent_orders = self
            .store
            .list_orders(&OrderQuery::new().page(PageRequest::new(Some(1), Some(RECENT_ORDERS))))
            .await?
            .items;

        let orders_by_status = OrderStatus::ALL
            .into_iter()
            .map(|status| StatusCount {
                status,
                count: stats
                    .by_status
                    .iter()
                    .find(|(s, _)| *s == status)
                    .map_or(0, |(_, n)| *n),
            })
            .collect();

        Ok(Dashboard {
            total_orders: stats.total_orders,
            revenue: stats.revenue,
            orders_by_status,
            low_stock_count,
            recent_orders,
        })
    }
}
