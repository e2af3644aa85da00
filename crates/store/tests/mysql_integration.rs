//! MySQL integration tests
//!
//! These tests use a shared MySQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test mysql_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::{Money, PageRequest};
use domain::{
    CategoryDraft, CouponDraft, CustomerInfo, DiscountKind, NewOrder, OrderItem, OrderStatus,
    ProductDraft, Settings,
};
use store::{MySqlStore, OrderQuery, ProductQuery, Store, StoreError};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::mysql::Mysql;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Mysql>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Mysql::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(3306).await.unwrap();

            let connection_string = format!("mysql://root@{}:{}/test", host, port);

            let store = MySqlStore::connect(&connection_string, 1).await.unwrap();
            store.run_migrations().await.unwrap();
            store.pool().close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> MySqlStore {
    let info = get_container_info().await;
    let store = MySqlStore::connect(&info.connection_string, 5)
        .await
        .unwrap();

    for table in [
        "order_items",
        "orders",
        "coupons",
        "products",
        "categories",
        "settings",
    ] {
        sqlx::query(&format!("DELETE FROM {table}"))
            .execute(store.pool())
            .await
            .unwrap();
    }

    store
}

fn customer() -> CustomerInfo {
    CustomerInfo {
        name: "Asha Verma".to_string(),
        phone: "9876543210".to_string(),
        email: None,
        address: "12 Market Road".to_string(),
        city: "Sivakasi".to_string(),
        state: "Tamil Nadu".to_string(),
        pincode: "626123".to_string(),
    }
}

fn new_order(number: &str, product: &domain::Product, quantity: u32) -> NewOrder {
    let line_total = product.price.multiply(quantity);
    NewOrder {
        order_number: number.to_string(),
        customer: customer(),
        items: vec![OrderItem {
            product_id: product.id,
            sku: product.sku.clone(),
            product_name: product.name.clone(),
            unit_price: product.price,
            quantity,
            line_total,
        }],
        subtotal: line_total,
        discount: Money::zero(),
        coupon_code: None,
        coupon_id: None,
        tax: Money::zero(),
        shipping: Money::zero(),
        total: line_total,
        notes: None,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn create_and_fetch_product() {
    let store = get_test_store().await;

    let category = store
        .create_category(CategoryDraft::new("Sparklers").validate().unwrap())
        .await
        .unwrap();
    let product = store
        .create_product(
            ProductDraft::new("sp-10", "Gold Sparkler", Money::from_rupees(120))
                .with_category(category.id)
                .with_stock(40)
                .validate()
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(product.sku, "SP-10");
    assert_eq!(product.slug, "gold-sparkler");
    assert_eq!(product.category_id, Some(category.id));
    assert_eq!(product.sales_count, 0);

    let by_slug = store.get_product_by_slug("gold-sparkler").await.unwrap();
    assert_eq!(by_slug.map(|p| p.id), Some(product.id));
}

#[tokio::test]
async fn duplicate_sku_is_a_conflict() {
    let store = get_test_store().await;
    let draft = ProductDraft::new("FLOWER-POT", "Flower Pot", Money::from_rupees(80))
        .validate()
        .unwrap();
    store.create_product(draft.clone()).await.unwrap();

    let mut second = draft;
    second.slug = Some("flower-pot-2".to_string());
    let err = store.create_product(second).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
async fn category_with_products_cannot_be_deleted() {
    let store = get_test_store().await;
    let category = store
        .create_category(CategoryDraft::new("Rockets").validate().unwrap())
        .await
        .unwrap();
    store
        .create_product(
            ProductDraft::new("RK-1", "Sky Rocket", Money::from_rupees(150))
                .with_category(category.id)
                .validate()
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(store.count_products_in_category(category.id).await.unwrap(), 1);
    let err = store.delete_category(category.id).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
async fn list_products_filters_and_pages() {
    let store = get_test_store().await;
    for (sku, name) in [("A-1", "Atom Bomb"), ("B-1", "Bijili"), ("C-1", "Chakkar")] {
        store
            .create_product(
                ProductDraft::new(sku, name, Money::from_rupees(50))
                    .with_stock(5)
                    .validate()
                    .unwrap(),
            )
            .await
            .unwrap();
    }

    let page = store
        .list_products(&ProductQuery::storefront().page(PageRequest::new(Some(1), Some(2))))
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].name, "Atom Bomb");

    let search = store
        .list_products(&ProductQuery::storefront().search("bij"))
        .await
        .unwrap();
    assert_eq!(search.total, 1);
    assert_eq!(search.items[0].sku, "B-1");
}

#[tokio::test]
async fn coupon_round_trips_discount_and_categories() {
    let store = get_test_store().await;
    let category = store
        .create_category(CategoryDraft::new("Gift Boxes").validate().unwrap())
        .await
        .unwrap();

    let mut draft = CouponDraft::new("diwali10", DiscountKind::Percentage(1_000));
    draft.max_discount = Some(Money::from_rupees(200));
    draft.usage_limit = Some(100);
    draft.category_ids = vec![category.id];
    let coupon = store.create_coupon(draft.validate().unwrap()).await.unwrap();

    let fetched = store.get_coupon_by_code("DIWALI10").await.unwrap().unwrap();
    assert_eq!(fetched.id, coupon.id);
    assert_eq!(fetched.discount, DiscountKind::Percentage(1_000));
    assert_eq!(fetched.max_discount, Some(Money::from_rupees(200)));
    assert_eq!(fetched.usage_limit, Some(100));
    assert_eq!(fetched.category_ids, vec![category.id]);
}

#[tokio::test]
async fn settings_round_trip() {
    let store = get_test_store().await;
    assert_eq!(store.load_settings().await.unwrap(), Settings::default());

    let settings = Settings {
        store_name: "Sivakasi Crackers".to_string(),
        tax_rate_bp: 1_800,
        shipping_fee: Money::from_rupees(99),
        free_shipping_threshold: Some(Money::from_rupees(2_000)),
        ..Settings::default()
    };
    store.save_settings(&settings).await.unwrap();
    store.save_settings(&settings).await.unwrap();

    assert_eq!(store.load_settings().await.unwrap(), settings);
}

#[tokio::test]
async fn committed_order_is_visible_with_items() {
    let store = get_test_store().await;
    let product = store
        .create_product(
            ProductDraft::new("SP-1", "Sparkler", Money::from_rupees(20))
                .with_stock(10)
                .validate()
                .unwrap(),
        )
        .await
        .unwrap();

    let mut tx = store.begin().await.unwrap();
    let locked = tx.product_for_update(product.id).await.unwrap().unwrap();
    tx.take_stock(locked.id, 3).await.unwrap();
    let order = tx
        .insert_order(new_order("ORD-20261018-AAAA0001", &locked, 3))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let product = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(product.stock_quantity, 7);
    assert_eq!(product.sales_count, 3);

    let fetched = store
        .get_order_by_number("ORD-20261018-AAAA0001")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.id, order.id);
    assert_eq!(fetched.status, OrderStatus::Pending);
    assert_eq!(fetched.items.len(), 1);
    assert_eq!(fetched.items[0].quantity, 3);
    assert_eq!(fetched.total, Money::from_rupees(60));
}

#[tokio::test]
async fn dropped_transaction_rolls_back() {
    let store = get_test_store().await;
    let product = store
        .create_product(
            ProductDraft::new("SP-2", "Sparkler", Money::from_rupees(20))
                .with_stock(10)
                .validate()
                .unwrap(),
        )
        .await
        .unwrap();

    {
        let mut tx = store.begin().await.unwrap();
        tx.take_stock(product.id, 4).await.unwrap();
        tx.insert_order(new_order("ORD-20261018-AAAA0002", &product, 4))
            .await
            .unwrap();
    }

    let product = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(product.stock_quantity, 10);
    assert!(
        store
            .get_order_by_number("ORD-20261018-AAAA0002")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn take_stock_never_goes_negative() {
    let store = get_test_store().await;
    let product = store
        .create_product(
            ProductDraft::new("SP-3", "Sparkler", Money::from_rupees(20))
                .with_stock(2)
                .validate()
                .unwrap(),
        )
        .await
        .unwrap();

    let mut tx = store.begin().await.unwrap();
    let err = tx.take_stock(product.id, 3).await.unwrap_err();
    assert!(matches!(err, StoreError::StockUnderflow(id) if id == product.id));
}

#[tokio::test]
async fn status_update_and_stats() {
    let store = get_test_store().await;
    let product = store
        .create_product(
            ProductDraft::new("SP-4", "Sparkler", Money::from_rupees(10))
                .with_stock(50)
                .validate()
                .unwrap(),
        )
        .await
        .unwrap();

    let mut tx = store.begin().await.unwrap();
    let kept = tx
        .insert_order(new_order("ORD-20261018-AAAA0003", &product, 2))
        .await
        .unwrap();
    let cancelled = tx
        .insert_order(new_order("ORD-20261018-AAAA0004", &product, 5))
        .await
        .unwrap();
    tx.set_order_status(cancelled.id, OrderStatus::Cancelled, Utc::now())
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let stats = store.order_stats().await.unwrap();
    assert_eq!(stats.total_orders, 2);
    assert_eq!(stats.revenue, kept.total);
    assert!(stats.by_status.contains(&(OrderStatus::Cancelled, 1)));

    let pending = store
        .list_orders(&OrderQuery::new().status(OrderStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.total, 1);
    assert_eq!(pending.items[0].order_number, "ORD-20261018-AAAA0003");
}

#[tokio::test]
async fn cancelling_restores_stock_sales_and_coupon_use() {
    let store = get_test_store().await;
    let product = store
        .create_product(
            ProductDraft::new("SP-5", "Sparkler", Money::from_rupees(50))
                .with_stock(10)
                .validate()
                .unwrap(),
        )
        .await
        .unwrap();
    let coupon = store
        .create_coupon(
            CouponDraft::new("launch", DiscountKind::Fixed(Money::from_rupees(10)))
                .validate()
                .unwrap(),
        )
        .await
        .unwrap();

    // Place: take stock and count the coupon in one transaction.
    let mut tx = store.begin().await.unwrap();
    let locked = tx.product_for_update(product.id).await.unwrap().unwrap();
    tx.take_stock(locked.id, 3).await.unwrap();
    let locked_coupon = tx.coupon_for_update("LAUNCH").await.unwrap().unwrap();
    assert_eq!(locked_coupon.id, coupon.id);
    tx.increment_coupon_usage(locked_coupon.id).await.unwrap();
    let mut placed = new_order("ORD-20261018-AAAA0005", &locked, 3);
    placed.coupon_code = Some(locked_coupon.code.clone());
    placed.coupon_id = Some(locked_coupon.id);
    let order = tx.insert_order(placed).await.unwrap();
    tx.commit().await.unwrap();

    let after_place = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(after_place.stock_quantity, 7);
    assert_eq!(after_place.sales_count, 3);
    assert_eq!(store.get_coupon(coupon.id).await.unwrap().unwrap().used_count, 1);

    // Cancel: give everything back in one transaction.
    let mut tx = store.begin().await.unwrap();
    let locked_order = tx.order_for_update(order.id).await.unwrap().unwrap();
    assert_eq!(locked_order.items.len(), 1);
    assert_eq!(locked_order.coupon_id, Some(coupon.id));
    for item in &locked_order.items {
        tx.restock(item.product_id, item.quantity).await.unwrap();
    }
    tx.release_coupon_usage(coupon.id).await.unwrap();
    tx.set_order_status(order.id, OrderStatus::Cancelled, Utc::now())
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let after_cancel = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(after_cancel.stock_quantity, 10);
    assert_eq!(after_cancel.sales_count, 0);
    assert_eq!(store.get_coupon(coupon.id).await.unwrap().unwrap().used_count, 0);
    let cancelled = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.coupon_id, Some(coupon.id));

    // Counters floor at zero.
    let mut tx = store.begin().await.unwrap();
    tx.restock(product.id, 2).await.unwrap();
    tx.release_coupon_usage(coupon.id).await.unwrap();
    tx.commit().await.unwrap();

    let floored = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(floored.stock_quantity, 12);
    assert_eq!(floored.sales_count, 0);
    assert_eq!(store.get_coupon(coupon.id).await.unwrap().unwrap().used_count, 0);
}

#[tokio::test]
async fn deleting_a_coupon_detaches_it_from_orders() {
    let store = get_test_store().await;
    let product = store
        .create_product(
            ProductDraft::new("SP-6", "Sparkler", Money::from_rupees(50))
                .with_stock(10)
                .validate()
                .unwrap(),
        )
        .await
        .unwrap();
    let coupon = store
        .create_coupon(
            CouponDraft::new("GONE", DiscountKind::Percentage(500))
                .validate()
                .unwrap(),
        )
        .await
        .unwrap();

    let mut tx = store.begin().await.unwrap();
    let mut placed = new_order("ORD-20261018-AAAA0006", &product, 1);
    placed.coupon_code = Some(coupon.code.clone());
    placed.coupon_id = Some(coupon.id);
    let order = tx.insert_order(placed).await.unwrap();
    tx.commit().await.unwrap();

    store.delete_coupon(coupon.id).await.unwrap();

    let fetched = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(fetched.coupon_id, None);
    assert_eq!(fetched.coupon_code.as_deref(), Some("GONE"));
}
