use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CategoryId, CouponId, Money, OrderId, Page, ProductId};
use domain::{
    Category, CategoryDraft, Coupon, CouponDraft, CustomerInfo, DiscountKind, NewOrder, Order,
    OrderItem, OrderStatus, Product, ProductDraft, Settings,
};
use sqlx::mysql::{MySqlArguments, MySqlConnection, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::types::Json;
use sqlx::{MySql, MySqlPool, Row, Transaction};

use crate::query::like_pattern;
use crate::{
    OrderQuery, ProductQuery, Result, StoreError,
    store::{OrderStats, Store, StoreTx},
};

const CATEGORY_COLUMNS: &str =
    "id, name, slug, description, is_active, sort_order, created_at, updated_at";

const PRODUCT_COLUMNS: &str = "id, sku, name, slug, description, category_id, price, sale_price, \
     stock_quantity, sales_count, is_active, is_featured, image_url, created_at, updated_at";

const COUPON_COLUMNS: &str = "id, code, description, discount_type, discount_value, \
     min_order_amount, max_discount, usage_limit, used_count, valid_from, expires_at, is_active, \
     category_ids, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, order_number, customer_name, customer_phone, customer_email, \
     address, city, state, pincode, subtotal, discount, coupon_code, coupon_id, tax, shipping, \
     total, status, notes, created_at, updated_at";

/// A dynamically bound query parameter.
#[derive(Debug, Clone)]
enum Arg {
    Int(i64),
    Text(String),
    Bool(bool),
}

fn bind_all<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    args: &'q [Arg],
) -> Query<'q, MySql, MySqlArguments> {
    for arg in args {
        query = match arg {
            Arg::Int(v) => query.bind(*v),
            Arg::Text(v) => query.bind(v.as_str()),
            Arg::Bool(v) => query.bind(*v),
        };
    }
    query
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Maps constraint violations to `Conflict`, everything else to `Database`.
fn map_write_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && (db_err.is_unique_violation() || db_err.is_foreign_key_violation())
    {
        tracing::debug!(error = %db_err, "constraint violation");
        return StoreError::Conflict(db_err.message().to_string());
    }
    StoreError::Database(e)
}

fn row_to_category(row: &MySqlRow) -> Result<Category> {
    Ok(Category {
        id: CategoryId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        is_active: row.try_get("is_active")?,
        sort_order: row.try_get("sort_order")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_product(row: &MySqlRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        sku: row.try_get("sku")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        category_id: row
            .try_get::<Option<i64>, _>("category_id")?
            .map(CategoryId::new),
        price: Money::from_paise(row.try_get("price")?),
        sale_price: row
            .try_get::<Option<i64>, _>("sale_price")?
            .map(Money::from_paise),
        stock_quantity: row.try_get("stock_quantity")?,
        sales_count: row.try_get("sales_count")?,
        is_active: row.try_get("is_active")?,
        is_featured: row.try_get("is_featured")?,
        image_url: row.try_get("image_url")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn discount_columns(kind: DiscountKind) -> (&'static str, i64) {
    match kind {
        DiscountKind::Percentage(bp) => ("percentage", i64::from(bp)),
        DiscountKind::Fixed(amount) => ("fixed", amount.paise()),
    }
}

fn row_to_coupon(row: &MySqlRow) -> Result<Coupon> {
    let kind: String = row.try_get("discount_type")?;
    let value: i64 = row.try_get("discount_value")?;
    let corrupt = |reason: String| StoreError::Corrupt {
        table: "coupons",
        reason,
    };
    let discount = match kind.as_str() {
        "percentage" => DiscountKind::Percentage(
            u32::try_from(value).map_err(|_| corrupt(format!("percentage {value}")))?,
        ),
        "fixed" => DiscountKind::Fixed(Money::from_paise(value)),
        other => return Err(corrupt(format!("discount type {other:?}"))),
    };
    let Json(category_ids): Json<Vec<CategoryId>> = row.try_get("category_ids")?;

    Ok(Coupon {
        id: CouponId::new(row.try_get("id")?),
        code: row.try_get("code")?,
        description: row.try_get("description")?,
        discount,
        min_order_amount: Money::from_paise(row.try_get("min_order_amount")?),
        max_discount: row
            .try_get::<Option<i64>, _>("max_discount")?
            .map(Money::from_paise),
        usage_limit: row.try_get("usage_limit")?,
        used_count: row.try_get("used_count")?,
        valid_from: row.try_get("valid_from")?,
        expires_at: row.try_get("expires_at")?,
        is_active: row.try_get("is_active")?,
        category_ids,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order(row: &MySqlRow, items: Vec<OrderItem>) -> Result<Order> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<OrderStatus>()
        .map_err(|reason| StoreError::Corrupt {
            table: "orders",
            reason,
        })?;

    Ok(Order {
        id: OrderId::new(row.try_get("id")?),
        order_number: row.try_get("order_number")?,
        customer: CustomerInfo {
            name: row.try_get("customer_name")?,
            phone: row.try_get("customer_phone")?,
            email: row.try_get("customer_email")?,
            address: row.try_get("address")?,
            city: row.try_get("city")?,
            state: row.try_get("state")?,
            pincode: row.try_get("pincode")?,
        },
        items,
        subtotal: Money::from_paise(row.try_get("subtotal")?),
        discount: Money::from_paise(row.try_get("discount")?),
        coupon_code: row.try_get("coupon_code")?,
        coupon_id: row
            .try_get::<Option<i64>, _>("coupon_id")?
            .map(CouponId::new),
        tax: Money::from_paise(row.try_get("tax")?),
        shipping: Money::from_paise(row.try_get("shipping")?),
        total: Money::from_paise(row.try_get("total")?),
        status,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_item(row: &MySqlRow) -> Result<OrderItem> {
    Ok(OrderItem {
        product_id: ProductId::new(row.try_get("product_id")?),
        sku: row.try_get("sku")?,
        product_name: row.try_get("product_name")?,
        unit_price: Money::from_paise(row.try_get("unit_price")?),
        quantity: row.try_get("quantity")?,
        line_total: Money::from_paise(row.try_get("line_total")?),
    })
}

/// Loads the items of the given orders, grouped by order id.
async fn fetch_items(
    conn: &mut MySqlConnection,
    order_ids: &[i64],
) -> Result<Vec<(i64, OrderItem)>> {
    if order_ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT order_id, product_id, sku, product_name, unit_price, quantity, line_total \
         FROM order_items WHERE order_id IN ({}) ORDER BY id ASC",
        placeholders(order_ids.len())
    );
    let mut query = sqlx::query(&sql);
    for id in order_ids {
        query = query.bind(*id);
    }
    let rows = query.fetch_all(&mut *conn).await?;
    rows.iter()
        .map(|row| Ok((row.try_get("order_id")?, row_to_item(row)?)))
        .collect()
}

/// Attaches items to order rows, keeping the row order.
async fn hydrate_orders(conn: &mut MySqlConnection, rows: Vec<MySqlRow>) -> Result<Vec<Order>> {
    let ids: Vec<i64> = rows
        .iter()
        .map(|row| row.try_get("id"))
        .collect::<std::result::Result<_, _>>()?;
    let mut items = fetch_items(conn, &ids).await?;

    let mut orders = Vec::with_capacity(rows.len());
    for (row, id) in rows.iter().zip(ids) {
        let (mine, rest): (Vec<_>, Vec<_>) = items.into_iter().partition(|(oid, _)| *oid == id);
        items = rest;
        orders.push(row_to_order(row, mine.into_iter().map(|(_, i)| i).collect())?);
    }
    Ok(orders)
}

async fn fetch_order(
    conn: &mut MySqlConnection,
    filter: &str,
    arg: Arg,
    for_update: bool,
) -> Result<Option<Order>> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE {filter}{}",
        if for_update { " FOR UPDATE" } else { "" }
    );
    let args = [arg];
    let row = bind_all(sqlx::query(&sql), &args)
        .fetch_optional(&mut *conn)
        .await?;
    match row {
        Some(row) => Ok(hydrate_orders(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

async fn fetch_settings(conn: &mut MySqlConnection) -> Result<Settings> {
    let rows = sqlx::query("SELECT setting_key, setting_value FROM settings")
        .fetch_all(&mut *conn)
        .await?;
    let entries = rows
        .iter()
        .map(|row| {
            Ok((
                row.try_get::<String, _>("setting_key")?,
                row.try_get::<String, _>("setting_value")?,
            ))
        })
        .collect::<Result<Vec<_>>>()?;
    Settings::from_entries(entries).map_err(|e| StoreError::Corrupt {
        table: "settings",
        reason: e.to_string(),
    })
}

/// MySQL-backed store implementation.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Creates a new store over an existing pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Connects a new pool to `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        tracing::debug!(max_connections, "MySQL pool connected");
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }

    fn product_filter(query: &ProductQuery) -> (String, Vec<Arg>) {
        let mut clauses = Vec::new();
        let mut args = Vec::new();

        if query.active_only {
            clauses.push("is_active = ?");
            args.push(Arg::Bool(true));
        }
        if query.featured_only {
            clauses.push("is_featured = ?");
            args.push(Arg::Bool(true));
        }
        if let Some(category) = query.category_id {
            clauses.push("category_id = ?");
            args.push(Arg::Int(category.get()));
        }
        if let Some(ref text) = query.search {
            clauses.push("(name LIKE ? OR sku LIKE ?)");
            let pattern = like_pattern(text);
            args.push(Arg::Text(pattern.clone()));
            args.push(Arg::Text(pattern));
        }

        (where_sql(&clauses), args)
    }

    fn order_filter(query: &OrderQuery) -> (String, Vec<Arg>) {
        let mut clauses = Vec::new();
        let mut args = Vec::new();

        if let Some(status) = query.status {
            clauses.push("status = ?");
            args.push(Arg::Text(status.as_str().to_string()));
        }
        if let Some(ref text) = query.search {
            clauses.push("(order_number LIKE ? OR customer_phone LIKE ?)");
            let pattern = like_pattern(text);
            args.push(Arg::Text(pattern.clone()));
            args.push(Arg::Text(pattern));
        }

        (where_sql(&clauses), args)
    }

    async fn count(&self, sql: &str, args: &[Arg]) -> Result<u64> {
        let row = bind_all(sqlx::query(sql), args)
            .fetch_one(&self.pool)
            .await?;
        let total: i64 = row.try_get("total")?;
        Ok(total.max(0) as u64)
    }
}

fn where_sql(clauses: &[&str]) -> String {
    if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    }
}

#[async_trait]
impl Store for MySqlStore {
    async fn create_category(&self, draft: CategoryDraft) -> Result<Category> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO categories (name, slug, description, is_active, sort_order, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&draft.name)
        .bind(draft.slug())
        .bind(&draft.description)
        .bind(draft.is_active)
        .bind(draft.sort_order)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        let id = CategoryId::new(result.last_insert_id() as i64);
        self.get_category(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Category", id))
    }

    async fn update_category(&self, id: CategoryId, draft: CategoryDraft) -> Result<Category> {
        let result = sqlx::query(
            r#"
            UPDATE categories
            SET name = ?, slug = ?, description = ?, is_active = ?, sort_order = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&draft.name)
        .bind(draft.slug())
        .bind(&draft.description)
        .bind(draft.is_active)
        .bind(draft.sort_order)
        .bind(Utc::now())
        .bind(id.get())
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Category", id));
        }
        self.get_category(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Category", id))
    }

    async fn delete_category(&self, id: CategoryId) -> Result<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Category", id));
        }
        Ok(())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_category).transpose()
    }

    async fn list_categories(&self, active_only: bool) -> Result<Vec<Category>> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories{} ORDER BY sort_order ASC, name ASC",
            if active_only { " WHERE is_active = TRUE" } else { "" }
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_category).collect()
    }

    async fn count_products_in_category(&self, id: CategoryId) -> Result<u64> {
        self.count(
            "SELECT COUNT(*) AS total FROM products WHERE category_id = ?",
            &[Arg::Int(id.get())],
        )
        .await
    }

    async fn create_product(&self, draft: ProductDraft) -> Result<Product> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO products (sku, name, slug, description, category_id, price, sale_price,
                stock_quantity, sales_count, is_active, is_featured, image_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&draft.sku)
        .bind(&draft.name)
        .bind(draft.slug())
        .bind(&draft.description)
        .bind(draft.category_id.map(|c| c.get()))
        .bind(draft.price.paise())
        .bind(draft.sale_price.map(|m| m.paise()))
        .bind(draft.stock_quantity)
        .bind(draft.is_active)
        .bind(draft.is_featured)
        .bind(&draft.image_url)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        let id = ProductId::new(result.last_insert_id() as i64);
        self.get_product(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Product", id))
    }

    async fn update_product(&self, id: ProductId, draft: ProductDraft) -> Result<Product> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET sku = ?, name = ?, slug = ?, description = ?, category_id = ?, price = ?,
                sale_price = ?, stock_quantity = ?, is_active = ?, is_featured = ?, image_url = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&draft.sku)
        .bind(&draft.name)
        .bind(draft.slug())
        .bind(&draft.description)
        .bind(draft.category_id.map(|c| c.get()))
        .bind(draft.price.paise())
        .bind(draft.sale_price.map(|m| m.paise()))
        .bind(draft.stock_quantity)
        .bind(draft.is_active)
        .bind(draft.is_featured)
        .bind(&draft.image_url)
        .bind(Utc::now())
        .bind(id.get())
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Product", id));
        }
        self.get_product(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Product", id))
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Product", id));
        }
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_product).transpose()
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = ?");
        let row = sqlx::query(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_product).transpose()
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id.get());
        }
        let rows = query.fetch_all(&self.pool).await?;
        let mut products = rows
            .iter()
            .map(row_to_product)
            .collect::<Result<Vec<_>>>()?;
        products.sort_by_key(|p| ids.iter().position(|id| *id == p.id));
        Ok(products)
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>> {
        let (filter, args) = Self::product_filter(query);
        let total = self
            .count(&format!("SELECT COUNT(*) AS total FROM products{filter}"), &args)
            .await?;

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products{filter} ORDER BY name ASC, id ASC LIMIT ? OFFSET ?"
        );
        let mut page_args = args;
        page_args.push(Arg::Int(query.page.limit() as i64));
        page_args.push(Arg::Int(query.page.offset() as i64));
        let rows = bind_all(sqlx::query(&sql), &page_args)
            .fetch_all(&self.pool)
            .await?;
        let products = rows
            .iter()
            .map(row_to_product)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page::new(products, query.page, total))
    }

    async fn low_stock_products(&self, threshold: u32) -> Result<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = TRUE AND stock_quantity <= ? \
             ORDER BY stock_quantity ASC, name ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(threshold)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_product).collect()
    }

    async fn create_coupon(&self, draft: CouponDraft) -> Result<Coupon> {
        let now = Utc::now();
        let (discount_type, discount_value) = discount_columns(draft.discount);
        let result = sqlx::query(
            r#"
            INSERT INTO coupons (code, description, discount_type, discount_value, min_order_amount,
                max_discount, usage_limit, used_count, valid_from, expires_at, is_active,
                category_ids, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&draft.code)
        .bind(&draft.description)
        .bind(discount_type)
        .bind(discount_value)
        .bind(draft.min_order_amount.paise())
        .bind(draft.max_discount.map(|m| m.paise()))
        .bind(draft.usage_limit)
        .bind(draft.valid_from)
        .bind(draft.expires_at)
        .bind(draft.is_active)
        .bind(Json(&draft.category_ids))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        let id = CouponId::new(result.last_insert_id() as i64);
        self.get_coupon(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Coupon", id))
    }

    async fn update_coupon(&self, id: CouponId, draft: CouponDraft) -> Result<Coupon> {
        let (discount_type, discount_value) = discount_columns(draft.discount);
        let result = sqlx::query(
            r#"
            UPDATE coupons
            SET code = ?, description = ?, discount_type = ?, discount_value = ?,
                min_order_amount = ?, max_discount = ?, usage_limit = ?, valid_from = ?,
                expires_at = ?, is_active = ?, category_ids = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&draft.code)
        .bind(&draft.description)
        .bind(discount_type)
        .bind(discount_value)
        .bind(draft.min_order_amount.paise())
        .bind(draft.max_discount.map(|m| m.paise()))
        .bind(draft.usage_limit)
        .bind(draft.valid_from)
        .bind(draft.expires_at)
        .bind(draft.is_active)
        .bind(Json(&draft.category_ids))
        .bind(Utc::now())
        .bind(id.get())
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Coupon", id));
        }
        self.get_coupon(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Coupon", id))
    }

    async fn delete_coupon(&self, id: CouponId) -> Result<()> {
        let result = sqlx::query("DELETE FROM coupons WHERE id = ?")
            .bind(id.get())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Coupon", id));
        }
        Ok(())
    }

    async fn get_coupon(&self, id: CouponId) -> Result<Option<Coupon>> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_coupon).transpose()
    }

    async fn get_coupon_by_code(&self, code: &str) -> Result<Option<Coupon>> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE code = ?");
        let row = sqlx::query(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_coupon).transpose()
    }

    async fn list_coupons(&self) -> Result<Vec<Coupon>> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons ORDER BY code ASC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_coupon).collect()
    }

    async fn load_settings(&self) -> Result<Settings> {
        let mut conn = self.pool.acquire().await?;
        fetch_settings(&mut conn).await
    }

    async fn save_settings(&self, settings: &Settings) -> Result<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        for (key, value) in settings.to_entries() {
            sqlx::query(
                r#"
                INSERT INTO settings (setting_key, setting_value, updated_at)
                VALUES (?, ?, ?)
                ON DUPLICATE KEY UPDATE setting_value = VALUES(setting_value),
                    updated_at = VALUES(updated_at)
                "#,
            )
            .bind(key)
            .bind(value)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        fetch_order(&mut conn, "id = ?", Arg::Int(id.get()), false).await
    }

    async fn get_order_by_number(&self, order_number: &str) -> Result<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        fetch_order(
            &mut conn,
            "order_number = ?",
            Arg::Text(order_number.to_string()),
            false,
        )
        .await
    }

    async fn list_orders(&self, query: &OrderQuery) -> Result<Page<Order>> {
        let (filter, args) = Self::order_filter(query);
        let total = self
            .count(&format!("SELECT COUNT(*) AS total FROM orders{filter}"), &args)
            .await?;

        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders{filter} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let mut page_args = args;
        page_args.push(Arg::Int(query.page.limit() as i64));
        page_args.push(Arg::Int(query.page.offset() as i64));

        let mut conn = self.pool.acquire().await?;
        let rows = bind_all(sqlx::query(&sql), &page_args)
            .fetch_all(&mut *conn)
            .await?;
        let orders = hydrate_orders(&mut conn, rows).await?;

        Ok(Page::new(orders, query.page, total))
    }

    async fn order_stats(&self) -> Result<OrderStats> {
        let rows = sqlx::query(
            r#"
            SELECT status, COUNT(*) AS orders, CAST(COALESCE(SUM(total), 0) AS SIGNED) AS amount
            FROM orders
            GROUP BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = Vec::with_capacity(rows.len());
        for row in &rows {
            let status: String = row.try_get("status")?;
            let status = status
                .parse::<OrderStatus>()
                .map_err(|reason| StoreError::Corrupt {
                    table: "orders",
                    reason,
                })?;
            let orders: i64 = row.try_get("orders")?;
            let amount: i64 = row.try_get("amount")?;
            counts.push((status, orders.max(0) as u64, Money::from_paise(amount)));
        }

        let mut stats = OrderStats::default();
        for status in OrderStatus::ALL {
            if let Some((_, orders, amount)) = counts.iter().find(|(s, _, _)| *s == status) {
                stats.total_orders += orders;
                stats.by_status.push((status, *orders));
                if status.counts_as_revenue() {
                    stats.revenue += *amount;
                }
            }
        }
        Ok(stats)
    }

    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(MySqlTx { tx }))
    }
}

/// Transaction over a [`MySqlStore`]. Rolled back by sqlx when dropped.
struct MySqlTx {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl StoreTx for MySqlTx {
    async fn product_for_update(&mut self, id: ProductId) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ? FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(id.get())
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_product).transpose()
    }

    async fn take_stock(&mut self, id: ProductId, quantity: u32) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity - ?, sales_count = sales_count + ?, updated_at = ?
            WHERE id = ? AND stock_quantity >= ?
            "#,
        )
        .bind(quantity)
        .bind(quantity)
        .bind(Utc::now())
        .bind(id.get())
        .bind(quantity)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query("SELECT id FROM products WHERE id = ?")
                .bind(id.get())
                .fetch_optional(&mut *self.tx)
                .await?
                .is_some();
            return Err(if exists {
                StoreError::StockUnderflow(id)
            } else {
                StoreError::not_found("Product", id)
            });
        }
        Ok(())
    }

    async fn restock(&mut self, id: ProductId, quantity: u32) -> Result<()> {
        // The product may have been deleted since the order was placed.
        sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + ?,
                sales_count = IF(sales_count >= ?, sales_count - ?, 0),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(quantity)
        .bind(quantity)
        .bind(quantity)
        .bind(Utc::now())
        .bind(id.get())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn coupon_for_update(&mut self, code: &str) -> Result<Option<Coupon>> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE code = ? FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(code)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.as_ref().map(row_to_coupon).transpose()
    }

    async fn increment_coupon_usage(&mut self, id: CouponId) -> Result<()> {
        let result = sqlx::query("UPDATE coupons SET used_count = used_count + 1 WHERE id = ?")
            .bind(id.get())
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Coupon", id));
        }
        Ok(())
    }

    async fn release_coupon_usage(&mut self, id: CouponId) -> Result<()> {
        sqlx::query(
            "UPDATE coupons SET used_count = used_count - 1 WHERE id = ? AND used_count > 0",
        )
        .bind(id.get())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn settings(&mut self) -> Result<Settings> {
        fetch_settings(&mut self.tx).await
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order> {
        let result = sqlx::query(
            r#"
            INSERT INTO orders (order_number, customer_name, customer_phone, customer_email,
                address, city, state, pincode, subtotal, discount, coupon_code, coupon_id, tax,
                shipping, total, status, notes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&order.order_number)
        .bind(&order.customer.name)
        .bind(&order.customer.phone)
        .bind(&order.customer.email)
        .bind(&order.customer.address)
        .bind(&order.customer.city)
        .bind(&order.customer.state)
        .bind(&order.customer.pincode)
        .bind(order.subtotal.paise())
        .bind(order.discount.paise())
        .bind(&order.coupon_code)
        .bind(order.coupon_id.map(|id| id.get()))
        .bind(order.tax.paise())
        .bind(order.shipping.paise())
        .bind(order.total.paise())
        .bind(OrderStatus::Pending.as_str())
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;

        let order_id = result.last_insert_id() as i64;

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, sku, product_name, unit_price,
                    quantity, line_total)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(order_id)
            .bind(item.product_id.get())
            .bind(&item.sku)
            .bind(&item.product_name)
            .bind(item.unit_price.paise())
            .bind(item.quantity)
            .bind(item.line_total.paise())
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(Order::from_new(OrderId::new(order_id), order))
    }

    async fn order_for_update(&mut self, id: OrderId) -> Result<Option<Order>> {
        fetch_order(&mut self.tx, "id = ?", Arg::Int(id.get()), true).await
    }

    async fn set_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(at)
            .bind(id.get())
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Order", id));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
