//! Admin endpoints, mounted under `/api/admin` behind [`crate::auth::require_admin`].

pub mod catalog;
pub mod coupons;
pub mod orders;
pub mod settings;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post, put};
use store::Store;

use crate::AppState;
use crate::auth::{AdminToken, require_admin};

/// Builds the admin router. Every route requires the admin token.
pub fn router<S: Store + Clone + 'static>(token: AdminToken) -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/categories", post(catalog::create_category::<S>))
        .route(
            "/categories/{id}",
            put(catalog::update_category::<S>)
                .delete(catalog::delete_category::<S>),
        )
        .route(
            "/products",
            get(catalog::list_products::<S>).post(catalog::create_product::<S>),
        )
        .route("/products/low-stock", get(catalog::low_stock::<S>))
        .route(
            "/products/{id}",
            get(catalog::get_product::<S>)
                .put(catalog::update_product::<S>)
                .delete(catalog::delete_product::<S>),
        )
        .route(
            "/coupons",
            get(coupons::list::<S>).post(coupons::create::<S>),
        )
        .route(
            "/coupons/{id}",
            get(coupons::get::<S>)
                .put(coupons::update::<S>)
                .delete(coupons::delete::<S>),
        )
        .route("/orders", get(orders::list::<S>))
        .route("/orders/{id}", get(orders::get::<S>))
        .route("/orders/{id}/status", put(orders::update_status::<S>))
        .route("/dashboard", get(orders::dashboard::<S>))
        .route(
            "/settings",
            get(settings::get::<S>).put(settings::update::<S>),
        )
        .route_layer(middleware::from_fn_with_state(token, require_admin))
}
