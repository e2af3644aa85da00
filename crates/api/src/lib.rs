//! HTTP API server for the storefront backend.
//!
//! Serves the public catalog and checkout endpoints and the token-guarded
//! admin API, with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::http::Uri;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use services::{CatalogService, CouponService, OrderService, SettingsService};
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::AdminToken;
use error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub catalog: CatalogService<S>,
    pub coupons: CouponService<S>,
    pub settings: SettingsService<S>,
    pub orders: OrderService<S>,
}

impl<S: Store + Clone> AppState<S> {
    /// Builds every service over the same store.
    pub fn new(store: S) -> Self {
        Self {
            catalog: CatalogService::new(store.clone()),
            coupons: CouponService::new(store.clone()),
            settings: SettingsService::new(store.clone()),
            orders: OrderService::new(store),
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
    admin_token: AdminToken,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let api = Router::new()
        .route("/categories", get(routes::catalog::list_categories::<S>))
        .route("/products", get(routes::catalog::list_products::<S>))
        .route("/products/{id}", get(routes::catalog::get_product::<S>))
        .route(
            "/products/slug/{slug}",
            get(routes::catalog::get_product_by_slug::<S>),
        )
        .route("/checkout/quote", post(routes::checkout::quote::<S>))
        .route(
            "/coupons/validate",
            post(routes::checkout::validate_coupon::<S>),
        )
        .route("/orders", post(routes::checkout::place_order::<S>))
        .route(
            "/orders/{order_number}",
            get(routes::checkout::get_order::<S>),
        )
        .route("/settings/public", get(routes::settings::public::<S>))
        .nest("/admin", routes::admin::router::<S>(admin_token));

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .nest("/api", api)
        .fallback(not_found)
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}
