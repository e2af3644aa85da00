//! Checkout endpoints: quotes, coupon checks and order placement.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use domain::{CartLine, Order, Quote};
use serde::Deserialize;
use services::{CouponCheck, PlaceOrder};
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{Json, Path};

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CouponCheckRequest {
    pub code: String,
    pub items: Vec<CartLine>,
}

/// POST /api/checkout/quote: prices a cart without placing it.
#[tracing::instrument(skip(state, req))]
pub async fn quote<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<QuoteRequest>,
) -> Result<Json<Quote>, ApiError> {
    let quote = state
        .orders
        .quote(&req.items, req.coupon_code.as_deref())
        .await?;
    Ok(Json(quote))
}

/// POST /api/coupons/validate
#[tracing::instrument(skip(state, req), fields(code = %req.code))]
pub async fn validate_coupon<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CouponCheckRequest>,
) -> Result<Json<CouponCheck>, ApiError> {
    Ok(Json(state.coupons.validate(&req.code, &req.items).await?))
}

/// POST /api/orders: runs the order transaction.
#[tracing::instrument(skip(state, req))]
pub async fn place_order<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<PlaceOrder>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state.orders.place_order(req).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/orders/{order_number}: order tracking for customers.
pub async fn get_order<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(order_number): Path<String>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.orders.get_by_number(&order_number).await?))
}
