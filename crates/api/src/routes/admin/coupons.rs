//! Coupon administration.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use common::CouponId;
use domain::{Coupon, CouponDraft};
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{Json, Path};

pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Coupon>>, ApiError> {
    Ok(Json(state.coupons.list().await?))
}

pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<CouponId>,
) -> Result<Json<Coupon>, ApiError> {
    Ok(Json(state.coupons.get(id).await?))
}

#[tracing::instrument(skip(state, draft))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(draft): Json<CouponDraft>,
) -> Result<(StatusCode, Json<Coupon>), ApiError> {
    let coupon = state.coupons.create(draft).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

#[tracing::instrument(skip(state, draft))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<CouponId>,
    Json(draft): Json<CouponDraft>,
) -> Result<Json<Coupon>, ApiError> {
    Ok(Json(state.coupons.update(id, draft).await?))
}

#[tracing::instrument(skip(state))]
pub async fn delete<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<CouponId>,
) -> Result<StatusCode, ApiError> {
    state.coupons.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
