//! Category and product administration.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use common::{CategoryId, Page, ProductId};
use domain::{Category, CategoryDraft, Product, ProductDraft};
use serde::Deserialize;
use store::{ProductQuery, Store};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};
use crate::routes::catalog::ProductListParams;

#[derive(Debug, Deserialize)]
pub struct LowStockParams {
    pub threshold: Option<u32>,
}

#[tracing::instrument(skip(state, draft))]
pub async fn create_category<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(draft): Json<CategoryDraft>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state.catalog.create_category(draft).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[tracing::instrument(skip(state, draft))]
pub async fn update_category<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<CategoryId>,
    Json(draft): Json<CategoryDraft>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.catalog.update_category(id, draft).await?))
}

#[tracing::instrument(skip(state))]
pub async fn delete_category<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Lists every product, inactive ones included.
#[tracing::instrument(skip(state))]
pub async fn list_products<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ProductListParams>,
) -> Result<Json<Page<Product>>, ApiError> {
    let query = params.into_query(ProductQuery::new());
    Ok(Json(state.catalog.list_products(&query).await?))
}

pub async fn get_product<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.catalog.get_product(id).await?))
}

#[tracing::instrument(skip(state, draft))]
pub async fn create_product<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(draft): Json<ProductDraft>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.catalog.create_product(draft).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[tracing::instrument(skip(state, draft))]
pub async fn update_product<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ProductId>,
    Json(draft): Json<ProductDraft>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.catalog.update_product(id, draft).await?))
}

#[tracing::instrument(skip(state))]
pub async fn delete_product<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Products at or below `threshold` units; defaults to the stored threshold.
pub async fn low_stock<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<LowStockParams>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.catalog.low_stock(params.threshold).await?))
}
