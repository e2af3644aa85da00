//! Order administration and the dashboard.

use std::sync::Arc;

use axum::extract::State;
use common::{OrderId, Page, PageRequest};
use domain::{Order, OrderStatus};
use serde::Deserialize;
use services::Dashboard;
use store::{OrderQuery, Store};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};

#[derive(Debug, Default, Deserialize)]
pub struct OrderListParams {
    pub status: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// GET /api/admin/orders: newest first, filtered by `status` and `search`.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<OrderListParams>,
) -> Result<Json<Page<Order>>, ApiError> {
    let mut query = OrderQuery::new().page(PageRequest::new(params.page, params.per_page));
    if let Some(status) = params.status.filter(|s| !s.trim().is_empty()) {
        let status = status
            .parse::<OrderStatus>()
            .map_err(|e| ApiError::BadRequest(format!("Invalid status: {e}")))?;
        query = query.status(status);
    }
    if let Some(search) = params.search {
        query = query.search(search);
    }
    Ok(Json(state.orders.list(&query).await?))
}

pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.orders.get(id).await?))
}

/// PUT /api/admin/orders/{id}/status
#[tracing::instrument(skip(state))]
pub async fn update_status<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.orders.update_status(id, update.status).await?))
}

/// GET /api/admin/dashboard
pub async fn dashboard<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Dashboard>, ApiError> {
    Ok(Json(state.orders.dashboard().await?))
}
