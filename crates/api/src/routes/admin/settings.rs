//! Settings administration.

use std::sync::Arc;

use axum::extract::State;
use domain::{Settings, SettingsPatch};
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::Json;

pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Settings>, ApiError> {
    Ok(Json(state.settings.get().await?))
}

/// PUT /api/admin/settings: applies a partial update.
#[tracing::instrument(skip(state, patch))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<Settings>, ApiError> {
    Ok(Json(state.settings.update(patch).await?))
}
