//! Public store settings.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use services::PublicSettings;
use store::Store;

use crate::AppState;
use crate::error::ApiError;

/// GET /api/settings/public: store name, tax rate and shipping rules.
pub async fn public<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<PublicSettings>, ApiError> {
    Ok(Json(state.settings.public().await?))
}
