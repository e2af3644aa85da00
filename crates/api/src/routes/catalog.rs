//! Public catalog endpoints.

use std::sync::Arc;

use axum::extract::State;
use common::{CategoryId, Page, PageRequest, ProductId};
use domain::{Category, Product};
use serde::Deserialize;
use store::{ProductQuery, Store};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};

#[derive(Debug, Default, Deserialize)]
pub struct ProductListParams {
    pub category_id: Option<CategoryId>,
    pub search: Option<String>,
    #[serde(default)]
    pub featured: bool,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ProductListParams {
    /// Applies the filters on top of `base`.
    pub fn into_query(self, base: ProductQuery) -> ProductQuery {
        let mut query = base.page(PageRequest::new(self.page, self.per_page));
        if let Some(category) = self.category_id {
            query = query.category(category);
        }
        if let Some(search) = self.search {
            query = query.search(search);
        }
        if self.featured {
            query = query.featured();
        }
        query
    }
}

/// GET /api/categories: active categories in display order.
pub async fn list_categories<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.catalog.list_categories(true).await?))
}

/// GET /api/products: active products, filtered and paged.
#[tracing::instrument(skip(state))]
pub async fn list_products<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ProductListParams>,
) -> Result<Json<Page<Product>>, ApiError> {
    let query = params.into_query(ProductQuery::storefront());
    Ok(Json(state.catalog.list_products(&query).await?))
}

/// GET /api/products/{id}
pub async fn get_product<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>, ApiError> {
    let product = state.catalog.get_product(id).await?;
    if !product.is_active {
        return Err(ApiError::NotFound(format!("Product not found: {id}")));
    }
    Ok(Json(product))
}

/// GET /api/products/slug/{slug}
pub async fn get_product_by_slug<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(slug): Path<String>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.catalog.get_product_by_slug(&slug).await?))
}
