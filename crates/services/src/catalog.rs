//! Category and product management.

use common::{CategoryId, Page, ProductId};
use domain::{Category, CategoryDraft, Product, ProductDraft};
use store::{ProductQuery, Store};

use crate::error::{Result, ServiceError};

/// Catalog operations over a store.
#[derive(Clone)]
pub struct CatalogService<S: Store> {
    store: S,
}

impl<S: Store> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn list_categories(&self, active_only: bool) -> Result<Vec<Category>> {
        Ok(self.store.list_categories(active_only).await?)
    }

    pub async fn get_category(&self, id: CategoryId) -> Result<Category> {
        self.store
            .get_category(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Category", id))
    }

    #[tracing::instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create_category(&self, draft: CategoryDraft) -> Result<Category> {
        let draft = draft.validate()?;
        let category = self.store.create_category(draft).await?;
        tracing::info!(category_id = %category.id, slug = %category.slug, "category created");
        Ok(category)
    }

    #[tracing::instrument(skip(self, draft))]
    pub async fn update_category(&self, id: CategoryId, draft: CategoryDraft) -> Result<Category> {
        let draft = draft.validate()?;
        Ok(self.store.update_category(id, draft).await?)
    }

    /// Deletes a category that no product refers to.
    #[tracing::instrument(skip(self))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<()> {
        let products = self.store.count_products_in_category(id).await?;
        if products > 0 {
            return Err(ServiceError::Conflict(format!(
                "category {id} still has {products} product(s)"
            )));
        }
        self.store.delete_category(id).await?;
        tracing::info!(category_id = %id, "category deleted");
        Ok(())
    }

    pub async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>> {
        Ok(self.store.list_products(query).await?)
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", id))
    }

    /// Looks up an active product by slug, as shown on the storefront.
    pub async fn get_product_by_slug(&self, slug: &str) -> Result<Product> {
        self.store
            .get_product_by_slug(slug)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| ServiceError::not_found("Product", slug))
    }

    #[tracing::instrument(skip(self, draft), fields(sku = %draft.sku))]
    pub async fn create_product(&self, draft: ProductDraft) -> Result<Product> {
        let draft = draft.validate()?;
        self.check_category(draft.category_id).await?;
        let product = self.store.create_product(draft).await?;
        tracing::info!(product_id = %product.id, sku = %product.sku, "product created");
        Ok(product)
    }

    #[tracing::instrument(skip(self, draft))]
    pub async fn update_product(&self, id: ProductId, draft: ProductDraft) -> Result<Product> {
        let draft = draft.validate()?;
        self.check_category(draft.category_id).await?;
        Ok(self.store.update_product(id, draft).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<()> {
        self.store.delete_product(id).await?;
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }

    /// Active products at or below `threshold` units, or the stored
    /// low-stock threshold when none is given.
    pub async fn low_stock(&self, threshold: Option<u32>) -> Result<Vec<Product>> {
        let threshold = match threshold {
            Some(t) => t,
            None => self.store.load_settings().await?.low_stock_threshold,
        };
        Ok(self.store.low_stock_products(threshold).await?)
    }

    async fn check_category(&self, id: Option<CategoryId>) -> Result<()> {
        if let Some(id) = id
            && self.store.get_category(id).await?.is_none()
        {
            return Err(ServiceError::not_found("Category", id));
        }
        Ok(())
    }
}
