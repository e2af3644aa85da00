//! Coupon management and cart previews.

use chrono::Utc;
use common::{CouponId, Money};
use domain::{CartLine, Coupon, CouponDraft, CouponError, cart_subtotal, normalize_code};
use serde::Serialize;
use store::Store;

use crate::error::{Result, ServiceError};
use crate::orders::price_cart;

/// Outcome of checking a coupon against a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CouponCheck {
    pub code: String,
    pub description: Option<String>,
    pub subtotal: Money,
    pub discount: Money,
}

/// Coupon operations over a store.
#[derive(Clone)]
pub struct CouponService<S: Store> {
    store: S,
}

impl<S: Store> CouponService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<Coupon>> {
        Ok(self.store.list_coupons().await?)
    }

    pub async fn get(&self, id: CouponId) -> Result<Coupon> {
        self.store
            .get_coupon(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Coupon", id))
    }

    #[tracing::instrument(skip(self, draft), fields(code = %draft.code))]
    pub async fn create(&self, draft: CouponDraft) -> Result<Coupon> {
        let draft = draft.validate()?;
        let coupon = self.store.create_coupon(draft).await?;
        tracing::info!(coupon_id = %coupon.id, code = %coupon.code, "coupon created");
        Ok(coupon)
    }

    #[tracing::instrument(skip(self, draft))]
    pub async fn update(&self, id: CouponId, draft: CouponDraft) -> Result<Coupon> {
        let draft = draft.validate()?;
        Ok(self.store.update_coupon(id, draft).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: CouponId) -> Result<()> {
        self.store.delete_coupon(id).await?;
        tracing::info!(coupon_id = %id, "coupon deleted");
        Ok(())
    }

    /// Checks whether `code` applies to the cart and what it would take off.
    ///
    /// Nothing is reserved; the usage counter only moves when an order is
    /// placed.
    #[tracing::instrument(skip(self, lines))]
    pub async fn validate(&self, code: &str, lines: &[CartLine]) -> Result<CouponCheck> {
        let code = normalize_code(code);
        let coupon = self
            .store
            .get_coupon_by_code(&code)
            .await?
            .ok_or_else(|| CouponError::NotFound(code.clone()))?;

        let priced = price_cart(&self.store, lines).await?;
        let subtotal = cart_subtotal(&priced)?;
        let discount = coupon.evaluate(&priced, Utc::now())?;

        Ok(CouponCheck {
            code: coupon.code,
            description: coupon.description,
            subtotal,
            discount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProductId;
    use domain::{DiscountKind, OrderError, ProductDraft};
    use store::InMemoryStore;

    async fn setup() -> (CouponService<InMemoryStore>, ProductId) {
        let store = InMemoryStore::new();
        let product = store
            .create_product(
                ProductDraft::new("GB-1", "Gift Box", Money::from_rupees(500))
                    .with_stock(10)
                    .validate()
                    .unwrap(),
            )
            .await
            .unwrap();
        (CouponService::new(store), product.id)
    }

    #[tokio::test]
    async fn validate_reports_discount() {
        let (coupons, product) = setup().await;
        coupons
            .create(CouponDraft::new("save10", DiscountKind::Percentage(1_000)))
            .await
            .unwrap();

        let check = coupons
            .validate(" Save10 ", &[CartLine::new(product, 2)])
            .await
            .unwrap();
        assert_eq!(check.code, "SAVE10");
        assert_eq!(check.subtotal, Money::from_rupees(1_000));
        assert_eq!(check.discount, Money::from_rupees(100));
    }

    #[tokio::test]
    async fn validate_does_not_count_usage() {
        let (coupons, product) = setup().await;
        let coupon = coupons
            .create(CouponDraft::new("ONCE", DiscountKind::Fixed(Money::from_rupees(50))))
            .await
            .unwrap();

        coupons
            .validate("ONCE", &[CartLine::new(product, 1)])
            .await
            .unwrap();
        assert_eq!(coupons.get(coupon.id).await.unwrap().used_count, 0);
    }

    #[tokio::test]
    async fn unknown_code_is_rejected() {
        let (coupons, product) = setup().await;
        let err = coupons
            .validate("NOPE", &[CartLine::new(product, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Coupon(CouponError::NotFound(ref c)) if c == "NOPE"));
    }

    #[tokio::test]
    async fn unknown_product_in_cart_is_rejected() {
        let (coupons, _) = setup().await;
        coupons
            .create(CouponDraft::new("SAVE10", DiscountKind::Percentage(1_000)))
            .await
            .unwrap();
        let err = coupons
            .validate("SAVE10", &[CartLine::new(ProductId::new(404), 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Order(OrderError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn duplicate_code_is_conflict() {
        let (coupons, _) = setup().await;
        coupons
            .create(CouponDraft::new("SAVE10", DiscountKind::Percentage(1_000)))
            .await
            .unwrap();
        let err = coupons
            .create(CouponDraft::new("save10", DiscountKind::Percentage(500)))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }
}
