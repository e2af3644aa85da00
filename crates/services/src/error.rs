//! Service error types.

use domain::{CouponError, OrderError, ValidationError};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur in service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The addressed entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The write clashes with existing data.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Order rule violation.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// The coupon cannot be used.
    #[error("Coupon rejected: {0}")]
    Coupon(#[from] CouponError),

    /// Store error.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ServiceError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Store(other),
        }
    }
}

/// Convenience type alias for service results.
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProductId;

    #[test]
    fn store_not_found_keeps_entity() {
        let err: ServiceError = StoreError::not_found("Product", 7).into();
        assert!(matches!(err, ServiceError::NotFound { entity: "Product", ref id } if id == "7"));
    }

    #[test]
    fn store_conflict_becomes_conflict() {
        let err: ServiceError = StoreError::Conflict("duplicate sku".to_string()).into();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[test]
    fn stock_underflow_stays_a_store_error() {
        let err: ServiceError = StoreError::StockUnderflow(ProductId::new(1)).into();
        assert!(matches!(err, ServiceError::Store(_)));
    }
}
