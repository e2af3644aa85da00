//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::OrderError;
use services::ServiceError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
///
/// Every error is rendered as `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found.
    #[error("{0}")]
    NotFound(String),
    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),
    /// Missing or wrong admin token.
    #[error("Unauthorized")]
    Unauthorized,
    /// Service layer error.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::Service(err) => service_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn service_error_to_response(err: ServiceError) -> (StatusCode, String) {
    match &err {
        ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        ServiceError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        ServiceError::Conflict(_) => (StatusCode::CONFLICT, err.to_string()),
        ServiceError::Coupon(_) => (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
        ServiceError::Order(order_err) => match order_err {
            OrderError::EmptyCart
            | OrderError::InvalidQuantity { .. }
            | OrderError::InvalidCustomer(_)
            | OrderError::AmountTooLarge => (StatusCode::BAD_REQUEST, err.to_string()),
            OrderError::ProductNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
            OrderError::ProductUnavailable { .. }
            | OrderError::InsufficientStock { .. }
            | OrderError::InvalidStatusTransition { .. } => (StatusCode::CONFLICT, err.to_string()),
            OrderError::Coupon(_) | OrderError::BelowMinimumOrder { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
            }
        },
        ServiceError::Store(store_err) => {
            tracing::error!(error = %store_err, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProductId;
    use domain::{CouponError, OrderStatus, ValidationError};
    use store::StoreError;

    fn status_of(err: ServiceError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(ValidationError::new("name", "is required").into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ServiceError::not_found("Product", 1)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ServiceError::Conflict("taken".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(CouponError::Expired.into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(OrderError::Coupon(CouponError::Inactive).into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(
                OrderError::InsufficientStock {
                    product_id: ProductId::new(1),
                    name: "Sparkler".to_string(),
                    requested: 5,
                    available: 1,
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(
                OrderError::InvalidStatusTransition {
                    from: OrderStatus::Delivered,
                    to: OrderStatus::Pending,
                }
                .into()
            ),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(OrderError::EmptyCart.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(OrderError::AmountTooLarge.into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_store_errors_are_hidden() {
        let err = ServiceError::Store(StoreError::Corrupt {
            table: "orders",
            reason: "bad status".to_string(),
        });
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
