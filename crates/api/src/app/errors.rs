//! Consistent JSON error responses and the failure-kind to status mapping.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use storefront_core::DomainError;
use storefront_orders::{OrderError, StoreError};

/// 400 for business-rule rejections, 404 for lookup misses, 500 for
/// infrastructure failures. Store internals are logged, never echoed.
pub fn order_error_to_response(err: OrderError) -> axum::response::Response {
    match err {
        OrderError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        OrderError::ProductNotFound { product_id } => json_error(
            StatusCode::BAD_REQUEST,
            "product_not_found",
            format!("product not found: {product_id}"),
        ),
        OrderError::InsufficientStock { product_id } => json_error(
            StatusCode::BAD_REQUEST,
            "insufficient_stock",
            format!("insufficient stock for product {product_id}"),
        ),
        OrderError::UserNotFound { user_id } => json_error(
            StatusCode::BAD_REQUEST,
            "user_not_found",
            format!("user not found: {user_id}"),
        ),
        OrderError::NotFound => {
            json_error(StatusCode::NOT_FOUND, "not_found", "order not found")
        }
        OrderError::Transient(msg) => {
            tracing::error!(error = %msg, "transient_store_failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "transient_store_error",
                "temporary failure, safe to retry",
            )
        }
        OrderError::Store(msg) => {
            tracing::error!(error = %msg, "store_failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
                "failed to process request",
            )
        }
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    order_error_to_response(OrderError::from(err))
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
