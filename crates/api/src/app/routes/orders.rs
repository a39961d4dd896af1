use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use storefront_core::OrderId;
use storefront_orders::OrderRequest;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_order))
        .route("/:id", get(get_order))
}

pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CreateOrderRequest>,
) -> axum::response::Response {
    let request: OrderRequest = body.into();

    // One attempt per call; the deadline cancels the in-flight transaction,
    // which rolls back on drop.
    let outcome = tokio::time::timeout(
        services.order_timeout,
        services.coordinator.create_order(request),
    )
    .await;

    match outcome {
        Ok(Ok(created)) => {
            (StatusCode::CREATED, Json(dto::order_to_json(&created))).into_response()
        }
        Ok(Err(err)) => errors::order_error_to_response(err),
        Err(_elapsed) => {
            tracing::error!(
                timeout_ms = services.order_timeout.as_millis() as u64,
                "order_creation_timed_out"
            );
            errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "transient_store_error",
                "order creation timed out, safe to retry",
            )
        }
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id")
        }
    };

    match services.coordinator.get_order(id).await {
        Ok(order) => (StatusCode::OK, Json(dto::order_to_json(&order))).into_response(),
        Err(err) => errors::order_error_to_response(err),
    }
}
