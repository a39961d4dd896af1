use axum::{routing::get, Router};

pub mod orders;
pub mod products;
pub mod system;

pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .nest("/api/products", products::router())
        .nest("/api/orders", orders::router())
}
