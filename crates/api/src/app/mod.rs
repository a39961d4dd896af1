//! HTTP application assembly.
//!
//! Handlers stay thin: parse, delegate to the coordinator or store, map the
//! outcome to a response. All state travels through [`AppServices`].

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{Extension, Router};

use services::AppServices;

pub fn build_app(services: AppServices) -> Router {
    routes::router()
        .layer(Extension(Arc::new(services)))
        .layer(axum::middleware::from_fn(crate::middleware::request_logging))
}
