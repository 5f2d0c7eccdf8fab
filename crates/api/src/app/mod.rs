//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: the kernel over its store, plus cookie settings
//! - `routes/`: HTTP routes + handlers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use gatehouse_infra::GatehouseConfig;

pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(config: &GatehouseConfig) -> Router {
    build_app_with(Arc::new(services::AppServices::from_config(config)))
}

/// Router over already-built services (tests keep a handle to inspect the store).
pub fn build_app_with(services: Arc<services::AppServices>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::router())
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
