use axum::{Router, routing::get};

pub mod actions;
pub mod system;

/// Router for every `/{area}/{action}` endpoint.
pub fn router() -> Router {
    Router::new().route("/:area/:action", get(actions::query_action).post(actions::form_action))
}
