//! `/{area}/{action}`: every kernel action behind one pair of routes.
//!
//! POST takes a urlencoded form and may run any action. GET takes the query
//! string and is refused for actions that carry an anti-forgery guard.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Extension, Path, Query},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::IntoResponse,
};

use gatehouse_kernel::ActionOutcome;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::{context, cookies};

/// GET /:area/:action - read-only actions
pub async fn query_action(
    Extension(services): Extension<Arc<AppServices>>,
    Path((area, action)): Path<(String, String)>,
    headers: HeaderMap,
    Query(fields): Query<HashMap<String, String>>,
) -> axum::response::Response {
    if services.requires_token(&area, &action) {
        return errors::json_error(
            StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed",
            "state-changing actions must be submitted with POST",
        );
    }
    run(services, area, action, &headers, fields).await
}

/// POST /:area/:action - any action, form-encoded input
pub async fn form_action(
    Extension(services): Extension<Arc<AppServices>>,
    Path((area, action)): Path<(String, String)>,
    headers: HeaderMap,
    Form(fields): Form<HashMap<String, String>>,
) -> axum::response::Response {
    run(services, area, action, &headers, fields).await
}

async fn run(
    services: Arc<AppServices>,
    area: String,
    action: String,
    headers: &HeaderMap,
    fields: HashMap<String, String>,
) -> axum::response::Response {
    let ctx = context::request_context(headers, services.cookies(), fields);

    // Password hashing is CPU-bound; keep it off the async workers.
    let worker = services.clone();
    let result = tokio::task::spawn_blocking(move || worker.gatehouse().dispatch(&area, &action, &ctx)).await;

    match result {
        Ok(Ok(outcome)) => respond(outcome, &services),
        Ok(Err(e)) => errors::handle_error_to_response(&e),
        Err(e) => {
            tracing::error!(error = %e, "action task failed");
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

fn respond(outcome: ActionOutcome, services: &AppServices) -> axum::response::Response {
    let set_cookies = cookies::set_cookie_headers(&outcome.effects, services.cookies());

    let mut response = Json(outcome.payload).into_response();
    let headers = response.headers_mut();
    for value in set_cookies {
        headers.append(header::SET_COOKIE, value);
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
