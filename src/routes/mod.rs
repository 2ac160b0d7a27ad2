use std::time::Duration;

use axum::{
    Json, Router,
    http::{HeaderName, Request, Response, StatusCode, Uri},
    routing::get,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::{response::ApiResponse, state::AppState};

pub mod auth;
pub mod cart;
pub mod categories;
pub mod doc;
pub mod favorites;
pub mod health;
pub mod order_items;
pub mod orders;
pub mod params;
pub mod products;
pub mod roles;
pub mod users;

const REQUEST_ID_HEADER: &str = "x-request-id";

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(roles::router())
        .nest("/products", products::router())
        .nest("/categories", categories::router())
        .nest("/users", users::router())
        .nest("/cart-items", cart::router())
        .nest("/favorite-items", favorites::router())
        .nest("/orders", orders::route())
        .nest("/order-items", order_items::router())
}

/// The full application: API routes, docs, health and the middleware stack.
pub fn create_app(state: AppState, request_timeout: Duration) -> Router {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<_>| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id
            )
        })
        .on_request(|request: &Request<_>, _span: &tracing::Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "request started"
            );
        })
        .on_response(|response: &Response<_>, latency: Duration, _span: &tracing::Span| {
            tracing::info!(
                status = %response.status(),
                ms = %latency.as_millis(),
                "request finished"
            );
        });

    Router::new()
        .route("/health", get(health::health_check))
        .merge(create_api_router())
        .merge(doc::scalar_docs())
        .fallback(not_found)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(trace_layer)
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .layer(ConcurrencyLimitLayer::new(100))
        .with_state(state)
}

#[derive(serde::Serialize)]
struct NotFoundData {
    path: String,
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<NotFoundData>>) {
    let body = ApiResponse::success(
        "Not Found",
        NotFoundData {
            path: uri.path().to_string(),
        },
    );
    (StatusCode::NOT_FOUND, Json(body))
}
