use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, middleware};

pub fn build_router(app_state: AppState, request_timeout: Duration) -> Router {
    let rpc_routes = Router::new()
        .route(
            "/v1alpha/check",
            post(handlers::access::check_permission_handler),
        )
        .route(
            "/v1alpha/orgs/{org_id}/licenses/{service_id}",
            get(handlers::licenses::get_license_handler),
        )
        .route(
            "/v1alpha/orgs/{org_id}/licenses/{service_id}/seats",
            get(handlers::licenses::get_seats_handler)
                .post(handlers::licenses::modify_seats_handler),
        )
        .route_layer(from_fn(middleware::resolve_request_context));

    let router = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(rpc_routes)
        .with_state(app_state);

    with_http_layers(router, request_timeout)
}

fn with_http_layers(router: Router, request_timeout: Duration) -> Router {
    router
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
}
