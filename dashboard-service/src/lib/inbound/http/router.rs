use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::accounts::create_teacher;
use super::handlers::accounts::list_teachers;
use super::handlers::health::health;
use super::handlers::login::admin_login;
use super::handlers::login::teacher_login;
use super::handlers::logout::logout;
use super::handlers::me::me;
use super::handlers::refresh::refresh;
use super::middleware::authenticate;
use super::middleware::require_admin;
use super::middleware::require_csrf;
use crate::domain::account::ports::AccountServicePort;
use crate::domain::session::ports::SessionServicePort;

#[derive(Clone)]
pub struct AppState {
    pub session_service: Arc<dyn SessionServicePort>,
    pub account_service: Arc<dyn AccountServicePort>,
    pub trust_forwarded_for: bool,
}

/// Build the HTTP surface.
///
/// The router must be served with
/// `into_make_service_with_connect_info::<SocketAddr>()`; login handlers read
/// the peer address to key the lockout tracker.
pub fn create_router(
    session_service: Arc<dyn SessionServicePort>,
    account_service: Arc<dyn AccountServicePort>,
    trust_forwarded_for: bool,
) -> Router {
    let state = AppState {
        session_service,
        account_service,
        trust_forwarded_for,
    };

    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/api/auth/admin/login", post(admin_login))
        .route("/api/auth/teacher/login", post(teacher_login))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/logout", post(logout));

    // Layers run bottom-up: authenticate, then CSRF, then the role check.
    let session_routes = Router::new()
        .route("/api/auth/me", get(me))
        .route_layer(middleware::from_fn(require_csrf))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            authenticate,
        ));

    let admin_routes = Router::new()
        .route("/api/admin/teachers", get(list_teachers).post(create_teacher))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn(require_csrf))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            authenticate,
        ));

    // Headers are left out of the span: they carry bearer and CSRF tokens.
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(admin_routes)
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
