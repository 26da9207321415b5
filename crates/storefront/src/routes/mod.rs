//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (data store reachable)
//!
//! # Public API
//! GET  /api/products           - Product listing (filter, sort, paginate)
//! GET  /api/products/{id}      - Product detail
//! POST /api/newsletter         - Newsletter signup
//! POST /api/contact            - Contact form
//!
//! # Admin pages (gated, except login and reset-password)
//! GET  /admin                  - Dashboard
//! GET  /admin/login            - Login page
//! POST /admin/login            - Login action
//! GET  /admin/reset-password   - Reset password page
//! POST /admin/reset-password   - Request reset email
//! POST /admin/logout           - Logout action
//!
//! # Admin API (gated)
//! GET  /api/admin/session      - Session probe for client route guards
//! GET  /api/admin/orders       - Orders, newest first
//! GET  /api/admin/subscribers  - Newsletter subscribers
//! POST /api/admin/uploads      - Product image upload
//! ```

pub mod admin;
pub mod api;
pub mod contact;
pub mod health;
pub mod newsletter;
pub mod products;

use std::time::Duration;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Request, rejection::JsonRejection},
    middleware,
    response::Response,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::db::products::MAX_PER_PAGE;
use crate::error::{AppError, ValidationError};
use crate::middleware::{
    admin_gate_middleware, request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// Validate optional `page` / `per_page` query parameters.
///
/// # Errors
///
/// Returns `ValidationError::TooSmall` if `page` is zero and
/// `ValidationError::OutOfRange` if `per_page` is outside `1..=MAX_PER_PAGE`.
pub fn paging(
    page: Option<u32>,
    per_page: Option<u32>,
    default_per_page: u32,
) -> Result<(u32, u32), ValidationError> {
    let page = page.unwrap_or(1);
    if page == 0 {
        return Err(ValidationError::TooSmall {
            field: "page",
            min: 1,
        });
    }

    let per_page = per_page.unwrap_or(default_per_page);
    if !(1..=MAX_PER_PAGE).contains(&per_page) {
        return Err(ValidationError::OutOfRange {
            field: "per_page",
            min: 1,
            max: MAX_PER_PAGE,
        });
    }

    Ok((page, per_page))
}

/// Unwrap a JSON body, reporting malformed input as `400`.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Create the health check router.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
}

/// Create the public API router.
pub fn public_api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(products::index))
        .route("/api/products/{id}", get(products::show))
        .route("/api/newsletter", post(newsletter::subscribe))
        .route("/api/contact", post(contact::submit))
}

/// Create the admin pages and admin API router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin", get(admin::dashboard))
        .route("/admin/login", get(admin::login_page).post(admin::login))
        .route(
            "/admin/reset-password",
            get(admin::reset_password_page).post(admin::reset_password),
        )
        .route("/admin/logout", post(admin::logout))
        .route("/api/admin/session", get(api::admin::session))
        .route("/api/admin/orders", get(api::admin::orders))
        .route("/api/admin/subscribers", get(api::admin::subscribers))
        .route(
            "/api/admin/uploads",
            post(api::admin::upload).layer(DefaultBodyLimit::max(api::admin::UPLOAD_BODY_LIMIT)),
        )
}

/// All routes, without middleware.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health_routes())
        .merge(public_api_routes())
        .merge(admin_routes())
        .fallback(not_found)
}

/// The full application: routes plus the middleware stack.
///
/// Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    routes()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_gate_middleware,
        ))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                    )
                })
                .on_response(|response: &Response, latency: Duration, span: &Span| {
                    span.record("status", response.status().as_u16());
                    tracing::debug!(
                        latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        "Response sent"
                    );
                }),
        )
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("Page".to_string())
}
