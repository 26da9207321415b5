//! Edge enforcement of the admin gate.
//!
//! Runs before routing for every request. Paths outside the admin area
//! pass straight through; protected paths are evaluated and either
//! forwarded with an [`AdminSession`] extension or answered with an
//! [`AdminRejection`].

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use seamline_core::is_protected_path;

use super::auth::{AdminSession, enforce, wants_json};
use crate::state::AppState;

/// Gate every protected path before it reaches a handler.
pub async fn admin_gate_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if !is_protected_path(path) {
        return next.run(request).await;
    }

    let json = wants_json(path, request.headers());
    match enforce(&state, request.headers(), json).await {
        Ok(session) => {
            request.extensions_mut().insert(AdminSession(session));
            next.run(request).await
        }
        Err(rejection) => {
            tracing::debug!(path = %request.uri().path(), "Edge gate rejected request");
            rejection.into_response()
        }
    }
}
