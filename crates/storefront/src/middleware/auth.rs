//! Admin authentication extractors.
//!
//! Provides extractors for requiring an admin session in route handlers.
//! When the edge middleware already let the request through, its
//! [`AdminSession`] extension is reused; otherwise the extractor runs the
//! gate itself through [`enforce`], the same path the edge takes.

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{ACCEPT, CACHE_CONTROL, SET_COOKIE},
        request::Parts,
    },
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;

use seamline_core::{GateDecision, LOGIN_PATH, Session};

use crate::gate::{Credential, CredentialSource, expired_cookie};
use crate::state::AppState;

/// Session that passed the admin gate for the current request.
///
/// Inserted into request extensions by the edge middleware.
#[derive(Debug, Clone)]
pub struct AdminSession(pub Session);

/// Error returned when the admin gate denies a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminRejection {
    /// Redirect to the login page (navigations).
    RedirectToLogin {
        /// Also tell the browser to drop the revoked credential cookie.
        clear_cookie: bool,
    },
    /// `401` with a JSON body (API and `fetch` callers).
    Unauthorized {
        /// Also tell the browser to drop the credential cookie.
        clear_cookie: bool,
    },
}

impl AdminRejection {
    /// Translate a deny decision for the given kind of caller.
    ///
    /// The cookie is only expired when the revoked token was the cookie;
    /// a revoked bearer token leaves the cookie alone.
    #[must_use]
    pub const fn from_denial(
        decision: &GateDecision,
        credential: Option<&Credential>,
        wants_json: bool,
    ) -> Self {
        let clear_cookie = decision.requires_revoke()
            && matches!(
                credential,
                Some(Credential {
                    source: CredentialSource::Cookie,
                    ..
                })
            );
        if wants_json {
            Self::Unauthorized { clear_cookie }
        } else {
            Self::RedirectToLogin { clear_cookie }
        }
    }
}

impl IntoResponse for AdminRejection {
    fn into_response(self) -> Response {
        let (mut response, clear_cookie) = match self {
            Self::RedirectToLogin { clear_cookie } => {
                (Redirect::to(LOGIN_PATH).into_response(), clear_cookie)
            }
            Self::Unauthorized { clear_cookie } => (
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "unauthorized" })),
                )
                    .into_response(),
                clear_cookie,
            ),
        };

        let headers = response.headers_mut();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        if clear_cookie
            && let Ok(value) = HeaderValue::from_str(&expired_cookie().to_string())
        {
            headers.append(SET_COOKIE, value);
        }

        response
    }
}

/// Whether a request expects JSON rather than a page.
///
/// True for anything under `/api/` and for requests whose `Accept` header
/// asks for JSON without also accepting HTML.
#[must_use]
pub fn wants_json(path: &str, headers: &HeaderMap) -> bool {
    if path.starts_with("/api/") {
        return true;
    }
    headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json") && !accept.contains("text/html"))
}

/// Run the admin gate for one request.
///
/// The edge middleware and both extractors call this, so every
/// enforcement point reads the same credential and reaches the same
/// decision.
///
/// # Errors
///
/// Returns the [`AdminRejection`] to send when the gate denies.
pub async fn enforce(
    state: &AppState,
    headers: &HeaderMap,
    wants_json: bool,
) -> Result<Session, AdminRejection> {
    let credential = Credential::from_headers(headers);
    let decision = state.gate().evaluate(credential.as_ref()).await;

    match decision {
        GateDecision::Allow(session) => Ok(session),
        denied => Err(AdminRejection::from_denial(
            &denied,
            credential.as_ref(),
            wants_json,
        )),
    }
}

/// Extractor for server-rendered admin pages.
///
/// Redirects to the login page when the gate denies, or answers `401`
/// when the request asks for JSON (see [`wants_json`]).
///
/// # Example
///
/// ```rust,ignore
/// async fn dashboard(RequireAdmin(session): RequireAdmin) -> impl IntoResponse {
///     format!("Signed in as {}", session.identity_id())
/// }
/// ```
pub struct RequireAdmin(pub Session);

impl<S> FromRequestParts<S> for RequireAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AdminRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(AdminSession(session)) = parts.extensions.get::<AdminSession>() {
            return Ok(Self(session.clone()));
        }

        let state = AppState::from_ref(state);
        let json = wants_json(parts.uri.path(), &parts.headers);
        enforce(&state, &parts.headers, json).await.map(Self)
    }
}

/// Extractor for admin JSON endpoints.
///
/// Reads `Authorization: Bearer` or the cookie and answers `401` JSON when
/// the gate denies.
pub struct RequireAdminApi(pub Session);

impl<S> FromRequestParts<S> for RequireAdminApi
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AdminRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(AdminSession(session)) = parts.extensions.get::<AdminSession>() {
            return Ok(Self(session.clone()));
        }

        let state = AppState::from_ref(state);
        enforce(&state, &parts.headers, true).await.map(Self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::header::LOCATION;

    use super::*;
    use crate::services::AccessToken;

    #[test]
    fn test_wants_json() {
        let mut headers = HeaderMap::new();
        assert!(wants_json("/api/admin/orders", &headers));
        assert!(!wants_json("/admin/orders", &headers));

        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        assert!(wants_json("/admin/orders", &headers));

        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/json;q=0.9"),
        );
        assert!(!wants_json("/admin/orders", &headers));
    }

    fn credential(source: CredentialSource) -> Credential {
        Credential {
            token: AccessToken::new("tok"),
            source,
        }
    }

    #[test]
    fn test_rejection_from_denial() {
        let no_session = GateDecision::DenyRedirect { target: LOGIN_PATH };
        let not_admin = GateDecision::DenyRevokeAndRedirect { target: LOGIN_PATH };
        let cookie = credential(CredentialSource::Cookie);

        assert_eq!(
            AdminRejection::from_denial(&no_session, None, false),
            AdminRejection::RedirectToLogin {
                clear_cookie: false
            }
        );
        assert_eq!(
            AdminRejection::from_denial(&no_session, Some(&cookie), false),
            AdminRejection::RedirectToLogin {
                clear_cookie: false
            }
        );
        assert_eq!(
            AdminRejection::from_denial(&not_admin, Some(&cookie), true),
            AdminRejection::Unauthorized { clear_cookie: true }
        );
    }

    #[test]
    fn test_revoked_bearer_keeps_cookie() {
        let not_admin = GateDecision::DenyRevokeAndRedirect { target: LOGIN_PATH };
        let bearer = credential(CredentialSource::Bearer);

        assert_eq!(
            AdminRejection::from_denial(&not_admin, Some(&bearer), false),
            AdminRejection::RedirectToLogin {
                clear_cookie: false
            }
        );
    }

    #[test]
    fn test_redirect_rejection_response() {
        let response = AdminRejection::RedirectToLogin { clear_cookie: true }.into_response();
        assert!(response.status().is_redirection());
        assert_eq!(response.headers()[LOCATION], LOGIN_PATH);
        assert_eq!(response.headers()[CACHE_CONTROL], "no-store");

        let cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("sb-access-token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_unauthorized_rejection_response() {
        let response = AdminRejection::Unauthorized {
            clear_cookie: false,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(SET_COOKIE).is_none());

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"error": "unauthorized"}));
    }
}
