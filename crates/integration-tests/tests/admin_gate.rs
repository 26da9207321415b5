//! Admin gate behaviour at every enforcement point.
//!
//! The full router exercises the edge middleware; the bare router (no
//! middleware) shows the handler extractors gate on their own.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use seamline_core::LOGIN_PATH;
use seamline_integration_tests::{
    ACCESS_TOKEN_COOKIE, TestApp, TestResponse, get, get_with_bearer, get_with_cookie, post_form,
};
use seamline_storefront::db::collections;

fn clears_cookie(response: &TestResponse) -> bool {
    response
        .set_cookies()
        .iter()
        .any(|c| c.starts_with(&format!("{ACCESS_TOKEN_COOKIE}=;")) && c.contains("Max-Age=0"))
}

// =============================================================================
// Page navigations
// =============================================================================

#[tokio::test]
async fn test_no_credential_redirects_to_login() {
    let app = TestApp::new();

    let response = app.send(get("/admin")).await;

    assert!(response.is_redirect_to(LOGIN_PATH));
    assert_eq!(response.header("cache-control"), Some("no-store"));
    assert!(!clears_cookie(&response));
    assert_eq!(app.identity.sign_out_count(), 0);
}

#[tokio::test]
async fn test_unknown_token_redirects_without_revoke() {
    let app = TestApp::new();

    let response = app.send(get_with_cookie("/admin", "forged-token")).await;

    assert!(response.is_redirect_to(LOGIN_PATH));
    assert_eq!(app.identity.sign_out_count(), 0);
}

#[tokio::test]
async fn test_non_admin_is_signed_out_then_redirected() {
    let app = TestApp::new();
    app.sign_in("tok-u1");

    let response = app.send(get_with_cookie("/admin", "tok-u1")).await;

    assert!(response.is_redirect_to(LOGIN_PATH));
    assert!(clears_cookie(&response));
    assert_eq!(app.identity.sign_out_count(), 1);
    assert!(app.identity.is_revoked("tok-u1"));
}

#[tokio::test]
async fn test_revoked_credential_is_treated_as_no_session() {
    let app = TestApp::new();
    app.sign_in("tok-u1");

    let first = app.send(get_with_cookie("/admin", "tok-u1")).await;
    assert!(first.is_redirect_to(LOGIN_PATH));

    let second = app.send(get_with_cookie("/admin", "tok-u1")).await;
    assert!(second.is_redirect_to(LOGIN_PATH));
    assert!(!clears_cookie(&second));
    assert_eq!(app.identity.sign_out_count(), 1);
}

#[tokio::test]
async fn test_admin_reaches_dashboard() {
    let app = TestApp::new();
    app.sign_in_admin("tok-u2");

    let response = app.send(get_with_cookie("/admin", "tok-u2")).await;

    assert_eq!(response.status, StatusCode::OK);
    let html = response.text();
    assert!(html.contains("Dashboard"));
    assert!(html.contains("tok-u2@seamline.test"));
    assert_eq!(app.identity.sign_out_count(), 0);
}

#[tokio::test]
async fn test_allow_is_idempotent() {
    let app = TestApp::new();
    app.sign_in_admin("tok-u2");

    for _ in 0..2 {
        let response = app.send(get_with_cookie("/admin", "tok-u2")).await;
        assert_eq!(response.status, StatusCode::OK);
    }

    assert_eq!(app.identity.sign_out_count(), 0);
    assert!(!app.identity.is_revoked("tok-u2"));
    assert_eq!(app.store.rows(collections::ADMIN_USERS).len(), 1);
}

#[tokio::test]
async fn test_session_resolved_once_per_request() {
    let app = TestApp::new();
    app.sign_in_admin("tok-u2");

    let response = app.send(get_with_cookie("/admin", "tok-u2")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.identity.session_lookup_count(), 1);
}

#[tokio::test]
async fn test_provider_outage_redirects_to_login() {
    let app = TestApp::new();
    app.sign_in_admin("tok-u2");
    app.identity.set_failing(true);

    let response = app.send(get_with_cookie("/admin", "tok-u2")).await;

    assert!(response.is_redirect_to(LOGIN_PATH));
    assert_eq!(app.identity.sign_out_count(), 0);
}

#[tokio::test]
async fn test_membership_lookup_outage_denies() {
    let app = TestApp::new();
    app.sign_in_admin("tok-u2");
    app.store.set_unavailable(true);

    let response = app.send(get_with_cookie("/admin", "tok-u2")).await;

    assert!(response.is_redirect_to(LOGIN_PATH));
    assert_eq!(app.identity.sign_out_count(), 1);
}

#[tokio::test]
async fn test_duplicate_memberships_deny() {
    let app = TestApp::new();
    let identity_id = app.sign_in_admin("tok-u2");
    app.grant_admin(identity_id);

    let response = app.send(get_with_cookie("/admin", "tok-u2")).await;

    assert!(response.is_redirect_to(LOGIN_PATH));
    assert_eq!(app.identity.sign_out_count(), 1);
}

#[tokio::test]
async fn test_unrouted_admin_paths_are_gated() {
    let app = TestApp::new();

    let response = app.send(get("/admin/settings")).await;

    assert!(response.is_redirect_to(LOGIN_PATH));
}

// =============================================================================
// Exempt pages
// =============================================================================

#[tokio::test]
async fn test_login_page_does_not_loop() {
    let app = TestApp::new();

    let response = app.send(get(LOGIN_PATH)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("Sign in"));
    assert_eq!(app.identity.session_lookup_count(), 0);
}

#[tokio::test]
async fn test_reset_password_page_is_public() {
    let app = TestApp::new();

    let response = app.send(get("/admin/reset-password")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("Reset password"));
}

#[tokio::test]
async fn test_public_routes_skip_the_gate() {
    let app = TestApp::new();
    app.sign_in("tok-u1");

    let response = app.send(get_with_cookie("/api/products", "tok-u1")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(app.identity.session_lookup_count(), 0);
    assert_eq!(app.identity.sign_out_count(), 0);
}

// =============================================================================
// JSON callers
// =============================================================================

#[tokio::test]
async fn test_api_without_credential_is_unauthorized() {
    let app = TestApp::new();

    let response = app.send(get("/api/admin/orders")).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json(), json!({"error": "unauthorized"}));
}

#[tokio::test]
async fn test_api_non_admin_is_revoked() {
    let app = TestApp::new();
    app.sign_in("tok-u1");

    let response = app.send(get_with_bearer("/api/admin/orders", "tok-u1")).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    // The revoked token came from the header; the cookie is not touched.
    assert!(!clears_cookie(&response));
    assert_eq!(app.identity.sign_out_count(), 1);
}

#[tokio::test]
async fn test_api_non_admin_cookie_is_revoked_and_cleared() {
    let app = TestApp::new();
    app.sign_in("tok-u1");

    let response = app.send(get_with_cookie("/api/admin/orders", "tok-u1")).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(clears_cookie(&response));
    assert!(app.identity.is_revoked("tok-u1"));
}

#[tokio::test]
async fn test_api_admin_with_bearer_is_allowed() {
    let app = TestApp::new();
    app.sign_in_admin("tok-u2");

    let response = app.send(get_with_bearer("/api/admin/orders", "tok-u2")).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["total"], 0);
}

#[tokio::test]
async fn test_json_accept_on_page_gets_401() {
    let app = TestApp::new();

    let request = Request::builder()
        .uri("/admin")
        .header("accept", "application/json")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_session_probe() {
    let app = TestApp::new();
    let identity_id = app.sign_in_admin("tok-u2");

    let response = app.send(get_with_cookie("/api/admin/session", "tok-u2")).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["identity_id"], identity_id.to_string());
    assert_eq!(body["email"], "tok-u2@seamline.test");
}

#[tokio::test]
async fn test_session_probe_denies_non_admin() {
    let app = TestApp::new();
    app.sign_in("tok-u1");

    let response = app.send(get_with_cookie("/api/admin/session", "tok-u1")).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.identity.sign_out_count(), 1);
}

// =============================================================================
// Extractors without the edge middleware
// =============================================================================

#[tokio::test]
async fn test_page_extractor_gates_alone() {
    let app = TestApp::new();
    app.sign_in("tok-u1");

    let anonymous = TestResponse::from_router(app.bare_router(), get("/admin")).await;
    assert!(anonymous.is_redirect_to(LOGIN_PATH));

    let non_admin =
        TestResponse::from_router(app.bare_router(), get_with_cookie("/admin", "tok-u1")).await;
    assert!(non_admin.is_redirect_to(LOGIN_PATH));
    assert!(clears_cookie(&non_admin));
    assert_eq!(app.identity.sign_out_count(), 1);
}

#[tokio::test]
async fn test_api_extractor_gates_alone() {
    let app = TestApp::new();
    app.sign_in_admin("tok-u2");

    let anonymous = TestResponse::from_router(app.bare_router(), get("/api/admin/orders")).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let admin = TestResponse::from_router(
        app.bare_router(),
        get_with_bearer("/api/admin/subscribers", "tok-u2"),
    )
    .await;
    assert_eq!(admin.status, StatusCode::OK);
}

/// Admin cookie alongside a non-admin bearer token.
fn mixed_credentials(path: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header("cookie", format!("{ACCESS_TOKEN_COOKIE}=tok-admin"))
        .header("authorization", "Bearer tok-user")
        .body(Body::empty())
        .unwrap()
}

#[derive(Debug, PartialEq, Eq)]
struct Outcome {
    status: StatusCode,
    location: Option<String>,
    clears_cookie: bool,
    user_revoked: bool,
    admin_revoked: bool,
    sign_outs: usize,
}

async fn outcome_of(bare: bool, path: &str) -> Outcome {
    let app = TestApp::new();
    app.sign_in_admin("tok-admin");
    app.sign_in("tok-user");

    let request = mixed_credentials(path);
    let response = if bare {
        TestResponse::from_router(app.bare_router(), request).await
    } else {
        app.send(request).await
    };

    Outcome {
        status: response.status,
        location: response.header("location").map(str::to_string),
        clears_cookie: clears_cookie(&response),
        user_revoked: app.identity.is_revoked("tok-user"),
        admin_revoked: app.identity.is_revoked("tok-admin"),
        sign_outs: app.identity.sign_out_count(),
    }
}

#[tokio::test]
async fn test_mixed_credentials_judged_alike_at_every_enforcement_point() {
    for path in ["/admin", "/api/admin/orders"] {
        let edge = outcome_of(false, path).await;
        let extractor = outcome_of(true, path).await;
        assert_eq!(edge, extractor, "enforcement points disagree on {path}");

        // The bearer token wins, is revoked, and the admin cookie survives.
        assert!(edge.user_revoked);
        assert!(!edge.admin_revoked);
        assert!(!edge.clears_cookie);
        assert_eq!(edge.sign_outs, 1);
    }

    let page = outcome_of(false, "/admin").await;
    assert_eq!(page.location.as_deref(), Some(LOGIN_PATH));
    let api = outcome_of(false, "/api/admin/orders").await;
    assert_eq!(api.status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Login, logout and reset
// =============================================================================

#[tokio::test]
async fn test_login_sets_cookie_and_redirects() {
    let app = TestApp::new();
    let identity_id = app.sign_in("tok-login");
    app.grant_admin(identity_id);
    app.identity
        .add_account("owner@seamline.test", "correct horse", "tok-login");

    let response = app
        .send(post_form(
            LOGIN_PATH,
            "email=Owner%40seamline.test&password=correct+horse",
            None,
        ))
        .await;

    assert!(response.is_redirect_to("/admin"));
    let cookie = response
        .set_cookies()
        .into_iter()
        .find(|c| c.starts_with(&format!("{ACCESS_TOKEN_COOKIE}=tok-login")))
        .unwrap()
        .to_string();
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Secure"));

    let dashboard = app.send(get_with_cookie("/admin", "tok-login")).await;
    assert_eq!(dashboard.status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_rejects_bad_password() {
    let app = TestApp::new();
    app.identity
        .add_account("owner@seamline.test", "correct horse", "tok-login");

    let response = app
        .send(post_form(
            LOGIN_PATH,
            "email=owner%40seamline.test&password=wrong",
            None,
        ))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.text().contains("Invalid email or password."));
    assert!(response.set_cookies().is_empty());
}

#[tokio::test]
async fn test_login_provider_outage() {
    let app = TestApp::new();
    app.identity.set_failing(true);

    let response = app
        .send(post_form(
            LOGIN_PATH,
            "email=owner%40seamline.test&password=whatever",
            None,
        ))
        .await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.text().contains("temporarily unavailable"));
}

#[tokio::test]
async fn test_logout_revokes_and_clears_cookie() {
    let app = TestApp::new();
    app.sign_in_admin("tok-u2");

    let response = app
        .send(post_form("/admin/logout", "", Some("tok-u2")))
        .await;

    assert!(response.is_redirect_to(LOGIN_PATH));
    assert!(clears_cookie(&response));
    assert!(app.identity.is_revoked("tok-u2"));

    let after = app.send(get_with_cookie("/admin", "tok-u2")).await;
    assert!(after.is_redirect_to(LOGIN_PATH));
}

#[tokio::test]
async fn test_logout_with_bearer_only_revokes() {
    let app = TestApp::new();
    app.sign_in_admin("tok-u2");

    let request = Request::builder()
        .method("POST")
        .uri("/admin/logout")
        .header("authorization", "Bearer tok-u2")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert!(response.is_redirect_to(LOGIN_PATH));
    assert_eq!(app.identity.sign_out_count(), 1);
    assert!(app.identity.is_revoked("tok-u2"));
}

#[tokio::test]
async fn test_reset_password_is_neutral() {
    let app = TestApp::new();

    let known = app
        .send(post_form(
            "/admin/reset-password",
            "email=owner%40seamline.test",
            None,
        ))
        .await;
    let malformed = app
        .send(post_form("/admin/reset-password", "email=nope", None))
        .await;

    assert_eq!(known.status, StatusCode::OK);
    assert_eq!(known.text(), malformed.text());
    assert_eq!(
        app.identity.reset_requests(),
        vec![(
            "owner@seamline.test".to_string(),
            Some("https://seamline.test/admin/login".to_string())
        )]
    );
}
