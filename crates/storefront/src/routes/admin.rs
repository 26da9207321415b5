//! Server-rendered admin pages.
//!
//! Login and reset-password are reachable without a session; the
//! dashboard and logout sit behind the admin gate.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use secrecy::SecretString;
use serde::Deserialize;
use tracing::instrument;

use seamline_core::{ADMIN_PREFIX, Email, LOGIN_PATH};

use crate::db::{NewsletterRepository, OrderRepository, ProductRepository};
use crate::error::{Result, clear_sentry_user};
use crate::gate::{Credential, expired_cookie, session_cookie};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password.";
const SIGN_IN_UNAVAILABLE: &str = "Sign-in is temporarily unavailable. Please try again.";
const RESET_REQUESTED: &str =
    "If that address belongs to an admin account, a reset link is on its way.";

// =============================================================================
// Templates
// =============================================================================

/// Admin login page.
#[derive(Template, WebTemplate)]
#[template(path = "admin/login.html")]
pub struct LoginTemplate {
    pub email: String,
    pub error: Option<String>,
}

/// Reset password page.
#[derive(Template, WebTemplate)]
#[template(path = "admin/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub message: Option<String>,
}

/// Admin dashboard.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub email: String,
    pub products: u64,
    pub orders: u64,
    pub subscribers: u64,
}

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Reset password form data.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub email: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the login page.
#[instrument]
pub async fn login_page() -> impl IntoResponse {
    LoginTemplate {
        email: String::new(),
        error: None,
    }
}

/// Sign in through the identity provider and store the access token.
///
/// Non-admin identities get a cookie here too; the gate revokes it on
/// their first protected request.
#[instrument(skip(state, jar, form))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let Ok(email) = Email::parse(&form.email) else {
        return login_failed(form.email, StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS);
    };
    let password = SecretString::from(form.password);

    match state
        .identity()
        .sign_in_with_password(&email, &password)
        .await
    {
        Ok(Some(signed_in)) => {
            let cookie = session_cookie(
                &signed_in.access_token,
                signed_in.expires_in,
                state.config().is_https(),
            );
            tracing::info!("Admin sign-in succeeded");
            (jar.add(cookie), Redirect::to(ADMIN_PREFIX)).into_response()
        }
        Ok(None) => {
            tracing::info!("Admin sign-in rejected");
            login_failed(form.email, StatusCode::UNAUTHORIZED, INVALID_CREDENTIALS)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Identity provider sign-in failed");
            login_failed(
                form.email,
                StatusCode::SERVICE_UNAVAILABLE,
                SIGN_IN_UNAVAILABLE,
            )
        }
    }
}

fn login_failed(email: String, status: StatusCode, message: &str) -> Response {
    (
        status,
        LoginTemplate {
            email,
            error: Some(message.to_string()),
        },
    )
        .into_response()
}

/// Display the reset password page.
#[instrument]
pub async fn reset_password_page() -> impl IntoResponse {
    ResetPasswordTemplate { message: None }
}

/// Ask the provider to mail a reset link.
///
/// The response is the same whether or not the address exists.
#[instrument(skip(state, form))]
pub async fn reset_password(
    State(state): State<AppState>,
    Form(form): Form<ResetPasswordForm>,
) -> impl IntoResponse {
    if let Ok(email) = Email::parse(&form.email) {
        let redirect_to = state
            .config()
            .site_url
            .as_ref()
            .and_then(|url| url.join(LOGIN_PATH.trim_start_matches('/')).ok());

        if let Err(e) = state
            .identity()
            .send_password_reset(&email, redirect_to.as_ref())
            .await
        {
            tracing::warn!(error = %e, "Password reset request failed");
        }
    }

    ResetPasswordTemplate {
        message: Some(RESET_REQUESTED.to_string()),
    }
}

/// Revoke every session the request carries and clear the cookie.
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> impl IntoResponse {
    let credentials = Credential::all_from_headers(&headers);
    for credential in &credentials {
        state.gate().revoke(&credential.token).await;
    }
    clear_sentry_user();
    tracing::info!(revoked = credentials.len(), "Admin signed out");

    (jar.add(expired_cookie()), Redirect::to(LOGIN_PATH))
}

/// Dashboard with catalogue, order and subscriber counts.
#[instrument(skip_all)]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(session): RequireAdmin,
) -> Result<impl IntoResponse> {
    let products = ProductRepository::new(state.store());
    let orders = OrderRepository::new(state.store());
    let subscribers = NewsletterRepository::new(state.store());
    let (products, orders, subscribers) = tokio::try_join!(
        products.count_all(),
        orders.count(),
        subscribers.count(),
    )?;

    Ok(DashboardTemplate {
        email: session.email().unwrap_or_default().to_string(),
        products,
        orders,
        subscribers,
    })
}
