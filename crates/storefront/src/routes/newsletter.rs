//! Newsletter subscription handler.
//!
//! Stores the address in `newsletter_subscribers`. Subscribing twice is
//! not an error; the caller just learns the address was already on the
//! list. A welcome email goes out for new subscribers when SMTP is
//! configured.

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use seamline_core::Email;

use super::json_body;
use crate::db::{NewsletterRepository, SubscribeOutcome};
use crate::error::{Result, ValidationError};
use crate::services::email::render_welcome;
use crate::state::AppState;

/// Newsletter signup body.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
}

/// Newsletter signup result.
#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub success: bool,
    pub already_subscribed: bool,
}

/// Subscribe an address to the newsletter.
///
/// POST /api/newsletter
#[instrument(skip(state, payload))]
pub async fn subscribe(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SubscribeRequest>, JsonRejection>,
) -> Result<Json<SubscribeResponse>> {
    let request = json_body(payload)?;
    let email = Email::parse(&request.email).map_err(ValidationError::from)?;

    let outcome = NewsletterRepository::new(state.store())
        .subscribe(&email)
        .await?;

    let already_subscribed = match outcome {
        SubscribeOutcome::Created(subscriber) => {
            tracing::info!(subscriber_id = %subscriber.id, "Newsletter subscription created");
            send_welcome(&state, &email).await;
            false
        }
        SubscribeOutcome::AlreadySubscribed => {
            tracing::debug!("Address already subscribed");
            true
        }
    };

    Ok(Json(SubscribeResponse {
        success: true,
        already_subscribed,
    }))
}

/// Send the welcome email. Failures are logged, never surfaced.
async fn send_welcome(state: &AppState, email: &Email) {
    let Some(mailer) = state.mailer() else {
        return;
    };

    let site_url = state.config().site_url.as_ref().map(Url::as_str);
    let result = match render_welcome(email, site_url) {
        Ok(html) => mailer.send(email, "Welcome to Seamline", &html).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        tracing::warn!(error = %e, "Failed to send welcome email");
    }
}
