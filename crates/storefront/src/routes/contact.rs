//! Contact form handler.
//!
//! Submissions are mailed to the admin notification address. Without SMTP
//! the endpoint answers `503`.

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use seamline_core::Email;

use super::json_body;
use crate::error::{AppError, Result, ValidationError};
use crate::services::email::render_contact;
use crate::state::AppState;

const MAX_NAME_LEN: usize = 200;
const MAX_SUBJECT_LEN: usize = 200;
const MAX_MESSAGE_LEN: usize = 5000;
const DEFAULT_SUBJECT: &str = "Website enquiry";

/// Contact form body.
#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
}

/// Contact form result.
#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
}

/// Validated contact submission.
#[derive(Debug, PartialEq, Eq)]
struct ContactMessage {
    name: String,
    email: Email,
    subject: String,
    message: String,
}

fn required(value: &str, field: &'static str, max: usize) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required(field).into());
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max }.into());
    }
    Ok(value.to_string())
}

impl TryFrom<ContactRequest> for ContactMessage {
    type Error = AppError;

    fn try_from(request: ContactRequest) -> Result<Self> {
        let name = required(&request.name, "name", MAX_NAME_LEN)?;
        let message = required(&request.message, "message", MAX_MESSAGE_LEN)?;
        let email = Email::parse(&request.email).map_err(ValidationError::from)?;
        let subject = match request.subject.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => required(s, "subject", MAX_SUBJECT_LEN)?,
            _ => DEFAULT_SUBJECT.to_string(),
        };

        Ok(Self {
            name,
            email,
            subject,
            message,
        })
    }
}

/// Forward a contact form submission to the shop owner.
///
/// POST /api/contact
#[instrument(skip(state, payload))]
pub async fn submit(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ContactRequest>, JsonRejection>,
) -> Result<Json<ContactResponse>> {
    let contact = ContactMessage::try_from(json_body(payload)?)?;

    let (Some(mailer), Some(recipient)) =
        (state.mailer(), state.config().admin_notification_email.as_ref())
    else {
        return Err(AppError::ServiceUnavailable(
            "Contact form is not available".to_string(),
        ));
    };

    let html = render_contact(
        &contact.name,
        &contact.email,
        &contact.subject,
        &contact.message,
    )?;
    mailer
        .send(recipient, &format!("[Contact] {}", contact.subject), &html)
        .await?;

    tracing::info!("Contact form forwarded");
    Ok(Json(ContactResponse { success: true }))
}
