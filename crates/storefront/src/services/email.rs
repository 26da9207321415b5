//! Outbound email.
//!
//! Uses SMTP via lettre against an external relay, with Askama HTML
//! templates rendered before handing the body to a [`Mailer`].

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use seamline_core::Email;

use crate::config::EmailConfig;

/// HTML template for contact form notifications.
#[derive(Template)]
#[template(path = "email/contact.html")]
struct ContactEmailHtml<'a> {
    name: &'a str,
    email: &'a str,
    subject: &'a str,
    message: &'a str,
}

/// HTML template for the newsletter welcome email.
#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeEmailHtml<'a> {
    email: &'a str,
    site_url: Option<&'a str>,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum MailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Sends one HTML email.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver `html_body` to `to`.
    async fn send(&self, to: &Email, subject: &str, html_body: &str) -> Result<(), MailError>;
}

/// Render the notification for a contact form submission.
///
/// # Errors
///
/// Returns `MailError::Template` if rendering fails.
pub fn render_contact(
    name: &str,
    email: &Email,
    subject: &str,
    message: &str,
) -> Result<String, MailError> {
    Ok(ContactEmailHtml {
        name,
        email: email.as_str(),
        subject,
        message,
    }
    .render()?)
}

/// Render the welcome email for a new subscriber.
///
/// # Errors
///
/// Returns `MailError::Template` if rendering fails.
pub fn render_welcome(email: &Email, site_url: Option<&str>) -> Result<String, MailError> {
    Ok(WelcomeEmailHtml {
        email: email.as_str(),
        site_url,
    }
    .render()?)
}

/// [`Mailer`] backed by an SMTP relay.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Create a new SMTP mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay host is invalid or the sender address
    /// cannot be used as a mailbox.
    pub fn new(config: &EmailConfig) -> Result<Self, MailError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        let from = config
            .from_address
            .as_str()
            .parse()
            .map_err(|_| MailError::InvalidAddress(config.from_address.to_string()))?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &Email, subject: &str, html_body: &str) -> Result<(), MailError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(to
                .as_str()
                .parse()
                .map_err(|_| MailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string())?;

        self.transport.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}
