//! Admin access gate.
//!
//! [`AdminGate`] wires the identity provider (session resolution) and the
//! data store (membership lookup) into [`seamline_core::decide`]. Every
//! enforcement point reads the credential with [`Credential::from_headers`]
//! and goes through [`AdminGate::evaluate`]:
//!
//! 1. Edge middleware (`middleware::admin_gate_middleware`)
//! 2. Server-rendered pages (`middleware::RequireAdmin`)
//! 3. Client route guard probe (`GET /api/admin/session`)
//! 4. Admin API calls (`middleware::RequireAdminApi`)
//!
//! Nothing is cached between requests: both checks run every time.

pub mod credentials;

use std::sync::Arc;

use chrono::Utc;
use seamline_core::{GateDecision, IdentityId, Session, decide};

use crate::db::{AdminMembershipRepository, DataStore};
use crate::services::{AccessToken, IdentityProvider};

pub use credentials::{
    ACCESS_TOKEN_COOKIE, Credential, CredentialSource, expired_cookie, session_cookie,
};

/// Session resolver, role authorizer and gate enforcer.
#[derive(Clone)]
pub struct AdminGate {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DataStore>,
}

impl AdminGate {
    /// Create a gate over the given collaborators.
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn DataStore>) -> Self {
        Self { identity, store }
    }

    /// Resolve a credential to a live session.
    ///
    /// Malformed, expired or unknown tokens and provider failures all
    /// yield `None`.
    pub async fn resolve_session(&self, credential: &Credential) -> Option<Session> {
        match self.identity.get_session(&credential.token).await {
            Ok(Some(session)) if !session.is_expired_at(Utc::now()) => Some(session),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Identity provider failed to resolve session");
                None
            }
        }
    }

    /// Whether `identity_id` holds exactly one admin membership.
    ///
    /// Fails closed: lookup errors and duplicate rows both answer `false`.
    pub async fn is_admin(&self, identity_id: IdentityId) -> bool {
        match AdminMembershipRepository::new(self.store.as_ref())
            .find_for_identity(identity_id)
            .await
        {
            Ok(rows) => match rows.len() {
                1 => true,
                0 => false,
                n => {
                    tracing::error!(
                        identity_id = %identity_id,
                        rows = n,
                        "Multiple admin memberships for one identity"
                    );
                    false
                }
            },
            Err(e) => {
                tracing::warn!(identity_id = %identity_id, error = %e, "Admin membership lookup failed");
                false
            }
        }
    }

    /// Run both checks for one request and carry out any revocation.
    ///
    /// When the decision is [`GateDecision::DenyRevokeAndRedirect`] the
    /// provider session is signed out before this returns. A failed
    /// sign-out is logged; the deny stands either way.
    pub async fn evaluate(&self, credential: Option<&Credential>) -> GateDecision {
        let session = match credential {
            Some(credential) => self.resolve_session(credential).await,
            None => None,
        };

        let decision = decide(session, |identity_id| self.is_admin(identity_id)).await;

        if decision.requires_revoke()
            && let Some(credential) = credential
        {
            self.revoke(&credential.token).await;
        }

        match (&decision, decision.deny_reason()) {
            (GateDecision::Allow(session), _) => {
                tracing::debug!(identity_id = %session.identity_id(), "Admin gate allowed request");
                crate::error::set_sentry_user(&session.identity_id(), session.email());
            }
            (_, Some(reason)) => {
                tracing::info!(reason = reason.as_str(), "Admin gate denied request");
            }
            (_, None) => {}
        }

        decision
    }

    /// Terminate the provider session behind `token`.
    pub async fn revoke(&self, token: &AccessToken) {
        if let Err(e) = self.identity.sign_out(token).await {
            tracing::warn!(error = %e, "Failed to revoke session");
        }
    }
}
