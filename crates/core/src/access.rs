//! Admin access types and the gate decision.
//!
//! A principal is an administrator iff it presents a live [`Session`] **and**
//! an [`AdminMembership`] row exists for its identity. [`decide`] is the one
//! place that composition is written down; every enforcement point in the
//! storefront (edge middleware, page extractor, client guard probe, API
//! extractor) resolves the session with its own transport and then calls it.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{IdentityId, MembershipId};

/// Root of the admin section.
pub const ADMIN_PREFIX: &str = "/admin";

/// Root of the admin JSON API.
pub const ADMIN_API_PREFIX: &str = "/api/admin";

/// Where denied navigations are sent.
pub const LOGIN_PATH: &str = "/admin/login";

/// Password reset page; reachable without a session.
pub const RESET_PASSWORD_PATH: &str = "/admin/reset-password";

/// Admin paths that bypass the gate. Exact matches only.
const GATE_EXEMPT_PATHS: &[&str] = &[LOGIN_PATH, RESET_PASSWORD_PATH];

/// A live session vouched for by the identity provider.
///
/// Sessions are only ever read or revoked by this application; they are
/// minted by the provider's sign-in flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    identity_id: IdentityId,
    email: Option<String>,
    expires_at: DateTime<Utc>,
}

impl Session {
    /// Create a session for a resolved identity.
    #[must_use]
    pub const fn new(
        identity_id: IdentityId,
        email: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            identity_id,
            email,
            expires_at,
        }
    }

    /// The authenticated identity.
    #[must_use]
    pub const fn identity_id(&self) -> IdentityId {
        self.identity_id
    }

    /// Email reported by the provider, if any.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// When the underlying access token stops being accepted.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the session has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Row in the `admin_users` collection granting admin rights to an identity.
///
/// Created by the provisioning CLI; the gate only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminMembership {
    pub id: MembershipId,
    #[serde(rename = "user_id")]
    pub identity_id: IdentityId,
    pub created_at: DateTime<Utc>,
}

/// Why a request was denied. Never shown to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No credential, or the credential did not resolve to a live session.
    NoSession,
    /// Live session without an admin membership.
    NotAdmin,
}

impl DenyReason {
    /// Stable label for structured logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoSession => "no_session",
            Self::NotAdmin => "not_admin",
        }
    }
}

/// Outcome of the admin gate for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Proceed; carries the session that passed both checks.
    Allow(Session),
    /// Send the caller to `target`.
    DenyRedirect {
        /// Redirect target (absolute path).
        target: &'static str,
    },
    /// Terminate the session with the provider, then send the caller to `target`.
    DenyRevokeAndRedirect {
        /// Redirect target (absolute path).
        target: &'static str,
    },
}

impl GateDecision {
    /// Whether the request may proceed.
    #[must_use]
    pub const fn is_allow(&self) -> bool {
        matches!(self, Self::Allow(_))
    }

    /// The deny reason, or `None` for [`GateDecision::Allow`].
    #[must_use]
    pub const fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Self::Allow(_) => None,
            Self::DenyRedirect { .. } => Some(DenyReason::NoSession),
            Self::DenyRevokeAndRedirect { .. } => Some(DenyReason::NotAdmin),
        }
    }

    /// Where a denied navigation should land.
    #[must_use]
    pub const fn redirect_target(&self) -> Option<&'static str> {
        match self {
            Self::Allow(_) => None,
            Self::DenyRedirect { target } | Self::DenyRevokeAndRedirect { target } => {
                Some(*target)
            }
        }
    }

    /// Whether the session must be revoked before responding.
    #[must_use]
    pub const fn requires_revoke(&self) -> bool {
        matches!(self, Self::DenyRevokeAndRedirect { .. })
    }
}

/// Compose the session check and the membership check.
///
/// `is_admin` is only invoked with the identity of a resolved session, so a
/// membership lookup without a principal cannot be expressed. Lookup errors
/// are the caller's to map to `false` before returning.
///
/// ```
/// use seamline_core::{GateDecision, LOGIN_PATH, decide};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let decision = decide(None, |_| async { true }).await;
/// assert_eq!(decision, GateDecision::DenyRedirect { target: LOGIN_PATH });
/// # });
/// ```
pub async fn decide<F, Fut>(session: Option<Session>, is_admin: F) -> GateDecision
where
    F: FnOnce(IdentityId) -> Fut,
    Fut: Future<Output = bool>,
{
    let Some(session) = session else {
        return GateDecision::DenyRedirect { target: LOGIN_PATH };
    };

    if is_admin(session.identity_id()).await {
        GateDecision::Allow(session)
    } else {
        GateDecision::DenyRevokeAndRedirect { target: LOGIN_PATH }
    }
}

/// Whether `path` is on the gate's allow-list.
///
/// A single trailing slash is ignored so `/admin/login/` cannot loop.
#[must_use]
pub fn is_gate_exempt(path: &str) -> bool {
    let trimmed = if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    };
    GATE_EXEMPT_PATHS.contains(&trimmed)
}

/// Whether `path` is behind the admin gate.
///
/// Covers `/admin`, everything below it and the admin JSON API, minus the
/// exempt pages.
#[must_use]
pub fn is_protected_path(path: &str) -> bool {
    let under = |prefix: &str| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    };
    (under(ADMIN_PREFIX) || under(ADMIN_API_PREFIX)) && !is_gate_exempt(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use chrono::Duration;
    use uuid::Uuid;

    use super::*;

    fn session(id: u128) -> Session {
        Session::new(
            IdentityId::new(Uuid::from_u128(id)),
            Some("staff@seamline.shop".to_string()),
            Utc::now() + Duration::hours(1),
        )
    }

    #[tokio::test]
    async fn test_no_session_redirects_without_lookup() {
        let called = Cell::new(false);
        let decision = decide(None, |_| {
            called.set(true);
            async { true }
        })
        .await;

        assert_eq!(decision, GateDecision::DenyRedirect { target: LOGIN_PATH });
        assert_eq!(decision.deny_reason(), Some(DenyReason::NoSession));
        assert!(!decision.requires_revoke());
        assert!(!called.get());
    }

    #[tokio::test]
    async fn test_non_member_is_revoked() {
        let decision = decide(Some(session(1)), |_| async { false }).await;

        assert_eq!(
            decision,
            GateDecision::DenyRevokeAndRedirect { target: LOGIN_PATH }
        );
        assert_eq!(decision.deny_reason(), Some(DenyReason::NotAdmin));
        assert!(decision.requires_revoke());
        assert_eq!(decision.redirect_target(), Some(LOGIN_PATH));
    }

    #[tokio::test]
    async fn test_member_is_allowed_with_its_session() {
        let expected = session(2);
        let seen = Cell::new(None);
        let decision = decide(Some(expected.clone()), |id| {
            seen.set(Some(id));
            async { true }
        })
        .await;

        assert_eq!(decision, GateDecision::Allow(expected.clone()));
        assert_eq!(seen.get(), Some(expected.identity_id()));
        assert!(decision.is_allow());
        assert_eq!(decision.redirect_target(), None);
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let s = Session::new(IdentityId::new(Uuid::nil()), None, now);
        assert!(s.is_expired_at(now));
        assert!(!s.is_expired_at(now - Duration::seconds(1)));
    }

    #[test]
    fn test_gate_exempt_paths() {
        assert!(is_gate_exempt("/admin/login"));
        assert!(is_gate_exempt("/admin/login/"));
        assert!(is_gate_exempt("/admin/reset-password"));

        assert!(!is_gate_exempt("/admin"));
        assert!(!is_gate_exempt("/admin/"));
        assert!(!is_gate_exempt("/admin/login-as"));
        assert!(!is_gate_exempt("/admin/login/../orders"));
        assert!(!is_gate_exempt("/"));
    }

    #[test]
    fn test_protected_paths() {
        assert!(is_protected_path("/admin"));
        assert!(is_protected_path("/admin/"));
        assert!(is_protected_path("/admin/orders"));
        assert!(is_protected_path("/admin/login-as"));
        assert!(is_protected_path("/api/admin/orders"));
        assert!(is_protected_path("/api/admin/session"));

        assert!(!is_protected_path("/admin/login"));
        assert!(!is_protected_path("/admin/reset-password/"));
        assert!(!is_protected_path("/administrator"));
        assert!(!is_protected_path("/api/administer"));
        assert!(!is_protected_path("/api/products"));
        assert!(!is_protected_path("/"));
    }

    #[test]
    fn test_membership_deserializes_from_row() {
        let row = serde_json::json!({
            "id": 3,
            "user_id": "0b6f3c1e-5d2a-4b8e-9c41-2f7e8a9d0c13",
            "created_at": "2026-01-05T10:00:00Z"
        });
        let membership: AdminMembership = serde_json::from_value(row).unwrap();
        assert_eq!(membership.id, MembershipId::new(3));
        assert_eq!(
            membership.identity_id.to_string(),
            "0b6f3c1e-5d2a-4b8e-9c41-2f7e8a9d0c13"
        );
    }
}
