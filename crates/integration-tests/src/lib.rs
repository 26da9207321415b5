//! Integration test harness for Seamline.
//!
//! Builds the real storefront router over in-process collaborators:
//!
//! - [`FakeIdentity`] - token-to-session map with sign-in, sign-out and
//!   an outage switch
//! - [`MemoryStore`] - the storefront's in-memory data store
//! - [`RecordingMailer`] - keeps every message instead of sending it
//! - [`MemoryStorage`] - keeps uploads in memory
//!
//! Requests go through `tower::ServiceExt::oneshot`; no sockets are opened.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Request, StatusCode},
};
use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;
use uuid::Uuid;

use seamline_core::{Email, IdentityId, Session};
use seamline_storefront::config::{DEFAULT_STORAGE_BUCKET, LogFormat, StorefrontConfig, SupabaseConfig};
use seamline_storefront::db::{MemoryStore, collections};
use seamline_storefront::routes;
use seamline_storefront::services::{
    AccessToken, Identity, IdentityError, IdentityProvider, MailError, Mailer, ObjectStorage,
    SignedIn, StorageError,
};
use seamline_storefront::state::{AppState, Collaborators};

pub use seamline_storefront::gate::ACCESS_TOKEN_COOKIE;

/// Address contact form messages are delivered to.
pub const ADMIN_INBOX: &str = "owner@seamline.test";

// =============================================================================
// Identity provider
// =============================================================================

/// Identity provider fake.
///
/// Tokens map to sessions. Signing out marks a token revoked, after which
/// it no longer resolves.
#[derive(Default)]
pub struct FakeIdentity {
    sessions: Mutex<HashMap<String, Session>>,
    revoked: Mutex<HashSet<String>>,
    accounts: Mutex<HashMap<String, (String, String)>>,
    reset_requests: Mutex<Vec<(String, Option<String>)>>,
    sign_outs: AtomicUsize,
    session_lookups: AtomicUsize,
    failing: AtomicBool,
}

impl FakeIdentity {
    /// Register a live session for `token`.
    pub fn add_session(&self, token: &str, session: Session) {
        self.sessions
            .lock()
            .unwrap()
            .insert(token.to_string(), session);
    }

    /// Register an account that signs in with `password` and receives `token`.
    pub fn add_account(&self, email: &str, password: &str, token: &str) {
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_string(), (password.to_string(), token.to_string()));
    }

    /// Make every call fail as if the provider were down.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `sign_out` calls received.
    pub fn sign_out_count(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }

    /// Number of `get_session` calls received.
    pub fn session_lookup_count(&self) -> usize {
        self.session_lookups.load(Ordering::SeqCst)
    }

    /// Whether `token` has been signed out.
    pub fn is_revoked(&self, token: &str) -> bool {
        self.revoked.lock().unwrap().contains(token)
    }

    /// Password reset requests as `(email, redirect_to)`.
    pub fn reset_requests(&self) -> Vec<(String, Option<String>)> {
        self.reset_requests.lock().unwrap().clone()
    }

    fn check_available(&self) -> Result<(), IdentityError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(IdentityError::Unavailable("identity provider offline".to_string()));
        }
        Ok(())
    }

    fn live_session(&self, token: &AccessToken) -> Option<Session> {
        if self.is_revoked(token.expose()) {
            return None;
        }
        self.sessions.lock().unwrap().get(token.expose()).cloned()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn get_session(&self, token: &AccessToken) -> Result<Option<Session>, IdentityError> {
        self.session_lookups.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.live_session(token))
    }

    async fn get_user(&self, token: &AccessToken) -> Result<Option<Identity>, IdentityError> {
        self.check_available()?;
        Ok(self.live_session(token).map(|s| Identity {
            id: s.identity_id(),
            email: s.email().map(String::from),
        }))
    }

    async fn sign_out(&self, token: &AccessToken) -> Result<(), IdentityError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        self.revoked
            .lock()
            .unwrap()
            .insert(token.expose().to_string());
        Ok(())
    }

    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Option<SignedIn>, IdentityError> {
        self.check_available()?;
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts
            .get(email.as_str())
            .filter(|(expected, _)| expected == password.expose_secret())
            .map(|(_, token)| SignedIn {
                access_token: AccessToken::new(token.clone()),
                expires_in: 3600,
            }))
    }

    async fn send_password_reset(
        &self,
        email: &Email,
        redirect_to: Option<&Url>,
    ) -> Result<(), IdentityError> {
        self.check_available()?;
        self.reset_requests.lock().unwrap().push((
            email.as_str().to_string(),
            redirect_to.map(ToString::to_string),
        ));
        Ok(())
    }
}

// =============================================================================
// Mailer and storage
// =============================================================================

/// One captured email.
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Mailer that records instead of sending.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    /// Messages sent so far.
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    /// Make every send fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &Email, subject: &str, html_body: &str) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::InvalidAddress("relay refused recipient".to_string()));
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.as_str().to_string(),
            subject: subject.to_string(),
            html: html_body.to_string(),
        });
        Ok(())
    }
}

/// One stored object.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub size: usize,
}

/// Object storage that keeps uploads in memory.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<Vec<StoredObject>>,
}

impl MemoryStorage {
    /// Objects uploaded so far.
    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.objects.lock().unwrap().push(StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len(),
        });
        Ok(format!("https://storage.seamline.test/{bucket}/{key}"))
    }
}

// =============================================================================
// Test application
// =============================================================================

/// Storefront configuration pointing at nothing real.
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        site_url: Some(Url::parse("https://seamline.test/").unwrap()),
        supabase: SupabaseConfig {
            url: Url::parse("https://project.supabase.test/").unwrap(),
            anon_key: "anon-key".to_string(),
            service_role_key: SecretString::from("service-role-key"),
        },
        email: None,
        admin_notification_email: Some(Email::parse(ADMIN_INBOX).unwrap()),
        storage_bucket: DEFAULT_STORAGE_BUCKET.to_string(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
        log_format: LogFormat::Text,
    }
}

/// Storefront wired to fakes, with handles to inspect them.
pub struct TestApp {
    pub state: AppState,
    pub identity: Arc<FakeIdentity>,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub storage: Arc<MemoryStorage>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// App with a mailer configured.
    pub fn new() -> Self {
        Self::build(true)
    }

    /// App without SMTP: contact answers `503`, no welcome mail.
    pub fn without_mailer() -> Self {
        Self::build(false)
    }

    fn build(with_mailer: bool) -> Self {
        let identity = Arc::new(FakeIdentity::default());
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let storage = Arc::new(MemoryStorage::default());

        let state = AppState::new(
            test_config(),
            Collaborators {
                identity: identity.clone(),
                store: store.clone(),
                mailer: with_mailer.then(|| mailer.clone() as Arc<dyn Mailer>),
                storage: storage.clone(),
            },
        );

        Self {
            state,
            identity,
            store,
            mailer,
            storage,
        }
    }

    /// Full router: edge gate, security headers, request ids, tracing.
    pub fn router(&self) -> Router {
        routes::app(self.state.clone())
    }

    /// Routes without any middleware, so only the handler extractors gate.
    pub fn bare_router(&self) -> Router {
        routes::routes().with_state(self.state.clone())
    }

    /// Create a live session for a fresh identity and return its token.
    pub fn sign_in(&self, token: &str) -> IdentityId {
        let identity_id = IdentityId::new(Uuid::new_v4());
        self.identity.add_session(
            token,
            Session::new(
                identity_id,
                Some(format!("{token}@seamline.test")),
                Utc::now() + Duration::hours(1),
            ),
        );
        identity_id
    }

    /// Create a live session whose identity also holds an admin membership.
    pub fn sign_in_admin(&self, token: &str) -> IdentityId {
        let identity_id = self.sign_in(token);
        self.grant_admin(identity_id);
        identity_id
    }

    /// Insert an `admin_users` row for `identity_id`.
    pub fn grant_admin(&self, identity_id: IdentityId) {
        let id = i64::try_from(self.store.rows(collections::ADMIN_USERS).len()).unwrap() + 1;
        self.store.seed(
            collections::ADMIN_USERS,
            [json!({
                "id": id,
                "user_id": identity_id.to_string(),
                "created_at": "2026-01-01T00:00:00Z",
            })],
        );
    }

    /// Send `request` through the full router.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        TestResponse::from_router(self.router(), request).await
    }
}

// =============================================================================
// Requests and responses
// =============================================================================

/// Collected response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// Run `request` through `router` and buffer the response.
    pub async fn from_router(router: Router, request: Request<Body>) -> Self {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        Self {
            status,
            headers,
            body,
        }
    }

    /// Body parsed as JSON.
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    /// Body as UTF-8 text.
    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).unwrap()
    }

    /// Value of a header, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All `Set-Cookie` values.
    pub fn set_cookies(&self) -> Vec<&str> {
        self.headers
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// Whether this is a redirect to `location`.
    pub fn is_redirect_to(&self, location: &str) -> bool {
        self.status.is_redirection() && self.header("location") == Some(location)
    }
}

/// `GET path` with no credentials.
pub fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

/// `GET path` carrying `token` in the session cookie.
pub fn get_with_cookie(path: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header("cookie", format!("{ACCESS_TOKEN_COOKIE}={token}"))
        .body(Body::empty())
        .unwrap()
}

/// `GET path` carrying `token` as a bearer credential.
pub fn get_with_bearer(path: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

/// `POST path` with a JSON body.
pub fn post_json(path: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// `POST path` with a form body and optional session cookie.
pub fn post_form(path: &str, body: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/x-www-form-urlencoded");
    if let Some(token) = token {
        builder = builder.header("cookie", format!("{ACCESS_TOKEN_COOKIE}={token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Seed a small catalogue: three active products and one inactive.
pub fn seed_catalogue(store: &MemoryStore) {
    store.seed(
        collections::PRODUCTS,
        [
            json!({"id": 1, "name": "Linen Shirt", "price": "89.00", "category": "shirts", "sizes": ["S", "M", "L"], "stock": 12, "active": true, "created_at": "2026-01-01T00:00:00Z"}),
            json!({"id": 2, "name": "Denim Jacket", "price": "149.00", "category": "outerwear", "sizes": ["M", "L"], "stock": 0, "active": true, "created_at": "2026-01-03T00:00:00Z"}),
            json!({"id": 3, "name": "Wool Coat", "price": "289.00", "category": "outerwear", "active": false, "created_at": "2026-01-04T00:00:00Z"}),
            json!({"id": 4, "name": "Oxford Shirt", "price": "79.00", "category": "shirts", "active": true, "created_at": "2026-01-02T00:00:00Z"}),
        ],
    );
}
