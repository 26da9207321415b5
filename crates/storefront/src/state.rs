//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::{DataStore, DataStoreError, PostgrestStore};
use crate::gate::AdminGate;
use crate::services::{
    IdentityError, IdentityProvider, MailError, Mailer, ObjectStorage, SmtpMailer, StorageError,
    SupabaseAuth, SupabaseStorage,
};

/// Error building the hosted collaborator clients.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("identity provider client: {0}")]
    Identity(#[from] IdentityError),
    #[error("data store client: {0}")]
    DataStore(#[from] DataStoreError),
    #[error("mailer: {0}")]
    Mail(#[from] MailError),
    #[error("object storage client: {0}")]
    Storage(#[from] StorageError),
}

/// External collaborators, constructed once and injected.
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn DataStore>,
    /// `None` when SMTP is not configured.
    pub mailer: Option<Arc<dyn Mailer>>,
    pub storage: Arc<dyn ObjectStorage>,
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the collaborator clients and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DataStore>,
    mailer: Option<Arc<dyn Mailer>>,
    storage: Arc<dyn ObjectStorage>,
    gate: AdminGate,
}

impl AppState {
    /// Create application state from already-built collaborators.
    #[must_use]
    pub fn new(config: StorefrontConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            identity,
            store,
            mailer,
            storage,
        } = collaborators;
        let gate = AdminGate::new(Arc::clone(&identity), Arc::clone(&store));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                identity,
                store,
                mailer,
                storage,
                gate,
            }),
        }
    }

    /// Build the hosted clients described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if any client cannot be constructed.
    pub fn from_config(config: StorefrontConfig) -> Result<Self, StateError> {
        let identity: Arc<dyn IdentityProvider> = Arc::new(SupabaseAuth::new(&config.supabase)?);
        let store: Arc<dyn DataStore> = Arc::new(PostgrestStore::new(&config.supabase)?);
        let storage: Arc<dyn ObjectStorage> = Arc::new(SupabaseStorage::new(&config.supabase)?);
        let mailer = match &config.email {
            Some(email) => Some(Arc::new(SmtpMailer::new(email)?) as Arc<dyn Mailer>),
            None => {
                tracing::warn!("SMTP not configured; contact form and welcome mail disabled");
                None
            }
        };

        Ok(Self::new(
            config,
            Collaborators {
                identity,
                store,
                mailer,
                storage,
            },
        ))
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get the identity provider.
    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }

    /// Get the data store.
    #[must_use]
    pub fn store(&self) -> &dyn DataStore {
        self.inner.store.as_ref()
    }

    /// Get the mailer, if SMTP is configured.
    #[must_use]
    pub fn mailer(&self) -> Option<&dyn Mailer> {
        self.inner.mailer.as_deref()
    }

    /// Get the object storage client.
    #[must_use]
    pub fn storage(&self) -> &dyn ObjectStorage {
        self.inner.storage.as_ref()
    }

    /// Get the admin gate.
    #[must_use]
    pub fn gate(&self) -> &AdminGate {
        &self.inner.gate
    }
}
