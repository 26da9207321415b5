//! Data store access for the storefront.
//!
//! The hosted database is reached through its REST interface; the server
//! owns no persistence engine. Every read is a [`Query`] against a named
//! collection:
//!
//! ## Collections
//!
//! - `products` - Catalogue (read-only from the storefront)
//! - `orders` - Orders (read-only, admin listing)
//! - `newsletter_subscribers` - Newsletter sign-ups (unique `email`)
//! - `admin_users` - Admin memberships (unique `user_id`)
//!
//! # Migrations
//!
//! The `admin_users` and `newsletter_subscribers` tables are created by
//! the SQL migrations in `crates/storefront/migrations/`, run via:
//! ```bash
//! cargo run -p seamline-cli -- migrate
//! ```

pub mod admin_memberships;
pub mod memory;
pub mod newsletter;
pub mod orders;
pub mod postgrest;
pub mod products;
pub mod query;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use admin_memberships::AdminMembershipRepository;
pub use memory::MemoryStore;
pub use newsletter::{NewsletterRepository, SubscribeOutcome};
pub use orders::OrderRepository;
pub use postgrest::PostgrestStore;
pub use products::{ProductFilter, ProductRepository, ProductSort};
pub use query::{Direction, Op, Query};

/// Collection names.
pub mod collections {
    pub const PRODUCTS: &str = "products";
    pub const ORDERS: &str = "orders";
    pub const NEWSLETTER_SUBSCRIBERS: &str = "newsletter_subscribers";
    pub const ADMIN_USERS: &str = "admin_users";
}

/// Errors from data store operations.
#[derive(Debug, Error)]
pub enum DataStoreError {
    /// Transport failure talking to the store.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store rejected the request.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the store.
        message: String,
    },

    /// Unique constraint violation.
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A row could not be decoded into the expected shape.
    #[error("data corruption: {0}")]
    Decode(String),

    /// The store is not reachable or not configured.
    #[error("data store unavailable: {0}")]
    Unavailable(String),
}

impl DataStoreError {
    /// Decode failure helper for `serde_json` errors.
    pub(crate) fn decode(err: &serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Generic filter / project / order / paginate access to named collections.
///
/// Rows are JSON objects; repositories decode them into typed models.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Fetch rows matching `query`.
    async fn select(&self, query: &Query) -> Result<Vec<Value>, DataStoreError>;

    /// Count rows matching the filters of `query` (paging is ignored).
    async fn count(&self, query: &Query) -> Result<u64, DataStoreError>;

    /// Insert one row and return it as stored.
    ///
    /// Returns [`DataStoreError::Conflict`] on a unique constraint violation.
    async fn insert(&self, collection: &str, row: Value) -> Result<Value, DataStoreError>;
}

/// One page of decoded rows plus the total matching the filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    /// Whether rows exist beyond this page.
    #[must_use]
    pub fn has_more(&self, page: u32, per_page: u32) -> bool {
        u64::from(page) * u64::from(per_page) < self.total
    }
}

/// Run a paged select and its count concurrently.
pub(crate) async fn fetch_page<T: serde::de::DeserializeOwned>(
    store: &dyn DataStore,
    query: &Query,
) -> Result<Page<T>, DataStoreError> {
    let (rows, total) = tokio::try_join!(store.select(query), store.count(query))?;
    Ok(Page {
        items: decode_rows(rows)?,
        total,
    })
}

/// Decode a list of rows into `T`.
pub(crate) fn decode_rows<T: serde::de::DeserializeOwned>(
    rows: Vec<Value>,
) -> Result<Vec<T>, DataStoreError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(|e| DataStoreError::decode(&e)))
        .collect()
}
