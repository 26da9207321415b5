//! Newsletter subscriber repository.

use serde_json::json;

use seamline_core::Email;

use super::{DataStore, DataStoreError, Direction, Page, Query, collections, fetch_page};
use crate::models::Subscriber;

/// Result of a subscribe attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// A new row was written.
    Created(Subscriber),
    /// The address was already on the list.
    AlreadySubscribed,
}

/// Repository for `newsletter_subscribers`.
pub struct NewsletterRepository<'a> {
    store: &'a dyn DataStore,
}

impl<'a> NewsletterRepository<'a> {
    /// Create a new newsletter repository.
    #[must_use]
    pub const fn new(store: &'a dyn DataStore) -> Self {
        Self { store }
    }

    /// Add an address to the list.
    ///
    /// The unique constraint on `email` is the source of truth for
    /// duplicates; a conflict is reported as [`SubscribeOutcome::AlreadySubscribed`].
    ///
    /// # Errors
    ///
    /// Returns `DataStoreError` for any failure other than a duplicate.
    pub async fn subscribe(&self, email: &Email) -> Result<SubscribeOutcome, DataStoreError> {
        match self
            .store
            .insert(
                collections::NEWSLETTER_SUBSCRIBERS,
                json!({ "email": email.as_str() }),
            )
            .await
        {
            Ok(row) => {
                let subscriber =
                    serde_json::from_value(row).map_err(|e| DataStoreError::decode(&e))?;
                Ok(SubscribeOutcome::Created(subscriber))
            }
            Err(DataStoreError::Conflict(_)) => Ok(SubscribeOutcome::AlreadySubscribed),
            Err(e) => Err(e),
        }
    }

    /// One page of subscribers, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DataStoreError` if the query fails or a row cannot be decoded.
    pub async fn list(&self, page: u32, per_page: u32) -> Result<Page<Subscriber>, DataStoreError> {
        let query = Query::from(collections::NEWSLETTER_SUBSCRIBERS)
            .order("created_at", Direction::Desc)
            .order("id", Direction::Desc)
            .page(page, per_page);

        fetch_page(self.store, &query).await
    }

    /// Number of subscribers.
    ///
    /// # Errors
    ///
    /// Returns `DataStoreError` if the query fails.
    pub async fn count(&self) -> Result<u64, DataStoreError> {
        self.store
            .count(&Query::from(collections::NEWSLETTER_SUBSCRIBERS))
            .await
    }
}
