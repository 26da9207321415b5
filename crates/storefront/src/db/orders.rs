//! Order repository (admin listing).

use seamline_core::OrderStatus;

use super::{DataStore, DataStoreError, Direction, Page, Query, collections, fetch_page};
use crate::models::Order;

/// Repository for `orders` reads.
pub struct OrderRepository<'a> {
    store: &'a dyn DataStore,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(store: &'a dyn DataStore) -> Self {
        Self { store }
    }

    /// One page of orders, newest first, optionally limited to one status.
    ///
    /// # Errors
    ///
    /// Returns `DataStoreError` if the query fails or a row cannot be decoded.
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Order>, DataStoreError> {
        let mut query = Query::from(collections::ORDERS);
        if let Some(status) = status {
            query = query.eq("status", status.as_str());
        }
        let query = query
            .order("created_at", Direction::Desc)
            .order("id", Direction::Desc)
            .page(page, per_page);

        fetch_page(self.store, &query).await
    }

    /// Number of orders.
    ///
    /// # Errors
    ///
    /// Returns `DataStoreError` if the query fails.
    pub async fn count(&self) -> Result<u64, DataStoreError> {
        self.store.count(&Query::from(collections::ORDERS)).await
    }
}
