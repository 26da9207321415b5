//! Product catalogue repository.

use serde::Deserialize;

use seamline_core::ProductId;

use super::{
    DataStore, DataStoreError, Direction, Page, Query, collections, decode_rows, fetch_page,
};
use crate::models::Product;

/// Default page size for listings.
pub const DEFAULT_PER_PAGE: u32 = 24;

/// Largest page a caller may request.
pub const MAX_PER_PAGE: u32 = 100;

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl ProductSort {
    /// Primary sort key; `id` is always appended as a tie-breaker so pages
    /// are stable.
    const fn key(self) -> (&'static str, Direction) {
        match self {
            Self::Newest => ("created_at", Direction::Desc),
            Self::PriceAsc => ("price", Direction::Asc),
            Self::PriceDesc => ("price", Direction::Desc),
            Self::Name => ("name", Direction::Asc),
        }
    }
}

/// Validated listing parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub sort: ProductSort,
    pub page: u32,
    pub per_page: u32,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            category: None,
            search: None,
            sort: ProductSort::default(),
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// Repository for catalogue reads.
pub struct ProductRepository<'a> {
    store: &'a dyn DataStore,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(store: &'a dyn DataStore) -> Self {
        Self { store }
    }

    /// One page of active products matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `DataStoreError` if the query fails or a row cannot be decoded.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Page<Product>, DataStoreError> {
        let mut query = Query::from(collections::PRODUCTS).eq("active", true);

        if let Some(category) = &filter.category {
            query = query.eq("category", category.as_str());
        }
        if let Some(search) = filter.search.as_deref().map(sanitize_search)
            && !search.is_empty()
        {
            query = query.ilike("name", &format!("*{search}*"));
        }

        let (column, direction) = filter.sort.key();
        let query = query
            .order(column, direction)
            .order("id", Direction::Asc)
            .page(filter.page, filter.per_page);

        fetch_page(self.store, &query).await
    }

    /// A single active product.
    ///
    /// # Errors
    ///
    /// Returns `DataStoreError` if the query fails or the row cannot be decoded.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, DataStoreError> {
        let query = Query::from(collections::PRODUCTS)
            .eq("id", id.as_i64())
            .eq("active", true)
            .limit(1);

        let rows = self.store.select(&query).await?;
        Ok(decode_rows(rows)?.into_iter().next())
    }

    /// Number of products, active or not.
    ///
    /// # Errors
    ///
    /// Returns `DataStoreError` if the query fails.
    pub async fn count_all(&self) -> Result<u64, DataStoreError> {
        self.store
            .count(&Query::from(collections::PRODUCTS))
            .await
    }
}

/// Drop characters that carry meaning in the store's filter syntax.
fn sanitize_search(term: &str) -> String {
    term.chars()
        .filter(|c| !matches!(c, '*' | '%' | '_' | ',' | '(' | ')' | '"' | '\\'))
        .collect::<String>()
        .trim()
        .to_string()
}
