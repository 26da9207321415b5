//! Product catalogue API handlers.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    http::header::CACHE_CONTROL,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use seamline_core::ProductId;

use super::paging;
use crate::db::products::DEFAULT_PER_PAGE;
use crate::db::{ProductFilter, ProductRepository, ProductSort};
use crate::error::{AppError, Result};
use crate::models::Product;
use crate::state::AppState;

/// Cache policy for successful catalogue reads.
pub const CATALOG_CACHE_CONTROL: &str =
    "public, max-age=60, s-maxage=300, stale-while-revalidate=600";

/// Query parameters for the product listing.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort: ProductSort,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ProductQuery {
    fn into_filter(self) -> Result<ProductFilter> {
        let (page, per_page) = paging(self.page, self.per_page, DEFAULT_PER_PAGE)?;
        Ok(ProductFilter {
            category: non_blank(self.category),
            search: non_blank(self.search),
            sort: self.sort,
            page,
            per_page,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// One page of products.
#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<Product>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub has_more: bool,
}

/// List active products.
///
/// GET /api/products?category=&search=&sort=&page=&per_page=
#[instrument(skip(state, query))]
pub async fn index(
    State(state): State<AppState>,
    query: std::result::Result<Query<ProductQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let filter = query.into_filter()?;

    let page = ProductRepository::new(state.store()).list(&filter).await?;
    let has_more = page.has_more(filter.page, filter.per_page);

    Ok((
        [(CACHE_CONTROL, CATALOG_CACHE_CONTROL)],
        Json(ProductListResponse {
            products: page.items,
            page: filter.page,
            per_page: filter.per_page,
            total: page.total,
            has_more,
        }),
    ))
}

/// Show one active product.
///
/// GET /api/products/{id}
#[instrument(skip(state, id))]
pub async fn show(
    State(state): State<AppState>,
    id: std::result::Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse> {
    let Ok(Path(id)) = id else {
        return Err(AppError::NotFound("Product".to_string()));
    };

    let product = ProductRepository::new(state.store())
        .get(ProductId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    Ok(([(CACHE_CONTROL, CATALOG_CACHE_CONTROL)], Json(product)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_query_into_filter() {
        let filter = ProductQuery {
            category: Some("  tops ".to_string()),
            search: Some("   ".to_string()),
            sort: ProductSort::PriceAsc,
            page: Some(2),
            per_page: None,
        }
        .into_filter()
        .unwrap();

        assert_eq!(filter.category.as_deref(), Some("tops"));
        assert_eq!(filter.search, None);
        assert_eq!(filter.sort, ProductSort::PriceAsc);
        assert_eq!((filter.page, filter.per_page), (2, DEFAULT_PER_PAGE));
    }

    #[test]
    fn test_query_rejects_oversized_page() {
        let result = ProductQuery {
            per_page: Some(500),
            ..ProductQuery::default()
        }
        .into_filter();
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
