//! PostgREST client for the hosted database.
//!
//! Requests run with the service role key, so row-level security does not
//! apply; callers must only expose what the route intends to expose.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::{DataStore, DataStoreError, Query};
use crate::config::SupabaseConfig;

/// Postgres error code for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Error body returned by PostgREST.
#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// [`DataStore`] backed by the hosted PostgREST endpoint.
#[derive(Clone)]
pub struct PostgrestStore {
    client: reqwest::Client,
    rest_url: Url,
}

impl PostgrestStore {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the project URL is invalid or the key cannot be
    /// used as a header value.
    pub fn new(config: &SupabaseConfig) -> Result<Self, DataStoreError> {
        let key = config.service_role_key.expose_secret();

        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(key)
                .map_err(|e| DataStoreError::Unavailable(format!("invalid service key: {e}")))?,
        );
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| DataStoreError::Unavailable(format!("invalid service key: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        let rest_url = config
            .url
            .join("rest/v1/")
            .map_err(|e| DataStoreError::Unavailable(format!("invalid project URL: {e}")))?;

        Ok(Self { client, rest_url })
    }

    /// URL for a collection with the query encoded as parameters.
    fn collection_url(&self, query: &Query) -> Result<Url, DataStoreError> {
        let mut url = self
            .rest_url
            .join(query.collection())
            .map_err(|e| DataStoreError::Unavailable(format!("invalid collection URL: {e}")))?;
        url.query_pairs_mut()
            .extend_pairs(query.to_postgrest_params());
        Ok(url)
    }

    /// Map a non-success response into a [`DataStoreError`].
    async fn error_from(response: reqwest::Response) -> DataStoreError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let body: Option<PostgrestErrorBody> = serde_json::from_str(&text).ok();

        let code = body.as_ref().and_then(|b| b.code.as_deref());
        let message = body
            .as_ref()
            .and_then(|b| b.message.clone())
            .unwrap_or(text);

        if status == StatusCode::CONFLICT || code == Some(UNIQUE_VIOLATION) {
            return DataStoreError::Conflict(message);
        }

        DataStoreError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl DataStore for PostgrestStore {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, DataStoreError> {
        let url = self.collection_url(query)?;
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let rows: Vec<Value> = response.json().await?;
        Ok(rows)
    }

    async fn count(&self, query: &Query) -> Result<u64, DataStoreError> {
        let url = self.collection_url(&query.without_paging())?;
        let response = self
            .client
            .request(Method::HEAD, url)
            .header("Prefer", "count=exact")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| DataStoreError::Decode("missing Content-Range header".to_string()))?;

        parse_content_range_total(range)
    }

    async fn insert(&self, collection: &str, row: Value) -> Result<Value, DataStoreError> {
        let url = self
            .rest_url
            .join(collection)
            .map_err(|e| DataStoreError::Unavailable(format!("invalid collection URL: {e}")))?;

        let response = self
            .client
            .post(url)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        // PostgREST returns the inserted rows as an array.
        let mut rows: Vec<Value> = response.json().await?;
        if rows.is_empty() {
            return Err(DataStoreError::Decode("insert returned no rows".to_string()));
        }
        Ok(rows.swap_remove(0))
    }
}

/// Extract the total from a `Content-Range` header (`0-23/480` or `*/0`).
fn parse_content_range_total(range: &str) -> Result<u64, DataStoreError> {
    range
        .rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse().ok())
        .ok_or_else(|| DataStoreError::Decode(format!("invalid Content-Range: {range}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::db::Direction;

    fn config() -> SupabaseConfig {
        SupabaseConfig {
            url: Url::parse("https://abcd.supabase.co").unwrap(),
            anon_key: "anon".to_string(),
            service_role_key: SecretString::from("service-role"),
        }
    }

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("0-23/480").unwrap(), 480);
        assert_eq!(parse_content_range_total("*/0").unwrap(), 0);
        assert!(parse_content_range_total("0-23/*").is_err());
        assert!(parse_content_range_total("garbage").is_err());
    }

    #[test]
    fn test_collection_url_encodes_query() {
        let store = PostgrestStore::new(&config()).unwrap();
        let query = Query::from("products")
            .eq("active", true)
            .order("created_at", Direction::Desc)
            .page(2, 10);

        let url = store.collection_url(&query).unwrap();
        assert_eq!(url.path(), "/rest/v1/products");

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("active".to_string(), "eq.true".to_string())));
        assert!(pairs.contains(&("order".to_string(), "created_at.desc".to_string())));
        assert!(pairs.contains(&("offset".to_string(), "10".to_string())));
    }
}
